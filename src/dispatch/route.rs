//! Route table
//!
//! Exact addresses are looked up first. Otherwise the wildcard routes are
//! tried longest prefix first; a wildcard is a trailing `*` segment that
//! captures exactly one further, non-empty address segment.

use std::collections::HashMap;

use super::handlers::{self, Handler};

/// Address pattern a handler is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Exact(String),
    Wildcard { prefix: Vec<String> },
}

impl RoutePattern {
    /// `"/app/volume/*"` becomes a wildcard, anything else is exact
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/*") {
            Some(prefix) => RoutePattern::Wildcard {
                prefix: segments(prefix).map(str::to_string).collect(),
            },
            None => RoutePattern::Exact(pattern.to_string()),
        }
    }
}

/// A resolved route for one address
#[derive(Clone, Copy)]
pub struct RouteMatch<'r, 'a> {
    /// Pattern the route was registered under
    pub pattern: &'r str,
    pub handler: Handler,
    /// Address segment bound by a wildcard route
    pub captured: Option<&'a str>,
}

struct WildcardRoute {
    pattern: String,
    prefix: Vec<String>,
    handler: Handler,
}

/// Ordered mapping from OSC addresses to handlers.
///
/// Read-only once built; the listener shares it without locking.
#[derive(Default)]
pub struct RouteTable {
    exact: HashMap<String, Handler>,
    wildcard: Vec<WildcardRoute>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The protocol surface served by the bridge
    pub fn standard() -> Self {
        Self::new()
            .route("/ping", handlers::ping)
            .route("/master/volume", handlers::master_volume)
            .route("/master/mute", handlers::master_mute)
            .route("/mic/volume", handlers::mic_volume)
            .route("/mic/mute", handlers::mic_mute)
            .route("/app/volume", handlers::app_volume)
            .route("/app/volume/*", handlers::app_volume_named)
    }

    /// Bind `handler` to `pattern`, replacing any previous binding
    pub fn route(mut self, pattern: &str, handler: Handler) -> Self {
        match RoutePattern::parse(pattern) {
            RoutePattern::Exact(address) => {
                self.exact.insert(address, handler);
            }
            RoutePattern::Wildcard { prefix } => {
                self.wildcard.retain(|r| r.prefix != prefix);
                self.wildcard.push(WildcardRoute {
                    pattern: pattern.to_string(),
                    prefix,
                    handler,
                });
                self.wildcard
                    .sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
            }
        }
        self
    }

    /// Find the single route for `address`
    pub fn resolve<'r, 'a>(&'r self, address: &'a str) -> Option<RouteMatch<'r, 'a>> {
        if let Some((pattern, handler)) = self.exact.get_key_value(address) {
            return Some(RouteMatch {
                pattern: pattern.as_str(),
                handler: *handler,
                captured: None,
            });
        }

        if !address.starts_with('/') {
            return None;
        }
        let parts: Vec<&str> = segments(address).collect();

        self.wildcard.iter().find_map(|route| {
            let (last, head) = parts.split_last()?;
            let matches = head.len() == route.prefix.len()
                && !last.is_empty()
                && head.iter().zip(&route.prefix).all(|(a, b)| *a == b.as_str());
            matches.then_some(RouteMatch {
                pattern: route.pattern.as_str(),
                handler: route.handler,
                captured: Some(*last),
            })
        })
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn segments(address: &str) -> impl Iterator<Item = &str> {
    address.strip_prefix('/').unwrap_or(address).split('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handlers::{app_volume_named, ping};

    #[test]
    fn test_parse_pattern() {
        assert_eq!(
            RoutePattern::parse("/app/volume/*"),
            RoutePattern::Wildcard {
                prefix: vec!["app".into(), "volume".into()]
            }
        );
        assert_eq!(
            RoutePattern::parse("/ping"),
            RoutePattern::Exact("/ping".into())
        );
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let table = RouteTable::standard();

        let m = table.resolve("/app/volume").unwrap();
        assert_eq!(m.pattern, "/app/volume");
        assert_eq!(m.captured, None);

        let m = table.resolve("/app/volume/chrome").unwrap();
        assert_eq!(m.pattern, "/app/volume/*");
        assert_eq!(m.captured, Some("chrome"));
    }

    #[test]
    fn test_wildcard_is_single_level() {
        let table = RouteTable::standard();
        assert!(table.resolve("/app/volume/a/b").is_none());
        assert!(table.resolve("/app/volume/").is_none());
        assert!(table.resolve("/app").is_none());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RouteTable::new()
            .route("/a/*", ping)
            .route("/a/b/*", app_volume_named);

        let m = table.resolve("/a/b/c").unwrap();
        assert_eq!(m.pattern, "/a/b/*");
        assert_eq!(m.captured, Some("c"));

        let m = table.resolve("/a/x").unwrap();
        assert_eq!(m.pattern, "/a/*");
    }

    #[test]
    fn test_unknown_address() {
        let table = RouteTable::standard();
        assert!(table.resolve("/mixer/fader/1").is_none());
        assert!(table.resolve("ping").is_none());
        assert_eq!(table.len(), 7);
    }
}
