//! OSC command dispatch
//!
//! The [`Dispatcher`] resolves each inbound message against the
//! [`RouteTable`], runs the single matching handler inside a failure
//! boundary and logs exactly one line describing what happened. Nothing is
//! ever sent back to the client.

pub mod handlers;
pub mod route;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::audio::AudioControl;
use crate::error::{ArgumentError, Error, Result};
use crate::osc::InboundMessage;

pub use handlers::{Effect, Handler, Request};
pub use route::{RouteMatch, RoutePattern, RouteTable};

/// Result of dispatching one message
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A handler ran and produced an effect
    Handled(Effect),
    /// No route for the address
    Unmatched,
    /// Arguments were missing or malformed
    Rejected(ArgumentError),
    /// The audio backend failed or the handler panicked
    Failed(String),
}

/// Routes OSC messages to audio operations
pub struct Dispatcher {
    routes: RouteTable,
    audio: Arc<dyn AudioControl>,
}

impl Dispatcher {
    /// Dispatcher serving the standard route table
    pub fn new(audio: Arc<dyn AudioControl>) -> Self {
        Self::with_routes(RouteTable::standard(), audio)
    }

    pub fn with_routes(routes: RouteTable, audio: Arc<dyn AudioControl>) -> Self {
        Self { routes, audio }
    }

    /// Handle one message. Never panics and never returns an error: every
    /// failure is logged and reported through the outcome.
    pub fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        let Some(route) = self.routes.resolve(&message.address) else {
            warn!("Dropped {}: no route for address", message);
            return DispatchOutcome::Unmatched;
        };

        let request = Request {
            address: &message.address,
            captured: route.captured,
            args: &message.args,
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.invoke(route.handler, &request)
        }));

        match result {
            Ok(Ok(effect)) => {
                info!("{} -> {}", message, effect);
                DispatchOutcome::Handled(effect)
            }
            Ok(Err(Error::Argument(err))) => {
                warn!("Dropped {}: {}", message, err);
                DispatchOutcome::Rejected(err)
            }
            Ok(Err(err)) => {
                error!("Failed {}: {}", message, err);
                DispatchOutcome::Failed(err.to_string())
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("Handler for {} panicked: {}", message, reason);
                DispatchOutcome::Failed(format!("handler panicked: {}", reason))
            }
        }
    }

    fn invoke(&self, handler: Handler, request: &Request<'_>) -> Result<Effect> {
        let _scope = self.audio.enter_thread()?;
        handler(request, self.audio.as_ref())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioCall, MockAudio};
    use crate::error::AudioError;
    use crate::osc::OscValue;

    fn dispatcher(audio: &Arc<MockAudio>) -> Dispatcher {
        Dispatcher::new(audio.clone())
    }

    fn msg(address: &str, args: Vec<OscValue>) -> InboundMessage {
        InboundMessage::new(address, args)
    }

    #[test]
    fn test_wildcard_route_is_exclusive() {
        let audio = Arc::new(MockAudio::new().with_sessions(&["chrome.exe"]));
        let outcome = dispatcher(&audio).dispatch(&msg("/app/volume/chrome", vec![72i64.into()]));

        assert!(matches!(
            outcome,
            DispatchOutcome::Handled(Effect::AppVolume { matched: true, .. })
        ));
        match audio.calls().as_slice() {
            [AudioCall::AppVolume {
                target,
                volume,
                matched: true,
            }] => {
                assert_eq!(target, "chrome");
                assert!((volume - 0.72).abs() < 1e-6);
            }
            other => panic!("unexpected calls {other:?}"),
        }
    }

    #[test]
    fn test_unmatched_is_dropped() {
        let audio = Arc::new(MockAudio::new());
        let outcome = dispatcher(&audio).dispatch(&msg("/nope", vec![]));
        assert_eq!(outcome, DispatchOutcome::Unmatched);
        assert_eq!(audio.scopes_entered(), 0);
    }

    #[test]
    fn test_backend_failure_is_contained() {
        let audio = Arc::new(
            MockAudio::new().failing(AudioError::DeviceUnavailable("no speakers".into())),
        );
        let d = dispatcher(&audio);

        let outcome = d.dispatch(&msg("/master/volume", vec![0.5.into()]));
        assert!(matches!(outcome, DispatchOutcome::Failed(ref r) if r.contains("no speakers")));

        let outcome = d.dispatch(&msg("/ping", vec![]));
        assert_eq!(outcome, DispatchOutcome::Handled(Effect::Pong));
        assert_eq!(audio.open_scopes(), 0);
    }

    #[test]
    fn test_panic_is_contained_and_scope_released() {
        let audio = Arc::new(MockAudio::new().panicking());
        let d = dispatcher(&audio);

        let outcome = d.dispatch(&msg("/master/mute", vec![true.into()]));
        assert!(matches!(outcome, DispatchOutcome::Failed(ref r) if r.contains("panicked")));
        assert_eq!(audio.scopes_entered(), 1);
        assert_eq!(audio.open_scopes(), 0);

        assert_eq!(
            d.dispatch(&msg("/ping", vec![])),
            DispatchOutcome::Handled(Effect::Pong)
        );
    }

    #[test]
    fn test_invalid_argument_is_rejected() {
        let audio = Arc::new(MockAudio::new());
        let outcome = dispatcher(&audio).dispatch(&msg("/master/volume", vec!["abc".into()]));
        assert_eq!(
            outcome,
            DispatchOutcome::Rejected(ArgumentError::NotNumeric("abc".into()))
        );
        assert!(audio.calls().is_empty());
    }

    #[test]
    fn test_mic_routes() {
        let audio = Arc::new(MockAudio::new());
        let d = dispatcher(&audio);
        d.dispatch(&msg("/mic/mute", vec![1i64.into()]));
        d.dispatch(&msg("/mic/volume", vec![25i64.into()]));
        assert_eq!(
            audio.calls(),
            vec![AudioCall::MicMute(true), AudioCall::MicVolume(0.25)]
        );
    }
}
