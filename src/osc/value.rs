//! Tagged OSC argument values

use std::fmt;

use rosc::OscType;

/// One OSC argument as received from the wire.
///
/// int32/int64 collapse into `Int`, float32/float64 into `Float`. Anything
/// the normalizers cannot interpret keeps only its type name.
#[derive(Debug, Clone, PartialEq)]
pub enum OscValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Unsupported(&'static str),
}

impl OscValue {
    /// Short type name used in log lines and errors
    pub fn type_name(&self) -> &'static str {
        match self {
            OscValue::Int(_) => "int",
            OscValue::Float(_) => "float",
            OscValue::Str(_) => "string",
            OscValue::Bool(_) => "bool",
            OscValue::Unsupported(name) => *name,
        }
    }
}

impl From<OscType> for OscValue {
    fn from(arg: OscType) -> Self {
        match arg {
            OscType::Int(v) => OscValue::Int(v as i64),
            OscType::Long(v) => OscValue::Int(v),
            OscType::Float(v) => OscValue::Float(v as f64),
            OscType::Double(v) => OscValue::Float(v),
            OscType::String(s) => OscValue::Str(s),
            OscType::Bool(b) => OscValue::Bool(b),
            OscType::Blob(_) => OscValue::Unsupported("blob"),
            OscType::Time(_) => OscValue::Unsupported("timetag"),
            OscType::Char(_) => OscValue::Unsupported("char"),
            OscType::Color(_) => OscValue::Unsupported("color"),
            OscType::Midi(_) => OscValue::Unsupported("midi"),
            OscType::Array(_) => OscValue::Unsupported("array"),
            OscType::Nil => OscValue::Unsupported("nil"),
            OscType::Inf => OscValue::Unsupported("inf"),
        }
    }
}

impl From<f64> for OscValue {
    fn from(v: f64) -> Self {
        OscValue::Float(v)
    }
}

impl From<i64> for OscValue {
    fn from(v: i64) -> Self {
        OscValue::Int(v)
    }
}

impl From<&str> for OscValue {
    fn from(s: &str) -> Self {
        OscValue::Str(s.to_string())
    }
}

impl From<bool> for OscValue {
    fn from(b: bool) -> Self {
        OscValue::Bool(b)
    }
}

impl fmt::Display for OscValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscValue::Int(v) => write!(f, "{}", v),
            OscValue::Float(v) => write!(f, "{}", v),
            OscValue::Str(s) => write!(f, "{:?}", s),
            OscValue::Bool(b) => write!(f, "{}", b),
            OscValue::Unsupported(name) => write!(f, "<{}>", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_types_collapse() {
        assert_eq!(OscValue::from(OscType::Int(7)), OscValue::Int(7));
        assert_eq!(OscValue::from(OscType::Long(7)), OscValue::Int(7));
        assert_eq!(OscValue::from(OscType::Float(0.5)), OscValue::Float(0.5));
        assert_eq!(OscValue::from(OscType::Double(0.5)), OscValue::Float(0.5));
        assert_eq!(
            OscValue::from(OscType::String("x".into())),
            OscValue::Str("x".into())
        );
        assert_eq!(OscValue::from(OscType::Nil), OscValue::Unsupported("nil"));
    }

    #[test]
    fn test_display() {
        assert_eq!(OscValue::Str("firefox".into()).to_string(), "\"firefox\"");
        assert_eq!(OscValue::Unsupported("blob").to_string(), "<blob>");
    }
}
