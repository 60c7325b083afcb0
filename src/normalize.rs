//! Message normalization
//!
//! Pure conversions from raw OSC arguments into bounded domain values.
//! Volumes may arrive on a 0-1 or a 0-100 scale; anything above 1.0 is
//! read as a percentage.

use std::fmt;

use crate::error::ArgumentError;
use crate::osc::OscValue;

/// Volume as a fraction in [0.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct VolumeValue(f32);

impl VolumeValue {
    pub const SILENT: VolumeValue = VolumeValue(0.0);
    pub const FULL: VolumeValue = VolumeValue(1.0);

    /// Build from an already-normalized fraction, clamping into range.
    pub fn from_fraction(fraction: f64) -> Option<Self> {
        if fraction.is_finite() {
            Some(VolumeValue(fraction.clamp(0.0, 1.0) as f32))
        } else {
            None
        }
    }

    pub fn fraction(self) -> f32 {
        self.0
    }

    /// Rounded percentage, for log lines
    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

impl fmt::Display for VolumeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Leniently interpreted on/off flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanFlag(bool);

impl BooleanFlag {
    pub fn new(value: bool) -> Self {
        BooleanFlag(value)
    }

    pub fn get(self) -> bool {
        self.0
    }
}

impl fmt::Display for BooleanFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0 { "on" } else { "off" })
    }
}

/// Process name used as the join key against live audio sessions.
///
/// Lower-cased, trimmed, with a single trailing `.exe` removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessTarget(String);

impl ProcessTarget {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a session's executable name refers to this target
    pub fn matches(&self, executable: &str) -> bool {
        normalize_name(executable) == self.0
    }
}

impl fmt::Display for ProcessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a raw argument into a volume fraction
pub fn normalize_volume(raw: &OscValue) -> Result<VolumeValue, ArgumentError> {
    let value = match raw {
        OscValue::Int(v) => *v as f64,
        OscValue::Float(v) => *v,
        OscValue::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ArgumentError::NotNumeric(s.clone()))?,
        OscValue::Bool(b) => return Err(ArgumentError::NotNumeric(b.to_string())),
        OscValue::Unsupported(name) => return Err(ArgumentError::Unsupported(*name)),
    };

    if !value.is_finite() {
        return Err(ArgumentError::NotNumeric(value.to_string()));
    }

    let fraction = if value > 1.0 { value / 100.0 } else { value };
    VolumeValue::from_fraction(fraction).ok_or_else(|| ArgumentError::NotNumeric(value.to_string()))
}

/// Interpret a raw argument as a flag. Never fails: unrecognized input is `false`.
pub fn normalize_boolean(raw: &OscValue) -> BooleanFlag {
    let value = match raw {
        OscValue::Bool(b) => *b,
        OscValue::Int(v) => *v != 0,
        OscValue::Float(v) => *v != 0.0 && !v.is_nan(),
        OscValue::Str(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        ),
        OscValue::Unsupported(_) => false,
    };
    BooleanFlag(value)
}

/// Normalize a raw process name
pub fn normalize_process_target(raw: &str) -> Result<ProcessTarget, ArgumentError> {
    let name = normalize_name(raw);
    if name.is_empty() {
        return Err(ArgumentError::EmptyProcessName);
    }
    Ok(ProcessTarget(name))
}

fn normalize_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lowered,
    }
}
