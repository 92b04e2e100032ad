//! Raw payload parsing and the reading value type.

use std::sync::LazyLock;

use regex::Regex;

/// Device id assumed when the transport does not carry one.
pub const UNKNOWN_DEVICE: &str = "UNKNOWN_DEVICE";

/// Out-of-band status some producers publish alongside the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    Stable,
    Unstable,
    Boot,
    Tare,
}

impl StatusTag {
    /// Parse a transport status string; unknown tags map to `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stable" => Some(Self::Stable),
            "unstable" => Some(Self::Unstable),
            "boot" => Some(Self::Boot),
            "tare" => Some(Self::Tare),
            _ => None,
        }
    }
}

/// One observation as received from the transport edge. Immutable once built.
///
/// A reading with `weight_kg: None` never reaches the stabilization or
/// inventory math but is still forwarded for display and logging.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device_id: String,
    pub weight_kg: Option<f64>,
    pub raw_payload: String,
    pub at_ms: u64,
    pub tag: Option<StatusTag>,
}

impl Reading {
    /// Build a reading from a raw payload, best-effort parsing the weight.
    pub fn from_payload(
        device_id: Option<&str>,
        payload: &str,
        at_ms: u64,
        tag: Option<StatusTag>,
    ) -> Self {
        let device_id = match device_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => UNKNOWN_DEVICE.to_string(),
        };
        Self {
            device_id,
            weight_kg: parse_weight_kg(payload),
            raw_payload: payload.to_string(),
            at_ms,
            tag,
        }
    }
}

static FIRST_NUMBER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d+\.?\d*").ok());

/// Extract a weight in kilograms from an arbitrary payload.
///
/// Tries a strict full-string parse first, then falls back to the first
/// decimal-number substring. Returns `None` when nothing parses or the
/// result is not finite. Handles payloads like `"75.50"`, `"Weight: 75.5"`
/// and `"75.5kg"`.
pub fn parse_weight_kg(payload: &str) -> Option<f64> {
    let trimmed = payload.trim();
    if let Ok(v) = trimmed.parse::<f64>() {
        return v.is_finite().then_some(v);
    }
    let re = FIRST_NUMBER.as_ref()?;
    let found = re.find(trimmed)?;
    found.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}
