//! Line-oriented stdin transport: one raw reading per line.
//!
//! Accepted line shapes: `payload`, `device|payload`, or
//! `device|payload|status`. Blank lines are skipped.

use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tally_traits::{RawMessage, RawSource};

pub struct StdinLineSource {
    default_device: Option<String>,
    stop: Arc<AtomicBool>,
    reader: std::io::StdinLock<'static>,
}

impl StdinLineSource {
    pub fn new(default_device: Option<String>, stop: Arc<AtomicBool>) -> Self {
        Self {
            default_device,
            stop,
            reader: std::io::stdin().lock(),
        }
    }
}

impl RawSource for StdinLineSource {
    fn recv(&mut self) -> Result<Option<RawMessage>, Box<dyn std::error::Error + Send + Sync>> {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return Ok(None);
            }
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(parse_line(line, self.default_device.as_deref())));
        }
    }
}

fn parse_line(line: &str, default_device: Option<&str>) -> RawMessage {
    let mut parts = line.splitn(3, '|');
    let first = parts.next().unwrap_or_default();
    match parts.next() {
        None => RawMessage {
            device_id: default_device.map(str::to_string),
            payload: first.trim().to_string(),
            status: None,
        },
        Some(payload) => {
            let device = first.trim();
            RawMessage {
                device_id: if device.is_empty() {
                    default_device.map(str::to_string)
                } else {
                    Some(device.to_string())
                },
                payload: payload.trim().to_string(),
                status: parts
                    .next()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            }
        }
    }
}

#[cfg(test)]
mod line_tests {
    use super::parse_line;

    #[test]
    fn bare_payload_uses_the_default_device() {
        let msg = parse_line("7.50", Some("SCALE_A"));
        assert_eq!(msg.device_id.as_deref(), Some("SCALE_A"));
        assert_eq!(msg.payload, "7.50");
        assert_eq!(msg.status, None);
    }

    #[test]
    fn bare_payload_without_default_has_no_device() {
        let msg = parse_line("Weight: 7.5", None);
        assert_eq!(msg.device_id, None);
        assert_eq!(msg.payload, "Weight: 7.5");
    }

    #[test]
    fn device_and_payload_split_on_the_first_pipe() {
        let msg = parse_line("SCALE_B|7.50", None);
        assert_eq!(msg.device_id.as_deref(), Some("SCALE_B"));
        assert_eq!(msg.payload, "7.50");
    }

    #[test]
    fn full_form_carries_a_status() {
        let msg = parse_line("SCALE_B| 8.50 |stable", None);
        assert_eq!(msg.device_id.as_deref(), Some("SCALE_B"));
        assert_eq!(msg.payload, "8.50");
        assert_eq!(msg.status.as_deref(), Some("stable"));
    }

    #[test]
    fn empty_device_field_falls_back() {
        let msg = parse_line("|7.50|", Some("SCALE_A"));
        assert_eq!(msg.device_id.as_deref(), Some("SCALE_A"));
        assert_eq!(msg.payload, "7.50");
        assert_eq!(msg.status, None);
    }
}
