use std::time::Duration;

use crate::error::{Result, XpackError};
use crate::gate;
use crate::report;

pub(super) fn default_destination() -> String {
    "data.zip".to_string()
}

pub(super) fn default_log_image_path() -> String {
    "log.png".to_string()
}

pub(super) fn default_max_lines() -> usize {
    report::DEFAULT_MAX_LINES
}

pub(super) fn default_image_width() -> u32 {
    800
}

pub(super) fn default_image_height() -> u32 {
    600
}

pub(super) fn default_mount_path() -> String {
    gate::DEFAULT_MOUNT_PATH.to_string()
}

pub(super) fn default_poll_interval() -> Duration {
    gate::DEFAULT_POLL_INTERVAL
}

/// Parse a short duration like "150ms", "2s", "5m" or "1h".
///
/// A bare number is taken as seconds. Zero is accepted; callers that need a
/// positive value check for it.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(XpackError::Config("duration must not be empty".into()));
    }

    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (num_part, unit) = input.split_at(split);

    let value: u64 = num_part
        .parse()
        .map_err(|_| XpackError::Config(format!("invalid duration value: '{raw}'")))?;

    let duration = match unit.trim() {
        "ms" => Duration::from_millis(value),
        "" | "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        "h" => Duration::from_secs(value.saturating_mul(60 * 60)),
        other => {
            return Err(XpackError::Config(format!(
                "unsupported duration suffix '{other}' in '{raw}' (use ms/s/m/h)"
            )));
        }
    };
    Ok(duration)
}
