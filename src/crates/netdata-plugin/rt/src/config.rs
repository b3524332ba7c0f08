//! Small parsers shared by plugin command lines and legacy config files.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Interval used when netdata passes nothing usable.
pub const DEFAULT_INTERVAL_SECONDS: u64 = 10;

/// Parse the positional interval netdata passes to every plugin.
///
/// Anything that is not a positive number of seconds falls back to
/// [`DEFAULT_INTERVAL_SECONDS`].
pub fn parse_interval_seconds(arg: Option<&str>) -> Duration {
    let secs = arg
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_INTERVAL_SECONDS);
    Duration::from_secs(secs)
}

/// Parse `key<separator>value` lines.
///
/// The first separator on a line splits it and both sides are trimmed.
/// Lines without a separator, and lines whose key is empty, are skipped.
/// Later keys override earlier ones.
pub fn parse_key_value(contents: &str, separator: &str) -> BTreeMap<String, String> {
    if separator.is_empty() {
        return BTreeMap::new();
    }

    contents
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(separator)?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Read a `key<separator>value` file, see [`parse_key_value`].
pub fn read_key_value_conf(path: impl AsRef<Path>, separator: &str) -> io::Result<BTreeMap<String, String>> {
    let contents = fs::read_to_string(path)?;
    Ok(parse_key_value(&contents, separator))
}
