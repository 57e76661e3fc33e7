//! Human-readable byte counts for progress lines.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

fn scale(mut value: f64) -> (f64, &'static str) {
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    (value, UNITS[unit])
}

/// `1536` → `"1.5KB"`. At most two decimals, never a trailing `.0`.
pub fn human_size(bytes: u64) -> String {
    let (value, unit) = scale(bytes as f64);
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, unit)
}

/// Throughput rounded to a whole number of its unit: `"12MB/s"`.
pub fn human_rate(bytes_per_sec: f64) -> String {
    let (value, unit) = scale(bytes_per_sec.max(0.0));
    format!("{}{}/s", value.round() as u64, unit)
}
