//! Human-readable byte sizes.

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Format a byte count with base-1024 units.
///
/// Counts below 1 KB are printed as integers (`"512 B"`); larger counts use two
/// fractional digits (`"1.50 KB"`). GB is the largest unit.
pub fn format_size(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
