/// Size formatting utilities: human-readable byte counts.
///
/// All internal sizes are `u64` bytes. Floating point is only used
/// at the display-formatting boundary.

/// Format a byte count into a human-readable string with appropriate unit.
///
/// Uses binary units (KiB = 1024) labelled with the short forms users
/// expect (KB, MB, GB, TB).
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    const TB: f64 = GB * 1024.0;

    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else if b < GB {
        format!("{:.1} MB", b / MB)
    } else if b < TB {
        format!("{:.2} GB", b / GB)
    } else {
        format!("{:.2} TB", b / TB)
    }
}

/// Format a count with thousand separators, e.g. for sweep summaries.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Convert a megabyte threshold from configuration into bytes.
///
/// Negative and NaN inputs clamp to zero.
pub fn megabytes_to_bytes(mb: f64) -> u64 {
    if mb.is_nan() || mb <= 0.0 {
        return 0;
    }
    (mb * 1024.0 * 1024.0) as u64
}

/// Format a duration in seconds as `HH:MM:SS`.
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(10), "10 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_048_576), "1.0 MB");
        assert_eq!(format_size(1_073_741_824), "1.00 GB");
        assert_eq!(format_size(1_099_511_627_776), "1.00 TB");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }

    #[test]
    fn megabytes_clamp_and_convert() {
        assert_eq!(megabytes_to_bytes(100.0), 104_857_600);
        assert_eq!(megabytes_to_bytes(0.5), 524_288);
        assert_eq!(megabytes_to_bytes(-3.0), 0);
        assert_eq!(megabytes_to_bytes(f64::NAN), 0);
    }

    #[test]
    fn hms_is_zero_padded() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(3_725), "01:02:05");
        assert_eq!(format_hms(90_000), "25:00:00");
    }
}
