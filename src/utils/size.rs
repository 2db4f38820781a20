//! Byte-size formatting and ratio helpers.

/// Bytes in one KiB.
pub const KIB: u64 = 1024;

/// Bytes in one MiB.
pub const MIB: u64 = 1024 * KIB;

/// Format bytes with thousands separators: `1234567` -> `"1,234,567"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Format bytes as KiB with two decimals: `1536` -> `"1.50 KB"`.
#[allow(clippy::cast_precision_loss)]
pub fn kib(n: u64) -> String {
    format!("{:.2} KB", n as f64 / KIB as f64)
}

/// Fraction of space saved by compression: `1 - compressed / original`.
///
/// Returns `None` for an empty original, where the ratio is undefined.
#[allow(clippy::cast_precision_loss)]
pub fn saved_ratio(original: u64, compressed: u64) -> Option<f64> {
    if original == 0 {
        return None;
    }
    Some(1.0 - compressed as f64 / original as f64)
}

/// Render a saved ratio as `"42.3% saved"` or `"n/a"`.
pub fn format_saved(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) => format!("{:.1}% saved", r * 100.0),
        None => "n/a".to_string(),
    }
}
