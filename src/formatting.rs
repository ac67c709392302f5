// src/formatting.rs

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

/// Magnitudes from largest to smallest, with the letter placed before the unit.
const MAGNITUDES: [(u64, &str); 4] = [(TIB, "T"), (GIB, "G"), (MIB, "M"), (KIB, "K")];

/// Renders `num` with a binary magnitude prefix and the given unit suffix.
///
/// Values of 1024 and above are scaled to the largest magnitude that keeps the
/// value at or above 1 and printed with two decimals (`"3.50 MB"`). Smaller
/// values are printed as plain integers (`"512 B"`). An empty `unit` is used
/// for pure counts, in which case no trailing space is emitted below 1024:
/// `format_magnitude(12, "")` is `"12"`, deliberately without the `"12 "`
/// trailing space a naive `"{num} {unit}"` would leave.
pub fn format_magnitude(num: u64, unit: &str) -> String {
    for (scale, letter) in MAGNITUDES {
        if num >= scale {
            return format!("{:.2} {}{}", num as f64 / scale as f64, letter, unit);
        }
    }

    if unit.is_empty() {
        num.to_string()
    } else {
        format!("{} {}", num, unit)
    }
}

/// Renders a byte count, e.g. `"1.50 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    format_magnitude(bytes, "B")
}
