//! Human-readable numbers and durations.

use crate::state::NumberFormat;

const UNITS: [&str; 9] = ["bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const DIVISOR: f64 = 1000.0;

/// Format an amount of data according to the player's number format.
pub fn format_number(n: f64, format: NumberFormat) -> String {
    if !n.is_finite() {
        return "...".into();
    }
    if n < 0.0 {
        return format!("-{}", format_number(-n, format));
    }
    match format {
        NumberFormat::Long => format_grouped(n),
        NumberFormat::Short => {
            if n < DIVISOR {
                return format!("{n:.0} {}", UNITS[0]);
            }
            let exponent = ((n.log10() / 3.0).floor() as usize).min(UNITS.len() - 1);
            format!("{:.2} {}", n / DIVISOR.powi(exponent as i32), UNITS[exponent])
        }
    }
}

/// Format with comma digit grouping (e.g. 1234567 → "1,234,567").
pub fn format_grouped(n: f64) -> String {
    if !n.is_finite() {
        return "...".into();
    }
    if n < 0.0 {
        return format!("-{}", format_grouped(-n));
    }
    let whole = n.floor();
    let frac = n - whole;

    // `{:.0}` prints every digit, even beyond u64 range.
    let digits = format!("{whole:.0}");
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    let tenth = (frac * 10.0).round() as u8;
    if frac > 0.05 && tenth < 10 {
        format!("{result}.{tenth}")
    } else {
        result
    }
}

/// At most two of `d`, `h`, `m`, `s`. Seconds appear only when fewer than
/// two larger units were printed.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        return "moments".into();
    }
    let total = ms / 1000;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::with_capacity(2);
    for (value, unit) in [(days, 'd'), (hours, 'h'), (minutes, 'm')] {
        if value > 0 {
            parts.push(format!("{value}{unit}"));
        }
    }
    if seconds > 0 && parts.len() < 2 {
        parts.push(format!("{seconds}s"));
    }
    parts.truncate(2);
    parts.join(" ")
}
