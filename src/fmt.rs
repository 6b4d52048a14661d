use chrono::{DateTime, FixedOffset};

/// Format an amount the way provider messages do: 1,234.50 RWF
pub fn rwf(val: f64) -> String {
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();
    let sign = if val < 0.0 { "-" } else { "" };

    if dec_part == "00" {
        format!("{sign}{with_commas} RWF")
    } else {
        format!("{sign}{with_commas}.{dec_part} RWF")
    }
}

/// Wall-clock rendering used in table output.
pub fn timestamp_text(ts: &DateTime<FixedOffset>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Dead-letter log timestamp. Sub-second digits are kept (when non-zero) so
/// an entry can be matched back to its source message's `date`.
pub fn log_timestamp_text(ts: &DateTime<FixedOffset>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}
