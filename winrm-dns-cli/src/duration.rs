//! TTL duration strings.
//!
//! Accepts what `time.Duration.String()` prints (`1h0m0s`, `15m0s`, `30s`),
//! decimals such as `1.5h`, and a bare number of seconds.

/// Default record TTL (15 minutes).
pub const DEFAULT_TTL: &str = "15m0s";

/// Parses a duration string into whole seconds.
pub fn parse_ttl(input: &str) -> Result<u32, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(seconds) = s.parse::<u32>() {
        return Ok(seconds);
    }

    let mut total = 0.0_f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("invalid duration '{input}': expected a number"));
        }
        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| format!("invalid duration '{input}': bad number '{number}'"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "" => return Err(format!("invalid duration '{input}': missing unit")),
            other => {
                return Err(format!(
                    "invalid duration '{input}': unknown unit '{other}' (use h, m or s)"
                ));
            }
        };

        total += value * scale;
        rest = tail;
    }

    let total = total.round();
    if total > f64::from(u32::MAX) {
        return Err(format!("invalid duration '{input}': too large"));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let seconds = total as u32;
    Ok(seconds)
}

/// Formats seconds the way `time.Duration.String()` does.
pub fn format_ttl(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h{minutes}m{secs}s")
    } else if minutes > 0 {
        format!("{minutes}m{secs}s")
    } else {
        format!("{secs}s")
    }
}
