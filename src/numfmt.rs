//! Numeric rounding and display formatting.
//!
//! `format_number` reproduces the original interpreter's fixed-precision
//! display algorithm bit for bit: scale by `10^precision`, round half
//! away from zero, unscale, then split and zero-pad the integer and
//! fractional parts separately rather than relying on a float
//! formatter's own rounding.

/// Rounds half away from zero, unlike `f64::round` only in that it is
/// explicit about the tie-breaking rule it implements.
pub fn round_off(value: f64) -> f64 {
    if value >= 0.0 {
        (value + 0.5).floor()
    } else {
        (value - 0.5).ceil()
    }
}

/// Truncates toward zero: strips the fraction, keeps the sign.
pub fn trunc(value: f64) -> f64 {
    if value >= 0.0 {
        value.floor()
    } else {
        -((-value).floor())
    }
}

/// `true` if `value` has no fractional part once truncated toward zero.
pub fn is_int(value: f64) -> bool {
    value == trunc(value)
}

/// Formats `value` to `precision` fractional digits, the way the
/// original's `DispFloat` does: scale-round-unscale, then assemble the
/// integer and fractional halves by hand so trailing zeros always show.
pub fn format_number(value: f64, precision: u8) -> String {
    if value == 0.0 {
        return if precision == 0 {
            "0".to_string()
        } else {
            format!("0.{}", "0".repeat(precision as usize))
        };
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    let scale = 10f64.powi(precision as i32);
    let scaled = round_off(magnitude * scale);

    let int_part = (scaled / scale).floor();
    let frac_scaled = scaled - int_part * scale;

    if precision == 0 {
        format!("{sign}{int_part}")
    } else {
        format!(
            "{sign}{int_part}.{:0width$}",
            frac_scaled.max(0.0) as u64,
            width = precision as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_off_ties_away_from_zero() {
        assert_eq!(round_off(2.5), 3.0);
        assert_eq!(round_off(-2.5), -3.0);
        assert_eq!(round_off(2.4), 2.0);
    }

    #[test]
    fn trunc_keeps_sign_drops_fraction() {
        assert_eq!(trunc(3.9), 3.0);
        assert_eq!(trunc(-3.9), -3.0);
    }

    #[test]
    fn is_int_detects_whole_numbers() {
        assert!(is_int(4.0));
        assert!(!is_int(4.5));
    }

    #[test]
    fn formats_zero_with_padded_zeros() {
        assert_eq!(format_number(0.0, 2), "0.00");
        assert_eq!(format_number(0.0, 0), "0");
    }

    #[test]
    fn formats_with_requested_precision() {
        assert_eq!(format_number(3.14159, 2), "3.14");
        assert_eq!(format_number(1.0, 3), "1.000");
        assert_eq!(format_number(-3.456, 2), "-3.46");
    }

    #[test]
    fn formats_integer_precision_with_no_dot() {
        assert_eq!(format_number(7.0, 0), "7");
        assert_eq!(format_number(-7.0, 0), "-7");
    }
}
