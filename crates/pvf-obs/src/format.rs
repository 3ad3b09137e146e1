use std::fmt;

use crate::obs::Obs;

/// Renders `value(error)` with two significant digits of the error.
pub fn format_with_error(value: f64, error: f64) -> String {
    if !error.is_finite() || error <= 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let mut exponent = error.log10().floor() as i32;
    // Rounding can carry the error into the next decade, e.g. 0.0996 -> 0.10.
    if (error * 10f64.powi(1 - exponent)).round() >= 100.0 {
        exponent += 1;
    }
    let decimals = 1 - exponent;
    if decimals <= 0 {
        return format!("{value:.0}({error:.0})");
    }
    let digits = (error * 10f64.powi(decimals)).round() as u64;
    format!("{value:.prec$}({digits})", prec = decimals as usize)
}

impl fmt::Display for Obs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_with_error(self.value(), self.dvalue()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_significant_error_digits() {
        assert_eq!(format_with_error(0.123456, 0.0056), "0.1235(56)");
        assert_eq!(format_with_error(1.5, 0.25), "1.50(25)");
        assert_eq!(format_with_error(1234.4, 56.0), "1234(56)");
    }

    #[test]
    fn rounding_into_the_next_decade_keeps_two_digits() {
        assert_eq!(format_with_error(1.0, 0.0996), "1.00(10)");
        assert_eq!(format_with_error(0.5, 0.00999), "0.500(10)");
        assert_eq!(format_with_error(3.0, 0.0994), "3.000(99)");
    }

    #[test]
    fn exact_values_print_plainly() {
        assert_eq!(format_with_error(2.5, 0.0), "2.5");
        assert_eq!(Obs::constant(0.75).to_string(), "0.75");
    }
}
