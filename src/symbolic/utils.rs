// numeric helpers shared by the analyzer and the plotter

/// `n` evenly spaced points from `start` to `end`, both included
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + i as f64 * step).collect()
        }
    }
}

/// `%g`-style formatting with `sig` significant digits, e.g. `format_g(15.0, 3) == "15"`
/// and `format_g(0.000123456, 3) == "0.000123"`
pub fn format_g(value: f64, sig: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return format!("{}", value);
    }
    let sig = sig.max(1);
    let exponent = value.abs().log10().floor() as i32;
    // rounding can bump the exponent, e.g. 9.999 -> 10.0
    let sci = format!("{:.*e}", sig - 1, value);
    let exponent = sci
        .split('e')
        .nth(1)
        .and_then(|e| e.parse::<i32>().ok())
        .unwrap_or(exponent);
    if exponent < -4 || exponent >= sig as i32 {
        let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let mantissa = trim_zeros(mantissa);
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (sig as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{:.*}", decimals, value))
    }
}

fn trim_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace() {
        let xs = linspace(-10.0, 10.0, 1000);
        assert_eq!(xs.len(), 1000);
        assert_eq!(xs[0], -10.0);
        assert_relative_eq!(xs[999], 10.0, epsilon = 1e-12);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_format_g() {
        assert_eq!(format_g(15.0, 3), "15");
        assert_eq!(format_g(3.14159, 3), "3.14");
        assert_eq!(format_g(-0.5, 3), "-0.5");
        assert_eq!(format_g(225.0, 3), "225");
        assert_eq!(format_g(12345.0, 3), "1.23e+04");
        assert_eq!(format_g(0.000123456, 3), "0.000123");
        assert_eq!(format_g(9.999, 3), "10");
    }
}
