//! Exact rational helpers shared by the parser and the evaluator.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::error::ErrorKind;

/// Largest power of ten a decimal literal may carry.
const MAX_DECIMAL_SCALE: i32 = 10_000;

/// Upper limit on the size of an exact power or factorial, in bits.
const MAX_RESULT_BITS: u64 = 1 << 20;

/// Parses a decimal literal such as `12`, `-3.5`, `.25` or `1.5e-3` exactly.
pub fn parse_decimal(text: &str) -> Option<BigRational> {
    let (negative, text) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(pos) => (&text[..pos], text[pos + 1..].parse::<i32>().ok()?),
        None => (text, 0),
    };
    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (mantissa, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits: BigInt = format!("{whole}{fraction}").parse().ok()?;
    let scale = exponent.checked_sub(i32::try_from(fraction.len()).ok()?)?;
    if scale.abs() > MAX_DECIMAL_SCALE {
        return None;
    }
    let ten = BigInt::from(10);
    let value = if scale >= 0 {
        BigRational::from_integer(digits * num_traits::pow(ten, scale as usize))
    } else {
        BigRational::new(digits, num_traits::pow(ten, (-scale) as usize))
    };
    Some(if negative { -value } else { value })
}

pub fn to_f64(value: &BigRational) -> f64 {
    match (value.numer().to_f64(), value.denom().to_f64()) {
        (Some(n), Some(d)) => n / d,
        _ => f64::NAN,
    }
}

pub fn from_f64(value: f64, op: &str) -> Result<BigRational, ErrorKind> {
    BigRational::from_float(value)
        .ok_or_else(|| ErrorKind::Invalid(format!("{op} has no finite result")))
}

/// Applies a floating point function, the way `sqrt`, `ln` and friends are
/// evaluated.
pub fn float_fn(value: &BigRational, op: &str, f: fn(f64) -> f64) -> Result<BigRational, ErrorKind> {
    from_f64(f(to_f64(value)), op)
}

pub fn as_integer(value: &BigRational) -> Result<BigInt, ErrorKind> {
    if value.is_integer() {
        Ok(value.to_integer())
    } else {
        Err(ErrorKind::NotInteger(format_rational(value)))
    }
}

pub fn as_i64(value: &BigRational) -> Result<i64, ErrorKind> {
    as_integer(value)?
        .to_i64()
        .ok_or_else(|| ErrorKind::Invalid(format!("{} is out of range", format_rational(value))))
}

pub fn as_usize(value: &BigRational) -> Result<usize, ErrorKind> {
    as_integer(value)?
        .to_usize()
        .ok_or_else(|| ErrorKind::Invalid(format!("{} is not a valid count", format_rational(value))))
}

/// Integer division truncating toward zero.
pub fn int_div(lhs: &BigRational, rhs: &BigRational) -> Result<BigRational, ErrorKind> {
    if rhs.is_zero() {
        return Err(ErrorKind::DivisionByZero);
    }
    Ok((lhs / rhs).trunc())
}

/// `lhs - rhs * (lhs div rhs)`, so the result has the sign of `lhs`.
pub fn modulo(lhs: &BigRational, rhs: &BigRational) -> Result<BigRational, ErrorKind> {
    let quotient = int_div(lhs, rhs)?;
    Ok(lhs - rhs * quotient)
}

pub fn pow(base: &BigRational, exponent: &BigRational) -> Result<BigRational, ErrorKind> {
    if !exponent.is_integer() {
        return from_f64(to_f64(base).powf(to_f64(exponent)), "^");
    }
    let magnitude = exponent
        .abs()
        .to_integer()
        .to_usize()
        .ok_or_else(|| ErrorKind::Invalid("exponent is too large".to_string()))?;
    let bits = base.numer().bits().max(base.denom().bits());
    // 0, 1 and -1 stay small under any power
    if bits > 1 && (magnitude as u64).saturating_mul(bits) > MAX_RESULT_BITS {
        return Err(ErrorKind::Invalid("exponent is too large".to_string()));
    }
    let power = num_traits::pow(base.clone(), magnitude);
    if exponent.is_negative() {
        if power.is_zero() {
            return Err(ErrorKind::DivisionByZero);
        }
        Ok(power.recip())
    } else {
        Ok(power)
    }
}

pub fn factorial(value: &BigRational) -> Result<BigRational, ErrorKind> {
    let n = as_integer(value)?;
    if n.is_negative() {
        return Err(ErrorKind::Invalid(format!("factorial of negative number {n}")));
    }
    // n! has fewer than n * bits(n) bits
    if n.to_u64().map_or(true, |k| k.saturating_mul(n.bits()) > MAX_RESULT_BITS) {
        return Err(ErrorKind::Invalid(format!("factorial of {n} is too large")));
    }
    let mut acc = BigInt::one();
    let mut k = BigInt::one();
    while k <= n {
        acc *= &k;
        k += 1;
    }
    Ok(BigRational::from_integer(acc))
}

pub fn sgn(value: &BigRational) -> BigRational {
    BigRational::from_integer(value.signum().to_integer())
}

/// Integers print without a fraction, everything else as a float.
pub fn format_rational(value: &BigRational) -> String {
    if value.is_integer() {
        value.to_integer().to_string()
    } else {
        to_f64(value).to_string()
    }
}

pub fn integer(value: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(value))
}

pub fn count(value: usize) -> BigRational {
    BigRational::from_integer(BigInt::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("12"), Some(integer(12)));
        assert_eq!(parse_decimal("0.1"), Some(ratio(1, 10)));
        assert_eq!(parse_decimal(".25"), Some(ratio(1, 4)));
        assert_eq!(parse_decimal("1.5e3"), Some(integer(1500)));
        assert_eq!(parse_decimal("25E-2"), Some(ratio(1, 4)));
        assert_eq!(parse_decimal("-3.5"), Some(ratio(-7, 2)));
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("."), None);
        assert_eq!(parse_decimal("1e"), None);
        assert_eq!(parse_decimal("1e2000000000"), None);
        assert_eq!(parse_decimal("1e-2000000000"), None);
        assert_eq!(parse_decimal("1e9999"), Some(pow(&integer(10), &integer(9999)).unwrap()));
    }

    #[test]
    fn test_integer_division() {
        assert_eq!(int_div(&integer(7), &integer(2)).unwrap(), integer(3));
        assert_eq!(int_div(&integer(-7), &integer(2)).unwrap(), integer(-3));
        assert_eq!(modulo(&integer(7), &integer(3)).unwrap(), integer(1));
        assert_eq!(modulo(&integer(-7), &integer(3)).unwrap(), integer(-1));
        assert!(matches!(modulo(&integer(1), &integer(0)), Err(ErrorKind::DivisionByZero)));
    }

    #[test]
    fn test_pow_and_factorial() {
        assert_eq!(pow(&integer(2), &integer(10)).unwrap(), integer(1024));
        assert_eq!(pow(&integer(2), &integer(-2)).unwrap(), ratio(1, 4));
        assert_eq!(pow(&integer(4), &ratio(1, 2)).unwrap(), integer(2));
        assert!(matches!(pow(&integer(0), &integer(-1)), Err(ErrorKind::DivisionByZero)));
        assert_eq!(factorial(&integer(5)).unwrap(), integer(120));
        assert_eq!(factorial(&integer(0)).unwrap(), integer(1));
        assert!(factorial(&ratio(1, 2)).is_err());
        assert!(factorial(&integer(-1)).is_err());
    }

    #[test]
    fn test_oversized_results_are_rejected() {
        assert!(matches!(
            pow(&integer(2), &integer(100_000_000_000)),
            Err(ErrorKind::Invalid(msg)) if msg == "exponent is too large"
        ));
        assert!(pow(&integer(3), &integer(-100_000_000)).is_err());
        assert_eq!(pow(&integer(1), &integer(100_000_000_000)).unwrap(), integer(1));
        assert_eq!(pow(&integer(-1), &integer(100_000_000_001)).unwrap(), integer(-1));
        assert!(pow(&integer(2), &integer(1000)).is_ok());
        assert!(factorial(&integer(1_000_000_000)).is_err());
    }

    #[test]
    fn test_format() {
        assert_eq!(format_rational(&integer(-4)), "-4");
        assert_eq!(format_rational(&ratio(1, 4)), "0.25");
    }
}
