//! SPICE numeric literals.
//!
//! A literal is a mantissa with an optional exponent, an optional
//! engineering suffix, and any number of trailing letters, which name a unit
//! and are ignored (`10kOhm`, `1.5uF`).
//!
//! | Suffix | Scale |
//! |--------|-------|
//! | `T` | 1e12 |
//! | `G` | 1e9 |
//! | `MEG` | 1e6 |
//! | `K` | 1e3 |
//! | `M` | 1e-3 |
//! | `MIL` | 25.4e-6 |
//! | `U` | 1e-6 |
//! | `N` | 1e-9 |
//! | `P` | 1e-12 |
//! | `F` | 1e-15 |
//!
//! Suffixes are case-insensitive, so `M` is milli; mega is spelled `MEG`.

use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{alpha0, char, digit0, digit1, one_of};
use nom::combinator::{opt, recognize, value};
use nom::error::{Error, ErrorKind};
use nom::sequence::{pair, preceded};
use nom::IResult;

fn fraction(comma_decimal: bool) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| {
        if comma_decimal {
            alt((preceded(char('.'), digit0), preceded(char(','), digit1)))(input)
        } else {
            preceded(char('.'), digit0)(input)
        }
    }
}

fn exponent(input: &str) -> IResult<&str, &str> {
    preceded(one_of("eE"), recognize(pair(opt(one_of("+-")), digit1)))(input)
}

/// Parses an engineering suffix into its scale factor.
pub fn suffix(input: &str) -> IResult<&str, f64> {
    alt((
        value(1e6, tag_no_case("meg")),
        value(25.4e-6, tag_no_case("mil")),
        value(1e12, tag_no_case("t")),
        value(1e9, tag_no_case("g")),
        value(1e3, tag_no_case("k")),
        value(1e-3, tag_no_case("m")),
        value(1e-6, tag_no_case("u")),
        value(1e-9, tag_no_case("n")),
        value(1e-12, tag_no_case("p")),
        value(1e-15, tag_no_case("f")),
    ))(input)
}

/// Parses an unsigned numeric literal.
///
/// If `comma_decimal` is set, a comma followed by a digit is accepted as the
/// decimal separator.
pub fn literal(comma_decimal: bool) -> impl FnMut(&str) -> IResult<&str, f64> {
    move |input| {
        let (rest, int_part) = digit0(input)?;
        let (rest, frac) = opt(fraction(comma_decimal))(rest)?;
        if int_part.is_empty() && frac.map(str::is_empty).unwrap_or(true) {
            return Err(nom::Err::Error(Error::new(input, ErrorKind::Digit)));
        }
        let (rest, exp) = opt(exponent)(rest)?;
        let (rest, scale) = opt(suffix)(rest)?;
        let (rest, _unit) = alpha0(rest)?;

        let mantissa = format!(
            "{}.{}e{}",
            if int_part.is_empty() { "0" } else { int_part },
            frac.unwrap_or(""),
            exp.unwrap_or("0")
        );
        let value: f64 = mantissa
            .parse()
            .map_err(|_| nom::Err::Error(Error::new(input, ErrorKind::Float)))?;
        Ok((rest, value * scale.unwrap_or(1.0)))
    }
}

/// Converts a complete string, with an optional sign, to a number.
///
/// Returns `None` if the string is not entirely a numeric literal.
///
/// # Examples
///
/// ```
/// use spice_expr::number::parse_literal;
///
/// assert_eq!(parse_literal("10k"), Some(10e3));
/// assert_eq!(parse_literal("-2.5meg"), Some(-2.5e6));
/// assert_eq!(parse_literal("1.5uF"), Some(1.5e-6));
/// assert_eq!(parse_literal("abc"), None);
/// ```
pub fn parse_literal(s: &str) -> Option<f64> {
    let s = s.trim();
    let (s, sign) = match s.as_bytes().first() {
        Some(b'-') => (&s[1..], -1.0),
        Some(b'+') => (&s[1..], 1.0),
        _ => (s, 1.0),
    };
    match literal(false)(s) {
        Ok(("", value)) => Some(sign * value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn suffixes() {
        let cases = [
            ("1t", 1e12),
            ("1G", 1e9),
            ("1Meg", 1e6),
            ("1k", 1e3),
            ("1m", 1e-3),
            ("1MIL", 25.4e-6),
            ("1u", 1e-6),
            ("1n", 1e-9),
            ("1p", 1e-12),
            ("1f", 1e-15),
        ];
        for (text, expected) in cases {
            assert_relative_eq!(parse_literal(text).unwrap(), expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn exponents_and_units() {
        assert_relative_eq!(parse_literal("1.5e3").unwrap(), 1500.0);
        assert_relative_eq!(parse_literal("2E-2").unwrap(), 0.02);
        assert_relative_eq!(parse_literal("10kOhm").unwrap(), 10e3);
        assert_relative_eq!(parse_literal(".5").unwrap(), 0.5);
        assert_relative_eq!(parse_literal("3.").unwrap(), 3.0);
        // An `e` without digits starts a unit name.
        assert_relative_eq!(parse_literal("4eV").unwrap(), 4.0);
    }

    #[test]
    fn comma_decimal() {
        let (rest, v) = literal(true)("1,99666833293656").unwrap();
        assert_eq!(rest, "");
        assert_relative_eq!(v, 1.99666833293656);
        let (rest, v) = literal(false)("1,5").unwrap();
        assert_eq!(rest, ",5");
        assert_relative_eq!(v, 1.0);
    }

    #[test]
    fn rejects_non_literals() {
        assert_eq!(parse_literal(""), None);
        assert_eq!(parse_literal("."), None);
        assert_eq!(parse_literal("k1"), None);
        assert_eq!(parse_literal("1k2"), None);
    }
}
