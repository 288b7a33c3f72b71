//! Dimension parsing.
//!
//! A dimension is a number, optionally with a decimal fraction, followed by a unit like `pt` or `cm`.
//! It can also be read from a dimension variable, or be a number multiplying a dimension variable.

use super::keyword::parse_keyword;
use super::number::{self, InternalNumber};
use crate::prelude as txl;
use crate::token::Value;
use crate::traits::*;
use crate::types::{Dimen, Unit};
use crate::*;

impl<S: ParserState> Parsable<S> for Dimen {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let negative = number::parse_optional_signs(input)?.is_some();
        let first_token = input.next_or_err(DimenEndOfInputError {})?;
        let (integer_part, has_fractional_part) = match first_token.value() {
            Value::CommandRef(command_ref) => {
                match number::parse_internal_number(input, first_token, command_ref)? {
                    InternalNumber::Integer(i) => (i, false),
                    InternalNumber::Dimen(d) => {
                        if negative {
                            return Ok(-d);
                        }
                        return Ok(d);
                    }
                }
            }
            Value::Other(',' | '.') => (0, true),
            Value::Other(c @ '0'..='9') => {
                let i = number::parse_constant::<S, 10>(input, c as i32 - '0' as i32)?;
                let has_fractional_part = get_optional_element![
                    input,
                    Value::Other(',' | '.') => (),
                ]
                .is_some();
                (i, has_fractional_part)
            }
            _ => {
                input.back(first_token);
                let (_, i) = number::parse_number_internal(input)?;
                (i, false)
            }
        };
        let fractional_part = if has_fractional_part {
            scan_decimal_fraction(input)?
        } else {
            Dimen::ZERO
        };

        let (negative, integer_part) = if integer_part < 0 {
            // Only possible for an integer read from a variable, in which case there is no fraction.
            (!negative, integer_part.wrapping_neg())
        } else {
            (negative, integer_part)
        };
        let d = match scan_and_apply_units(input, integer_part, fractional_part)? {
            Some(d) => d,
            None => {
                let err = parse::Error::new(
                    input.vm(),
                    "a dimension in the range (-2^14pt,2^14pt)",
                    Some(first_token),
                    "",
                )
                .with_got_override("a dimension that's too large");
                return Err(input.fatal_error(err));
            }
        };
        if negative {
            Ok(-d)
        } else {
            Ok(d)
        }
    }
}

/// Reads the unit and applies it to the number.
///
/// Returns `Ok(None)` if the result is out of range.
fn scan_and_apply_units<S: ParserState>(
    input: &mut vm::ExpandedStream<S>,
    integer_part: i32,
    fractional_part: Dimen,
) -> txl::Result<Option<Dimen>> {
    while get_optional_element![
        input,
        Value::Space(_) => (),
    ]
    .is_some()
    {}
    // A variable in the unit position is a multiple of the variable's value, like 2\dimen0.
    if let Some(next) = input.next()? {
        match next.value() {
            Value::CommandRef(command_ref) => {
                let v = match number::parse_internal_number(input, next, command_ref)? {
                    // An integer in this position is a number of scaled points.
                    InternalNumber::Integer(i) => Dimen(i),
                    InternalNumber::Dimen(d) => d,
                };
                let Ok((adjusted_fractional_part, _)) = v.xn_over_d(fractional_part.0, 1 << 16)
                else {
                    return Ok(None);
                };
                return Ok(v.nx_plus_y(integer_part, adjusted_fractional_part).ok());
            }
            _ => input.back(next),
        }
    }

    // Magnification is not supported, so `true` units are the same as plain units.
    parse_keyword(input, "true")?;

    let unit = <Unit as Parsable<S>>::parse(input)?;
    get_optional_element![input, Value::Space(_) => (),];
    let (integer_part, fractional_part) = match unit {
        // For sp units, the fractional part is silently dropped.
        Unit::ScaledPoint => {
            let d = Dimen(integer_part);
            return Ok(if d > Dimen::MAX { None } else { Some(d) });
        }
        Unit::Point => (integer_part, fractional_part),
        _ => {
            let (n, d) = unit.conversion_fraction();
            let Ok((i, remainder)) = Dimen(integer_part).xn_over_d(n, d) else {
                return Ok(None);
            };
            let Ok(remainder) = Dimen::from_integer(remainder.0) else {
                return Ok(None);
            };
            let Ok(f) = fractional_part.nx_plus_y(n, remainder) else {
                return Ok(None);
            };
            let f = f / d;
            (i.0 + f.integer_part(), f.fractional_part())
        }
    };
    let Ok(integer_part) = Dimen::from_integer(integer_part) else {
        return Ok(None);
    };
    Ok(Some(integer_part + fractional_part))
}

impl<S: ParserState> Parsable<S> for Unit {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        for (keyword, unit) in Unit::ALL {
            if parse_keyword(input, keyword)? {
                return Ok(unit);
            }
        }
        let got = input.peek()?;
        let err = parse::Error::new(
            input.vm(),
            "a unit of length",
            got,
            "the supported units are pt, in, pc, cm, mm, bp, dd, cc and sp",
        );
        Err(input.fatal_error(err))
    }
}

fn scan_decimal_fraction<S: ParserState>(input: &mut vm::ExpandedStream<S>) -> txl::Result<Dimen> {
    // Digits after the 17th cannot change the result, since the smallest dimension is 2^(-16)pt.
    let mut digits = [0_u8; 17];
    let mut i = 0_usize;
    while let Some(token) = input.next()? {
        let d: u8 = match token.value() {
            Value::Other(c @ '0'..='9') => c as u8 - b'0',
            Value::Space(_) => {
                break;
            }
            _ => {
                input.back(token);
                break;
            }
        };
        if let Some(digit) = digits.get_mut(i) {
            *digit = d;
            i += 1;
        }
    }
    Ok(Dimen::from_decimal_fraction(&digits[0..i]))
}

#[derive(Debug)]
struct DimenEndOfInputError;

impl error::EndOfInputError for DimenEndOfInputError {
    fn doing(&self) -> String {
        "parsing a dimension".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::testing::*;

    #[derive(Default)]
    struct State;

    impl ParserState for State {}

    parse_success_tests![
        (zero_pt, "0pt", Dimen::ZERO),
        (one_pt, "1pt", Dimen::ONE),
        (one_pt_negative, "-1pt", -Dimen::ONE),
        (two_pt, "2pt", Dimen::TWO),
        (upper_case_unit, "2PT", Dimen::TWO),
        (empty_point, ".pt", Dimen::ZERO),
        (fraction_1, "0.5pt", Dimen::from_decimal_fraction(&[5])),
        (fraction_2, "-0.5pt", -Dimen::from_decimal_fraction(&[5])),
        (fraction_comma, "0,5pt", Dimen::from_decimal_fraction(&[5])),
        (
            fraction_3,
            "1.5pt",
            Dimen::ONE + Dimen::from_decimal_fraction(&[5])
        ),
        (
            fraction_4,
            "-1.5pt",
            -Dimen::ONE - Dimen::from_decimal_fraction(&[5])
        ),
        (units_in_1, "1in", (Dimen::ONE * 7227) / 100),
        (units_in_2, "1 in", (Dimen::ONE * 7227) / 100),
        (units_true_in, "1truein", (Dimen::ONE * 7227) / 100),
        (units_pc, "1pc", Dimen::ONE * 12),
        (units_cm, "1cm", (Dimen::ONE * 7227) / 254),
        (units_mm, "1mm", (Dimen::ONE * 7227) / 2540),
        (units_bp, "1bp", (Dimen::ONE * 7227) / 7200),
        (units_dd, "1dd", (Dimen::ONE * 1238) / 1157),
        (units_cc, "1cc", (Dimen::ONE * 14856) / 1157),
        (units_sp_1, "1sp", Dimen(1)),
        (units_sp_2, "1.999999sp", Dimen(1)),
        (hexadecimal_sp, "\"10sp", Dimen(16)),
        (nearly_overflow_pt, "16383.99998pt", Dimen::MAX),
        (nearly_overflow_sp_1, "1073741823sp", Dimen::MAX),
        (
            nearly_overflow_sp_2,
            "1073741823.99999999sp",
            Dimen::MAX
        )
    ];

    parse_failure_tests!(
        Dimen,
        State,
        (invalid_unit, "1xy"),
        (missing_unit, "1"),
        (overflow_pt, "16384pt"),
        (overflow_pt_neg, "-16384pt"),
        (overflow_in_1, "300in"),
        (overflow_in_2, "300000000in"),
        (overflow_in_3, "-300in"),
        (overflow_in_4, "-300000000in"),
        (overflow_sp, "1073741824sp"),
        (overflow_sp_neg, "-1073741824sp"),
    );
}
