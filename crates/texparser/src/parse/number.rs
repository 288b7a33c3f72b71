//! Number parsing.
//!
//! The number may be octal, decimal, hexadecimal, cast from a character token, or read
//! from an internal variable. The full definition of a number in the TeX grammar
//! is given in chapter 24 of the TeXBook.

use crate::prelude as txl;
use crate::token::Value;
use crate::traits::*;
use crate::*;

impl<S: ParserState> Parsable<S> for i32 {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let (_, i): (token::Token, i32) = parse_number_internal(input)?;
        Ok(i)
    }
}

/// A non-negative integer less than `N`.
#[derive(Debug, PartialEq, Eq, Default)]
pub struct Uint<const N: usize>(pub usize);

impl Uint<0> {
    pub const MAX: usize = i32::MAX as usize;
}

impl<S: ParserState, const N: usize> Parsable<S> for Uint<N> {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let (first_token, i): (token::Token, i32) = parse_number_internal(input)?;
        if i < 0 || i as usize >= N {
            return Err(input.fatal_error(OutOfBoundsError::<N> {
                first_token,
                got: i,
            }));
        }
        Ok(Uint(i as usize))
    }
}

#[derive(Debug)]
struct OutOfBoundsError<const N: usize> {
    first_token: token::Token,
    got: i32,
}

impl<const N: usize> error::TexError for OutOfBoundsError<N> {
    fn kind(&self) -> error::Kind {
        error::Kind::Syntax
    }

    fn location(&self) -> error::Location {
        error::Location::Token(self.first_token)
    }

    fn title(&self) -> String {
        format!(
            "expected an integer in the range [0, {}), got {}",
            N, self.got
        )
    }
}

impl<S: ParserState> Parsable<S> for token::CatCode {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let (token, i): (token::Token, i32) = parse_number_internal(input)?;
        if let Some(cat_code) = token::CatCode::from_int(i as i64) {
            return Ok(cat_code);
        }
        Err(input.fatal_error(
            parse::Error::new(
                input.vm(),
                "a category code number (an integer in the range [0, 15])",
                Some(token),
                "",
            )
            .with_got_override(format!["got the integer {i}"])
            .with_annotation_override("this is where the number started"),
        ))
    }
}

const GUIDANCE_BEGINNING: &str =
    "a number begins with zero or more minus signs followed by one of the following:
- A decimal digit (0-9), which begins a decimal number.
- The character ', which indicates the beginning of an octal number
- The character \", which indicates the beginning of a hexadecimal number
- The character `, followed by a character token. The character is converted into its UTF-8 number.
- A command that references a variable, like \\count1.
";

/// Parses a number and returns it together with the token where it started.
pub(crate) fn parse_number_internal<S: ParserState>(
    stream: &mut vm::ExpandedStream<S>,
) -> txl::Result<(token::Token, i32)> {
    let sign = parse_optional_signs(stream)?;
    let first_token = stream.next_or_err(NumberEndOfInputError {})?;
    let (result, is_constant): (i32, bool) = match first_token.value() {
        Value::Other(c @ '0'..='9') => (
            parse_constant::<S, 10>(stream, c as i32 - '0' as i32)?,
            true,
        ),
        Value::Other('\'') => (parse_constant::<S, 8>(stream, 0)?, true),
        Value::Other('"') => (parse_constant::<S, 16>(stream, 0)?, true),
        Value::Other('`') => (parse_character(stream)?, true),
        Value::CommandRef(command_ref) => {
            match parse_internal_number(stream, first_token, command_ref)? {
                InternalNumber::Integer(i) => (i, false),
                InternalNumber::Dimen(d) => (d.0, false),
            }
        }
        _ => {
            let err = parse::Error::new(
                stream.vm(),
                "the beginning of a number",
                Some(first_token),
                GUIDANCE_BEGINNING,
            );
            return Err(stream.fatal_error(err));
        }
    };
    // Only a constant is followed by an optional space.
    // Peeking after an internal quantity would expand the input too early.
    if is_constant {
        get_optional_element![stream, Value::Space(_) => (),];
    }
    let result = match sign {
        None => result,
        // The only i32 that is not safe to multiply by -1 is i32::MIN.
        // TeX wraps in this case and the result is i32::MIN again.
        Some(_) => result.wrapping_mul(-1),
    };
    Ok((first_token, result))
}

/// A number read from a command, like the value of a variable.
pub(crate) enum InternalNumber {
    Integer(i32),
    Dimen(types::Dimen),
}

/// Reads a number from the command the token references.
///
/// Integer and category code variables give integers; dimension variables give dimensions.
/// Any other command is an error.
pub(crate) fn parse_internal_number<S: ParserState>(
    stream: &mut vm::ExpandedStream<S>,
    first_token: token::Token,
    command_ref: token::CommandRef,
) -> txl::Result<InternalNumber> {
    let cmd = stream.commands_map().get_command(&command_ref).clone();
    match cmd {
        command::Command::Variable(cmd) => Ok(match cmd.value(first_token, stream)? {
            variable::ValueRef::Int(i) => InternalNumber::Integer(*i),
            variable::ValueRef::Dimen(d) => InternalNumber::Dimen(*d),
            variable::ValueRef::CatCode(c) => InternalNumber::Integer(c.int() as i32),
            variable::ValueRef::TokenList(_) => {
                return Err(stream.fatal_error(
                    error::SimpleTokenError::new(
                        first_token,
                        "a token list variable cannot be used as a number",
                    )
                    .with_kind(error::Kind::TypeMismatch)
                    .with_note(GUIDANCE_BEGINNING),
                ));
            }
        }),
        cmd => {
            let annotation = match cmd {
                command::Command::Undefined => "undefined control sequence".to_string(),
                cmd => format!["control sequence referencing {cmd}"],
            };
            let err = parse::Error::new(
                stream.vm(),
                "the beginning of a number",
                Some(first_token),
                GUIDANCE_BEGINNING,
            )
            .with_annotation_override(annotation);
            Err(stream.fatal_error(err))
        }
    }
}

#[derive(Debug)]
struct NumberEndOfInputError;

impl error::EndOfInputError for NumberEndOfInputError {
    fn doing(&self) -> String {
        "parsing a number".into()
    }
    fn notes(&self) -> Vec<String> {
        vec![GUIDANCE_BEGINNING.into()]
    }
}

/// Parses optional signs and spaces.
///
/// If the combination of the signs is positive, [None] is returned.
/// Otherwise, the Token corresponding to the last negative sign is returned.
pub(crate) fn parse_optional_signs<S: ParserState>(
    stream: &mut vm::ExpandedStream<S>,
) -> txl::Result<Option<token::Token>> {
    let mut result = None;
    while let Some((sign, token)) = get_optional_element_with_token![
        stream,
        Value::Other('+') => true,
        Value::Other('-') => false,
        Value::Space(_) => true,
    ] {
        result = match (result, sign) {
            (None, false) => Some(token),
            (Some(_), false) => None,
            (result, true) => result,
        };
    }
    Ok(result)
}

// The character after the backtick is read without expansion, so `\a gives 97 whatever \a means.
fn parse_character<S: ParserState>(input: &mut vm::ExpandedStream<S>) -> txl::Result<i32> {
    let token = input.unexpanded().next_or_err(CharacterError {})?;
    let c = match token.value() {
        Value::CommandRef(token::CommandRef::ControlSequence(cs_name)) => {
            let name = input.vm().cs_name_interner().resolve(cs_name).unwrap_or_default();
            let mut iter = name.chars();
            match (iter.next(), iter.count()) {
                (Some(c), 0) => c,
                _ => {
                    return Err(input.fatal_error(parse::Error::new(
                        input.vm(),
                        "a character",
                        Some(token),
                        r"a character is a character token or single-character control sequence like \a",
                    )));
                }
            }
        }
        Value::CommandRef(token::CommandRef::ActiveCharacter(c)) => c,
        _ => match token.char() {
            Some(c) => c,
            None => {
                return Err(input.fatal_error(parse::Error::new(
                    input.vm(),
                    "a character",
                    Some(token),
                    r"a character is a character token or single-character control sequence like \a",
                )));
            }
        },
    };
    Ok(c as i32)
}

#[derive(Debug)]
struct CharacterError;

impl error::EndOfInputError for CharacterError {
    fn doing(&self) -> String {
        "parsing a character".into()
    }

    fn notes(&self) -> Vec<String> {
        vec![
            r"a character is a character token or single-character control sequence like \a".into(),
        ]
    }
}

pub(crate) fn parse_constant<S: ParserState, const RADIX: i32>(
    stream: &mut vm::ExpandedStream<S>,
    mut result: i32,
) -> txl::Result<i32> {
    let mut started = RADIX == 10;
    loop {
        let next = match stream.next()? {
            None => break,
            Some(next) => next,
        };
        let lsd_or = match next.value() {
            token::Value::Other(c) => {
                let d = (c as u32).wrapping_sub('0' as u32);
                if d < 10 && d < (RADIX as u32) {
                    Some(d as i32)
                } else if RADIX == 16 {
                    let d = (c as u32).wrapping_sub('A' as u32);
                    if d < 6 {
                        Some(d as i32 + 10)
                    } else {
                        None
                    }
                } else {
                    None
                }
            }
            token::Value::Letter(c) => {
                let d = (c as u32).wrapping_sub('A' as u32);
                if RADIX == 16 && d < 6 {
                    Some(d as i32 + 10)
                } else {
                    None
                }
            }
            _ => None,
        };
        let lsd = match lsd_or {
            None => {
                stream.back(next);
                break;
            }
            Some(lsd) => lsd,
        };
        started = true;
        result = match add_lsd::<RADIX>(result, lsd) {
            Some(n) => n,
            None => {
                let err = add_lsd_error::<S, RADIX>(stream.vm(), next, result, lsd);
                return Err(stream.fatal_error(err));
            }
        }
    }
    if !started {
        let (expected, guidance) = match RADIX {
            8 => (
                "an octal digit",
                "an octal digit is a token with value 0-7 and category other",
            ),
            _ => (
                "a hexadecimal digit",
                "a hexadecimal digit is either:\n- A character token with value 0-9 and category other, or\n- A character token with value A-F and category letter or other",
            ),
        };
        let got = stream.peek()?;
        let err = parse::Error::new(stream.vm(), expected, got, guidance);
        return Err(stream.fatal_error(err));
    }
    Ok(result)
}

fn add_lsd<const RADIX: i32>(n: i32, lsd: i32) -> Option<i32> {
    match n.checked_mul(RADIX) {
        None => None,
        Some(n) => n.checked_add(lsd),
    }
}

fn add_lsd_error<S, const RADIX: i32>(
    vm: &vm::VM<S>,
    token: token::Token,
    n: i32,
    lsd: i32,
) -> parse::Error {
    let (got, range) = match RADIX {
        8 => (
            format!["got '{n:o}{lsd:o}"],
            format!["'{:o}, '{:o}", -i32::MAX, i32::MAX],
        ),
        16 => (
            format!["got \"{n:X}{lsd:X}"],
            format!["-\"{:X}, \"{:X}", i32::MAX, i32::MAX],
        ),
        _ => (
            format!["got {n}{lsd}"],
            format!["{}, {}", -i32::MAX, i32::MAX],
        ),
    };
    parse::Error::new(vm, format!["a number in the range [{range}]"], Some(token), "")
        .with_got_override(got)
        .with_annotation_override("this digit makes the number too big")
}
