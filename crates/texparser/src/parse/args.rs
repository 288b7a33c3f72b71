//! LaTeX-style argument popping.
//!
//! These functions are what command implementations are built from.
//! Each comes in two forms: one reads from the input the command was invoked from,
//!     and the `_from` form reads from a token list the command already owns.
//! The two forms behave identically except for where the tokens come from;
//!     the `_from` forms run the first form inside [vm::ExpandedStream::with_stack].

use crate::error;
use crate::object::{Group, GroupKind, Object, TokenList};
use crate::prelude as txl;
use crate::token::{self, Token, Value};
use crate::traits::*;
use crate::vm;

/// Pops a mandatory argument.
///
/// The argument is either balanced text in braces, in which case the braces are dropped,
///     or a single token.
/// Spaces before the argument are skipped.
/// The argument is read without expansion.
pub fn pop_arg<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
) -> txl::Result<Vec<Token>> {
    let input = input.as_mut().unexpanded();
    skip_spaces(input)?;
    let token = input.next_or_err(ArgumentEndOfInputError {})?;
    match token.value() {
        Value::BeginGroup(_) => {
            let mut result = vec![];
            super::finish_parsing_balanced_tokens(input, token, &mut result)?;
            Ok(result)
        }
        Value::EndGroup(_) => Err(input.fatal_error(super::Error::new(
            input.vm(),
            "an argument",
            Some(token),
            "an argument is balanced text in braces like {abc}, or a single token",
        ))),
        _ => Ok(vec![token]),
    }
}

pub fn pop_arg_from<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
    list: &mut TokenList,
) -> txl::Result<Vec<Token>> {
    input.as_mut().with_stack(list, |input| pop_arg(input))
}

/// Pops an optional argument in square brackets.
///
/// Returns [None] if the next token is not `[`.
/// Brackets inside braces do not end the argument, so `[{]}]` gives `{]}`.
pub fn pop_opt_arg<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
) -> txl::Result<Option<Vec<Token>>> {
    let input = input.as_mut().unexpanded();
    skip_spaces(input)?;
    match input.peek()? {
        Some(token) if token.value() == Value::Other('[') => {
            input.consume()?;
        }
        _ => return Ok(None),
    }
    let mut result = vec![];
    let mut depth = 0_usize;
    loop {
        let token = input.next_or_err(OptionalArgumentEndOfInputError {})?;
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => {
                if depth == 0 {
                    return Err(input.fatal_error(
                        error::SimpleTokenError::new(
                            token,
                            "unexpected end group token inside an optional argument",
                        )
                        .with_kind(error::Kind::UnbalancedGroup),
                    ));
                }
                depth -= 1;
            }
            Value::Other(']') if depth == 0 => return Ok(Some(result)),
            _ => {}
        }
        result.push(token);
    }
}

pub fn pop_opt_arg_from<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
    list: &mut TokenList,
) -> txl::Result<Option<Vec<Token>>> {
    input.as_mut().with_stack(list, |input| pop_opt_arg(input))
}

/// Pops an argument, expands it fully and flattens it to a string.
///
/// This is used for names like labels, environment names and file names.
/// Control sequences that remain after expansion are written with their escape character.
/// Leading and trailing spaces are trimmed.
pub fn pop_label_string<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
) -> txl::Result<String> {
    let input = input.as_mut();
    let tokens = pop_arg(input)?;
    let tokens = vm::expand_fully(tokens, input)?;
    let interner = input.vm().cs_name_interner();
    let mut s = String::new();
    for token in tokens {
        match token.value() {
            Value::CommandRef(token::CommandRef::ControlSequence(name)) => {
                s.push('\\');
                s.push_str(interner.resolve(name).unwrap_or_default());
            }
            _ => {
                if let Some(c) = token.char() {
                    s.push(c);
                }
            }
        }
    }
    Ok(s.trim().to_string())
}

pub fn pop_label_string_from<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
    list: &mut TokenList,
) -> txl::Result<String> {
    input.as_mut().with_stack(list, |input| pop_label_string(input))
}

/// Pops an optional modifier character like the `*` in `\section*`.
///
/// Returns whether the modifier was present.
/// Spaces before the modifier are skipped either way.
pub fn pop_modifier<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
    modifier: char,
) -> txl::Result<bool> {
    let input = input.as_mut().unexpanded();
    skip_spaces(input)?;
    match input.peek()? {
        Some(token)
            if matches!(token.value(), Value::Other(c) | Value::Letter(c) if c == modifier) =>
        {
            input.consume()?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

pub fn pop_modifier_from<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
    list: &mut TokenList,
    modifier: char,
) -> txl::Result<bool> {
    input
        .as_mut()
        .with_stack(list, |input| pop_modifier(input, modifier))
}

/// Pops an argument and parses it as a number.
///
/// The whole argument must be the number; `{12}` is valid but `{12a}` is not.
pub fn pop_numerical_arg<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
) -> txl::Result<i32> {
    let input = input.as_mut();
    let mut list = TokenList::new(pop_arg(input)?);
    let (n, leftover) = input.with_stack(&mut list, |input| {
        let n = i32::parse(input)?;
        Ok((n, input.next()?))
    })?;
    if let Some(token) = leftover {
        return Err(input.fatal_error(
            super::Error::new(
                input.vm(),
                "the end of the numerical argument",
                Some(token),
                "a numerical argument contains only a number, like {12}",
            ),
        ));
    }
    Ok(n)
}

pub fn pop_numerical_arg_from<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
    list: &mut TokenList,
) -> txl::Result<i32> {
    input.as_mut().with_stack(list, |input| pop_numerical_arg(input))
}

/// Pops the next object, expanding as needed.
///
/// A begin group token gives a [Group] containing the balanced text up to the matching end group token.
/// Any other token gives [Object::Token].
/// Returns [None] at the end of the input.
pub fn pop_object<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
) -> txl::Result<Option<Object>> {
    let input = input.as_mut();
    let token = match input.next()? {
        None => return Ok(None),
        Some(token) => token,
    };
    if !matches!(token.value(), Value::BeginGroup(_)) {
        return Ok(Some(Object::Token(token)));
    }
    let mut group = Group::new(GroupKind::Brace, token);
    let mut depth = 0_usize;
    let unexpanded = input.unexpanded();
    loop {
        let next = unexpanded.next_or_err(ArgumentEndOfInputError {})?;
        match next.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => {
                if depth == 0 {
                    group.close = Some(next);
                    return Ok(Some(Object::Group(group)));
                }
                depth -= 1;
            }
            _ => {}
        }
        group.content.tokens.push(next);
    }
}

pub fn pop_object_from<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
    list: &mut TokenList,
) -> txl::Result<Option<Object>> {
    input.as_mut().with_stack(list, |input| pop_object(input))
}

fn skip_spaces<T: TokenStream>(input: &mut T) -> txl::Result<()> {
    while get_optional_element![
        input,
        Value::Space(_) => (),
    ]
    .is_some()
    {}
    Ok(())
}

#[derive(Debug)]
struct ArgumentEndOfInputError;

impl error::EndOfInputError for ArgumentEndOfInputError {
    fn doing(&self) -> String {
        "popping an argument".into()
    }
}

#[derive(Debug)]
struct OptionalArgumentEndOfInputError;

impl error::EndOfInputError for OptionalArgumentEndOfInputError {
    fn doing(&self) -> String {
        "popping an optional argument".into()
    }

    fn notes(&self) -> Vec<String> {
        vec!["an optional argument must be closed with ]".into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::trace;
    use std::collections::HashMap;

    fn new_vm(source: &str) -> Box<vm::VM<()>> {
        let mut vm = vm::VM::<()>::new(HashMap::new());
        vm.push_source(trace::Origin::String("test".into()), source.into())
            .unwrap();
        vm
    }

    fn chars(tokens: &[Token]) -> String {
        tokens.iter().filter_map(|t| t.char()).collect()
    }

    fn rest(input: &mut vm::ExecutionInput<()>) -> String {
        let mut s = String::new();
        while let Some(token) = input.next().unwrap() {
            s.extend(token.char());
        }
        s
    }

    #[test]
    fn arg_in_braces() {
        let mut vm = new_vm("  {a{b}c}d");
        let input = vm::ExecutionInput::new(&mut vm);
        assert_eq!(chars(&pop_arg(input).unwrap()), "a{b}c");
        assert_eq!(rest(input), "d");
    }

    #[test]
    fn arg_single_token() {
        let mut vm = new_vm("ab");
        let input = vm::ExecutionInput::new(&mut vm);
        assert_eq!(chars(&pop_arg(input).unwrap()), "a");
        assert_eq!(rest(input), "b");
    }

    #[test]
    fn arg_end_of_input() {
        let mut vm = new_vm("{ab");
        let input = vm::ExecutionInput::new(&mut vm);
        let err = pop_arg(input).unwrap_err();
        assert_eq!(err.kind(), error::Kind::EndOfInput);
    }

    #[test]
    fn arg_end_group() {
        let mut vm = new_vm("}");
        let input = vm::ExecutionInput::new(&mut vm);
        let err = pop_arg(input).unwrap_err();
        assert_eq!(err.kind(), error::Kind::Syntax);
    }

    #[test]
    fn opt_arg_present() {
        let mut vm = new_vm("[a{]}b]c");
        let input = vm::ExecutionInput::new(&mut vm);
        assert_eq!(chars(&pop_opt_arg(input).unwrap().unwrap()), "a{]}b");
        assert_eq!(rest(input), "c");
    }

    #[test]
    fn opt_arg_absent() {
        let mut vm = new_vm("{a}");
        let input = vm::ExecutionInput::new(&mut vm);
        assert_eq!(pop_opt_arg(input).unwrap(), None);
        assert_eq!(rest(input), "{a}");
    }

    #[test]
    fn opt_arg_unterminated() {
        let mut vm = new_vm("[ab");
        let input = vm::ExecutionInput::new(&mut vm);
        let err = pop_opt_arg(input).unwrap_err();
        assert_eq!(err.kind(), error::Kind::EndOfInput);
    }

    #[test]
    fn label_string() {
        let mut vm = new_vm(r"{ sec:intro }x");
        let input = vm::ExecutionInput::new(&mut vm);
        assert_eq!(pop_label_string(input).unwrap(), "sec:intro");
    }

    #[test]
    fn modifier() {
        let mut vm = new_vm("*{a}");
        let input = vm::ExecutionInput::new(&mut vm);
        assert!(pop_modifier(input, '*').unwrap());
        assert!(!pop_modifier(input, '*').unwrap());
        assert_eq!(rest(input), "{a}");
    }

    #[test]
    fn numerical_arg() {
        let mut vm = new_vm("{-12}3");
        let input = vm::ExecutionInput::new(&mut vm);
        assert_eq!(pop_numerical_arg(input).unwrap(), -12);
        assert_eq!(rest(input), "3");
    }

    #[test]
    fn numerical_arg_with_trailing_tokens() {
        let mut vm = new_vm("{12a}");
        let input = vm::ExecutionInput::new(&mut vm);
        let err = pop_numerical_arg(input).unwrap_err();
        assert_eq!(err.kind(), error::Kind::Syntax);
    }

    #[test]
    fn object_group() {
        let mut vm = new_vm("{a{b}}c");
        let input = vm::ExecutionInput::new(&mut vm);
        let object = pop_object(input).unwrap().unwrap();
        let interner = input.vm().cs_name_interner();
        assert_eq!(object.to_text(interner), "{a{b}}");
        assert!(matches!(pop_object(input).unwrap(), Some(Object::Token(_))));
        assert_eq!(pop_object(input).unwrap(), None);
    }

    #[test]
    fn from_list_forms_read_only_the_list() {
        let mut vm = new_vm("z");
        let input = vm::ExecutionInput::new(&mut vm);
        let key = trace::Key::dummy();
        let mut list = TokenList::new(vec![
            Token::new_other('[', key),
            Token::new_letter('o', key),
            Token::new_other(']', key),
            Token::new_letter('a', key),
        ]);
        let opt = pop_opt_arg_from(input, &mut list).unwrap().unwrap();
        assert_eq!(chars(&opt), "o");
        assert_eq!(chars(&pop_arg_from(input, &mut list).unwrap()), "a");
        assert!(list.is_empty());
        let err = pop_arg_from(input, &mut list).unwrap_err();
        assert_eq!(err.kind(), error::Kind::EndOfInput);
        assert_eq!(rest(input), "z");
    }
}
