//! Logic for parsing elements of the TeX grammar from token streams.
//!
//! This parsing module is based around the [Parsable] trait, which is the most important type in the module.
//! This trait is implemented by Rust types that correspond to elements of the TeX grammar.
//! The trait implementation provides a way to parse grammar elements out of the input stream.
//!
//! The module contains implementations of [Parsable] for tuples where each element is parsable.
//! This allows expressions like `<integer><relation><integer>` to be parsed by one invocation
//!     of [Parsable::parse], in this case on the type `(i32, Ordering, i32)`.
//!
//! The second most important thing is the collection of custom Rust types like [OptionalBy] and
//!     [OptionalEquals] which correspond to elements of the grammar.
//!
//! Finally this module contains the argument popping functions used by LaTeX-style commands
//!     ([pop_arg], [pop_opt_arg] and friends) and some functions for parsing lists of tokens.

#[macro_use]
mod helpers;

mod args;
mod dimen;
mod keyword;
mod number;
mod relation;
#[cfg(test)]
mod testing;

pub use args::{
    pop_arg, pop_arg_from, pop_label_string, pop_label_string_from, pop_modifier,
    pop_modifier_from, pop_numerical_arg, pop_numerical_arg_from, pop_object, pop_object_from,
    pop_opt_arg, pop_opt_arg_from,
};
pub use keyword::{parse_keyword, OptionalBy, OptionalEquals, OptionalEqualsUnexpanded};
pub use number::Uint;
pub use relation::Ordering;

use crate::error;
use crate::prelude as txl;
use crate::token;
use crate::token::Token;
use crate::traits::*;
use crate::variable;
use crate::vm;

/// Implementations of this trait are elements of the TeX grammar than can be parsed from a stream of tokens.
pub trait Parsable<S: ParserState>: Sized {
    /// Parses a value from an input stream.
    ///
    /// This method just delegates to [Parsable::parse_impl].
    #[inline]
    fn parse<I>(input: &mut I) -> txl::Result<Self>
    where
        I: AsMut<vm::ExpandedStream<S>>,
    {
        Parsable::parse_impl(input.as_mut())
    }

    /// Parses a value from the [vm::ExpandedStream].
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self>;
}

/// Error returned when the input does not contain the expected grammar element.
#[derive(Debug)]
pub struct Error {
    pub expected: String,
    pub got: Option<Token>,
    got_description: String,
    pub got_override: String,
    pub annotation_override: String,
    pub guidance: String,
}

impl error::TexError for Error {
    fn kind(&self) -> error::Kind {
        match self.got {
            None => error::Kind::EndOfInput,
            Some(_) => error::Kind::Syntax,
        }
    }

    fn location(&self) -> error::Location {
        match self.got {
            None => error::Location::EndOfInput,
            Some(token) => error::Location::Token(token),
        }
    }

    fn title(&self) -> String {
        let got = if self.got_override.is_empty() {
            &self.got_description
        } else {
            &self.got_override
        };
        format!["expected {}, instead {}", self.expected, got]
    }

    fn notes(&self) -> Vec<String> {
        if self.guidance.is_empty() {
            vec![]
        } else {
            vec![self.guidance.clone()]
        }
    }

    fn source_annotation(&self) -> String {
        if !self.annotation_override.is_empty() {
            return self.annotation_override.clone();
        }
        error::TexError::default_source_annotation(self)
    }
}

impl Error {
    pub fn new<S, T: Into<String>, R: Into<String>>(
        vm: &vm::VM<S>,
        expected: T,
        got: Option<Token>,
        guidance: R,
    ) -> Self {
        let got_description = match got {
            None => "the input ended".to_string(),
            Some(token) => match token.value() {
                token::Value::Letter(c) => format!["found the letter {c}"],
                token::Value::Other(c) => format!["found a non-letter character {c}"],
                token::Value::CommandRef(command_ref) => format![
                    "found the control sequence {}",
                    command_ref.to_string(vm.cs_name_interner())
                ],
                _ => match (token.char(), token.cat_code()) {
                    (Some(c), Some(code)) => {
                        format!["found a token with value {c} and category code {code}"]
                    }
                    _ => "found an unexpected token".to_string(),
                },
            },
        };
        Error {
            expected: expected.into(),
            got,
            got_description,
            got_override: "".into(),
            annotation_override: "".into(),
            guidance: guidance.into(),
        }
    }

    pub fn with_got_override<T: Into<String>>(mut self, got_override: T) -> Self {
        self.got_override = got_override.into();
        self
    }

    pub fn with_annotation_override<T: Into<String>>(mut self, annotation_override: T) -> Self {
        self.annotation_override = annotation_override.into();
        self
    }
}

macro_rules! generate_tuple_impls {
    ( $first: ident ) => {};
    ( $first: ident, $( $name: ident ),+ ) => {
        generate_tuple_impls![ $( $name ),+];

        impl<S: ParserState, $first : Parsable<S>, $( $name : Parsable<S> ),+> Parsable<S> for ($first, $( $name ),+) {
            fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
                Ok(($first::parse(input)?, $( $name::parse(input)? ),+))
            }
        }
    };
}

generate_tuple_impls![T1, T2, T3, T4, T5];

impl<S: ParserState> Parsable<S> for token::CommandRef {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        while get_optional_element![
            input.unexpanded(),
            token::Value::Space(_) => (),
        ]
        .is_some()
        {}
        Ok(get_required_element![
            input.unexpanded(),
            "a control sequence or active character",
            "a command must be a control sequence or an active character",
            token::Value::CommandRef(command_ref) => command_ref,
        ])
    }
}

/// Parses balanced tokens from the stream.
///
/// The opening brace is assumed to have already been consumed.
/// The closing brace is consumed but not added to the result.
/// Returns false if the input ended before balanced tokens completed.
pub fn parse_balanced_tokens<T: TokenStream>(
    stream: &mut T,
    result: &mut Vec<Token>,
) -> txl::Result<bool> {
    let mut scope_depth = 0_usize;
    while let Some(token) = stream.next()? {
        match token.value() {
            token::Value::BeginGroup(_) => {
                scope_depth += 1;
            }
            token::Value::EndGroup(_) => {
                if scope_depth == 0 {
                    return Ok(true);
                }
                scope_depth -= 1;
            }
            _ => (),
        }
        result.push(token);
    }
    Ok(false)
}

/// Like [parse_balanced_tokens], but returns an error if the input ends first.
pub fn finish_parsing_balanced_tokens<T: TokenStream>(
    stream: &mut T,
    open_token: Token,
    result: &mut Vec<Token>,
) -> txl::Result<()> {
    if parse_balanced_tokens(stream, result)? {
        return Ok(());
    }
    let closer = match open_token.value() {
        token::Value::BeginGroup(_) => "a matching end group token like }".to_string(),
        _ => "a matching end group token".to_string(),
    };
    Err(stream.fatal_error(BalancedTextEndOfInputError { closer }))
}

#[derive(Debug)]
struct BalancedTextEndOfInputError {
    closer: String,
}

impl error::TexError for BalancedTextEndOfInputError {
    fn kind(&self) -> error::Kind {
        error::Kind::EndOfInput
    }

    fn location(&self) -> error::Location {
        error::Location::EndOfInput
    }

    fn title(&self) -> String {
        "unexpected end of input while parsing balanced text".into()
    }

    fn notes(&self) -> Vec<String> {
        vec![format!["the text must be closed with {}", self.closer]]
    }
}

/// Parses a token list value: either balanced text in braces or a token list variable.
///
/// Spaces before the value are skipped.
/// This is the right hand side of assignments like `\toks0={abc}` and `\toks0=\toks1`.
pub fn parse_token_list_value<S: ParserState, I: AsMut<vm::ExpandedStream<S>>>(
    input: &mut I,
) -> txl::Result<Vec<Token>> {
    let input = input.as_mut();
    let token = loop {
        let token = input.next_or_err(TokenListEndOfInputError {})?;
        if !matches!(token.value(), token::Value::Space(_)) {
            break token;
        }
    };
    match token.value() {
        token::Value::BeginGroup(_) => {
            let mut result = vec![];
            finish_parsing_balanced_tokens(input.unexpanded(), token, &mut result)?;
            return Ok(result);
        }
        token::Value::CommandRef(command_ref) => {
            if let crate::command::Command::Variable(cmd) =
                input.commands_map().get_command(&command_ref).clone()
            {
                if let variable::ValueRef::TokenList(tokens) = cmd.value(token, input)? {
                    return Ok(tokens.clone());
                }
            }
        }
        _ => {}
    }
    Err(input.fatal_error(Error::new(
        input.vm(),
        "a token list",
        Some(token),
        "a token list is balanced text in braces like {abc}, or a token list variable like \\toks0",
    )))
}

#[derive(Debug)]
struct TokenListEndOfInputError;

impl error::EndOfInputError for TokenListEndOfInputError {
    fn doing(&self) -> String {
        "parsing a token list".into()
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

    #[test]
    fn balanced_tokens() {
        let mut vm = new_vm("a{b}c}d");
        let input = vm::ExecutionInput::new(&mut vm);
        let mut result = vec![];
        assert!(parse_balanced_tokens(input.unexpanded(), &mut result).unwrap());
        assert_eq!(result.len(), 5);
        assert_eq!(
            input.next().unwrap().and_then(|t| t.char()),
            Some('d')
        );
    }

    #[test]
    fn balanced_tokens_end_of_input() {
        let mut vm = new_vm("a{b}c");
        let input = vm::ExecutionInput::new(&mut vm);
        let open = Token::new_begin_group('{', trace::Key::dummy());
        let err = finish_parsing_balanced_tokens(input.unexpanded(), open, &mut vec![])
            .unwrap_err();
        assert_eq!(err.kind(), error::Kind::EndOfInput);
    }

    #[test]
    fn token_list_value() {
        let mut vm = new_vm(" {a{b}}c");
        let input = vm::ExecutionInput::new(&mut vm);
        let tokens = parse_token_list_value(input).unwrap();
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn token_list_value_not_a_list() {
        let mut vm = new_vm("a");
        let input = vm::ExecutionInput::new(&mut vm);
        let err = parse_token_list_value(input).unwrap_err();
        assert_eq!(err.kind(), error::Kind::Syntax);
        assert_eq!(err.title(), "expected a token list, instead found the letter a");
    }
}
