//! # texparser: a TeX and LaTeX macro language interpreter
//!
//! This crate implements the token and expansion engine of a TeX-like language:
//!
//! - category codes and the tokenizer ([token]),
//! - the scoped registry of control sequence definitions ([command]),
//! - macros, variables and the expansion protocol ([texmacro], [variable], [vm]),
//! - argument popping and value parsing ([parse]),
//! - the listener contract through which processed output leaves the engine ([listener]).
//!
//! The primitives themselves (`\def`, `\ifnum`, `\newcommand`, ...) live in
//! the `texparser-stdlib` crate; this crate only provides what they are built from.

extern crate texparser_stdext;

pub mod command;
pub mod error;
pub mod listener;
pub mod object;
pub mod parse;
pub mod settings;
pub mod texmacro;
pub mod token;
pub mod types;
pub mod variable;
pub mod vm;

/// Module that re-exports all of the crate's traits.
///
/// ```
/// use texparser::traits::*;
/// ```
pub mod traits {
    pub use super::listener::Listener;
    pub use super::parse::Parsable;
    pub use super::vm::HasComponent;
    pub use super::vm::ParserState;
    pub use super::vm::TokenStream;
}

/// Module that re-exports the types used in almost every primitive implementation.
pub mod prelude {
    pub use super::command::BuiltIn;
    pub use super::command::Command;
    pub use super::error::Error;
    pub use super::token::Token;
    pub use super::vm::ExecutionInput;
    pub use super::vm::ExpansionInput;

    /// Result type returned by every fallible engine operation.
    pub type Result<T> = std::result::Result<T, Box<super::error::Error>>;
}
