//! Error handling
//!
//! Every fallible operation in the engine returns a [Box<Error>].
//! An [Error] wraps a concrete error type implementing [TexError]
//!     together with the source code trace of the place the error happened
//!     and the stack of commands that were running at the time.
//!
//! Errors are traced as soon as they are created with [Error::new], while the
//!     tokens involved can still be resolved against the VM's tracer.
//! When an error passes through a command on its way up to the driver
//!     the command adds a frame using [Error::propagate].
//!
//! Most errors are fatal and end the current call to [vm::VM::parse].
//! The exception is an undefined control sequence, which by default is reported
//!     through [vm::ParserState::recoverable_error_hook] and then skipped.

use crate::token;
use crate::token::trace;
use crate::vm;
use texparser_stdext::algorithms::spellcheck::{self, CloseWord};

pub mod display;

/// The type of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Kind {
    /// The input ended while a construct was still open, e.g. a group or a macro argument.
    EndOfInput,
    /// A token that is not allowed at this point, e.g. a letter where a number was expected.
    Syntax,
    /// A control sequence or active character without a definition.
    UndefinedCommand,
    /// A value of the wrong type, e.g. a token list variable used as a number.
    TypeMismatch,
    /// A group was closed without being opened, or closed with the wrong delimiter.
    UnbalancedGroup,
    /// Expansion exceeded one of the configured limits.
    NonTermination,
    /// The parse was cancelled through a [vm::CancellationToken].
    Cancelled,
    /// A file could not be read, or some other precondition outside the input failed.
    Io,
}

/// Where in the input an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// At a specific token.
    Token(token::Token),
    /// At the end of the input.
    EndOfInput,
    /// Nowhere in particular.
    /// The innermost stack trace frame is then the best location available.
    Unlocated,
}

/// Implementations of this trait describe an error in TeX source code.
pub trait TexError: std::fmt::Debug + 'static {
    fn kind(&self) -> Kind;

    fn location(&self) -> Location;

    fn title(&self) -> String;

    fn notes(&self) -> Vec<String> {
        vec![]
    }

    fn source_annotation(&self) -> String {
        TexError::default_source_annotation(self)
    }

    fn default_source_annotation(&self) -> String {
        match TexError::location(self) {
            Location::Token(t) => match (t.char(), t.cat_code()) {
                (Some(c), Some(code)) => {
                    format!["character token with value {c} and category code {code}",]
                }
                _ => "control sequence".to_string(),
            },
            Location::EndOfInput => "input ended here".into(),
            Location::Unlocated => "error occurred while running this command".into(),
        }
    }
}

/// A fully traced error.
#[derive(Debug)]
pub struct Error {
    pub error: Box<dyn TexError>,
    /// Trace of the error's location, if it has one.
    pub trace: Option<trace::SourceCodeTrace>,
    /// Commands that were running when the error occurred, innermost first.
    pub stack_trace: Vec<StackTraceElement>,
}

impl Error {
    /// Creates and traces a new error.
    pub fn new<S, E: TexError>(vm: &vm::VM<S>, err: E) -> Box<Error> {
        Error::new_boxed(vm, Box::new(err))
    }

    pub fn new_boxed<S>(vm: &vm::VM<S>, error: Box<dyn TexError>) -> Box<Error> {
        let trace = match error.location() {
            Location::Token(token) => Some(vm.trace(token)),
            Location::EndOfInput => Some(vm.trace_end_of_input()),
            Location::Unlocated => None,
        };
        Box::new(Error {
            error,
            trace,
            stack_trace: vec![],
        })
    }

    /// Adds a stack frame to the error for a command that was running when it occurred.
    pub fn propagate<S>(
        mut self: Box<Self>,
        vm: &vm::VM<S>,
        operation: OperationKind,
        token: token::Token,
    ) -> Box<Error> {
        self.stack_trace.push(StackTraceElement {
            operation,
            token,
            trace: vm.trace(token),
        });
        self
    }

    pub fn kind(&self) -> Kind {
        self.error.kind()
    }

    pub fn title(&self) -> String {
        self.error.title()
    }

    pub fn notes(&self) -> Vec<String> {
        self.error.notes()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display::format_error(f, self)
    }
}

impl std::error::Error for Error {}

#[cfg(feature = "serde")]
impl serde::Serialize for Error {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Error", 6)?;
        s.serialize_field("kind", &self.error.kind())?;
        s.serialize_field("title", &self.error.title())?;
        s.serialize_field("notes", &self.error.notes())?;
        s.serialize_field("annotation", &self.error.source_annotation())?;
        s.serialize_field("trace", &self.trace)?;
        s.serialize_field("stack_trace", &self.stack_trace)?;
        s.end()
    }
}

/// The kind of work a command was doing when an error passed through it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperationKind {
    Expansion,
    Execution,
    VariableIndex,
    VariableAssignment,
}

impl OperationKind {
    pub fn action(&self) -> &'static str {
        match self {
            OperationKind::Expansion => "expanding this command",
            OperationKind::Execution => "executing this command",
            OperationKind::VariableIndex => "determining the index of this variable",
            OperationKind::VariableAssignment => "determining the value to assign to this variable",
        }
    }
}

/// Element of a stack trace.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StackTraceElement {
    pub operation: OperationKind,
    pub token: token::Token,
    pub trace: trace::SourceCodeTrace,
}

/// Implementations of this trait describe an error in which the input ended prematurely.
///
/// These are passed to [vm::TokenStream::next_or_err], which builds the
///     full error only if the input really has ended.
pub trait EndOfInputError: std::fmt::Debug + 'static {
    fn doing(&self) -> String;
    fn notes(&self) -> Vec<String> {
        vec![]
    }
}

impl EndOfInputError for &'static str {
    fn doing(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug)]
pub(crate) struct EofError {
    doing: String,
    notes: Vec<String>,
}

impl EofError {
    pub(crate) fn new<E: EndOfInputError>(err: E) -> Self {
        Self {
            doing: err.doing(),
            notes: err.notes(),
        }
    }
}

impl TexError for EofError {
    fn kind(&self) -> Kind {
        Kind::EndOfInput
    }

    fn location(&self) -> Location {
        Location::EndOfInput
    }

    fn title(&self) -> String {
        format!("unexpected end of input while {}", self.doing)
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }
}

/// An error at a specific token with a fixed title.
#[derive(Debug)]
pub struct SimpleTokenError {
    pub token: token::Token,
    pub kind: Kind,
    pub title: String,
    pub notes: Vec<String>,
}

impl SimpleTokenError {
    /// Create a new simple token error.
    ///
    /// The kind of the error is [Kind::Syntax]; use [SimpleTokenError::with_kind] to change it.
    pub fn new<T: AsRef<str>>(token: token::Token, title: T) -> SimpleTokenError {
        SimpleTokenError {
            token,
            kind: Kind::Syntax,
            title: title.as_ref().into(),
            notes: vec![],
        }
    }

    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_note<T: Into<String>>(mut self, note: T) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl TexError for SimpleTokenError {
    fn kind(&self) -> Kind {
        self.kind
    }

    fn location(&self) -> Location {
        Location::Token(self.token)
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }
}

/// An error caused by something outside of the input, like a missing file.
#[derive(Debug)]
pub struct SimpleFailedPreconditionError {
    pub title: String,
    pub text_notes: Vec<String>,
}

impl SimpleFailedPreconditionError {
    /// Create a new simple failed precondition error.
    pub fn new<T: AsRef<str>>(title: T) -> Self {
        Self {
            title: title.as_ref().into(),
            text_notes: vec![],
        }
    }

    pub fn with_note<T: Into<String>>(mut self, note: T) -> Self {
        self.text_notes.push(note.into());
        self
    }
}

impl TexError for SimpleFailedPreconditionError {
    fn kind(&self) -> Kind {
        Kind::Io
    }

    fn location(&self) -> Location {
        Location::Unlocated
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn notes(&self) -> Vec<String> {
        self.text_notes.clone()
    }
}

/// Concrete error for the case when a command is undefined.
///
/// This error is returned when a control sequence or active character
///     is not defined.
#[derive(Debug)]
pub struct UndefinedCommandError {
    /// The token that was referred to an undefined command.
    pub token: token::Token,
    /// Control sequences that are spelled similarly to the token.
    pub close_names: Vec<CloseWord>,
}

impl UndefinedCommandError {
    /// Create a new undefined command error.
    pub fn new<S>(vm: &vm::VM<S>, token: token::Token) -> UndefinedCommandError {
        let close_names = match token.value() {
            token::Value::CommandRef(token::CommandRef::ControlSequence(cs_name)) => {
                let name = vm.cs_name_interner().resolve(cs_name).unwrap_or("");
                let all_names = vm.commands_map.names(vm.cs_name_interner());
                spellcheck::find_close_words(&all_names, name)
            }
            _ => vec![],
        };
        UndefinedCommandError { token, close_names }
    }
}

impl TexError for UndefinedCommandError {
    fn kind(&self) -> Kind {
        Kind::UndefinedCommand
    }

    fn location(&self) -> Location {
        Location::Token(self.token)
    }

    fn title(&self) -> String {
        match self.token.value() {
            token::Value::CommandRef(token::CommandRef::ActiveCharacter(_)) => {
                "undefined active character".into()
            }
            _ => "undefined control sequence".into(),
        }
    }

    fn notes(&self) -> Vec<String> {
        use texparser_stdext::color::Colorize;
        match self.close_names.first() {
            None => vec![],
            Some(close_name) => vec![format!["did you mean \\{}?", close_name.word.as_str().bold()]],
        }
    }
}

/// Error returned when one of the expansion limits in [vm::Config] is exceeded.
#[derive(Debug)]
pub struct NonTerminationError {
    /// The token being expanded when the limit was hit, if any.
    pub token: Option<token::Token>,
    pub limit_name: &'static str,
    pub limit: usize,
}

impl TexError for NonTerminationError {
    fn kind(&self) -> Kind {
        Kind::NonTermination
    }

    fn location(&self) -> Location {
        match self.token {
            None => Location::Unlocated,
            Some(token) => Location::Token(token),
        }
    }

    fn title(&self) -> String {
        format!["expansion did not terminate: the {} limit of {} was exceeded", self.limit_name, self.limit]
    }

    fn notes(&self) -> Vec<String> {
        vec![
            "this usually means a macro expands to itself, directly or indirectly".into(),
            "the limit can be raised in the VM's configuration".into(),
        ]
    }
}

/// Error returned when a parse is cancelled.
#[derive(Debug)]
pub struct CancelledError {
    pub token: Option<token::Token>,
}

impl TexError for CancelledError {
    fn kind(&self) -> Kind {
        Kind::Cancelled
    }

    fn location(&self) -> Location {
        match self.token {
            None => Location::Unlocated,
            Some(token) => Location::Token(token),
        }
    }

    fn title(&self) -> String {
        "parsing cancelled".into()
    }

    fn source_annotation(&self) -> String {
        "cancellation was observed here".into()
    }
}
