//! The virtual machine (VM)
//!
//! This module contains the definition of the VM,
//!     the input streams that wrap the VM,
//!     the expansion protocol
//!     and the driver that parses a file or string.
//!
//! ## Input sources
//!
//! The input is a stack of sources.
//! The bottom source is always present and holds tokens pushed before any file.
//! Above it are files (the main input and files added with `\input`),
//!     bounded regions created by [ExecutionInput::with_stack] so that a command can
//!     run the stream primitives over a token list it owns,
//!     and transparent capture sources used by [expand_once] to collect the result of one expansion.
//!
//! Every source has a stack of pushed tokens (macro expansions, tokens put back after peeking)
//!     that are read before anything else in the source.
//! Reading moves down the stack when a file is exhausted, but never past a region:
//!     the end of a region's tokens is the end of the input for the command running the region.

use crate::command;
use crate::command::BuiltIn;
use crate::command::Command;
use crate::error;
use crate::listener::{Listener, NullListener};
use crate::object::{Group, GroupKind};
use crate::prelude as txl;
use crate::settings::{Mode, Settings};
use crate::texmacro;
use crate::token;
use crate::token::lexer;
use crate::token::trace;
use crate::token::CsNameInterner;
use crate::token::Token;
use crate::token::Value;
use crate::variable;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use texparser_stdext::collections::scopedmap::Scope;

mod expansion;
mod streams;
pub use expansion::{can_expand, expand_fully, expand_once, process};
pub use streams::*;

/// Implementations of this trait determine how the VM handles tokens that are not execution commands.
///
/// The main loop of the VM reads the next expanded token and performs
///     some action based on the token.
/// Many cases are handled automatically based on the semantics of the TeX language:
///
/// | token type | example | action |
/// | -- | -- | -- |
/// | execution command | `\def` | run the command |
/// | variable command | `\count` | assign a value to the corresponding variable |
/// | token alias | `\a` after `\let\a=a` | process the token that is aliased |
/// | begin group character | `{` | begin a group
/// | end group character | `}` | end the current group
///
/// The remaining cases are specified by implementing the associated handler:
///
/// | token type | example | handler | default |
/// | --- | --- | --- | --- |
/// | character token | `b` | [character_handler](Handlers::character_handler) | do nothing
/// | undefined command | `\b` where `\b` was never defined | [undefined_command_handler](Handlers::undefined_command_handler) | report a recoverable error
/// | unexpanded expansion command | `\the` in `\noexpand\the` | [unexpanded_expansion_command](Handlers::unexpanded_expansion_command) | do nothing
/// | math shift character | `$` | [math_shift_handler](Handlers::math_shift_handler) | begin or end a math group
///
/// Each of the handlers has the same function signature as an execution command.
pub trait Handlers<S: ParserState> {
    /// Handler to invoke for character tokens.
    ///
    /// This handler is _not_ invoked for tokens whose category code is begin group (1),
    ///     end group (2), math shift (3) or active character (13).
    fn character_handler(token: Token, input: &mut ExecutionInput<S>) -> txl::Result<()> {
        _ = (token, input);
        Ok(())
    }

    /// Handler to invoke for a control sequence or active character for which no command is defined.
    ///
    /// The default reports an [error::UndefinedCommandError] through
    ///     [ParserState::recoverable_error_hook] and skips the token.
    /// If [Config::strict_undefined] is set the error is fatal instead.
    fn undefined_command_handler(token: Token, input: &mut ExecutionInput<S>) -> txl::Result<()> {
        let err = error::UndefinedCommandError::new(input.vm(), token);
        if input.vm().config.strict_undefined {
            return Err(input.fatal_error(err));
        }
        input.error(err)?;
        if let Some(command_ref) = token.command_ref() {
            let name = command_ref.to_string(input.vm().cs_name_interner());
            input.vm().listener.borrow_mut().substituting(&name, "");
        }
        Ok(())
    }

    /// Handler to invoke for expansion commands that were not expanded.
    ///
    /// This handles the `\the` token in `\noexpand\the`.
    fn unexpanded_expansion_command(token: Token, input: &mut ExecutionInput<S>) -> txl::Result<()> {
        _ = (token, input);
        Ok(())
    }

    /// Handler to invoke for math shift characters.
    ///
    /// The default begins an inline math group on `$` and a display math group on `$$`,
    ///     or ends the innermost group if it is a math group.
    fn math_shift_handler(token: Token, input: &mut ExecutionInput<S>) -> txl::Result<()> {
        let open_math = input.vm().groups().last().and_then(|group| match group.kind {
            GroupKind::Math { display } => Some(display),
            _ => None,
        });
        match open_math {
            Some(display) => {
                if display {
                    match input.unexpanded().next()? {
                        Some(next) if matches!(next.value(), Value::MathShift(_)) => {}
                        other => {
                            let got = other.unwrap_or(token);
                            return Err(input.fatal_error(
                                error::SimpleTokenError::new(got, "display math must end with $$")
                                    .with_kind(error::Kind::UnbalancedGroup),
                            ));
                        }
                    }
                }
                input.end_group(GroupKind::Math { display }, token)
            }
            None => {
                let display = match input.unexpanded().peek()? {
                    Some(next) if matches!(next.value(), Value::MathShift(_)) => {
                        input.unexpanded().consume()?;
                        true
                    }
                    _ => false,
                };
                input.begin_group(GroupKind::Math { display }, token);
                Ok(())
            }
        }
    }
}

/// Handlers with all of the default behaviors.
pub struct DefaultHandlers;

impl<S: ParserState> Handlers<S> for DefaultHandlers {}

/// Configuration of the VM's limits and policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of expansions in one call to [VM::parse].
    ///
    /// Exceeding it raises a [error::Kind::NonTermination] error.
    /// This catches macros that expand to themselves, like `\def\a{\a}\a`.
    pub max_expansions: usize,
    /// Maximum nesting of expansion primitives and token list regions.
    pub max_expansion_depth: usize,
    /// Maximum number of files that can be open at once through `\input`.
    pub max_input_depth: usize,
    /// Whether undefined control sequences are fatal errors rather than recoverable ones.
    pub strict_undefined: bool,
    /// Whether comments are reported to [Listener::skipping].
    pub retain_comments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_expansions: 1_000_000,
            max_expansion_depth: 500,
            max_input_depth: 64,
            strict_undefined: false,
            retain_comments: false,
        }
    }
}

/// A handle used to cancel a parse from another thread.
///
/// The VM polls the token once per token read and fails with
///     [error::Kind::Cancelled] after it has been cancelled.
///
/// ```
/// # use texparser::vm::CancellationToken;
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// std::thread::spawn(move || handle.cancel()).join().unwrap();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> CancellationToken {
        Default::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The virtual machine.
pub struct VM<S> {
    /// The state
    pub state: S,

    /// The commands map
    pub commands_map: command::Map<S>,

    /// File system operations
    ///
    /// By default this is real operations on the file system.
    /// It is replaceable to support unit testing.
    pub file_system: Box<dyn FileSystem>,

    /// The listener that receives the output of the interpreter.
    pub listener: Rc<RefCell<dyn Listener>>,

    /// Writer that writes to the terminal
    ///
    /// Defaults to standard error.
    pub terminal_out: Rc<RefCell<dyn std::io::Write>>,

    /// Writer that writes to the log file
    ///
    /// Defaults to a sink writer that writes nothing.
    pub log_file: Rc<RefCell<dyn std::io::Write>>,

    /// The working directory which is used as the root for relative file paths
    ///
    /// This is [None] if the working directory could not be determined.
    pub working_directory: Option<PathBuf>,

    /// Limits and policies.
    pub config: Config,

    /// Token polled for cancellation, if any.
    pub cancellation: Option<CancellationToken>,

    internal: Internal<S>,
}

/// File system operations that the VM may need to perform.
///
/// These operations are extracted to a trait so that they be mocked out in unit testing.
pub trait FileSystem {
    /// Read the entire contents of a file into a string.
    ///
    /// This is implemented by [std::fs::read_to_string].
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}

struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Implementations of this trait may be used as the state in a VM.
///
/// The most important thing to know about this trait is that it has no required methods.
/// For any type it can be implemented trivially:
/// ```
/// # use texparser::traits::ParserState;
/// struct SomeNewType;
///
/// impl ParserState for SomeNewType {}
/// ```
///
/// Methods of the trait are invoked at certain points when the VM is running,
///     and in general offer a way of customizing the behavior of the VM.
/// The trait methods are all dispatched statically.
pub trait ParserState: Sized {
    /// Get the category code for the provided code point.
    ///
    /// The default implementation returns the category codes used in plain TeX.
    fn cat_code(&self, code_point: u32) -> token::CatCode {
        token::CatCode::default_for(code_point)
    }

    /// Hook that is invoked after a TeX macro is expanded.
    ///
    /// This hook is designed to support the `\tracingmacros` primitive.
    fn post_macro_expansion_hook(
        token: Token,
        input: &ExpansionInput<Self>,
        tex_macro: &texmacro::Macro,
        arguments: &[&[Token]],
        reversed_expansion: &[Token],
    ) {
        _ = (token, input, tex_macro, arguments, reversed_expansion);
    }

    /// Hook that potentially overrides the expansion of a command.
    ///
    /// This hook is invoked before an expandable token is expanded.
    /// If the result of the hook is non-empty, that result is considered the expansion of
    ///   the token.
    /// The result of the hook is not expanded before being returned.
    ///
    /// This hook is designed to support the `\noexpand` primitive.
    fn expansion_override_hook(
        token: Token,
        input: &mut ExpansionInput<Self>,
        tag: Option<command::Tag>,
    ) -> txl::Result<Option<Token>> {
        _ = (token, input, tag);
        Ok(None)
    }

    /// Hook that determines the scope of a variable assignment.
    ///
    /// This hook is designed to support the `\global` prefix.
    fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
        _ = state;
        Scope::Local
    }

    /// Hook that decides what happens to a recoverable error.
    ///
    /// Returning the error makes it fatal.
    /// The default reports the error to the listener and the log file, and continues.
    fn recoverable_error_hook(vm: &VM<Self>, recoverable_error: Box<error::Error>) -> txl::Result<()> {
        use std::io::Write;
        vm.listener.borrow_mut().warning(&recoverable_error);
        _ = writeln!(vm.log_file.borrow_mut(), "{recoverable_error}");
        Ok(())
    }
}

impl ParserState for () {}

impl<S: ParserState + Default> VM<S> {
    /// Create a new VM.
    pub fn new(initial_built_ins: HashMap<&str, BuiltIn<S>>) -> Box<VM<S>> {
        VM::new_with_state(Default::default(), initial_built_ins)
    }
}

impl<S: ParserState> VM<S> {
    /// Create a new VM with the provided initial state.
    pub fn new_with_state(state: S, initial_built_ins: HashMap<&str, BuiltIn<S>>) -> Box<VM<S>> {
        let mut internal = Internal::new(Default::default());
        let initial_built_ins = initial_built_ins
            .into_iter()
            .map(|(key, value)| (internal.cs_name_interner.get_or_intern(key), value))
            .collect();
        Box::new(VM {
            state,
            commands_map: command::Map::new(initial_built_ins),
            internal,
            file_system: Box::new(RealFileSystem {}),
            listener: Rc::new(RefCell::new(NullListener)),
            terminal_out: Rc::new(RefCell::new(std::io::stderr())),
            log_file: Rc::new(RefCell::new(std::io::sink())),
            working_directory: std::env::current_dir().ok(),
            config: Default::default(),
            cancellation: None,
        })
    }

    /// Install the listener that receives the interpreter's output.
    pub fn set_listener(&mut self, listener: Rc<RefCell<dyn Listener>>) {
        self.listener = listener;
    }

    /// Parse source code.
    ///
    /// The listener's [begin_parse](Listener::begin_parse) and [end_parse](Listener::end_parse)
    ///     hooks are invoked around the parse.
    /// Whether the parse succeeds or fails, afterwards the input is empty
    ///     and every group opened during the parse has been closed.
    pub fn parse<H: Handlers<S>>(
        &mut self,
        origin: trace::Origin,
        source_code: String,
    ) -> txl::Result<()> {
        self.internal.handlers = HandlerFns::new::<H>();
        self.internal.expansions_performed = 0;
        self.listener.borrow_mut().begin_parse(&origin);
        let result = self
            .push_source(origin, source_code)
            .and_then(|()| self.run_loop())
            .and_then(|()| self.check_groups_closed());
        self.unwind();
        self.listener.borrow_mut().end_parse();
        result
    }

    /// Parse a file.
    ///
    /// The file is read using the VM's [FileSystem].
    pub fn parse_file<H: Handlers<S>>(&mut self, path: &Path) -> txl::Result<()> {
        let source_code = match self.file_system.read_to_string(path) {
            Ok(source_code) => source_code,
            Err(err) => {
                return Err(error::Error::new(
                    self,
                    error::SimpleFailedPreconditionError::new(format![
                        "could not read the file {}",
                        path.display()
                    ])
                    .with_note(err.to_string()),
                ))
            }
        };
        self.parse::<H>(trace::Origin::File(path.to_path_buf()), source_code)
    }

    /// Run the main loop over source code added with [VM::push_source].
    ///
    /// Unlike [VM::parse], this does not invoke the listener's parse hooks and does not
    ///     close groups that are still open when the input ends.
    pub fn run<H: Handlers<S>>(&mut self) -> txl::Result<()> {
        self.internal.handlers = HandlerFns::new::<H>();
        self.run_loop()
    }

    /// Add new source code to the VM.
    ///
    /// TeX input source code is organized as a stack.
    /// Pushing source code onto the stack will mean it is read first.
    pub fn push_source(&mut self, origin: trace::Origin, source_code: String) -> txl::Result<()> {
        self.internal.push_source(origin, source_code, self.config.retain_comments);
        Ok(())
    }

    fn run_loop(&mut self) -> txl::Result<()> {
        let input = ExecutionInput::new(self);
        while let Some(token) = input.next()? {
            process(token, input)?;
        }
        Ok(())
    }

    fn check_groups_closed(&self) -> txl::Result<()> {
        match self.internal.groups.last() {
            None => Ok(()),
            Some(group) => Err(error::Error::new(
                self,
                error::SimpleTokenError::new(group.open, "the input ended before this group was closed")
                    .with_kind(error::Kind::EndOfInput)
                    .with_note(format!["the group must be closed with {}", group.kind.closer()]),
            )),
        }
    }

    fn unwind(&mut self) {
        self.internal.clear_sources();
        while let Some(group) = self.internal.groups.pop() {
            _ = self.commands_map.end_group();
            if let Some(save_stack_element) = self.internal.save_stack.pop() {
                save_stack_element.restore(&mut self.state);
            }
            self.internal.settings.pop();
            self.listener.borrow_mut().end_group(&group);
        }
        self.internal.expansion_depth = 0;
        self.internal.suppress_protected = 0;
    }
}

impl<S> VM<S> {
    /// Clear all source code from the VM.
    pub fn clear_sources(&mut self) {
        self.internal.clear_sources()
    }

    /// Return a reference to the control sequence name string interner.
    ///
    /// This interner can be used to resolve [token::CsName] types into regular strings.
    #[inline]
    pub fn cs_name_interner(&self) -> &CsNameInterner {
        &self.internal.cs_name_interner
    }

    /// The groups that are currently open, outermost first.
    pub fn groups(&self) -> &[Group] {
        &self.internal.groups
    }

    /// The typographic settings currently in effect.
    pub fn settings(&self) -> &Settings {
        self.internal.settings()
    }

    /// Number of expansions performed in the current parse.
    pub fn expansions_performed(&self) -> usize {
        self.internal.expansions_performed
    }

    /// The value of the `\par` token the tokenizer produces for blank lines.
    pub fn par_value(&self) -> Value {
        Value::CommandRef(token::CommandRef::ControlSequence(self.internal.par_name))
    }

    pub fn trace(&self, token: Token) -> trace::SourceCodeTrace {
        self.internal
            .tracer
            .trace(token, &self.internal.cs_name_interner)
    }

    pub fn trace_end_of_input(&self) -> trace::SourceCodeTrace {
        self.internal.tracer.trace_end_of_input()
    }

    fn begin_group(&mut self, kind: GroupKind, token: Token) {
        let group = match kind {
            GroupKind::Math { display } => self.listener.borrow_mut().create_math_group(display, token),
            kind => self.listener.borrow_mut().create_group(kind, token),
        };
        self.commands_map.begin_group();
        self.internal.save_stack.push(Default::default());
        let mut settings = self.internal.settings().clone();
        if let GroupKind::Math { display } = group.kind {
            settings.mode = if display {
                Mode::DisplayMath
            } else {
                Mode::InlineMath
            };
        }
        self.internal.settings.push(settings);
        self.listener.borrow_mut().begin_group(&group);
        self.internal.groups.push(group);
    }

    fn end_group(&mut self, kind: GroupKind, token: Token) -> txl::Result<()> {
        let open_kind = match self.internal.groups.last() {
            None => {
                return Err(error::Error::new(
                    self,
                    error::SimpleTokenError::new(token, "there is no group to end")
                        .with_kind(error::Kind::UnbalancedGroup),
                ))
            }
            Some(group) => group.kind.clone(),
        };
        if open_kind != kind {
            return Err(error::Error::new(
                self,
                error::SimpleTokenError::new(
                    token,
                    format!["this ends a group that must be closed with {}", open_kind.closer()],
                )
                .with_kind(error::Kind::UnbalancedGroup)
                .with_note(format!["the token closes groups opened with {}", kind.closer()]),
            ));
        }
        _ = self.commands_map.end_group();
        if let Some(save_stack_element) = self.internal.save_stack.pop() {
            save_stack_element.restore(&mut self.state);
        }
        self.internal.settings.pop();
        if let Some(mut group) = self.internal.groups.pop() {
            group.close = Some(token);
            self.listener.borrow_mut().end_group(&group);
        }
        Ok(())
    }
}

type HandlerFn<S> = command::ExecutionFn<S>;

struct HandlerFns<S> {
    character: HandlerFn<S>,
    undefined: HandlerFn<S>,
    unexpanded_expansion: HandlerFn<S>,
    math_shift: HandlerFn<S>,
}

impl<S: ParserState> HandlerFns<S> {
    fn new<H: Handlers<S>>() -> Self {
        HandlerFns {
            character: H::character_handler,
            undefined: H::undefined_command_handler,
            unexpanded_expansion: H::unexpanded_expansion_command,
            math_shift: H::math_shift_handler,
        }
    }
}

impl<S> Clone for HandlerFns<S> {
    fn clone(&self) -> Self {
        HandlerFns {
            character: self.character,
            undefined: self.undefined,
            unexpanded_expansion: self.unexpanded_expansion,
            math_shift: self.math_shift,
        }
    }
}

/// Parts of the VM that are private.
struct Internal<S> {
    // Never empty: the bottom source is a permanent token source.
    sources: Vec<Source>,

    cs_name_interner: CsNameInterner,

    tracer: trace::Tracer,

    token_buffers: std::collections::BinaryHeap<TokenBuffer>,

    save_stack: Vec<variable::SaveStackElement<S>>,

    groups: Vec<Group>,

    // Settings for each open group; the base settings apply outside all groups.
    base_settings: Settings,
    settings: Vec<Settings>,

    expansion_depth: usize,
    expansions_performed: usize,
    suppress_protected: usize,

    handlers: HandlerFns<S>,

    par_name: token::CsName,
}

impl<S: ParserState> Internal<S> {
    fn new(mut cs_name_interner: CsNameInterner) -> Self {
        let par_name = cs_name_interner.get_or_intern("par");
        Internal {
            sources: vec![Source::new_tokens()],
            cs_name_interner,
            tracer: Default::default(),
            token_buffers: Default::default(),
            save_stack: Default::default(),
            groups: Default::default(),
            base_settings: Default::default(),
            settings: Default::default(),
            expansion_depth: 0,
            expansions_performed: 0,
            suppress_protected: 0,
            handlers: HandlerFns::new::<DefaultHandlers>(),
            par_name,
        }
    }
}

impl<S> Internal<S> {
    fn push_source(&mut self, origin: trace::Origin, source_code: String, retain_comments: bool) {
        let source_code: Rc<str> = source_code.into();
        let key_range = self
            .tracer
            .register_source_code(origin, source_code.clone());
        let mut lexer = lexer::Lexer::new(source_code, key_range);
        lexer.retain_comments(retain_comments);
        self.sources.push(Source {
            expansions: Vec::with_capacity(32),
            kind: SourceKind::File(lexer),
        });
    }

    fn num_files(&self) -> usize {
        self.sources
            .iter()
            .filter(|source| matches!(source.kind, SourceKind::File(_)))
            .count()
    }

    fn end_current_file(&mut self) {
        if let Some(source) = self
            .sources
            .iter_mut()
            .rev()
            .find(|source| matches!(source.kind, SourceKind::File(_)))
        {
            if let SourceKind::File(lexer) = &mut source.kind {
                lexer.end();
            }
        }
    }

    fn clear_sources(&mut self) {
        self.sources.clear();
        self.sources.push(Source::new_tokens());
    }

    fn top_mut(&mut self) -> &mut Source {
        if self.sources.is_empty() {
            self.sources.push(Source::new_tokens());
        }
        let i = self.sources.len() - 1;
        &mut self.sources[i]
    }

    #[inline]
    fn push_expansion(&mut self, expansion: &[Token]) {
        self.top_mut().expansions.extend(expansion.iter().rev());
    }

    // A token put back goes to the top source, even a capture: the capture may be where it
    // was read from, and everything left in a capture precedes the sources below it.
    #[inline]
    fn push_back(&mut self, token: Token) {
        self.top_mut().expansions.push(token)
    }

    #[inline]
    fn expansions(&self) -> &[Token] {
        match self.sources.last() {
            None => &[],
            Some(source) => &source.expansions,
        }
    }

    #[inline]
    fn expansions_mut(&mut self) -> &mut Vec<Token> {
        &mut self.top_mut().expansions
    }

    // Expansion is disabled inside a region in list mode.
    fn expansion_enabled(&self) -> bool {
        for source in self.sources.iter().rev() {
            match source.kind {
                SourceKind::Tokens | SourceKind::Capture => continue,
                SourceKind::Region(mode) => return mode == crate::object::Mode::Stack,
                SourceKind::File(_) => return true,
            }
        }
        true
    }

    fn settings(&self) -> &Settings {
        self.settings.last().unwrap_or(&self.base_settings)
    }

    fn settings_mut(&mut self) -> &mut Settings {
        match self.settings.last_mut() {
            None => &mut self.base_settings,
            Some(settings) => settings,
        }
    }
}

enum SourceKind {
    File(lexer::Lexer),
    Region(crate::object::Mode),
    Tokens,
    // Collects the output of a single expansion; reads pass through it.
    Capture,
}

struct Source {
    // A stack: the next token is the last element.
    expansions: Vec<Token>,
    kind: SourceKind,
}

impl Source {
    fn new_tokens() -> Source {
        Source {
            expansions: Vec::new(),
            kind: SourceKind::Tokens,
        }
    }
}

#[derive(Default)]
struct TokenBuffer(Vec<Token>);

impl PartialEq for TokenBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.0.capacity() == other.0.capacity()
    }
}

impl Eq for TokenBuffer {}

impl PartialOrd for TokenBuffer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TokenBuffer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.capacity().cmp(&other.0.capacity())
    }
}

/// Helper trait for implementing the component pattern.
///
/// The component pattern is a design pattern used when implementing commands that require some state.
/// An example of a stateful command is `\count`, which needs to store the registers somewhere.
/// When the component pattern is used, a stateful command
///     can have a single implementation that
///     is used by multiple interpreters built with this crate.
/// Additionally, a specific interpreter can compose many different
///     stateful commands together without worrying about conflicts between their state.
///
/// In the component pattern, the state
///     needed by a specific command like `\count` is isolated in a _component_, which is a concrete
///     Rust type like a struct.
/// This Rust type is the generic type `C` in the trait.
/// The stateful command is defined in the same Rust module as the component,
///     and the internals of the component are private to that module.
/// This means the state can only be mutated by the commands implemented in the module.
///
/// The command specifies `HasComponent<C>` in its trait bounds, and any VM state type that
///     contains the component can implement the trait.
/// Combining multiple commands into one state just involves having the
///     VM state include all of the relevant components.
///
/// Notes:
///
/// - In general state is shared by multiple commands. Such commands must be defined in the
///     same Rust module to support this.
///     For example, `\countdef` shares state with `\count`,
///     and they are implemented together.
///
/// - Commands don't necessarily have state: for example, `\def`, `\advance` and `\the`.
///     These commands are defined without trait bounds on the state.
///
/// - The easiest way to include a component in the state is to make it a direct field
///     of the state.
///     In this case the [implement_has_component] macro can be used to implement the trait.
///
/// This trait requires that the type also implements [ParserState] only to reduce
///     the number of trait bounds commands need to specify.
pub trait HasComponent<C>: ParserState {
    /// Return a immutable reference to the component.
    fn component(&self) -> &C;

    /// Return a mutable reference to the component.
    fn component_mut(&mut self) -> &mut C;
}

/// This macro is for implementing the [HasComponent] trait in the special (but common)
///     case when the state is a struct and the component is a direct field of the struct.
///
/// ## Examples
///
/// ```
/// # mod mylibrary1{
/// #   pub struct Component;
/// # }
/// # mod mylibrary2{
/// #   pub struct Component;
/// # }
/// # use texparser::vm::implement_has_component;
/// # use texparser::traits::*;
/// #
/// struct MyState {
///     component_1: mylibrary1::Component,
///     component_2: mylibrary2::Component,
/// }
///
/// impl ParserState for MyState {}
///
/// implement_has_component![MyState {
///     component_1: mylibrary1::Component,
///     component_2: mylibrary2::Component,
/// }];
/// ```
#[macro_export]
macro_rules! implement_has_component {
    ( $type: path { $( $field: ident: $component: path ),+ $(,)? } ) => {
        $(
            impl ::texparser::vm::HasComponent<$component> for $type {
                #[inline]
                fn component(&self) -> &$component {
                    &self.$field
                }
                #[inline]
                fn component_mut(&mut self) -> &mut $component {
                    &mut self.$field
                }
            }
        )*
    };
}

pub use implement_has_component;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::TokenList;
    use crate::traits::*;

    #[derive(Default)]
    struct State;

    impl ParserState for State {}

    fn new_vm(source: &str) -> Box<VM<State>> {
        let mut vm = VM::<State>::new(HashMap::new());
        vm.push_source(trace::Origin::String("test".into()), source.into())
            .unwrap();
        vm
    }

    fn chars(tokens: &[Token]) -> String {
        tokens.iter().filter_map(|t| t.char()).collect()
    }

    #[test]
    fn read_from_file_source() {
        let mut vm = new_vm("ab");
        let input = ExecutionInput::new(&mut vm);
        assert_eq!(input.next().unwrap().and_then(|t| t.char()), Some('a'));
        assert_eq!(input.peek().unwrap().and_then(|t| t.char()), Some('b'));
        assert_eq!(input.next().unwrap().and_then(|t| t.char()), Some('b'));
        assert_eq!(input.next().unwrap(), None);
    }

    #[test]
    fn with_stack_reads_only_the_list() {
        let mut vm = new_vm("xyz");
        let input = ExecutionInput::new(&mut vm);
        let key = trace::Key::dummy();
        let mut list = TokenList::new(vec![Token::new_letter('a', key), Token::new_letter('b', key)]);
        let first = input
            .with_stack(&mut list, |input| {
                let first = input.next()?;
                assert!(input.next()?.is_some());
                assert_eq!(input.next()?, None);
                Ok(first)
            })
            .unwrap();
        assert_eq!(first.and_then(|t| t.char()), Some('a'));
        assert!(list.is_empty());
        assert_eq!(input.next().unwrap().and_then(|t| t.char()), Some('x'));
    }

    #[test]
    fn with_stack_returns_unconsumed_tokens() {
        let mut vm = new_vm("");
        let input = ExecutionInput::new(&mut vm);
        let key = trace::Key::dummy();
        let mut list = TokenList::new(vec![
            Token::new_letter('a', key),
            Token::new_letter('b', key),
            Token::new_letter('c', key),
        ]);
        input
            .with_stack(&mut list, |input| {
                input.next()?;
                Ok(())
            })
            .unwrap();
        assert_eq!(chars(&list.tokens), "bc");
    }

    #[test]
    fn with_stack_releases_region_on_error() {
        let mut vm = new_vm("x");
        let input = ExecutionInput::new(&mut vm);
        let key = trace::Key::dummy();
        let mut list = TokenList::new(vec![Token::new_letter('a', key)]);
        let result: txl::Result<()> = input.with_stack(&mut list, |input| {
            let token = input.next_or_err("testing")?;
            input.next_or_err("testing")?;
            Err(input.fatal_error(error::SimpleTokenError::new(token, "unreachable")))
        });
        assert_eq!(result.unwrap_err().kind(), error::Kind::EndOfInput);
        assert_eq!(input.next().unwrap().and_then(|t| t.char()), Some('x'));
    }

    #[test]
    fn cancellation() {
        let mut vm = new_vm("abc");
        let token = CancellationToken::new();
        vm.cancellation = Some(token.clone());
        let input = ExecutionInput::new(&mut vm);
        assert!(input.next().unwrap().is_some());
        token.cancel();
        let err = input.next().unwrap_err();
        assert_eq!(err.kind(), error::Kind::Cancelled);
    }

    struct CancelAfterGroups {
        cancellation: CancellationToken,
        remaining: usize,
        open: usize,
    }

    impl Listener for CancelAfterGroups {
        fn begin_group(&mut self, _: &Group) {
            self.open += 1;
            self.remaining = self.remaining.saturating_sub(1);
            if self.remaining == 0 {
                self.cancellation.cancel();
            }
        }

        fn end_group(&mut self, _: &Group) {
            self.open = self.open.saturating_sub(1);
        }
    }

    #[test]
    fn cancellation_from_listener_closes_groups() {
        let mut vm = VM::<State>::new(HashMap::new());
        let cancellation = CancellationToken::new();
        vm.cancellation = Some(cancellation.clone());
        let listener = Rc::new(RefCell::new(CancelAfterGroups {
            cancellation,
            remaining: 2,
            open: 0,
        }));
        vm.set_listener(listener.clone());
        let err = vm
            .parse::<DefaultHandlers>(trace::Origin::String("test".into()), "{a{b{c}}}".into())
            .unwrap_err();
        assert_eq!(err.kind(), error::Kind::Cancelled);
        assert!(vm.groups().is_empty());
        assert_eq!(listener.borrow().open, 0);
        assert_eq!(listener.borrow().remaining, 0);
    }

    #[test]
    fn unbalanced_group_at_end_of_input() {
        let mut vm = VM::<State>::new(HashMap::new());
        let err = vm
            .parse::<DefaultHandlers>(trace::Origin::String("test".into()), "a{b".into())
            .unwrap_err();
        assert_eq!(err.kind(), error::Kind::EndOfInput);
        assert!(vm.groups().is_empty());
    }

    #[test]
    fn extra_end_group() {
        let mut vm = VM::<State>::new(HashMap::new());
        let err = vm
            .parse::<DefaultHandlers>(trace::Origin::String("test".into()), "a}".into())
            .unwrap_err();
        assert_eq!(err.kind(), error::Kind::UnbalancedGroup);
    }

    #[test]
    fn math_groups() {
        let mut vm = VM::<State>::new(HashMap::new());
        vm.parse::<DefaultHandlers>(trace::Origin::String("test".into()), "$a$ $$b$$".into())
            .unwrap();
        let err = vm
            .parse::<DefaultHandlers>(trace::Origin::String("test".into()), "$$a$".into())
            .unwrap_err();
        assert_eq!(err.kind(), error::Kind::UnbalancedGroup);
        assert_eq!(vm.settings().mode, Mode::Text);
    }
}
