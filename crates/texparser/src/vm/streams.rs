use super::{ParserState, Source, SourceKind};
use crate::command;
use crate::error;
use crate::object::{Group, GroupKind, TokenList};
use crate::prelude as txl;
use crate::settings::Settings;
use crate::token;
use crate::token::lexer;
use crate::token::trace;
use crate::token::Token;
use crate::variable;
use crate::vm;

/// A stream of tokens generated on demand.
///
/// This trait describes a general stream of tokens where the front of the stream may
/// retrieved using [TokenStream::next] or peeked at using [TokenStream::peek].
/// In practice, all [TokenStreams](TokenStream) in this crate
/// are either [ExecutionInput], [ExpansionInput], [ExpandedStream] or [UnexpandedStream].
/// This trait exists to allow a generic function to accept any of these types.
///
/// # Note on lazy loading
///
/// The simplest example of a stream is a vector of tokens. However, streams are more general
/// than this and can encompass situations in which the full contents cannot be determined in
/// advance. The classic example of this comes from the following LaTeX snippet:
/// ```tex
/// \makeatletter \do@
/// ```
/// Assuming the default catcode map, if we were to tokenize this input all at once we would
/// get three tokens: the control sequence `makeatletter`, the control sequence `do`, and a
/// single character token with value `@` and catcode "other". This is not the correct result:
/// the first control sequence changes the tokenization rules such that `@` is now
/// an admissible character in the name of a control sequence. The correct input is
/// the control sequence `makeatletter` followed by the control sequence `do@`.
pub trait TokenStream {
    /// The type of the custom state in the VM.
    type S: ParserState;

    /// Gets the next token in the stream.
    ///
    /// This method is almost the same
    /// as the `next` method in Rust's iterator trait, except a stream can return an error.
    ///
    /// As with iterators, a result of `Ok(None)` indicates that the stream is exhausted.
    fn next(&mut self) -> txl::Result<Option<Token>>;

    /// Puts a token back at the front of the stream, so that it is the next token returned.
    fn back(&mut self, token: Token);

    /// Returns a reference to the VM.
    fn vm(&self) -> &vm::VM<Self::S>;

    /// Peeks at the next token in the stream without removing it.
    ///
    /// In many situations it is necessary to examine the next token without consuming it.
    /// For example when reading an integer from a stream, one needs to peek at the next token
    /// to see if it is a digit and thus extends the currently parsed integer.
    ///
    /// On an expanded stream peeking performs expansion:
    ///     the next token in the stream may need to be expanded rather than returned.
    /// This mutation is irreversible.
    fn peek(&mut self) -> txl::Result<Option<Token>> {
        let token = self.next()?;
        if let Some(token) = token {
            self.back(token);
        }
        Ok(token)
    }

    /// Consumes the next token in the stream without returning it.
    ///
    /// This method is mostly to make code self-documenting. It is typically used in
    /// situations where a peek has already occurred, and the token itself is not needed.
    fn consume(&mut self) -> txl::Result<()> {
        self.next().map(|_| ())
    }

    /// Gets the next token, or returns an end of input error if the stream is exhausted.
    fn next_or_err<E: error::EndOfInputError>(&mut self, err: E) -> txl::Result<Token> {
        match self.next()? {
            Some(token) => Ok(token),
            None => Err(error::Error::new(self.vm(), error::EofError::new(err))),
        }
    }

    /// Returns a reference to the commands map.
    #[inline]
    fn commands_map(&self) -> &command::Map<Self::S> {
        &self.vm().commands_map
    }

    /// Returns a reference to the custom state.
    #[inline]
    fn state(&self) -> &Self::S {
        &self.vm().state
    }

    fn trace(&self, token: Token) -> trace::SourceCodeTrace {
        self.vm().trace(token)
    }

    fn trace_end_of_input(&self) -> trace::SourceCodeTrace {
        self.vm().trace_end_of_input()
    }

    /// Reports a recoverable error.
    ///
    /// The error is passed to [ParserState::recoverable_error_hook],
    ///     which decides whether it is fatal.
    fn error<E: error::TexError>(&self, err: E) -> txl::Result<()> {
        let err = error::Error::new(self.vm(), err);
        Self::S::recoverable_error_hook(self.vm(), err)
    }

    /// Builds a fatal error.
    fn fatal_error<E: error::TexError>(&self, err: E) -> Box<error::Error> {
        error::Error::new(self.vm(), err)
    }
}

/// Stream that returns input tokens without performing expansion.
///
/// The unexpanded stream is used when reading tokens without performing expansion;
/// e.g., when reading the replacement text for a macro defined using `\def`.
///
/// It be obtained from the other streams using their `unexpanded` methods.
#[repr(transparent)]
pub struct UnexpandedStream<S>(vm::VM<S>);

impl<S: ParserState> TokenStream for UnexpandedStream<S> {
    type S = S;

    #[inline]
    fn next(&mut self) -> txl::Result<Option<Token>> {
        next_unexpanded(&mut self.0)
    }

    #[inline]
    fn back(&mut self, token: Token) {
        self.0.internal.push_back(token)
    }

    #[inline]
    fn vm(&self) -> &vm::VM<S> {
        &self.0
    }
}

/// A [TokenStream] that performs expansion.
///
/// The unexpanded tokens are retrieved from the unexpanded stream returned by the
/// [unexpanded](ExpandedStream::unexpanded) method.
#[repr(transparent)]
pub struct ExpandedStream<S>(UnexpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExpandedStream<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        self
    }
}

impl<S: ParserState> TokenStream for ExpandedStream<S> {
    type S = S;

    #[inline]
    fn next(&mut self) -> txl::Result<Option<Token>> {
        next_expanded(&mut self.0 .0)
    }

    #[inline]
    fn back(&mut self, token: Token) {
        self.0.back(token)
    }

    #[inline]
    fn vm(&self) -> &vm::VM<S> {
        &self.0 .0
    }
}

impl<S> ExpandedStream<S> {
    /// Returns the underlying unexpanded stream.
    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0
    }

    /// Returns the expanded tokens stack for the current input source.
    ///
    /// The tokens are a stack, so the next token is the last token in the slice.
    #[inline]
    pub fn expansions(&self) -> &[Token] {
        self.0 .0.internal.expansions()
    }

    /// Returns a mutable reference to the expanded tokens stack for the current input source.
    ///
    /// The tokens are a stack, so the next token is the last token in the vector.
    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        self.0 .0.internal.expansions_mut()
    }

    /// Push tokens to the front of the input stream.
    ///
    /// The first token in the provided slice will be the next token read.
    #[inline]
    pub fn push_expansion(&mut self, expansion: &[Token]) {
        self.0 .0.internal.push_expansion(expansion)
    }

    /// Returns a vector than can be used as a token buffer, potentially without allocating memory.
    ///
    /// The returned vector is empty, but will generally have non-zero capacity from previous uses of the buffer.
    /// When finished with the buffer, return it using [return_token_buffer](ExpandedStream::return_token_buffer).
    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0 .0.internal.token_buffers.pop().unwrap_or_default().0
    }

    /// Return a token buffer, allowing it to be reused.
    pub fn return_token_buffer(&mut self, mut token_buffer: Vec<Token>) {
        token_buffer.clear();
        self.0
             .0
            .internal
            .token_buffers
            .push(super::TokenBuffer(token_buffer))
    }

    #[inline]
    pub(crate) fn vm_mut(&mut self) -> &mut vm::VM<S> {
        &mut self.0 .0
    }
}

impl<S: ParserState> ExpandedStream<S> {
    /// Expand the next token in the input.
    ///
    /// This method only expands a single token. If, after the expansion, the next token
    /// is expandable it will not be expanded.
    /// Returns whether an expansion happened.
    pub fn expand_once(&mut self) -> txl::Result<bool> {
        let vm = &mut self.0 .0;
        let token = match next_unexpanded(vm)? {
            None => return Ok(false),
            Some(token) => token,
        };
        if !vm.internal.expansion_enabled() || !vm::can_expand(token, &vm.commands_map) {
            vm.internal.push_back(token);
            return Ok(false);
        }
        if let Some(override_token) = expand_command(vm, token)? {
            vm.internal.push_back(override_token);
        }
        Ok(true)
    }

    /// Runs `f` with the token list as the only input.
    ///
    /// Inside `f` the stream reads the list's tokens and then reports the end of the input;
    ///     it never reads past the list into the enclosing input.
    /// Tokens `f` does not consume are left in the list, whether or not `f` succeeds.
    /// If the list is in [crate::object::Mode::List] its tokens are returned without expansion.
    pub fn with_stack<T, F>(&mut self, list: &mut TokenList, f: F) -> txl::Result<T>
    where
        F: FnOnce(&mut ExpandedStream<S>) -> txl::Result<T>,
    {
        with_stack(&mut self.0 .0, list, |vm| f(ExpansionInput::new(vm).expanded()))
    }
}

/// Input type for expansion primitives.
///
/// This type provides:
///
/// - Access to the input stream (with or without expansion). Its implementation of the [TokenStream]
///     trait returns expanded tokens.
///     To read the input stream without performing expansion, use the
///     [unexpanded](ExpansionInput::unexpanded) method.
///
/// - Read only access to the VM, except for [ExpansionInput::state_mut].
///
/// - The ability to push source code or token expansions to the front of the input stream.
///     For source code use [ExpansionInput::push_source];
///     for tokens use [ExpansionInput::push_expansion] or [ExpansionInput::expansions_mut].
///
/// - Access to token buffers using the [ExpansionInput::checkout_token_buffer] and
///     [ExpansionInput::return_token_buffer] methods.
#[repr(transparent)]
pub struct ExpansionInput<S>(ExpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExpansionInput<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }
}

impl<S: ParserState> TokenStream for ExpansionInput<S> {
    type S = S;

    fn next(&mut self) -> txl::Result<Option<Token>> {
        self.0.next()
    }

    fn back(&mut self, token: Token) {
        self.0.back(token)
    }

    fn vm(&self) -> &vm::VM<Self::S> {
        self.0.vm()
    }
}

impl<S> ExpansionInput<S> {
    /// Creates a mutable reference to this type from the [VM](vm::VM) type.
    #[inline]
    pub fn new(vm: &mut vm::VM<S>) -> &mut ExpansionInput<S> {
        // The input types are transparent wrappers around the VM.
        unsafe { &mut *(vm as *mut vm::VM<S> as *mut ExpansionInput<S>) }
    }

    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0 .0
    }

    #[inline]
    pub fn expanded(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }

    /// Push tokens to the front of the input stream.
    ///
    /// The first token in the provided slice will be the next token read.
    #[inline]
    pub fn push_expansion(&mut self, expansion: &[Token]) {
        self.0.push_expansion(expansion)
    }

    /// Returns a reference to the expanded tokens stack for the current input source.
    ///
    /// The tokens are a stack, so the next token is the last token in the slice.
    #[inline]
    pub fn expansions(&self) -> &[Token] {
        self.0.expansions()
    }

    /// Returns a mutable reference to the expanded tokens stack for the current input source.
    ///
    /// Adding tokens to the front of the input using this method can be more efficient
    /// than using [ExpansionInput::push_expansion] because an allocation is avoided.
    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        self.0.expansions_mut()
    }

    /// Returns a vector than can be used as a token buffer, potentially without allocating memory.
    ///
    /// Token buffers are used in macro expansion, and at any point in time multiple macros may be in
    ///     the process of expansion, so each caller checks out its own buffer.
    /// When finished with the buffer, return it using [return_token_buffer](ExpansionInput::return_token_buffer).
    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0.checkout_token_buffer()
    }

    /// Return a token buffer, allowing it to be reused.
    pub fn return_token_buffer(&mut self, token_buffer: Vec<Token>) {
        self.0.return_token_buffer(token_buffer)
    }

    /// Returns a mutable reference to the state.
    ///
    /// Expansion primitives use this for bookkeeping that is invisible to assignments,
    ///     like the stack of open conditional branches.
    #[inline]
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.0 .0 .0.state
    }

    #[inline]
    pub fn cs_name_interner_mut(&mut self) -> &mut token::CsNameInterner {
        &mut self.0 .0 .0.internal.cs_name_interner
    }

    /// Returns a mutable reference to the commands map.
    ///
    /// Few expansion primitives define commands; `\csname` is the main example.
    #[inline]
    pub fn commands_map_mut(&mut self) -> &mut command::Map<S> {
        &mut self.0 .0 .0.commands_map
    }

    #[inline]
    pub(crate) fn vm_mut(&mut self) -> &mut vm::VM<S> {
        &mut self.0 .0 .0
    }
}

impl<S: ParserState> ExpansionInput<S> {
    /// Push source code to the front of the input stream.
    ///
    /// This is used by the `\input` primitive.
    pub fn push_source(
        &mut self,
        token: Token,
        origin: trace::Origin,
        source_code: String,
    ) -> txl::Result<()> {
        let vm = &mut self.0 .0 .0;
        if vm.internal.num_files() >= vm.config.max_input_depth {
            return Err(error::Error::new(
                vm,
                error::NonTerminationError {
                    token: Some(token),
                    limit_name: "input depth",
                    limit: vm.config.max_input_depth,
                },
            ));
        }
        let retain_comments = vm.config.retain_comments;
        vm.internal
            .push_source(origin, source_code, retain_comments);
        Ok(())
    }

    /// End the current file.
    ///
    /// This method is used by `\endinput` primitive.
    pub fn end_current_file(&mut self) {
        self.0 .0 .0.internal.end_current_file()
    }

    /// Runs `f` with the token list as the only input.
    ///
    /// See [ExpandedStream::with_stack].
    pub fn with_stack<T, F>(&mut self, list: &mut TokenList, f: F) -> txl::Result<T>
    where
        F: FnOnce(&mut ExpansionInput<S>) -> txl::Result<T>,
    {
        with_stack(&mut self.0 .0 .0, list, |vm| f(ExpansionInput::new(vm)))
    }
}

/// Input type for execution primitives.
///
/// This type provides:
///
/// - Access to the input stream (with or without expansion). Its implementation of the [TokenStream]
///     trait returns expanded tokens.
///     To read the input stream without performing expansion, use the
///     [unexpanded](ExecutionInput::unexpanded) method.
///
/// - Mutable access to the state, the commands map and the typographic settings
///     through the [ExecutionInput::state_mut], [ExecutionInput::commands_map_mut]
///     and [ExecutionInput::settings_mut] methods.
///
/// - The ability to begin and end groups.
#[repr(transparent)]
pub struct ExecutionInput<S>(ExpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExecutionInput<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }
}

impl<S: ParserState> TokenStream for ExecutionInput<S> {
    type S = S;

    fn next(&mut self) -> txl::Result<Option<Token>> {
        self.0.next()
    }

    fn back(&mut self, token: Token) {
        self.0.back(token)
    }

    fn vm(&self) -> &vm::VM<Self::S> {
        self.0.vm()
    }
}

impl<S> ExecutionInput<S> {
    /// Creates a mutable reference to this type from the [VM](vm::VM) type.
    #[inline]
    pub fn new(vm: &mut vm::VM<S>) -> &mut ExecutionInput<S> {
        // The input types are transparent wrappers around the VM.
        unsafe { &mut *(vm as *mut vm::VM<S> as *mut ExecutionInput<S>) }
    }

    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0 .0
    }

    #[inline]
    pub fn expanded(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }

    #[inline]
    pub fn commands_map_mut(&mut self) -> &mut command::Map<S> {
        &mut self.0 .0 .0.commands_map
    }

    /// Returns a mutable reference to the state.
    #[inline]
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.0 .0 .0.state
    }

    #[inline]
    pub fn cs_name_interner_mut(&mut self) -> &mut token::CsNameInterner {
        &mut self.0 .0 .0.internal.cs_name_interner
    }

    /// Returns a mutable reference to the typographic settings of the current group.
    ///
    /// Changes are undone when the current group ends.
    #[inline]
    pub fn settings_mut(&mut self) -> &mut Settings {
        self.0 .0 .0.internal.settings_mut()
    }

    /// The groups that are currently open, outermost first.
    #[inline]
    pub fn groups(&self) -> &[Group] {
        &self.0 .0 .0.internal.groups
    }

    /// Begins a group.
    ///
    /// Local assignments made after this are undone when the group ends.
    pub fn begin_group(&mut self, kind: GroupKind, token: Token) {
        self.0 .0 .0.begin_group(kind, token)
    }

    /// Ends the innermost group, which must be of the given kind.
    pub fn end_group(&mut self, kind: GroupKind, token: Token) -> txl::Result<()> {
        self.0 .0 .0.end_group(kind, token)
    }

    /// Push tokens to the front of the input stream.
    ///
    /// The first token in the provided slice will be the next token read.
    #[inline]
    pub fn push_expansion(&mut self, expansion: &[Token]) {
        self.0.push_expansion(expansion)
    }

    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0.checkout_token_buffer()
    }

    /// Return a token buffer, allowing it to be reused.
    pub fn return_token_buffer(&mut self, token_buffer: Vec<Token>) {
        self.0.return_token_buffer(token_buffer)
    }

    #[inline]
    pub(crate) fn save_stack_mut(&mut self) -> &mut Vec<variable::SaveStackElement<S>> {
        &mut self.0 .0 .0.internal.save_stack
    }

    #[inline]
    pub(crate) fn vm_mut(&mut self) -> &mut vm::VM<S> {
        &mut self.0 .0 .0
    }
}

impl<S: ParserState> ExecutionInput<S> {
    /// Runs `f` with the token list as the only input.
    ///
    /// See [ExpandedStream::with_stack].
    pub fn with_stack<T, F>(&mut self, list: &mut TokenList, f: F) -> txl::Result<T>
    where
        F: FnOnce(&mut ExecutionInput<S>) -> txl::Result<T>,
    {
        with_stack(&mut self.0 .0 .0, list, |vm| f(ExecutionInput::new(vm)))
    }
}

fn with_stack<S, T, F>(vm: &mut vm::VM<S>, list: &mut TokenList, f: F) -> txl::Result<T>
where
    F: FnOnce(&mut vm::VM<S>) -> txl::Result<T>,
{
    if vm.internal.expansion_depth >= vm.config.max_expansion_depth {
        return Err(error::Error::new(
            vm,
            error::NonTerminationError {
                token: list.tokens.first().copied(),
                limit_name: "expansion depth",
                limit: vm.config.max_expansion_depth,
            },
        ));
    }
    vm.internal.expansion_depth += 1;
    let mut expansions = std::mem::take(&mut list.tokens);
    expansions.reverse();
    vm.internal.sources.push(Source {
        expansions,
        kind: SourceKind::Region(list.mode),
    });
    let region = vm.internal.sources.len() - 1;

    let result = f(vm);

    let mut leftovers = vec![];
    while vm.internal.sources.len() > region {
        if let Some(source) = vm.internal.sources.pop() {
            leftovers.push(source.expansions);
        }
    }
    list.tokens = leftovers
        .into_iter()
        .flat_map(|expansions| expansions.into_iter().rev())
        .collect();
    vm.internal.expansion_depth = vm.internal.expansion_depth.saturating_sub(1);
    result
}

pub(super) fn next_unexpanded<S: ParserState>(vm: &mut vm::VM<S>) -> txl::Result<Option<Token>> {
    if let Some(cancellation) = &vm.cancellation {
        if cancellation.is_cancelled() {
            return Err(error::Error::new(vm, error::CancelledError { token: None }));
        }
    }
    let mut i = vm.internal.sources.len();
    while i > 0 {
        i -= 1;
        let vm::Internal {
            sources,
            cs_name_interner,
            ..
        } = &mut vm.internal;
        let source = &mut sources[i];
        if let Some(token) = source.expansions.pop() {
            return Ok(Some(token));
        }
        let lexer = match &mut source.kind {
            SourceKind::Region(_) => return Ok(None),
            SourceKind::Tokens | SourceKind::Capture => continue,
            SourceKind::File(lexer) => lexer,
        };
        let state = &vm.state;
        let result = lexer.next(|c| state.cat_code(c), cs_name_interner);
        if vm.config.retain_comments {
            let comments = lexer.take_comments();
            let mut listener = vm.listener.borrow_mut();
            for comment in &comments {
                listener.skipping(comment);
            }
        }
        match result {
            Ok(Some(token)) => return Ok(Some(token)),
            Ok(None) => {
                if i + 1 == vm.internal.sources.len() && i > 0 {
                    vm.internal.sources.pop();
                }
            }
            Err(err) => return Err(lexer_error(vm, err)),
        }
    }
    Ok(None)
}

fn lexer_error<S>(vm: &vm::VM<S>, err: lexer::Error) -> Box<error::Error> {
    match err {
        lexer::Error::InvalidCharacter(c, key) => error::Error::new(
            vm,
            error::SimpleTokenError::new(
                Token::new_other(c, key),
                format!["invalid character {c:?}"],
            )
            .with_note("this character has category code 15 (invalid) and cannot appear in the input"),
        ),
        lexer::Error::EmptyControlSequence(key) => error::Error::new(
            vm,
            error::SimpleTokenError::new(
                Token::new_other('\\', key),
                "the input ended in the middle of a control sequence name",
            )
            .with_kind(error::Kind::EndOfInput),
        ),
    }
}

pub(super) fn next_expanded<S: ParserState>(vm: &mut vm::VM<S>) -> txl::Result<Option<Token>> {
    loop {
        let token = match next_unexpanded(vm)? {
            None => return Ok(None),
            Some(token) => token,
        };
        let command_ref = match token.value() {
            token::Value::CommandRef(command_ref) => command_ref,
            _ => return Ok(Some(token)),
        };
        if !vm.internal.expansion_enabled() {
            return Ok(Some(token));
        }
        match vm.commands_map.get_command(&command_ref) {
            command::Command::Expansion(_, _) => {}
            command::Command::Macro(m) if !(m.is_protected() && vm.internal.suppress_protected > 0) => {}
            _ => return Ok(Some(token)),
        }
        if let Some(override_token) = expand_command(vm, token)? {
            return Ok(Some(override_token));
        }
    }
}

/// Expands the command the token refers to.
///
/// If an override hook supplies the expansion, the returned token is that expansion
///     and must not be expanded again.
pub(super) fn expand_command<S: ParserState>(
    vm: &mut vm::VM<S>,
    token: Token,
) -> txl::Result<Option<Token>> {
    let command_ref = match token.command_ref() {
        None => return Ok(None),
        Some(command_ref) => command_ref,
    };
    vm.internal.expansions_performed += 1;
    if vm.internal.expansions_performed > vm.config.max_expansions {
        return Err(error::Error::new(
            vm,
            error::NonTerminationError {
                token: Some(token),
                limit_name: "expansion count",
                limit: vm.config.max_expansions,
            },
        ));
    }
    match vm.commands_map.get_command(&command_ref).clone() {
        command::Command::Expansion(f, tag) => {
            if vm.internal.expansion_depth >= vm.config.max_expansion_depth {
                return Err(error::Error::new(
                    vm,
                    error::NonTerminationError {
                        token: Some(token),
                        limit_name: "expansion depth",
                        limit: vm.config.max_expansion_depth,
                    },
                ));
            }
            vm.internal.expansion_depth += 1;
            let result = run_expansion_primitive(vm, token, f, tag);
            vm.internal.expansion_depth = vm.internal.expansion_depth.saturating_sub(1);
            result.map_err(|err| err.propagate(vm, error::OperationKind::Expansion, token))
        }
        command::Command::Macro(m) => {
            m.call(token, ExpansionInput::new(vm))
                .map_err(|err| err.propagate(vm, error::OperationKind::Expansion, token))?;
            Ok(None)
        }
        _ => Ok(None),
    }
}

fn run_expansion_primitive<S: ParserState>(
    vm: &mut vm::VM<S>,
    token: Token,
    f: command::ExpansionFn<S>,
    tag: Option<command::Tag>,
) -> txl::Result<Option<Token>> {
    if let Some(override_token) = S::expansion_override_hook(token, ExpansionInput::new(vm), tag)? {
        return Ok(Some(override_token));
    }
    f(token, ExpansionInput::new(vm))?;
    Ok(None)
}
