//! Commands and the command registry
//!
//! A command is what a control sequence or active character resolves to.
//! Control sequence tokens only hold a reference (an interned name);
//!     the command is looked up in the [Map] each time the reference is resolved,
//!     so the same name can mean different things at different points of the input.
//!
//! ## Expansion vs execution
//!
//! |                                          | Expansion | Execution
//! |------------------------------------------|-----------|-----------
//! Can read tokens from the input?            | Yes       | Yes
//! Can add tokens to the input?               | Yes       | Rarely
//! Can change the state?                      | No        | Yes
//! Runs when tokens are only being expanded, like in `\edef` | Yes | No
//!
//! Macros are expansion commands defined in the input itself, with `\def` and friends.

use crate::prelude as txl;
use crate::texmacro;
use crate::token;
use crate::variable;
use crate::vm;
use std::num;
use std::rc;
use std::sync::atomic;

pub(crate) mod map;

pub use map::Map;

/// The Rust type of expansion primitive functions.
pub type ExpansionFn<S> =
    fn(token: token::Token, input: &mut vm::ExpansionInput<S>) -> txl::Result<()>;

/// The Rust type of execution primitive functions.
pub type ExecutionFn<S> =
    fn(token: token::Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()>;

/// A command.
pub enum Command<S> {
    /// An expansion primitive that is implemented in the engine.
    ///
    /// Examples: `\the`, `\ifnum`.
    Expansion(ExpansionFn<S>, Option<Tag>),

    /// A user defined macro.
    Macro(rc::Rc<texmacro::Macro>),

    /// A non-expansion primitive that performs operations on the state.
    ///
    /// Examples: `\def`, `\par`.
    Execution(ExecutionFn<S>, Option<Tag>),

    /// A command that is used to reference a variable, like a register.
    ///
    /// Examples: `\count`, `\catcode`.
    Variable(rc::Rc<variable::Command<S>>),

    /// A command that aliases a character token.
    ///
    /// Created using `\let\cmd=<character>`.
    CharacterTokenAlias(token::Value),

    /// The command of a name with no definition.
    ///
    /// Looking up a name never fails; names without a definition resolve to this.
    /// `\let\a\undefinedname` makes `\a` undefined too.
    Undefined,
}

impl<S> std::fmt::Display for Command<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Expansion(_, _) => write![f, "an expansion command"],
            Command::Macro(_) => write![f, "a user-defined macro"],
            Command::Execution(_, _) => write![f, "an execution command"],
            Command::Variable(_) => write![f, "a variable command"],
            Command::CharacterTokenAlias(_) => write![f, "a character token alias"],
            Command::Undefined => write![f, "an undefined command"],
        }
    }
}

impl<S> Command<S> {
    /// Gets the tag associated to this command, or [None] if the command has no tag.
    pub fn tag(&self) -> Option<Tag> {
        match self {
            Command::Expansion(_, tag) => *tag,
            Command::Execution(_, tag) => *tag,
            Command::Macro(_)
            | Command::Variable(_)
            | Command::CharacterTokenAlias(_)
            | Command::Undefined => None,
        }
    }

    /// Whether the command is expandable: a macro or an expansion primitive.
    pub fn can_expand(&self) -> bool {
        matches!(self, Command::Expansion(_, _) | Command::Macro(_))
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, Command::Undefined)
    }

    /// Whether two commands have the same meaning, in the sense of `\ifx`.
    ///
    /// Primitives are equal if they are the same primitive.
    /// Macros are equal if they have the same parameters, replacement text and flags.
    pub fn meaning_eq(&self, other: &Command<S>) -> bool {
        match (self, other) {
            (Command::Expansion(a, t_a), Command::Expansion(b, t_b)) => {
                *a as usize == *b as usize && t_a == t_b
            }
            (Command::Execution(a, t_a), Command::Execution(b, t_b)) => {
                *a as usize == *b as usize && t_a == t_b
            }
            (Command::Macro(a), Command::Macro(b)) => a == b,
            (Command::Variable(a), Command::Variable(b)) => {
                rc::Rc::ptr_eq(a, b) || a.refers_to_same_variable(b)
            }
            (Command::CharacterTokenAlias(a), Command::CharacterTokenAlias(b)) => a == b,
            (Command::Undefined, Command::Undefined) => true,
            _ => false,
        }
    }
}

/// A built-in command. This is a command provided at VM initialization.
///
/// This struct is simply a combination of a [Command] and a documentation string for the command.
pub struct BuiltIn<S> {
    cmd: Command<S>,
    doc: Option<&'static str>,
}

impl<S> BuiltIn<S> {
    /// Create a new expansion built-in command.
    pub fn new_expansion(t: ExpansionFn<S>) -> BuiltIn<S> {
        t.into()
    }

    /// Create a new execution built-in command.
    pub fn new_execution(t: ExecutionFn<S>) -> BuiltIn<S> {
        t.into()
    }

    /// Create a new variable built-in command.
    pub fn new_variable(cmd: variable::Command<S>) -> BuiltIn<S> {
        Command::Variable(rc::Rc::new(cmd)).into()
    }

    /// Set the tag for this built-in command.
    ///
    /// Only expansion and execution commands carry tags; for other commands this does nothing.
    pub fn with_tag(mut self, tag: Tag) -> BuiltIn<S> {
        match &mut self.cmd {
            Command::Expansion(_, t) => *t = Some(tag),
            Command::Execution(_, t) => *t = Some(tag),
            Command::Macro(_)
            | Command::Variable(_)
            | Command::CharacterTokenAlias(_)
            | Command::Undefined => {}
        }
        self
    }

    /// Set the doc for this built-in command.
    pub fn with_doc(mut self, doc: &'static str) -> BuiltIn<S> {
        self.doc = Some(doc);
        self
    }

    pub fn cmd(&self) -> &Command<S> {
        &self.cmd
    }

    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }
}

// We need to implement Clone manually as the derived implementation requires S to be Clone.
impl<S> Clone for Command<S> {
    fn clone(&self) -> Self {
        match self {
            Command::Expansion(e, t) => Command::Expansion::<S>(*e, *t),
            Command::Macro(m) => Command::Macro(m.clone()),
            Command::Execution(e, t) => Command::Execution(*e, *t),
            Command::Variable(v) => Command::Variable(v.clone()),
            Command::CharacterTokenAlias(tv) => Command::CharacterTokenAlias(*tv),
            Command::Undefined => Command::Undefined,
        }
    }
}

impl<S> Clone for BuiltIn<S> {
    fn clone(&self) -> Self {
        Self {
            cmd: self.cmd.clone(),
            doc: self.doc,
        }
    }
}

impl<S> From<ExpansionFn<S>> for BuiltIn<S> {
    fn from(cmd: ExpansionFn<S>) -> Self {
        Command::Expansion(cmd, None).into()
    }
}

impl<S> From<rc::Rc<texmacro::Macro>> for BuiltIn<S> {
    fn from(cmd: rc::Rc<texmacro::Macro>) -> Self {
        Command::Macro(cmd).into()
    }
}

impl<S> From<ExecutionFn<S>> for BuiltIn<S> {
    fn from(cmd: ExecutionFn<S>) -> Self {
        Command::Execution(cmd, None).into()
    }
}

impl<S> From<variable::Command<S>> for BuiltIn<S> {
    fn from(cmd: variable::Command<S>) -> Self {
        Command::Variable(rc::Rc::new(cmd)).into()
    }
}

impl<S> From<Command<S>> for BuiltIn<S> {
    fn from(cmd: Command<S>) -> Self {
        BuiltIn { cmd, doc: None }
    }
}

/// A tag is a piece of metadata that is optionally attached to a command.
///
/// Tags let a command recognize other commands in the input without running them.
/// When a conditional is false, `\iftrue` must skip tokens until it finds the
///     matching `\else` or `\fi`, without expanding anything in between.
/// The skipping loop resolves each control sequence it passes and compares the
///     command's tag with the tags of `\else`, `\fi` and the other conditionals.
/// Comparing tags rather than names means `\let\myfi\fi` works as expected.
///
/// Tags are non-zero 32 bit integers handed out by a global counter,
///     so `Option<Tag>` takes up 4 bytes.
#[derive(PartialEq, Eq, Clone, Copy, Debug, PartialOrd, Ord, Hash)]
pub struct Tag(num::NonZeroU32);

static NEXT_TAG_VALUE: atomic::AtomicU32 = atomic::AtomicU32::new(1);

impl Tag {
    /// Creates a new unique tag.
    ///
    /// ```
    /// # use texparser::command::Tag;
    /// let tag_1 = Tag::new();
    /// let tag_2 = Tag::new();
    /// assert_ne!(tag_1, tag_2);
    /// ```
    #[allow(clippy::new_without_default)]
    pub fn new() -> Tag {
        let n = NEXT_TAG_VALUE.fetch_add(1, atomic::Ordering::Relaxed);
        match num::NonZeroU32::new(n) {
            Some(n) => Tag(n),
            None => panic!("all command tags have been used"),
        }
    }
}

/// A static tag enables creating a tag in a static variable.
///
/// ```
/// # use texparser::command::StaticTag;
/// static TAG: StaticTag = StaticTag::new();
///
/// assert_eq!(TAG.get(), TAG.get());
/// ```
pub struct StaticTag(std::sync::OnceLock<Tag>);

impl Default for StaticTag {
    fn default() -> Self {
        StaticTag::new()
    }
}

impl StaticTag {
    pub const fn new() -> StaticTag {
        StaticTag(std::sync::OnceLock::new())
    }

    /// Get the actual [Tag] out of this [StaticTag].
    /// Repeated calls to this function return the same tag.
    pub fn get(&self) -> Tag {
        *self.0.get_or_init(Tag::new)
    }
}
