//! The `\global`, `\long` and `\protected` prefix commands
//!
//! A prefix changes the behavior of the command that follows it.
//! `\global` makes an assignment survive every enclosing group;
//!     `\long` lets a macro's arguments contain `\par`;
//!     `\protected` keeps a macro from expanding inside `\edef` and other full expansions.
//!
//! # Developer notes
//!
//! Prefixes are stored as flags in a [Component].
//! A prefix command reads any further prefixes, checks that the next command accepts them,
//!     and then sets the flags.
//! The command that follows reads each flag it cares about exactly once with
//!     [Component::take_global], [Component::take_long] or [Component::take_protected],
//!     which also resets it.
//! It is essential that every code path of a command that accepts `\global` calls
//!     [take_global](Component::take_global), even if it ignores the result;
//!     otherwise the flag leaks into the next assignment.
//!
//! Which commands accept which prefixes is decided by the commands' tags.

use crate::{alias, conditional, def, math, registers};
use std::collections::HashSet;
use texparser::prelude as txl;
use texparser::token::Value;
use texparser::traits::*;
use texparser::*;
use texparser_stdext::collections::scopedmap::Scope;

pub const GLOBAL_DOC: &str = "Make the next assignment global";
pub const LONG_DOC: &str = "Allow the arguments of the next macro to contain \\par";
pub const PROTECTED_DOC: &str = "Keep the next macro from expanding inside \\edef";

/// Component for the prefix commands.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    global: bool,
    long: bool,
    protected: bool,
    #[cfg_attr(feature = "serde", serde(skip, default = "prefixable_with_global"))]
    prefixable_with_global: HashSet<command::Tag>,
    #[cfg_attr(feature = "serde", serde(skip, default = "prefixable_with_any"))]
    prefixable_with_any: HashSet<command::Tag>,
}

fn prefixable_with_global() -> HashSet<command::Tag> {
    HashSet::from([
        alias::let_tag(),
        conditional::newif_tag(),
        math::math_tag(),
        registers::registerdef_tag(),
    ])
}

fn prefixable_with_any() -> HashSet<command::Tag> {
    HashSet::from([def::def_tag()])
}

impl Default for Component {
    fn default() -> Self {
        Component {
            global: false,
            long: false,
            protected: false,
            prefixable_with_global: prefixable_with_global(),
            prefixable_with_any: prefixable_with_any(),
        }
    }
}

impl Component {
    /// Get the value of the global flag and reset the flag to false.
    ///
    /// See the module documentation for correct usage of this method.
    #[inline]
    pub fn take_global(&mut self) -> bool {
        std::mem::take(&mut self.global)
    }

    /// Get the value of the long flag and reset the flag to false.
    #[inline]
    pub fn take_long(&mut self) -> bool {
        std::mem::take(&mut self.long)
    }

    /// Get the value of the protected flag and reset the flag to false.
    #[inline]
    pub fn take_protected(&mut self) -> bool {
        std::mem::take(&mut self.protected)
    }

    /// Returns the scope of the next assignment, resetting the global flag.
    #[inline]
    pub fn take_scope(&mut self) -> Scope {
        if self.take_global() {
            Scope::Global
        } else {
            Scope::Local
        }
    }
}

/// Returns the scope of a variable assignment, as determined by a preceding `\global`.
#[inline]
pub fn variable_assignment_scope_hook<S: HasComponent<Component>>(state: &mut S) -> Scope {
    state.component_mut().take_scope()
}

#[derive(Default, Clone, Copy)]
struct Prefix {
    global: Option<token::Token>,
    long: Option<token::Token>,
    protected: Option<token::Token>,
}

impl Prefix {
    fn first_macro_only(&self) -> Option<token::Token> {
        self.long.or(self.protected)
    }

    fn any(&self) -> Option<token::Token> {
        self.global.or(self.first_macro_only())
    }
}

static GLOBAL_TAG: command::StaticTag = command::StaticTag::new();
static LONG_TAG: command::StaticTag = command::StaticTag::new();
static PROTECTED_TAG: command::StaticTag = command::StaticTag::new();

/// Get the `\global` command.
pub fn get_global<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(global_fn)
        .with_tag(GLOBAL_TAG.get())
        .with_doc(GLOBAL_DOC)
}

/// Get the `\long` command.
pub fn get_long<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(long_fn)
        .with_tag(LONG_TAG.get())
        .with_doc(LONG_DOC)
}

/// Get the `\protected` command.
pub fn get_protected<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(protected_fn)
        .with_tag(PROTECTED_TAG.get())
        .with_doc(PROTECTED_DOC)
}

fn global_fn<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    process_prefixes(
        Prefix {
            global: Some(token),
            ..Default::default()
        },
        input,
    )
}

fn long_fn<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    process_prefixes(
        Prefix {
            long: Some(token),
            ..Default::default()
        },
        input,
    )
}

fn protected_fn<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    process_prefixes(
        Prefix {
            protected: Some(token),
            ..Default::default()
        },
        input,
    )
}

fn process_prefixes<S: HasComponent<Component>>(
    mut prefix: Prefix,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let next = loop {
        let token = input.next_or_err("reading the command after a prefix")?;
        let tag = match token.value() {
            Value::Space(_) => continue,
            Value::CommandRef(command_ref) => input.commands_map().get_tag(&command_ref),
            _ => None,
        };
        if tag == Some(GLOBAL_TAG.get()) {
            prefix.global = Some(token);
        } else if tag == Some(LONG_TAG.get()) {
            prefix.long = Some(token);
        } else if tag == Some(PROTECTED_TAG.get()) {
            prefix.protected = Some(token);
        } else {
            break token;
        }
    };
    let command_ref = match next.value() {
        Value::CommandRef(command_ref) => command_ref,
        _ => {
            return Err(input.fatal_error(
                error::SimpleTokenError::new(next, "a character cannot be prefixed")
                    .with_note("prefixes apply to assignments and macro definitions"),
            ))
        }
    };
    let (accepts_global, accepts_any) = {
        let component = input.state().component();
        match input.commands_map().get_command(&command_ref) {
            command::Command::Variable(_) => (true, false),
            cmd => match cmd.tag() {
                Some(tag) => (
                    component.prefixable_with_global.contains(&tag)
                        || component.prefixable_with_any.contains(&tag),
                    component.prefixable_with_any.contains(&tag),
                ),
                None => (false, false),
            },
        }
    };
    let offending_prefix = if !accepts_global {
        prefix.any()
    } else if !accepts_any {
        prefix.first_macro_only()
    } else {
        None
    };
    if let Some(prefix_token) = offending_prefix {
        let prefix_name = match prefix_token.command_ref() {
            Some(command_ref) => command_ref.to_string(input.vm().cs_name_interner()),
            None => "the prefix".to_string(),
        };
        let name = command_ref.to_string(input.vm().cs_name_interner());
        return Err(input.fatal_error(
            error::SimpleTokenError::new(next, format!["{name} cannot be prefixed by {prefix_name}"])
                .with_note(r"\global applies to assignments and definitions")
                .with_note(r"\long and \protected apply only to \def, \gdef, \edef and \xdef"),
        ));
    }
    input.back(next);
    let component = input.state_mut().component_mut();
    component.global = prefix.global.is_some();
    component.long = prefix.long.is_some();
    component.protected = prefix.protected.is_some();
    Ok(())
}
