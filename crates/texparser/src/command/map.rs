//! The scoped registry of command definitions
//!
//! Bindings are held in a [ScopedMap] keyed by [token::CommandRef].
//! A local assignment binds the name in the innermost open group and is undone
//!     when that group ends; a global assignment survives every enclosing group.
//! Looking up a name that has no binding returns [Command::Undefined], never an error.

use super::{BuiltIn, Command, Tag};
use crate::texmacro;
use crate::token;
use crate::variable;
use std::collections::HashMap;
use std::rc::Rc;
use texparser_stdext::collections::scopedmap::{NoGroupToEndError, Scope, ScopedMap};

/// Map from command references to the commands they currently resolve to.
pub struct Map<S> {
    commands: ScopedMap<token::CommandRef, Command<S>>,
    built_ins: HashMap<token::CsName, BuiltIn<S>>,
    undefined: Command<S>,
}

impl<S> Map<S> {
    pub(crate) fn new(built_ins: HashMap<token::CsName, BuiltIn<S>>) -> Map<S> {
        let commands = built_ins
            .iter()
            .map(|(name, built_in)| {
                (
                    token::CommandRef::ControlSequence(*name),
                    built_in.cmd().clone(),
                )
            })
            .collect();
        Map {
            commands,
            built_ins,
            undefined: Command::Undefined,
        }
    }

    /// Returns the command the reference currently resolves to.
    #[inline]
    pub fn get_command(&self, command_ref: &token::CommandRef) -> &Command<S> {
        self.commands.get(command_ref).unwrap_or(&self.undefined)
    }

    /// Whether the reference currently resolves to a defined command.
    pub fn is_defined(&self, command_ref: &token::CommandRef) -> bool {
        self.get_command(command_ref).is_defined()
    }

    /// Returns the tag of the command the reference resolves to, if it has one.
    #[inline]
    pub fn get_tag(&self, command_ref: &token::CommandRef) -> Option<Tag> {
        self.get_command(command_ref).tag()
    }

    /// Returns the macro the reference resolves to, if it resolves to a macro.
    pub fn get_macro(&self, command_ref: &token::CommandRef) -> Option<&Rc<texmacro::Macro>> {
        match self.get_command(command_ref) {
            Command::Macro(m) => Some(m),
            _ => None,
        }
    }

    /// Binds the reference to the command.
    pub fn insert(&mut self, command_ref: token::CommandRef, command: Command<S>, scope: Scope) {
        self.commands.insert(command_ref, command, scope);
    }

    pub fn insert_macro(
        &mut self,
        command_ref: token::CommandRef,
        texmacro: texmacro::Macro,
        scope: Scope,
    ) {
        self.insert(command_ref, Command::Macro(Rc::new(texmacro)), scope);
    }

    pub fn insert_variable_command(
        &mut self,
        command_ref: token::CommandRef,
        variable_command: variable::Command<S>,
        scope: Scope,
    ) {
        self.insert(
            command_ref,
            Command::Variable(Rc::new(variable_command)),
            scope,
        );
    }

    /// Binds `alias` to whatever `command_ref` currently resolves to.
    ///
    /// This is `\let\alias\command`. If `command_ref` is undefined, `alias` becomes undefined.
    pub fn alias_control_sequence(
        &mut self,
        alias: token::CommandRef,
        command_ref: &token::CommandRef,
        scope: Scope,
    ) {
        let command = self.get_command(command_ref).clone();
        self.insert(alias, command, scope);
    }

    /// Binds `alias` to the meaning of the token.
    ///
    /// This is `\let\alias=<token>`: command tokens are aliased to their command,
    ///     and character tokens to a [Command::CharacterTokenAlias].
    pub fn alias_token(&mut self, alias: token::CommandRef, token: token::Token, scope: Scope) {
        match token.value() {
            token::Value::CommandRef(command_ref) => {
                self.alias_control_sequence(alias, &command_ref, scope)
            }
            value => self.insert(alias, Command::CharacterTokenAlias(value), scope),
        }
    }

    /// Returns the built-in commands the map was created with.
    pub fn built_in_commands(&self) -> &HashMap<token::CsName, BuiltIn<S>> {
        &self.built_ins
    }

    /// Returns the names of all defined control sequences, sorted.
    pub fn names<'a>(&self, interner: &'a token::CsNameInterner) -> Vec<&'a str> {
        let mut names: Vec<&'a str> = self
            .commands
            .iter()
            .filter(|(_, command)| command.is_defined())
            .filter_map(|(command_ref, _)| match command_ref {
                token::CommandRef::ControlSequence(cs_name) => interner.resolve(*cs_name),
                token::CommandRef::ActiveCharacter(_) => None,
            })
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of open groups.
    pub fn depth(&self) -> usize {
        self.commands.depth()
    }

    pub(crate) fn begin_group(&mut self) {
        self.commands.begin_group();
    }

    pub(crate) fn end_group(&mut self) -> Result<(), NoGroupToEndError> {
        self.commands.end_group()
    }
}
