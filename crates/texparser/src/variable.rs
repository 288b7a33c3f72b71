//! Variables: registers, parameters and other assignable values
//!
//! A variable is a Rust value living somewhere in the VM's state, like an `i32`
//!     count register or the category code of a character.
//! Variables are built from an immutable getter ([RefFn]) and a mutable getter ([MutRefFn])
//!     that both receive the state and an [Index].
//! One pair of getters serves a whole array of registers; the index picks the element.
//!
//! A variable [Command] is what a control sequence like `\count` resolves to.
//! Resolving the command determines the index, either statically (`\countdef\a=5`
//!     makes `\a` always point at register 5) or by parsing the input (`\count 5`).
//!
//! Assignments respect grouping.
//! A local assignment saves the overwritten value in the innermost group's save stack
//!     element, and ending the group restores it.
//! A global assignment removes any saved values for the variable from every open group,
//!     so the new value survives all of them.

use crate::error;
use crate::parse::OptionalEquals;
use crate::token::{CatCode, Token};
use crate::traits::*;
use crate::types::Dimen;
use crate::vm;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use texparser_stdext::collections::scopedmap::Scope;

/// Function signature for a variable's immutable getter.
pub type RefFn<S, T> = fn(state: &S, index: Index) -> &T;

/// Function signature for a variable's mutable getter.
pub type MutRefFn<S, T> = fn(state: &mut S, index: Index) -> &mut T;

/// Index of a variable within an array.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Index(pub usize);

impl From<usize> for Index {
    fn from(value: usize) -> Self {
        Index(value)
    }
}

/// Specification for how the index of an array variable is determined.
pub enum IndexResolver<S> {
    /// A static index, provided in the enum variant.
    ///
    /// After `\countdef\A 30`, the command backing `\A` uses a static resolver with index 30.
    Static(Index),
    /// A dynamic index that is determined by reading the input.
    ///
    /// In `\count 4` the index 4 is determined by parsing a number from the input.
    Dynamic(fn(Token, &mut vm::ExpandedStream<S>) -> Result<Index, Box<error::Error>>),
}

impl<S> IndexResolver<S> {
    fn resolve(
        &self,
        token: Token,
        input: &mut vm::ExpandedStream<S>,
    ) -> Result<Index, Box<error::Error>> {
        match self {
            IndexResolver::Static(addr) => Ok(*addr),
            IndexResolver::Dynamic(f) => f(token, input),
        }
    }
}

/// A variable command.
///
/// Variable commands are _resolved_ to obtain a [Variable].
pub struct Command<S> {
    getters: Getters<S>,
    index_resolver: Option<IndexResolver<S>>,
}

impl<S> Command<S> {
    /// Create a new command for a single variable.
    pub fn new_singleton<T: SupportedType>(
        ref_fn: RefFn<S, T>,
        ref_mut_fn: MutRefFn<S, T>,
    ) -> Command<S> {
        SupportedType::new_command(ref_fn, ref_mut_fn, None)
    }

    /// Whether the two commands refer to the same variable.
    ///
    /// Commands that resolve their index from the input are the same if they read the index
    ///     the same way; `\count` is the same as `\let\c=\count`.
    pub fn refers_to_same_variable(&self, other: &Command<S>) -> bool {
        let same_index = match (&self.index_resolver, &other.index_resolver) {
            (None, None) => true,
            (Some(IndexResolver::Static(a)), Some(IndexResolver::Static(b))) => a == b,
            (Some(IndexResolver::Dynamic(a)), Some(IndexResolver::Dynamic(b))) => {
                *a as usize == *b as usize
            }
            _ => false,
        };
        same_index && self.getters.key() == other.getters.key()
    }

    /// Create a new command for an element of an array of variables.
    pub fn new_array<T: SupportedType>(
        ref_fn: RefFn<S, T>,
        ref_mut_fn: MutRefFn<S, T>,
        index_resolver: IndexResolver<S>,
    ) -> Command<S> {
        SupportedType::new_command(ref_fn, ref_mut_fn, Some(index_resolver))
    }
}

impl<S: ParserState> Command<S> {
    /// Resolve the command to obtain a [Variable].
    pub fn resolve(
        &self,
        token: Token,
        input: &mut vm::ExpandedStream<S>,
    ) -> Result<Variable<S>, Box<error::Error>> {
        let index = match &self.index_resolver {
            None => Index(0),
            Some(index_resolver) => index_resolver
                .resolve(token, input)
                .map_err(|err| err.propagate(input.vm(), error::OperationKind::VariableIndex, token))?,
        };
        Ok(match self.getters {
            Getters::Int(a, b) => Variable::Int(TypedVariable(a, b, index)),
            Getters::Dimen(a, b) => Variable::Dimen(TypedVariable(a, b, index)),
            Getters::TokenList(a, b) => Variable::TokenList(TypedVariable(a, b, index)),
            Getters::CatCode(a, b) => Variable::CatCode(TypedVariable(a, b, index)),
        })
    }

    /// Resolve the command to a variable and return the value of the variable.
    pub fn value<'a>(
        &self,
        token: Token,
        input: &'a mut vm::ExpandedStream<S>,
    ) -> Result<ValueRef<'a>, Box<error::Error>> {
        Ok(self.resolve(token, input)?.value(input))
    }

    /// Resolve the command to a variable and set the value of the variable using the following tokens in the input.
    ///
    /// This is TeX code like `\variable = 3`.
    pub fn set_value_using_input(
        &self,
        token: Token,
        input: &mut vm::ExecutionInput<S>,
        scope: Scope,
    ) -> Result<(), Box<error::Error>> {
        self.resolve(token, input.as_mut())?
            .set_value_using_input(input, scope)
            .map_err(|err| err.propagate(input.vm(), error::OperationKind::VariableAssignment, token))
    }
}

/// Immutable reference to the value of a variable.
#[derive(Debug, PartialEq, Eq)]
pub enum ValueRef<'a> {
    Int(&'a i32),
    Dimen(&'a Dimen),
    TokenList(&'a Vec<Token>),
    CatCode(&'a CatCode),
}

/// Variable of any type.
///
/// Reading the value with [Variable::value] borrows the state.
/// To use the input while working with the variable, match on the variants instead;
///     the [TypedVariable] inside holds no borrow.
pub enum Variable<S> {
    Int(TypedVariable<S, i32>),
    Dimen(TypedVariable<S, Dimen>),
    TokenList(TypedVariable<S, Vec<Token>>),
    CatCode(TypedVariable<S, CatCode>),
}

impl<S> Variable<S> {
    /// Name of the variable's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variable::Int(_) => "an integer variable",
            Variable::Dimen(_) => "a dimension variable",
            Variable::TokenList(_) => "a token list variable",
            Variable::CatCode(_) => "a category code variable",
        }
    }
}

impl<S: ParserState> Variable<S> {
    /// Return a reference to the value of the variable.
    pub fn value<'a>(&self, input: &'a mut vm::ExpandedStream<S>) -> ValueRef<'a> {
        match self {
            Variable::Int(variable) => ValueRef::Int(variable.get(input.state())),
            Variable::Dimen(variable) => ValueRef::Dimen(variable.get(input.state())),
            Variable::TokenList(variable) => ValueRef::TokenList(variable.get(input.state())),
            Variable::CatCode(variable) => ValueRef::CatCode(variable.get(input.state())),
        }
    }

    fn set_value_using_input(
        &self,
        input: &mut vm::ExecutionInput<S>,
        scope: Scope,
    ) -> Result<(), Box<error::Error>> {
        OptionalEquals::parse(input)?;
        match self {
            Variable::Int(variable) => {
                let value = i32::parse(input)?;
                variable.set(input, scope, value);
            }
            Variable::Dimen(variable) => {
                let value = Dimen::parse(input)?;
                variable.set(input, scope, value);
            }
            Variable::TokenList(variable) => {
                let value = crate::parse::parse_token_list_value(input)?;
                variable.set(input, scope, value);
            }
            Variable::CatCode(variable) => {
                let value = CatCode::parse(input)?;
                variable.set(input, scope, value);
            }
        };
        Ok(())
    }
}

enum Getters<S> {
    Int(RefFn<S, i32>, MutRefFn<S, i32>),
    Dimen(RefFn<S, Dimen>, MutRefFn<S, Dimen>),
    TokenList(RefFn<S, Vec<Token>>, MutRefFn<S, Vec<Token>>),
    CatCode(RefFn<S, CatCode>, MutRefFn<S, CatCode>),
}

impl<S> Getters<S> {
    fn key(&self) -> (usize, usize) {
        match self {
            Getters::Int(a, b) => (*a as usize, *b as usize),
            Getters::Dimen(a, b) => (*a as usize, *b as usize),
            Getters::TokenList(a, b) => (*a as usize, *b as usize),
            Getters::CatCode(a, b) => (*a as usize, *b as usize),
        }
    }
}

/// A variable of a specific Rust type `T`.
pub struct TypedVariable<S, T>(RefFn<S, T>, MutRefFn<S, T>, Index);

impl<S, T> Copy for TypedVariable<S, T> {}

impl<S, T> Clone for TypedVariable<S, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, T> TypedVariable<S, T> {
    /// Returns an immutable reference to the variable's value.
    pub fn get<'a>(&self, state: &'a S) -> &'a T {
        (self.0)(state, self.2)
    }

    pub fn index(&self) -> Index {
        self.2
    }

    fn key(&self) -> (usize, usize, Index) {
        (self.0 as usize, self.1 as usize, self.2)
    }
}

impl<S, T> TypedVariable<S, T>
where
    S: ParserState,
    T: SupportedType,
{
    /// Sets the value of the variable.
    ///
    /// The full input is needed, not just the state, because a local assignment
    ///     saves the overwritten value so that it can be restored when the current group ends.
    pub fn set(&self, input: &mut vm::ExecutionInput<S>, scope: Scope, value: T) {
        let r: &mut T = (self.1)(input.state_mut(), self.2);
        let overwritten_value = std::mem::replace(r, value);
        if !input.save_stack_mut().is_empty() {
            SupportedType::update_save_stack(input, self, scope, overwritten_value);
        }
    }
}

impl<S, T> PartialEq for TypedVariable<S, T> {
    fn eq(&self, rhs: &TypedVariable<S, T>) -> bool {
        self.key() == rhs.key()
    }
}

impl<S, T> Eq for TypedVariable<S, T> {}

impl<S, T> Hash for TypedVariable<S, T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.key().hash(state);
    }
}

/// Trait satisfied by all Rust types that can be used as variables.
///
/// The trait cannot be usefully implemented for new types.
pub trait SupportedType: Sized {
    /// Create a new command of this type with the provided reference functions and index resolver.
    fn new_command<S>(
        ref_fn: RefFn<S, Self>,
        ref_mut_fn: MutRefFn<S, Self>,
        index_resolver: Option<IndexResolver<S>>,
    ) -> Command<S>;

    /// Update the VM's save stack after a variable assignment.
    fn update_save_stack<S>(
        input: &mut vm::ExecutionInput<S>,
        variable: &TypedVariable<S, Self>,
        scope: Scope,
        overwritten_value: Self,
    );
}

fn update_save_stack<S, T, F>(
    input: &mut vm::ExecutionInput<S>,
    variable: &TypedVariable<S, T>,
    scope: Scope,
    overwritten_value: T,
    map_getter: F,
) where
    F: Fn(&mut SaveStackElement<S>) -> &mut SaveStackMap<S, T>,
{
    match scope {
        Scope::Global => {
            for element in input.save_stack_mut().iter_mut() {
                map_getter(element).remove(variable)
            }
        }
        Scope::Local => {
            if let Some(element) = input.save_stack_mut().last_mut() {
                map_getter(element).save(*variable, overwritten_value);
            }
        }
    }
}

macro_rules! supported_types {
    ( $( ($type: ty, $variant: ident, $field: ident), )+ ) => {
        $(
            impl SupportedType for $type {
                fn new_command<S>(
                    ref_fn: RefFn<S, Self>,
                    ref_mut_fn: MutRefFn<S, Self>,
                    index_resolver: Option<IndexResolver<S>>,
                ) -> Command<S> {
                    Command {
                        getters: Getters::$variant(ref_fn, ref_mut_fn),
                        index_resolver,
                    }
                }

                fn update_save_stack<S>(
                    input: &mut vm::ExecutionInput<S>,
                    variable: &TypedVariable<S, Self>,
                    scope: Scope,
                    overwritten_value: Self,
                ) {
                    update_save_stack(input, variable, scope, overwritten_value, |element| {
                        &mut element.$field
                    })
                }
            }
        )+

        /// Internal VM data structure used to implement grouping for variables.
        pub(crate) struct SaveStackElement<S> {
            $(
                $field: SaveStackMap<S, $type>,
            )+
        }

        impl<S> Default for SaveStackElement<S> {
            fn default() -> Self {
                Self {
                    $(
                        $field: Default::default(),
                    )+
                }
            }
        }

        impl<S> SaveStackElement<S> {
            pub(crate) fn restore(self, state: &mut S) {
                $(
                    self.$field.restore(state);
                )+
            }
        }
    };
}

supported_types!(
    (i32, Int, int),
    (Dimen, Dimen, dimen),
    (Vec<Token>, TokenList, token_list),
    (CatCode, CatCode, catcode),
);

pub(crate) struct SaveStackMap<S, T>(HashMap<TypedVariable<S, T>, T>);

impl<S, T> Default for SaveStackMap<S, T> {
    fn default() -> Self {
        Self(HashMap::new())
    }
}

impl<S, T> SaveStackMap<S, T> {
    // Only the first value saved in a group is kept: it is the value from before the group.
    fn save(&mut self, variable: TypedVariable<S, T>, val: T) {
        self.0.entry(variable).or_insert(val);
    }

    fn remove(&mut self, variable: &TypedVariable<S, T>) {
        self.0.remove(variable);
    }

    fn restore(self, state: &mut S) {
        for (v, restored_value) in self.0 {
            *(v.1)(state, v.2) = restored_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::GroupKind;
    use crate::token::trace;
    use std::collections::HashMap;

    #[derive(Default)]
    struct State {
        registers: [i32; 4],
    }

    impl ParserState for State {}

    fn register(state: &State, index: Index) -> &i32 {
        &state.registers[index.0]
    }

    fn register_mut(state: &mut State, index: Index) -> &mut i32 {
        &mut state.registers[index.0]
    }

    fn variable() -> TypedVariable<State, i32> {
        TypedVariable(register, register_mut, Index(2))
    }

    fn brace() -> Token {
        Token::new_begin_group('{', trace::Key::dummy())
    }

    fn end_brace() -> Token {
        Token::new_end_group('}', trace::Key::dummy())
    }

    #[test]
    fn local_assignment_is_restored() {
        let mut vm = vm::VM::<State>::new(HashMap::new());
        let input = vm::ExecutionInput::new(&mut vm);
        variable().set(input, Scope::Local, 1);
        input.begin_group(GroupKind::Brace, brace());
        variable().set(input, Scope::Local, 2);
        variable().set(input, Scope::Local, 3);
        assert_eq!(*variable().get(input.state()), 3);
        input.end_group(GroupKind::Brace, end_brace()).unwrap();
        assert_eq!(*variable().get(input.state()), 1);
    }

    #[test]
    fn global_assignment_survives_groups() {
        let mut vm = vm::VM::<State>::new(HashMap::new());
        let input = vm::ExecutionInput::new(&mut vm);
        input.begin_group(GroupKind::Brace, brace());
        variable().set(input, Scope::Local, 5);
        input.begin_group(GroupKind::Brace, brace());
        variable().set(input, Scope::Global, 7);
        input.end_group(GroupKind::Brace, end_brace()).unwrap();
        input.end_group(GroupKind::Brace, end_brace()).unwrap();
        assert_eq!(*variable().get(input.state()), 7);
    }

    #[test]
    fn local_after_global_in_same_group() {
        let mut vm = vm::VM::<State>::new(HashMap::new());
        let input = vm::ExecutionInput::new(&mut vm);
        input.begin_group(GroupKind::Brace, brace());
        variable().set(input, Scope::Global, 7);
        variable().set(input, Scope::Local, 9);
        input.end_group(GroupKind::Brace, end_brace()).unwrap();
        assert_eq!(*variable().get(input.state()), 7);
    }
}
