//! Register variables (`\count`, `\dimen`, `\toks`) and the commands that name them
//!     (`\countdef`, `\dimendef`, `\toksdef`)

use texparser::parse::OptionalEquals;
use texparser::prelude as txl;
use texparser::traits::*;
use texparser::types::Dimen;
use texparser::variable::SupportedType;
use texparser::*;

pub const COUNT_DOC: &str = "Get or set an integer register";
pub const COUNTDEF_DOC: &str = "Bind an integer register to a control sequence";
pub const DIMEN_DOC: &str = "Get or set a dimension register";
pub const DIMENDEF_DOC: &str = "Bind a dimension register to a control sequence";
pub const TOKS_DOC: &str = "Get or set a token list register";
pub const TOKSDEF_DOC: &str = "Bind a token list register to a control sequence";

/// Component holding `N` registers of type `T`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component<T, const N: usize>(Vec<T>);

impl<T: Default, const N: usize> Default for Component<T, N> {
    fn default() -> Self {
        Component(std::iter::repeat_with(T::default).take(N).collect())
    }
}

static REGISTERDEF_TAG: command::StaticTag = command::StaticTag::new();

/// Tag shared by `\countdef`, `\dimendef` and `\toksdef`.
pub fn registerdef_tag() -> command::Tag {
    REGISTERDEF_TAG.get()
}

/// Get the `\count` command.
pub fn get_count<S: HasComponent<Component<i32, N>>, const N: usize>() -> command::BuiltIn<S> {
    new_registers_command().with_doc(COUNT_DOC)
}

/// Get the `\dimen` command.
pub fn get_dimen<S: HasComponent<Component<Dimen, N>>, const N: usize>() -> command::BuiltIn<S> {
    new_registers_command().with_doc(DIMEN_DOC)
}

/// Get the `\toks` command.
pub fn get_toks<S: HasComponent<Component<Vec<token::Token>, N>>, const N: usize>(
) -> command::BuiltIn<S> {
    new_registers_command().with_doc(TOKS_DOC)
}

fn new_registers_command<T: SupportedType, S: HasComponent<Component<T, N>>, const N: usize>(
) -> command::BuiltIn<S> {
    variable::Command::new_array(
        ref_fn,
        mut_fn,
        variable::IndexResolver::Dynamic(index_fn::<T, S, N>),
    )
    .into()
}

fn index_fn<T, S: HasComponent<Component<T, N>>, const N: usize>(
    _: token::Token,
    input: &mut vm::ExpandedStream<S>,
) -> txl::Result<variable::Index> {
    let index = parse::Uint::<N>::parse(input)?;
    Ok(index.0.into())
}

/// Get the `\countdef` command.
pub fn get_countdef<S: HasComponent<Component<i32, N>>, const N: usize>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(registerdef_fn::<i32, S, N>)
        .with_tag(registerdef_tag())
        .with_doc(COUNTDEF_DOC)
}

/// Get the `\dimendef` command.
pub fn get_dimendef<S: HasComponent<Component<Dimen, N>>, const N: usize>(
) -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(registerdef_fn::<Dimen, S, N>)
        .with_tag(registerdef_tag())
        .with_doc(DIMENDEF_DOC)
}

/// Get the `\toksdef` command.
pub fn get_toksdef<S: HasComponent<Component<Vec<token::Token>, N>>, const N: usize>(
) -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(registerdef_fn::<Vec<token::Token>, S, N>)
        .with_tag(registerdef_tag())
        .with_doc(TOKSDEF_DOC)
}

fn registerdef_fn<T: SupportedType, S: HasComponent<Component<T, N>>, const N: usize>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let scope = S::variable_assignment_scope_hook(input.state_mut());
    let (command_ref, _, index) =
        <(token::CommandRef, OptionalEquals, parse::Uint<N>)>::parse(input)?;
    input.commands_map_mut().insert_variable_command(
        command_ref,
        variable::Command::new_array(
            ref_fn,
            mut_fn,
            variable::IndexResolver::Static(index.0.into()),
        ),
        scope,
    );
    Ok(())
}

fn ref_fn<T, S: HasComponent<Component<T, N>>, const N: usize>(
    state: &S,
    index: variable::Index,
) -> &T {
    &state.component().0[index.0]
}

fn mut_fn<T, S: HasComponent<Component<T, N>>, const N: usize>(
    state: &mut S,
    index: variable::Index,
) -> &mut T {
    &mut state.component_mut().0[index.0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{prefix, the};
    use std::collections::HashMap;
    use texparser::vm::implement_has_component;
    use texparser_stdext::collections::scopedmap::Scope;
    use texparser_testing::*;

    #[derive(Default)]
    struct State {
        count: Component<i32, 256>,
        dimen: Component<Dimen, 256>,
        toks: Component<Vec<token::Token>, 256>,
        prefix: prefix::Component,
        testing: TestingComponent,
    }

    impl ParserState for State {
        fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
            prefix::variable_assignment_scope_hook(state)
        }

        fn recoverable_error_hook(
            vm: &vm::VM<Self>,
            recoverable_error: Box<error::Error>,
        ) -> txl::Result<()> {
            TestingComponent::recoverable_error_hook(vm, recoverable_error)
        }
    }

    implement_has_component![State {
        count: Component<i32, 256>,
        dimen: Component<Dimen, 256>,
        toks: Component<Vec<token::Token>, 256>,
        prefix: prefix::Component,
        testing: TestingComponent,
    }];

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("count", get_count()),
            ("countdef", get_countdef()),
            ("dimen", get_dimen()),
            ("dimendef", get_dimendef()),
            ("global", prefix::get_global()),
            ("the", the::get_the()),
            ("toks", get_toks()),
            ("toksdef", get_toksdef()),
        ])
    }

    test_suite![
        expansion_equality_tests(
            (write_and_read_register, r"\count 23 4 \the\count 23", r"4"),
            (
                write_and_read_register_eq,
                r"\count 23 = 4 \the\count 23",
                r"4"
            ),
            (
                negative_negative,
                r"\count 1=5000 \count 0=-1 \the \count -\count 0",
                r"5000"
            ),
            (default_value, r"\the\count 100", r"0"),
            (countdef_base_case, r"\countdef\A 23\A 4 \the\A", r"4"),
            (countdef_base_case_eq, r"\countdef\A = 23\A 4 \the\A", r"4"),
            (
                countdef_local,
                r"\count 1=1 \count 2=2 \countdef\A 1{\countdef\A 2}\the\A",
                r"1"
            ),
            (
                countdef_global,
                r"\count 1=1 \count 2=2 \countdef\A 1{\global\countdef\A 2}\the\A",
                r"2"
            ),
            (
                countdef_with_same_count,
                r"\countdef\A 23\A 4\count 23 5 \the\A",
                r"5"
            ),
            (
                toks_basic,
                r"\toks 1 = {Hola, Mundo}\the \toks 1",
                r"Hola, Mundo"
            ),
            (
                toksdef_basic,
                r"\toksdef\content 1 \toks 1 = {Hola, Mundo}\the \content",
                r"Hola, Mundo"
            ),
            (
                toks_copy,
                r"\toks 1 = {Hola, Mundo}\toks 2 = \toks 1 \the \toks 2",
                r"Hola, Mundo"
            ),
            (
                toks_grouping,
                r"\toks 1 = {a}{\toks 1 = {b}}\the \toks 1",
                r"a"
            ),
            (
                dimen_to_int,
                r"\dimen 1 = 40sp \count 1 = \dimen 1 \the \count 1",
                r"40",
            ),
            (
                int_to_int_is_assigned_before_expansion,
                r"\count 1 = 7 \count 2 = \count 1 \the\count 2",
                r"7",
            ),
            (
                int_to_dimen,
                r"\count 1 = 40 \dimen 1 = \count 1 pt \the \dimen 1",
                r"\dimen 1 = 40pt \the \dimen 1",
            ),
            (
                dimen_to_dimen,
                r"\dimen 1 = 10pt \dimen 2 = 5 \dimen 1 \the \dimen 2",
                r"\dimen 2 = 50pt \the \dimen 2",
            ),
            (
                dimen_negative_factor,
                r"\dimen 2 = 10pt \dimen 1 = - 1.5 \dimen 2 \the \dimen 1",
                r"\dimen 1 = -15pt \the \dimen 1",
            ),
            (
                dimendef_base_case,
                r"\dimendef\len 3 \len = 2.5pt \count 1 = \dimen 3 \the\count 1",
                r"163840",
            ),
        ),
        failure_tests(
            (write_register_index_too_big, r"\count 260 = 4"),
            (write_register_negative_index, r"\count -1 = 4"),
            (countdef_index_too_big, r"\countdef\A 260"),
            (countdef_missing_cs, r"\countdef 26 End"),
            (toks_not_a_number, r"\toks 1 = {a}\count 1 = \toks 1"),
        ),
    ];
}
