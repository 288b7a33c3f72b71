//! Category code primitives (`\catcode`, `\makeatletter`, `\makeatother`)
//!
//! The category code table lives in the state, so the tokenizer sees changes
//!     made by `\catcode` from the next character it reads.
//! Assignments are scoped like any other variable assignment.

use texparser::parse;
use texparser::prelude as txl;
use texparser::token::{CatCode, CatCodeTable};
use texparser::traits::*;
use texparser::*;

/// Component holding the category code table.
#[derive(Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    table: CatCodeTable,
}

impl Component {
    pub fn table(&self) -> &CatCodeTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut CatCodeTable {
        &mut self.table
    }
}

#[inline]
pub fn cat_code<S: HasComponent<Component>>(state: &S, code_point: u32) -> CatCode {
    state.component().table.get(code_point)
}

pub const CATCODE_DOC: &str = "Get or set the category code of a character";
pub const MAKEATLETTER_DOC: &str = "Make @ a letter, so that internal control sequences can be written";
pub const MAKEATOTHER_DOC: &str = "Make @ an other character again";

const NUM_CODE_POINTS: usize = 0x11_0000;

/// Get the `\catcode` command.
pub fn get_catcode<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(variable::Command::new_array(
        ref_fn,
        mut_fn,
        variable::IndexResolver::Dynamic(index_fn),
    ))
    .with_doc(CATCODE_DOC)
}

fn ref_fn<S: HasComponent<Component>>(state: &S, index: variable::Index) -> &CatCode {
    state.component().table.get_ref(index.0 as u32)
}

fn mut_fn<S: HasComponent<Component>>(state: &mut S, index: variable::Index) -> &mut CatCode {
    state.component_mut().table.get_mut(index.0 as u32)
}

fn index_fn<S: HasComponent<Component>>(
    _: token::Token,
    input: &mut vm::ExpandedStream<S>,
) -> txl::Result<variable::Index> {
    Ok(parse::Uint::<NUM_CODE_POINTS>::parse(input)?.0.into())
}

/// Get the `\makeatletter` command.
pub fn get_makeatletter<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(makeatletter_fn).with_doc(MAKEATLETTER_DOC)
}

/// Get the `\makeatother` command.
pub fn get_makeatother<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(makeatother_fn).with_doc(MAKEATOTHER_DOC)
}

fn makeatletter_fn<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    set_at_sign(token, input, CatCode::Letter)
}

fn makeatother_fn<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    set_at_sign(token, input, CatCode::Other)
}

// Goes through the variable so that the assignment is undone when the current group ends.
fn set_at_sign<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
    cat_code: CatCode,
) -> txl::Result<()> {
    let command = variable::Command::new_array(
        ref_fn,
        mut_fn,
        variable::IndexResolver::Static(variable::Index('@' as usize)),
    );
    if let variable::Variable::CatCode(variable) = command.resolve(token, input.as_mut())? {
        let scope = S::variable_assignment_scope_hook(input.state_mut());
        variable.set(input, scope, cat_code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, prefix, the};
    use std::collections::HashMap;
    use texparser::vm::implement_has_component;
    use texparser_stdext::collections::scopedmap::Scope;
    use texparser_testing::*;

    #[derive(Default)]
    struct State {
        catcode: Component,
        prefix: prefix::Component,
        testing: TestingComponent,
    }

    impl ParserState for State {
        fn cat_code(&self, code_point: u32) -> CatCode {
            cat_code(self, code_point)
        }

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
        catcode: Component,
        prefix: prefix::Component,
        testing: TestingComponent,
    }];

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("catcode", get_catcode()),
            ("def", def::get_def()),
            ("global", prefix::get_global()),
            ("makeatletter", get_makeatletter()),
            ("makeatother", get_makeatother()),
            ("the", the::get_the()),
        ])
    }

    test_suite![
        expansion_equality_tests(
            (catcode_base_case, r"\catcode 48 11 \def\A0{x}\A0", r"x"),
            (
                catcode_grouping,
                r"{\catcode 48 11 \def\A0{x}\A0}\def\B0{y}\B0",
                r"xy"
            ),
            (
                catcode_global,
                r"{\global\catcode 48 11}\def\A0{x}\A0",
                r"x"
            ),
            (catcode_read, r"\the\catcode `\a", r"11"),
            (
                catcode_begin_group,
                r"\catcode`\[=1 \catcode`\]=2 \def\A[xy]\A",
                r"xy"
            ),
            (
                makeatletter,
                r"\makeatletter\def\a@b{x}\a@b\makeatother",
                r"x"
            ),
            (
                makeatletter_scoped,
                r"{\makeatletter}\def\a{y}\a@b",
                r"y@b"
            ),
        ),
        failure_tests(
            (catcode_value_too_large, r"\catcode 48 16"),
            (catcode_value_negative, r"\catcode 48 -1"),
            (catcode_index_negative, r"\catcode -1 11"),
        ),
    ];
}
