//! Macro tracing with `\tracingmacros`
//!
//! When `\tracingmacros` is positive every macro expansion is logged to the log file
//!     in TeX's format:
//!
//! ```txt
//! \foo #1->(#1)
//! #1<-a
//! ```
//!
//! When it is greater than one the trace is also written to the terminal.

use texparser::token::write_tokens;
use texparser::traits::*;
use texparser::*;

pub const TRACINGMACROS_DOC: &str = "Log macro expansions when positive";

/// Component for storing state related to macro tracing.
#[derive(Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    tracing_macros: i32,
}

/// Get the `\tracingmacros` command.
pub fn get_tracingmacros<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(variable::Command::new_singleton(
        |state: &S, _: variable::Index| -> &i32 { &state.component().tracing_macros },
        |state: &mut S, _: variable::Index| -> &mut i32 {
            &mut state.component_mut().tracing_macros
        },
    ))
    .with_doc(TRACINGMACROS_DOC)
}

/// Post macro expansion hook that writes the trace.
///
/// States that support `\tracingmacros` invoke this from
///     [ParserState::post_macro_expansion_hook].
pub fn hook<S: HasComponent<Component>>(
    token: token::Token,
    input: &vm::ExpansionInput<S>,
    tex_macro: &texmacro::Macro,
    arguments: &[&[token::Token]],
    _reversed_expansion: &[token::Token],
) {
    let level = input.state().component().tracing_macros;
    if level <= 0 {
        return;
    }
    let vm = input.vm();
    let trace = format_trace(token, vm.cs_name_interner(), tex_macro, arguments);
    // Failing to write a trace is not an error of the input.
    _ = vm.log_file.borrow_mut().write_all(trace.as_bytes());
    if level > 1 {
        _ = vm.terminal_out.borrow_mut().write_all(trace.as_bytes());
    }
}

fn format_trace(
    token: token::Token,
    interner: &token::CsNameInterner,
    tex_macro: &texmacro::Macro,
    arguments: &[&[token::Token]],
) -> String {
    let name = match token.command_ref() {
        Some(command_ref) => command_ref.to_string(interner),
        None => String::new(),
    };
    let meaning = tex_macro.meaning(interner);
    let definition = match meaning.split_once("macro:") {
        Some((_, definition)) => definition,
        None => &meaning,
    };
    let mut trace = format!["{name} {definition}\n"];
    for (i, argument) in arguments.iter().enumerate() {
        trace.push_str(&format!["#{}<-{}\n", i + 1, write_tokens(*argument, interner)]);
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, prefix, the};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use texparser::prelude as txl;
    use texparser::token::trace;
    use texparser::vm::implement_has_component;
    use texparser_testing::*;

    #[derive(Default)]
    struct State {
        prefix: prefix::Component,
        tracing_macros: Component,
        testing: TestingComponent,
    }

    impl ParserState for State {
        fn post_macro_expansion_hook(
            token: token::Token,
            input: &vm::ExpansionInput<Self>,
            tex_macro: &texmacro::Macro,
            arguments: &[&[token::Token]],
            reversed_expansion: &[token::Token],
        ) {
            hook(token, input, tex_macro, arguments, reversed_expansion)
        }

        fn recoverable_error_hook(
            vm: &vm::VM<Self>,
            recoverable_error: Box<error::Error>,
        ) -> txl::Result<()> {
            TestingComponent::recoverable_error_hook(vm, recoverable_error)
        }
    }

    implement_has_component![State {
        prefix: prefix::Component,
        tracing_macros: Component,
        testing: TestingComponent,
    }];

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("def", def::get_def()),
            ("the", the::get_the()),
            ("tracingmacros", get_tracingmacros()),
        ])
    }

    struct Logs {
        log_file: Rc<RefCell<Vec<u8>>>,
        terminal: Rc<RefCell<Vec<u8>>>,
    }

    fn run(source: &str) -> Logs {
        let mut vm = vm::VM::<State>::new(built_in_commands());
        let logs = Logs {
            log_file: Default::default(),
            terminal: Default::default(),
        };
        vm.log_file = logs.log_file.clone();
        vm.terminal_out = logs.terminal.clone();
        vm.parse::<vm::DefaultHandlers>(trace::Origin::String("tracing.tex".into()), source.into())
            .unwrap();
        logs
    }

    fn contents(buffer: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(buffer.borrow().clone()).unwrap()
    }

    #[test]
    fn disabled_by_default() {
        let logs = run(r"\def\a#1{(#1)}\a x");
        assert_eq!(contents(&logs.log_file), "");
        assert_eq!(contents(&logs.terminal), "");
    }

    #[test]
    fn level_one_logs_to_the_log_file() {
        let logs = run(r"\tracingmacros=1 \def\a#1{(#1)}\a x");
        assert_eq!(contents(&logs.log_file), "\\a #1->(#1)\n#1<-x\n");
        assert_eq!(contents(&logs.terminal), "");
    }

    #[test]
    fn level_two_logs_to_the_terminal_too() {
        let logs = run(r"\tracingmacros=2 \def\a{b}\a");
        assert_eq!(contents(&logs.log_file), "\\a ->b\n");
        assert_eq!(contents(&logs.terminal), "\\a ->b\n");
    }

    #[test]
    fn multiple_arguments() {
        let logs = run(r"\tracingmacros=1 \def\a#1#2{#2#1}\a{xy}z");
        assert_eq!(
            contents(&logs.log_file),
            "\\a #1#2->#2#1\n#1<-xy\n#2<-z\n"
        );
    }

    test_suite![expansion_equality_tests(
        (tracingmacros_is_a_variable, r"\tracingmacros=3 \the\tracingmacros", "3"),
    ),];
}
