//! Messages for the user: `\message` and `\show`

use crate::the;
use texparser::prelude as txl;
use texparser::token::write_tokens;
use texparser::traits::*;
use texparser::*;

pub const MESSAGE_DOC: &str = "Expand the argument and print it to the terminal";
pub const SHOW_DOC: &str = "Print the meaning of a token to the terminal";

/// Get the `\message` command.
pub fn get_message<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(message_fn).with_doc(MESSAGE_DOC)
}

fn message_fn<S: ParserState>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let tokens = parse::pop_arg(input)?;
    let tokens = vm::expand_fully(tokens, input)?;
    let text = write_tokens(&tokens, input.vm().cs_name_interner());
    emit(input.vm(), &text);
    input.vm().listener.borrow_mut().message(&text);
    Ok(())
}

/// Get the `\show` command.
pub fn get_show<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(show_fn).with_doc(SHOW_DOC)
}

fn show_fn<S: ParserState>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let token = input.unexpanded().next_or_err("reading the token after \\show")?;
    let vm = input.vm();
    let text = match token.command_ref() {
        Some(command_ref) => format![
            "> {}={}.",
            command_ref.to_string(vm.cs_name_interner()),
            the::meaning(token, vm)
        ],
        None => format!["> {}.", the::meaning(token, vm)],
    };
    emit(vm, &text);
    Ok(())
}

fn emit<S>(vm: &vm::VM<S>, text: &str) {
    _ = writeln!(vm.terminal_out.borrow_mut(), "{text}");
    _ = writeln!(vm.log_file.borrow_mut(), "{text}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, prefix};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use texparser::vm::implement_has_component;
    use texparser_testing::*;

    #[derive(Default)]
    struct State {
        prefix: prefix::Component,
        testing: TestingComponent,
    }

    impl ParserState for State {
        fn recoverable_error_hook(
            vm: &vm::VM<Self>,
            recoverable_error: Box<error::Error>,
        ) -> txl::Result<()> {
            TestingComponent::recoverable_error_hook(vm, recoverable_error)
        }
    }

    implement_has_component![State {
        prefix: prefix::Component,
        testing: TestingComponent,
    }];

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("def", def::get_def()),
            ("message", get_message()),
            ("show", get_show()),
        ])
    }

    thread_local! {
        static TERMINAL: Rc<RefCell<Vec<u8>>> = Default::default();
    }

    fn init_vm(vm: &mut vm::VM<State>) {
        TERMINAL.with(|terminal| {
            terminal.borrow_mut().clear();
            vm.terminal_out = terminal.clone();
        });
    }

    fn terminal() -> String {
        TERMINAL.with(|terminal| String::from_utf8(terminal.borrow().clone()).unwrap())
    }

    fn options() -> Vec<TestOption<'static, State>> {
        vec![
            TestOption::BuiltInCommands(built_in_commands),
            TestOption::CustomVMInitialization(init_vm),
        ]
    }

    #[test]
    fn message_is_reported_to_the_listener() {
        let events = run_listener_test::<State, vm::DefaultHandlers>(
            r"\def\name{World}\message{Hello \name}",
            &options(),
        );
        assert_eq!(
            events,
            vec![
                Event::BeginParse,
                Event::Message("Hello World".into()),
                Event::EndParse,
            ]
        );
        assert_eq!(terminal(), "Hello World\n");
    }

    #[test]
    fn show_macro() {
        run_listener_test::<State, vm::DefaultHandlers>(r"\def\a#1{(#1)}\show\a", &options());
        assert_eq!(terminal(), "> \\a=macro:#1->(#1).\n");
    }

    #[test]
    fn show_undefined() {
        run_listener_test::<State, vm::DefaultHandlers>(r"\show\a", &options());
        assert_eq!(terminal(), "> \\a=undefined.\n");
    }

    #[test]
    fn show_character() {
        run_listener_test::<State, vm::DefaultHandlers>(r"\show a", &options());
        assert_eq!(terminal(), "> the letter a.\n");
    }

    test_suite![
        options(
            TestOption::BuiltInCommands(built_in_commands),
            TestOption::CustomVMInitialization(init_vm),
        ),
        expansion_equality_tests((message_has_no_output, r"a\message{b}c", "ac"),),
        failure_tests(
            (message_end_of_input, r"\message"),
            (message_unbalanced, r"\message{a"),
            (show_end_of_input, r"\show"),
        ),
    ];
}
