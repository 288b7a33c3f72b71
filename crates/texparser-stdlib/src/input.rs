//! Primitives for reading other files: `\input` and `\endinput`

use std::path::PathBuf;
use texparser::prelude as txl;
use texparser::token::trace;
use texparser::traits::*;
use texparser::*;

pub const INPUT_DOC: &str = "Read the contents of a file as if they appeared at this point";
pub const ENDINPUT_DOC: &str = "Stop reading the current file";

/// Get the `\input` expansion primitive.
///
/// Both the TeX form `\input name ` and the LaTeX form `\input{name}` are supported.
/// The `.tex` extension is added if the name has no extension.
pub fn get_input<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(input_fn).with_doc(INPUT_DOC)
}

fn input_fn<S: ParserState>(
    input_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let name = parse_file_name(input)?;
    if name.is_empty() {
        return Err(input.fatal_error(
            error::SimpleTokenError::new(input_token, "missing file name after \\input")
                .with_kind(error::Kind::Syntax)
                .with_note(r"the file name follows \input, like \input{chapter} or \input chapter"),
        ));
    }
    let path = resolve_path(input.vm(), &name);
    let source_code = match input.vm().file_system.read_to_string(&path) {
        Ok(source_code) => source_code,
        Err(err) => {
            return Err(input.fatal_error(
                error::SimpleTokenError::new(
                    input_token,
                    format!["could not read the file {}", path.display()],
                )
                .with_kind(error::Kind::Io)
                .with_note(err.to_string()),
            ))
        }
    };
    input.vm().listener.borrow_mut().input(&path);
    input.push_source(input_token, trace::Origin::File(path), source_code)
}

fn parse_file_name<S: ParserState>(input: &mut vm::ExpansionInput<S>) -> txl::Result<String> {
    while let Some(token) = input.unexpanded().peek()? {
        match token.value() {
            token::Value::Space(_) => input.unexpanded().consume()?,
            token::Value::BeginGroup(_) => return parse::pop_label_string(input),
            _ => break,
        }
    }
    let mut name = String::new();
    while let Some(token) = input.next()? {
        match token.value() {
            token::Value::Letter(c) | token::Value::Other(c) => name.push(c),
            // The space that ends the name is consumed.
            token::Value::Space(_) => break,
            _ => {
                input.back(token);
                break;
            }
        }
    }
    Ok(name)
}

fn resolve_path<S>(vm: &vm::VM<S>, name: &str) -> PathBuf {
    let mut path = PathBuf::from(name);
    if path.extension().is_none() {
        path.set_extension("tex");
    }
    match &vm.working_directory {
        Some(working_directory) if path.is_relative() => working_directory.join(path),
        _ => path,
    }
}

/// Get the `\endinput` expansion primitive.
pub fn get_endinput<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(endinput_fn).with_doc(ENDINPUT_DOC)
}

fn endinput_fn<S: ParserState>(
    _: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    input.end_current_file();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def;
    use crate::prefix;
    use std::collections::HashMap;
    use std::path::Path;
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
            ("endinput", get_endinput()),
            ("input", get_input()),
        ])
    }

    fn init_vm(vm: &mut vm::VM<State>) {
        let working_directory = Path::new("/work");
        let mut file_system = InMemoryFileSystem::new(working_directory);
        file_system.add_file("b.tex", "B");
        file_system.add_file("nested.tex", r"(\input{b})");
        file_system.add_file("macros.tex", r"\def\hello{Hello}");
        file_system.add_file("early.tex", r"x\endinput y");
        file_system.add_file("notes.txt", "N");
        file_system.add_file("loop.tex", r"\input{loop}");
        vm.working_directory = Some(working_directory.into());
        vm.file_system = Box::new(file_system);
    }

    test_suite![
        options(
            TestOption::BuiltInCommands(built_in_commands),
            TestOption::CustomVMInitialization(init_vm),
        ),
        expansion_equality_tests(
            (input_tex_form, r"a\input b c", "aBc"),
            (input_latex_form, r"a\input{b}c", "aBc"),
            (input_explicit_extension, r"\input{b.tex}", "B"),
            (input_other_extension, r"\input{notes.txt}", "N"),
            (input_absolute_path, r"\input{/work/b}", "B"),
            (input_nested, r"\input{nested}", "(B)"),
            (input_defines_macros, r"\input{macros}\hello", "Hello"),
            (input_name_from_macro, r"\def\name{b}\input{\name}", "B"),
            (endinput, r"\input{early}z", "xz"),
        ),
        failure_tests(
            (input_missing_file, r"\input{missing}"),
            (input_missing_name, r"\input{}"),
            (input_recursive, r"\input{loop}"),
        ),
    ];
}
