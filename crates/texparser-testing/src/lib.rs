/*!
texparser unit testing library

This is a crate for writing unit tests for code that uses texparser.
It is used extensively in the texparser standard library,
    so the unit tests there are good examples of what this crate can do.

## Basic setup

Each unit test built with this library works with a specific user-defined state type.
This state type is provided by the unit test writer.
In addition to implementing the [`ParserState`] trait, this state must also:

1. Include the [`TestingComponent`] type as a component.
    I.e., the state must implement the [`HasComponent<TestingComponent>`](texparser::traits::HasComponent) trait.

1. Configure the `recoverable_error_hook` method on the [`ParserState`]
    trait to invoke [`TestingComponent::recoverable_error_hook`].

1. Implement [`Default`].

If the unit test doesn't require anything else from the state,
    the [`State`] type defined in this library can simply be used.
This type satisfies all the conditions above.

## Test types

### Expansion equality tests

Run using [`run_expansion_equality_test`].

These tests verify that two different TeX snippets expand to the same output.
For example, an output equality test can verify that
```tex
\def\HelloWorld{Hola Mundo}\HelloWorld - \HelloWorld
```
and
```tex
Hola Mundo - Hola Mundo
```
produce the same output.
The output is the sequence of character tokens that reach the VM's character handler.
Braces are consumed by the VM as group delimiters and are not part of the output.

These tests do _not_ verify that the state of the VM is the same in both cases.

### Failure tests

Run using [`run_failure_test`].
These tests verify that a specific TeX snippet fails to execute.

### Listener tests

Run using [`run_listener_test`].
These tests run a snippet with custom handlers and a [`RecordingListener`] installed,
    and return the [`Event`]s the listener received.

## The test suite macro

The preferred way to write a suite of unit tests is to use the [`test_suite`] macro.
*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use texparser::error;
use texparser::object::{Group, GroupKind, Ignoreable, Object};
use texparser::settings::Settings;
use texparser::token;
use texparser::token::trace;
use texparser::traits::*;
use texparser::vm::implement_has_component;
use texparser::vm::VM;
use texparser::*;

/// Component that every unit testing state needs to have.
#[derive(Default)]
pub struct TestingComponent {
    allow_undefined_command: bool,
    recover_from_errors: bool,
    num_recovered_errors: RefCell<usize>,
    tokens: Vec<token::Token>,
    integer: i32,
}

impl TestingComponent {
    fn take_tokens(&mut self) -> Vec<token::Token> {
        std::mem::take(&mut self.tokens)
    }

    /// Recoverable error hook for the testing component.
    ///
    /// States used in unit testing must be configured to use this hook.
    pub fn recoverable_error_hook<S: HasComponent<Self>>(
        vm: &VM<S>,
        recoverable_error: Box<error::Error>,
    ) -> Result<(), Box<error::Error>> {
        let component = vm.state.component();
        if component.recover_from_errors {
            *component.num_recovered_errors.borrow_mut() += 1;
            Ok(())
        } else {
            Err(recoverable_error)
        }
    }

    /// Returns an integer variable command that references an integer stored in the testing component.
    ///
    /// If you're writing a unit test that needs an integer variable it's easiest to use this
    ///     rather than building your own variable.
    pub fn get_integer<S: HasComponent<TestingComponent>>() -> command::BuiltIn<S> {
        variable::Command::new_singleton(
            |state: &S, _: variable::Index| -> &i32 { &state.component().integer },
            |state: &mut S, _: variable::Index| -> &mut i32 { &mut state.component_mut().integer },
        )
        .into()
    }
}

/// Simple state type for simple unit tests.
///
/// If the commands under test don't require custom components or
/// other pieces in the state, it is easier to use this type rather than defining a custom one.
#[derive(Default)]
pub struct State {
    testing: TestingComponent,
}

impl ParserState for State {
    fn recoverable_error_hook(
        vm: &VM<Self>,
        recoverable_error: Box<error::Error>,
    ) -> Result<(), Box<error::Error>> {
        TestingComponent::recoverable_error_hook(vm, recoverable_error)
    }
}

implement_has_component![State {
    testing: TestingComponent,
}];

/// Option passed to a test runner.
pub enum TestOption<'a, S> {
    /// The built-in commands are the result of invoking the provided static function.
    ///
    /// Overrides previous `BuiltInCommands` or `BuiltInCommandsDyn` options.
    BuiltInCommands(fn() -> HashMap<&'static str, command::BuiltIn<S>>),

    /// The built-in commands are the result of invoking the provided closure.
    ///
    /// Overrides previous `BuiltInCommands` or `BuiltInCommandsDyn` options.
    BuiltInCommandsDyn(Box<dyn Fn() -> HashMap<&'static str, command::BuiltIn<S>> + 'a>),

    /// The provided static function is invoked after the VM is created and before execution starts.
    /// This can be used to provide more custom VM initialization.
    ///
    /// Overrides previous `CustomVMInitialization` or `CustomVMInitializationDyn` options.
    CustomVMInitialization(fn(&mut VM<S>)),

    /// The provided closure is invoked after the VM is created and before execution starts.
    ///
    /// Overrides previous `CustomVMInitialization` or `CustomVMInitializationDyn` options.
    #[allow(clippy::type_complexity)]
    CustomVMInitializationDyn(Box<dyn Fn(&mut VM<S>) + 'a>),

    /// Whether undefined commands are passed through to the output rather than raising an error.
    ///
    /// Overrides previous `AllowUndefinedCommands` options.
    AllowUndefinedCommands(bool),

    /// Whether to recover from errors.
    ///
    /// Overrides previous `RecoverFromErrors` options.
    RecoverFromErrors(bool),
}

/// Run an expansion equality test.
///
/// The test passes if the two provided input strings expand to the same tokens.
pub fn run_expansion_equality_test<S>(
    lhs: &str,
    rhs: &str,
    expect_recoverable_errors: bool,
    options: &[TestOption<S>],
) where
    S: Default + HasComponent<TestingComponent>,
{
    let options = ResolvedOptions::new(options);

    let mut vm_1 = initialize_vm(&options);
    let output_1 = match execute_source_code(&mut vm_1, lhs, &options) {
        Ok(output) => output,
        Err(err) => panic!("running the left hand side failed:\n{err}"),
    };

    let mut vm_2 = initialize_vm(&options);
    let output_2 = match execute_source_code(&mut vm_2, rhs, &options) {
        Ok(output) => output,
        Err(err) => panic!("running the right hand side failed:\n{err}"),
    };
    compare_output(output_1, &vm_1, output_2, &vm_2);

    let num_recovered_errors = *vm_1.state.component().num_recovered_errors.borrow();
    match (expect_recoverable_errors, num_recovered_errors) {
        (true, 0) => {
            panic!("expected recoverable errors but didn't have any");
        }
        (true, _) | (false, 0) => (),
        (false, i) => {
            panic!("did not expect recoverable errors but had {i} recoverable errors");
        }
    }
}

fn compare_output<S>(
    mut output_1: Vec<token::Token>,
    vm_1: &VM<S>,
    mut output_2: Vec<token::Token>,
    vm_2: &VM<S>,
) {
    let trim_space = |v: &mut Vec<token::Token>| {
        if let Some(last) = v.last() {
            if last.cat_code() == Some(token::CatCode::Space) {
                v.pop();
            }
        }
    };
    trim_space(&mut output_1);
    trim_space(&mut output_2);

    use token::CommandRef::ControlSequence;
    use token::Value::CommandRef;
    let equal = output_1.len() == output_2.len()
        && output_1
            .iter()
            .zip(output_2.iter())
            .all(|(token_1, token_2)| match (token_1.value(), token_2.value()) {
                (CommandRef(ControlSequence(cs_name_1)), CommandRef(ControlSequence(cs_name_2))) => {
                    vm_1.cs_name_interner().resolve(cs_name_1)
                        == vm_2.cs_name_interner().resolve(cs_name_2)
                }
                _ => token_1 == token_2,
            });

    if !equal {
        println!("Expansion output is different:");
        println!("------[lhs]------");
        println!("'{}'", token::write_tokens(&output_1, vm_1.cs_name_interner()));
        println!("------[rhs]------");
        println!("'{}'", token::write_tokens(&output_2, vm_2.cs_name_interner()));
        println!("-----------------");
        panic!("Expansion test failed");
    }
}

/// Run a failure test.
///
/// The test passes if execution of the provided input fails.
/// The error is returned so that callers can make further assertions about it.
pub fn run_failure_test<S>(input: &str, options: &[TestOption<S>]) -> Box<error::Error>
where
    S: Default + HasComponent<TestingComponent>,
{
    let options = ResolvedOptions::new(options);

    let mut vm = initialize_vm(&options);
    match execute_source_code(&mut vm, input, &options) {
        Ok(output) => {
            println!("Expansion succeeded:");
            println!("{}", token::write_tokens(&output, vm.cs_name_interner()));
            panic!("Expansion failure test did not pass: expansion successful");
        }
        Err(err) => {
            println!("{err}");
            err
        }
    }
}

/// Run a recoverable failure test.
///
/// The test passes if the input fails when error recovery is disabled,
///     and expands to the same tokens as the `rhs` with at least one recovered error
///     when error recovery is enabled.
pub fn run_recoverable_failure_test<S>(lhs: &str, rhs: &str, options: Vec<TestOption<S>>)
where
    S: Default + HasComponent<TestingComponent>,
{
    let mut options = options;
    options.push(TestOption::RecoverFromErrors(false));
    run_failure_test(lhs, &options);
    options.push(TestOption::RecoverFromErrors(true));
    run_expansion_equality_test(lhs, rhs, true, &options);
}

/// Run a listener test.
///
/// The input is parsed with the handlers `H` and a [RecordingListener] installed.
/// The test panics if parsing fails.
pub fn run_listener_test<S, H>(input: &str, options: &[TestOption<S>]) -> Vec<Event>
where
    S: Default + HasComponent<TestingComponent>,
    H: vm::Handlers<S>,
{
    let options = ResolvedOptions::new(options);
    let mut vm = initialize_vm(&options);
    set_flags(&mut vm, &options);
    let listener = Rc::new(RefCell::new(RecordingListener::default()));
    vm.set_listener(listener.clone());
    if let Err(err) = vm.parse::<H>(trace::Origin::String("testing.tex".into()), input.into()) {
        panic!("parsing failed:\n{err}");
    }
    let events = std::mem::take(&mut listener.borrow_mut().events);
    events
}

struct ResolvedOptions<'a, S> {
    built_in_commands: &'a dyn Fn() -> HashMap<&'static str, command::BuiltIn<S>>,
    custom_vm_initialization: &'a dyn Fn(&mut VM<S>),
    allow_undefined_commands: bool,
    recover_from_errors: bool,
}

impl<'a, S> ResolvedOptions<'a, S> {
    pub fn new(options: &'a [TestOption<S>]) -> Self {
        let mut resolved = Self {
            built_in_commands: &HashMap::new,
            custom_vm_initialization: &|_| {},
            allow_undefined_commands: false,
            recover_from_errors: false,
        };
        for option in options {
            match option {
                TestOption::BuiltInCommands(f) => resolved.built_in_commands = f,
                TestOption::BuiltInCommandsDyn(f) => resolved.built_in_commands = f,
                TestOption::CustomVMInitialization(f) => resolved.custom_vm_initialization = f,
                TestOption::CustomVMInitializationDyn(f) => resolved.custom_vm_initialization = f,
                TestOption::AllowUndefinedCommands(b) => resolved.allow_undefined_commands = *b,
                TestOption::RecoverFromErrors(b) => resolved.recover_from_errors = *b,
            }
        }
        resolved
    }
}

fn initialize_vm<S: Default + ParserState>(options: &ResolvedOptions<S>) -> Box<VM<S>> {
    let mut vm = VM::<S>::new((options.built_in_commands)());
    (options.custom_vm_initialization)(&mut vm);
    vm
}

fn set_flags<S: HasComponent<TestingComponent>>(vm: &mut VM<S>, options: &ResolvedOptions<S>) {
    let component = vm.state.component_mut();
    component.allow_undefined_command = options.allow_undefined_commands;
    component.recover_from_errors = options.recover_from_errors;
    *component.num_recovered_errors.borrow_mut() = 0;
}

/// Execute source code in a VM with the provided options.
fn execute_source_code<S>(
    vm: &mut VM<S>,
    source: &str,
    options: &ResolvedOptions<S>,
) -> Result<Vec<token::Token>, Box<error::Error>>
where
    S: Default + HasComponent<TestingComponent>,
{
    set_flags(vm, options);
    vm.parse::<Handlers>(trace::Origin::String("testing.tex".into()), source.into())?;
    Ok(vm.state.component_mut().take_tokens())
}

struct Handlers;

impl<S: HasComponent<TestingComponent>> vm::Handlers<S> for Handlers {
    fn character_handler(
        token: token::Token,
        input: &mut vm::ExecutionInput<S>,
    ) -> Result<(), Box<error::Error>> {
        input.state_mut().component_mut().tokens.push(token);
        Ok(())
    }

    fn undefined_command_handler(
        token: token::Token,
        input: &mut vm::ExecutionInput<S>,
    ) -> Result<(), Box<error::Error>> {
        if input.state().component().allow_undefined_command {
            input.state_mut().component_mut().tokens.push(token);
            Ok(())
        } else {
            input.error(error::UndefinedCommandError::new(input.vm(), token))
        }
    }

    fn unexpanded_expansion_command(
        token: token::Token,
        input: &mut vm::ExecutionInput<S>,
    ) -> Result<(), Box<error::Error>> {
        input.state_mut().component_mut().tokens.push(token);
        Ok(())
    }
}

/// An event received by a [RecordingListener].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BeginParse,
    EndParse,
    BeginGroup(GroupKind),
    EndGroup(GroupKind),
    /// Consecutive writes with the same settings are merged into one event.
    Write(String, Settings),
    Par,
    Tab,
    Verb(String, bool),
    Href(String, String),
    IncludeGraphics(Vec<(String, String)>, String),
    Input(PathBuf),
    FileReference(PathBuf),
    Subscript(String),
    Superscript(String),
    Warning(error::Kind),
    Substituting(String, String),
    Skipping(String),
    Message(String),
}

impl Event {
    /// Returns a write event with default settings.
    pub fn text(s: &str) -> Event {
        Event::Write(s.into(), Default::default())
    }
}

/// A listener that records every event it receives.
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub events: Vec<Event>,
}

impl Listener for RecordingListener {
    fn begin_parse(&mut self, _: &trace::Origin) {
        self.events.push(Event::BeginParse);
    }

    fn end_parse(&mut self) {
        self.events.push(Event::EndParse);
    }

    fn begin_group(&mut self, group: &Group) {
        self.events.push(Event::BeginGroup(group.kind.clone()));
    }

    fn end_group(&mut self, group: &Group) {
        self.events.push(Event::EndGroup(group.kind.clone()));
    }

    fn write(&mut self, text: &str, settings: &Settings) {
        if let Some(Event::Write(last, last_settings)) = self.events.last_mut() {
            if last_settings == settings {
                last.push_str(text);
                return;
            }
        }
        self.events.push(Event::Write(text.into(), settings.clone()));
    }

    fn par(&mut self) {
        self.events.push(Event::Par);
    }

    fn tab(&mut self) {
        self.events.push(Event::Tab);
    }

    fn verb(&mut self, text: &str, starred: bool) {
        self.events.push(Event::Verb(text.into(), starred));
    }

    fn href(&mut self, url: &str, text: &str) {
        self.events.push(Event::Href(url.into(), text.into()));
    }

    fn includegraphics(&mut self, options: &[(String, String)], name: &str) {
        self.events
            .push(Event::IncludeGraphics(options.to_vec(), name.into()));
    }

    fn input(&mut self, path: &Path) {
        self.events.push(Event::Input(path.into()));
    }

    fn add_file_reference(&mut self, path: &Path) {
        self.events.push(Event::FileReference(path.into()));
    }

    fn subscript(&mut self, _: &Object, text: &str) {
        self.events.push(Event::Subscript(text.into()));
    }

    fn superscript(&mut self, _: &Object, text: &str) {
        self.events.push(Event::Superscript(text.into()));
    }

    fn warning(&mut self, error: &error::Error) {
        self.events.push(Event::Warning(error.kind()));
    }

    fn substituting(&mut self, original: &str, replacement: &str) {
        self.events
            .push(Event::Substituting(original.into(), replacement.into()));
    }

    fn skipping(&mut self, ignoreable: &Ignoreable) {
        self.events.push(Event::Skipping(ignoreable.text.clone()));
    }

    fn message(&mut self, text: &str) {
        self.events.push(Event::Message(text.into()));
    }
}

/// A file system that holds files in memory.
///
/// Install it in a VM using the [TestOption::CustomVMInitialization] option.
#[derive(Debug, Default)]
pub struct InMemoryFileSystem {
    working_directory: PathBuf,
    files: HashMap<PathBuf, String>,
}

impl InMemoryFileSystem {
    /// Create a new in-memory file system.
    ///
    /// Typically the working directory is taken from the VM.
    pub fn new(working_directory: &Path) -> Self {
        Self {
            working_directory: working_directory.into(),
            files: Default::default(),
        }
    }

    /// Add a file to the in-memory file system.
    ///
    /// The provided path is relative to the working directory.
    pub fn add_file(&mut self, relative_path: &str, content: &str) {
        let path = self.working_directory.join(relative_path);
        self.files.insert(path, content.to_string());
    }
}

impl vm::FileSystem for InMemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        match self.files.get(path) {
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!["{} not found", path.display()],
            )),
            Some(content) => Ok(content.clone()),
        }
    }
}

/// Macro to generate a suite of unit tests
///
/// The general use of this macros looks like this:
/// ```
/// # use texparser_testing::*;
/// # use std::collections::HashMap;
/// # use texparser::command;
/// # fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> { HashMap::new() }
/// test_suite![
///     state(State),
///     options(TestOption::BuiltInCommands(built_in_commands)),
///     expansion_equality_tests(
///         (case_1, "lhs_1", "lhs_1"),
///         (case_2, "lhs_2", "lhs_2"),
///     ),
///     failure_tests(
///         (case_3, "{"),
///     ),
/// ];
/// ```
///
/// The arguments to the macro are:
///
/// - `state(State)`: defines which Rust type to use as the VM state in the tests.
///     This can be omitted, in which case it defaults to the type name `State` in the current scope.
///
/// - `options(option_1, option_2, ..., option_n)`: options to pass to the test runner.
///     This is a list of values of type [TestOption].
///     The options can be omitted, in which case they default to `options(TestOption::BuiltInCommands(built_in_commands))`.
///     In this case `built_in_commands` is a static function that returns a list of built-in commands
///     to initialize the VM with.
///
/// - `expansion_equality_tests(cases...)`: a list of expansion equality test cases.
///     Each case is of the form (case name, left hand side, right hand side).
///     The data here is fed into the [run_expansion_equality_test] test runner.
///
/// - `failure_tests(cases...)`: a list of failure test cases.
///     Each case is of the form (case name, input).
///     The data here is fed into the [run_failure_test] test runner.
///
/// - `recoverable_failure_tests(cases...)`: a list of recoverable failure test cases.
///     Each case is of the form (case name, input, output after recovery).
///     The data here is fed into the [run_recoverable_failure_test] test runner.
///
/// Only one `state()` argument may be provided, and if provided it must be in the first position.
/// Only one `options()` argument may be provided, and if provided it must be in the first position
///     or after the `state()` argument.
/// Zero or more of the other arguments may be provided, and in any order.
#[macro_export]
macro_rules! test_suite {
    ( state($state: ty), options $options: tt, expansion_equality_tests ( $( ($name: ident, $lhs: expr, $rhs: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let lhs = $lhs;
                let rhs = $rhs;
                let options = vec! $options;
                texparser_testing::run_expansion_equality_test::<$state>(&lhs, &rhs, false, &options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, expansion_equality_tests $test_body: tt $(,)? ) => (
        compile_error!("Invalid test cases for expansion_equality_tests: must be a list of tuples (name, lhs, rhs)");
    );
    ( state($state: ty), options $options: tt, failure_tests ( $( ($name: ident, $input: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let input = $input;
                let options = vec! $options;
                texparser_testing::run_failure_test::<$state>(&input, &options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, recoverable_failure_tests ( $( ($name: ident, $lhs: expr, $rhs: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let lhs = $lhs;
                let rhs = $rhs;
                let options = vec! $options;
                texparser_testing::run_recoverable_failure_test::<$state>(&lhs, &rhs, options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, $test_kind: ident $test_cases: tt $(,)? ) => (
        compile_error!("Invalid keyword: test_suite! only accepts the following keywords: `state`, `options`, `expansion_equality_tests`, `failure_tests`, `recoverable_failure_tests`");
    );
    ( state($state: ty), options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        $(
            texparser_testing::test_suite![state($state), options $options, $test_kind $test_cases,];
        )+
    );
    ( options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        texparser_testing::test_suite![state(State), options $options, $( $test_kind $test_cases, )+ ];
    );
    ( $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        texparser_testing::test_suite![options (texparser_testing::TestOption::BuiltInCommands(built_in_commands)), $( $test_kind $test_cases, )+ ];
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([("integer", TestingComponent::get_integer())])
    }

    #[test]
    fn plain_text() {
        run_expansion_equality_test::<State>(
            "a{b}c",
            "abc",
            false,
            &[TestOption::BuiltInCommands(built_in_commands)],
        );
    }

    #[test]
    fn undefined_command_fails() {
        let err = run_failure_test::<State>(r"\undefined", &[]);
        assert_eq!(err.kind(), error::Kind::UndefinedCommand);
    }

    #[test]
    fn undefined_command_recovers() {
        run_recoverable_failure_test::<State>(r"a\undefined b", "ab", vec![]);
    }

    #[test]
    fn undefined_command_allowed() {
        run_expansion_equality_test::<State>(
            r"\undefined",
            r"\undefined",
            false,
            &[TestOption::AllowUndefinedCommands(true)],
        );
    }

    #[test]
    fn integer_variable() {
        run_expansion_equality_test::<State>(
            r"\integer=5 x",
            "x",
            false,
            &[TestOption::BuiltInCommands(built_in_commands)],
        );
    }

    #[test]
    fn recording_listener_merges_writes() {
        let mut listener = RecordingListener::default();
        let settings = Settings::default();
        listener.write("a", &settings);
        listener.write("b", &settings);
        listener.par();
        listener.write("c", &settings);
        assert_eq!(
            listener.events,
            vec![Event::text("ab"), Event::Par, Event::text("c")]
        );
    }

    #[test]
    fn in_memory_file_system() {
        use vm::FileSystem;
        let mut file_system = InMemoryFileSystem::new(Path::new("/work"));
        file_system.add_file("a.tex", "content");
        assert_eq!(
            file_system.read_to_string(Path::new("/work/a.tex")).unwrap(),
            "content"
        );
        assert!(file_system
            .read_to_string(Path::new("/work/b.tex"))
            .is_err());
    }
}
