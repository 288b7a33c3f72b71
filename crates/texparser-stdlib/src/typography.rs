//! Fonts, sizes and colors
//!
//! Switches like `\bfseries` change the settings of the current group.
//! Text commands like `\textbf{text}` open a group, apply the change and
//!     close the group after the argument.

use texparser::object::GroupKind;
use texparser::prelude as txl;
use texparser::settings::{Family, Settings, Shape, Size, Weight};
use texparser::token::Token;
use texparser::traits::*;
use texparser::*;

type Change = fn(&mut Settings);

fn switch<S: ParserState>(
    _: Token,
    input: &mut vm::ExecutionInput<S>,
    change: Change,
) -> txl::Result<()> {
    change(input.settings_mut());
    Ok(())
}

fn scoped<S: ParserState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
    change: Change,
) -> txl::Result<()> {
    let argument = parse::pop_arg(input)?;
    input.begin_group(GroupKind::Brace, token);
    change(input.settings_mut());
    push_argument_and_close(token, input, argument);
    Ok(())
}

fn push_argument_and_close<S: ParserState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
    mut argument: Vec<Token>,
) {
    argument.push(Token::new_end_group('}', token.trace_key()));
    input.push_expansion(&argument);
}

macro_rules! settings_commands {
    ( $( ($getter: ident, $apply: ident, $doc: literal, $change: expr) ),* $(,)? ) => {
        $(
            #[doc = $doc]
            pub fn $getter<S: ParserState>() -> command::BuiltIn<S> {
                fn execution_fn<S: ParserState>(
                    token: Token,
                    input: &mut vm::ExecutionInput<S>,
                ) -> txl::Result<()> {
                    $apply(token, input, $change)
                }
                command::BuiltIn::new_execution(execution_fn).with_doc($doc)
            }
        )*
    };
}

settings_commands![
    (get_rmfamily, switch, "Switch to the roman font family", |s: &mut Settings| s.family = Family::Roman),
    (get_sffamily, switch, "Switch to the sans serif font family", |s: &mut Settings| s.family = Family::SansSerif),
    (get_ttfamily, switch, "Switch to the typewriter font family", |s: &mut Settings| s.family = Family::Typewriter),
    (get_mdseries, switch, "Switch to the medium font weight", |s: &mut Settings| s.weight = Weight::Medium),
    (get_bfseries, switch, "Switch to the bold font weight", |s: &mut Settings| s.weight = Weight::Bold),
    (get_upshape, switch, "Switch to the upright font shape", |s: &mut Settings| s.shape = Shape::Upright),
    (get_itshape, switch, "Switch to the italic font shape", |s: &mut Settings| s.shape = Shape::Italic),
    (get_slshape, switch, "Switch to the slanted font shape", |s: &mut Settings| s.shape = Shape::Slanted),
    (get_scshape, switch, "Switch to the small caps font shape", |s: &mut Settings| s.shape = Shape::SmallCaps),
    (get_em, switch, "Toggle emphasis", |s: &mut Settings| s.toggle_emphasis()),
    (get_normalfont, switch, "Reset the font family, weight and shape", normal_font),
    (get_textrm, scoped, "Typeset the argument in the roman font family", |s: &mut Settings| s.family = Family::Roman),
    (get_textsf, scoped, "Typeset the argument in the sans serif font family", |s: &mut Settings| s.family = Family::SansSerif),
    (get_texttt, scoped, "Typeset the argument in the typewriter font family", |s: &mut Settings| s.family = Family::Typewriter),
    (get_textbf, scoped, "Typeset the argument in bold", |s: &mut Settings| s.weight = Weight::Bold),
    (get_textit, scoped, "Typeset the argument in italics", |s: &mut Settings| s.shape = Shape::Italic),
    (get_textsl, scoped, "Typeset the argument slanted", |s: &mut Settings| s.shape = Shape::Slanted),
    (get_textsc, scoped, "Typeset the argument in small caps", |s: &mut Settings| s.shape = Shape::SmallCaps),
    (get_emph, scoped, "Emphasize the argument", |s: &mut Settings| s.toggle_emphasis()),
    (get_tiny, switch, "Switch to the tiny font size", |s: &mut Settings| s.size = Size::Tiny),
    (get_scriptsize, switch, "Switch to the script font size", |s: &mut Settings| s.size = Size::ScriptSize),
    (get_footnotesize, switch, "Switch to the footnote font size", |s: &mut Settings| s.size = Size::FootnoteSize),
    (get_small, switch, "Switch to the small font size", |s: &mut Settings| s.size = Size::Small),
    (get_normalsize, switch, "Switch to the normal font size", |s: &mut Settings| s.size = Size::NormalSize),
    (get_large, switch, "Switch to the large font size, \\large", |s: &mut Settings| s.size = Size::Large),
    (get_larger, switch, "Switch to the larger font size, \\Large", |s: &mut Settings| s.size = Size::Larger),
    (get_largest, switch, "Switch to the largest font size, \\LARGE", |s: &mut Settings| s.size = Size::Largest),
    (get_huge, switch, "Switch to the huge font size, \\huge", |s: &mut Settings| s.size = Size::Huge),
    (get_hugest, switch, "Switch to the hugest font size, \\Huge", |s: &mut Settings| s.size = Size::Hugest),
];

fn normal_font(settings: &mut Settings) {
    settings.family = Family::default();
    settings.shape = Shape::default();
    settings.weight = Weight::default();
}

/// Returns the name of the command that selects each size, with its getter.
pub fn size_commands<S: ParserState>() -> [(&'static str, command::BuiltIn<S>); 10] {
    [
        ("tiny", get_tiny()),
        ("scriptsize", get_scriptsize()),
        ("footnotesize", get_footnotesize()),
        ("small", get_small()),
        ("normalsize", get_normalsize()),
        ("large", get_large()),
        ("Large", get_larger()),
        ("LARGE", get_largest()),
        ("huge", get_huge()),
        ("Huge", get_hugest()),
    ]
}

pub const COLOR_DOC: &str = "Switch the text color, \\color[model]{name}";
pub const TEXTCOLOR_DOC: &str = "Typeset the argument in a color, \\textcolor[model]{name}{text}";

/// Get the `\color` command.
pub fn get_color<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(color_fn).with_doc(COLOR_DOC)
}

fn color_fn<S: ParserState>(_: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    let color = pop_color(input)?;
    input.settings_mut().foreground = Some(color);
    Ok(())
}

/// Get the `\textcolor` command.
pub fn get_textcolor<S: ParserState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(textcolor_fn).with_doc(TEXTCOLOR_DOC)
}

fn textcolor_fn<S: ParserState>(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    let color = pop_color(input)?;
    let argument = parse::pop_arg(input)?;
    input.begin_group(GroupKind::Brace, token);
    input.settings_mut().foreground = Some(color);
    push_argument_and_close(token, input, argument);
    Ok(())
}

// A color given with a model, like \color[rgb]{1,0,0}, is recorded as "rgb:1,0,0".
fn pop_color<S: ParserState>(input: &mut vm::ExecutionInput<S>) -> txl::Result<String> {
    let model = match parse::pop_opt_arg(input)? {
        None => None,
        Some(tokens) => {
            let tokens = vm::expand_fully(tokens, input)?;
            Some(token::write_tokens(&tokens, input.vm().cs_name_interner()))
        }
    };
    let name = parse::pop_label_string(input)?;
    Ok(match model {
        None => name,
        Some(model) => format!["{}:{}", model.trim(), name],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{def, output, prefix};
    use std::collections::HashMap;
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
        let mut m = HashMap::from([
            ("bfseries", get_bfseries()),
            ("color", get_color()),
            ("def", def::get_def()),
            ("em", get_em()),
            ("emph", get_emph()),
            ("itshape", get_itshape()),
            ("normalfont", get_normalfont()),
            ("textbf", get_textbf()),
            ("textcolor", get_textcolor()),
            ("texttt", get_texttt()),
            ("ttfamily", get_ttfamily()),
        ]);
        m.extend(size_commands());
        m
    }

    fn run(source: &str) -> Vec<Event> {
        run_listener_test::<State, output::Handlers>(
            source,
            &[TestOption::BuiltInCommands(built_in_commands)],
        )
    }

    fn wrapped(events: Vec<Event>) -> Vec<Event> {
        let mut all = vec![Event::BeginParse];
        all.extend(events);
        all.push(Event::EndParse);
        all
    }

    fn styled(s: &str, change: Change) -> Event {
        let mut settings = Settings::default();
        change(&mut settings);
        Event::Write(s.into(), settings)
    }

    #[test]
    fn switch_is_local_to_group() {
        assert_eq!(
            run(r"{\bfseries a}b"),
            wrapped(vec![
                Event::BeginGroup(GroupKind::Brace),
                styled("a", |s| s.weight = Weight::Bold),
                Event::EndGroup(GroupKind::Brace),
                Event::text("b"),
            ])
        );
    }

    #[test]
    fn text_command_opens_a_group() {
        assert_eq!(
            run(r"\textbf{a}b"),
            wrapped(vec![
                Event::BeginGroup(GroupKind::Brace),
                styled("a", |s| s.weight = Weight::Bold),
                Event::EndGroup(GroupKind::Brace),
                Event::text("b"),
            ])
        );
    }

    #[test]
    fn text_command_with_single_token_argument() {
        assert_eq!(
            run(r"\texttt ab"),
            wrapped(vec![
                Event::BeginGroup(GroupKind::Brace),
                styled("a", |s| s.family = Family::Typewriter),
                Event::EndGroup(GroupKind::Brace),
                Event::text("b"),
            ])
        );
    }

    #[test]
    fn nested_emphasis_toggles() {
        assert_eq!(
            run(r"\emph{a\emph{b}}"),
            wrapped(vec![
                Event::BeginGroup(GroupKind::Brace),
                styled("a", |s| s.shape = Shape::Emphasized),
                Event::BeginGroup(GroupKind::Brace),
                Event::text("b"),
                Event::EndGroup(GroupKind::Brace),
                Event::EndGroup(GroupKind::Brace),
            ])
        );
    }

    #[test]
    fn em_inside_italics_is_upright() {
        assert_eq!(
            run(r"\itshape a\em b"),
            wrapped(vec![
                styled("a", |s| s.shape = Shape::Italic),
                Event::text("b"),
            ])
        );
    }

    #[test]
    fn normalfont_resets_the_font() {
        assert_eq!(
            run(r"\ttfamily\bfseries a\normalfont b"),
            wrapped(vec![
                styled("a", |s| {
                    s.family = Family::Typewriter;
                    s.weight = Weight::Bold;
                }),
                Event::text("b"),
            ])
        );
    }

    #[test]
    fn size_switch() {
        assert_eq!(
            run(r"\Large a\tiny b"),
            wrapped(vec![
                styled("a", |s| s.size = Size::Larger),
                styled("b", |s| s.size = Size::Tiny),
            ])
        );
    }

    #[test]
    fn color_switch() {
        assert_eq!(
            run(r"{\color{red}a}b"),
            wrapped(vec![
                Event::BeginGroup(GroupKind::Brace),
                styled("a", |s| s.foreground = Some("red".into())),
                Event::EndGroup(GroupKind::Brace),
                Event::text("b"),
            ])
        );
    }

    #[test]
    fn color_with_model() {
        assert_eq!(
            run(r"\color[rgb]{1,0,0}a"),
            wrapped(vec![styled("a", |s| s.foreground = Some("rgb:1,0,0".into()))])
        );
    }

    #[test]
    fn textcolor() {
        assert_eq!(
            run(r"\def\c{blue}\textcolor{\c}{a}b"),
            wrapped(vec![
                Event::BeginGroup(GroupKind::Brace),
                styled("a", |s| s.foreground = Some("blue".into())),
                Event::EndGroup(GroupKind::Brace),
                Event::text("b"),
            ])
        );
    }

    test_suite![
        expansion_equality_tests(
            (text_command_output, r"\textbf{a}b", "ab"),
            (switch_output, r"{\bfseries a}b", "ab"),
            (textcolor_output, r"\textcolor{red}{a}b", "ab"),
        ),
        failure_tests(
            (textbf_end_of_input, r"\textbf"),
            (color_end_of_input, r"\color"),
            (textcolor_end_of_input, r"\textcolor{red}"),
            (text_command_unclosed, r"\textbf{a"),
        ),
    ];
}
