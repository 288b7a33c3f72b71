//! User defined macros
//!
//! A macro is defined by a prefix, a list of parameters and a replacement text.
//! In `\def\a x#1y#2{(#2,#1)}` the prefix is `x`, the first parameter is delimited by `y`,
//!     the second parameter is undelimited and the replacement text is `(#2,#1)`.
//!
//! Calling a macro reads its arguments from the unexpanded input, substitutes them into
//!     the replacement text and puts the result back at the front of the input.
//! Arguments are substituted as they are, without expansion, and the result is
//!     expanded later when it is read again.

use crate::error;
use crate::parse;
use crate::prelude as txl;
use crate::token;
use crate::token::Token;
use crate::token::Value;
use crate::traits::*;
use crate::vm;
use texparser_stdext::algorithms::substringsearch::Matcher;
use texparser_stdext::color::Colorize;

/// A TeX Macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    long: bool,
    protected: bool,
    prefix: Vec<Token>,
    parameters: Vec<Parameter>,
    replacements: Vec<Replacement>,
}

/// A token list or parameter in a replacement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// A list of tokens, stored in reverse order.
    Tokens(Vec<Token>),

    /// A parameter.
    ///
    /// In order to be valid, the parameter's index must be less than the number
    /// of parameters in the macro.
    Parameter(usize),
}

/// A macro parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// A parameter that takes a single token or a braced group.
    Undelimited,
    /// A parameter that takes everything up to the first balanced occurrence of the delimiter.
    Delimited(Matcher<Value>),
}

impl Macro {
    /// Create a new macro.
    ///
    /// The token lists in the replacement text are given in reading order.
    pub fn new(
        prefix: Vec<Token>,
        parameters: Vec<Parameter>,
        replacement_text: Vec<Replacement>,
    ) -> Macro {
        let replacements = replacement_text
            .into_iter()
            .map(|replacement| match replacement {
                Replacement::Tokens(mut tokens) => {
                    tokens.reverse();
                    Replacement::Tokens(tokens)
                }
                parameter => parameter,
            })
            .collect();
        Macro {
            long: false,
            protected: false,
            prefix,
            parameters,
            replacements,
        }
    }

    /// Whether arguments to the macro may contain `\par`.
    pub fn with_long(mut self, long: bool) -> Macro {
        self.long = long;
        self
    }

    /// Whether the macro is left unexpanded inside `\edef` and `\xdef`.
    pub fn with_protected(mut self, protected: bool) -> Macro {
        self.protected = protected;
        self
    }

    pub fn is_long(&self) -> bool {
        self.long
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    /// Reads the macro's arguments from the input and pushes its expansion to the front of the input.
    pub fn call<S: ParserState>(
        &self,
        token: Token,
        input: &mut vm::ExpansionInput<S>,
    ) -> txl::Result<()> {
        remove_tokens_from_stream(token, &self.prefix, input.unexpanded())?;
        let mut argument_indices: Vec<(usize, usize)> = Vec::with_capacity(self.parameters.len());
        let mut argument_tokens = input.checkout_token_buffer();
        for (i, parameter) in self.parameters.iter().enumerate() {
            let start_index = argument_tokens.len();
            let trim_outer_braces = match parameter.parse_argument(input, i, &mut argument_tokens) {
                Ok(trim_outer_braces) => trim_outer_braces,
                Err(err) => {
                    input.return_token_buffer(argument_tokens);
                    return Err(err);
                }
            };
            let element = match trim_outer_braces {
                true => (start_index + 1, argument_tokens.len() - 1),
                false => (start_index, argument_tokens.len()),
            };
            argument_indices.push(element);
        }
        if !self.long {
            let par_value = input.vm().par_value();
            if let Some(par) = argument_tokens.iter().find(|t| t.value() == par_value) {
                let err = input.fatal_error(
                    error::SimpleTokenError::new(*par, "paragraph ended before the macro's arguments were complete")
                        .with_note("only macros defined with \\long may take arguments containing \\par"),
                );
                input.return_token_buffer(argument_tokens);
                return Err(err);
            }
        }

        let arguments: Vec<&[Token]> = argument_indices
            .iter()
            .map(|(i, j)| &argument_tokens[*i..*j])
            .collect();

        let result = input.expansions_mut();
        let num_tokens = Macro::perform_replacement(&self.replacements, &arguments, result);

        let result = input.expansions();
        S::post_macro_expansion_hook(
            token,
            input,
            self,
            &arguments,
            &result[result.len() - num_tokens..result.len()],
        );
        drop(arguments);
        input.return_token_buffer(argument_tokens);
        Ok(())
    }

    /// Returns the macro's meaning as `\meaning` prints it, e.g. `macro:#1->(#1)`.
    pub fn meaning(&self, interner: &token::CsNameInterner) -> String {
        let mut d = String::new();
        if self.protected {
            d.push_str("\\protected ");
        }
        if self.long {
            d.push_str("\\long ");
        }
        d.push_str("macro:");
        d.push_str(&token::write_tokens(&self.prefix, interner));
        for (i, parameter) in self.parameters.iter().enumerate() {
            d.push_str(&format!["#{}", i + 1]);
            if let Parameter::Delimited(matcher) = parameter {
                d.push_str(&write_token_values(matcher.pattern(), interner));
            }
        }
        d.push_str("->");
        for replacement in &self.replacements {
            match replacement {
                Replacement::Parameter(i) => d.push_str(&format!["#{}", i + 1]),
                Replacement::Tokens(tokens) => {
                    let tokens: Vec<Token> = tokens.iter().rev().copied().collect();
                    d.push_str(&token::write_tokens(&tokens, interner));
                }
            }
        }
        d
    }

    /// Returns a description of the macro for the command documentation tool.
    pub fn doc(&self, interner: &token::CsNameInterner) -> String {
        let mut d = String::default();
        d.push_str("User defined macro\n\n");
        d.push_str(&format![
            "{}\n{}",
            "Parameters definition".italic(),
            pretty_print_prefix_and_parameters(&self.prefix, &self.parameters, interner),
        ]);
        d.push_str(&format![
            "\n\n{} `{}`\n",
            "Replacement definition:".italic(),
            pretty_print_replacement_text(&self.replacements, interner),
        ]);
        d
    }

    fn perform_replacement(
        replacements: &[Replacement],
        arguments: &[&[Token]],
        result: &mut Vec<Token>,
    ) -> usize {
        let mut output_size = 0;
        for replacement in replacements.iter() {
            output_size += match replacement {
                Replacement::Tokens(tokens) => tokens.len(),
                Replacement::Parameter(i) => arguments.get(*i).map(|a| a.len()).unwrap_or(0),
            };
        }
        result.reserve(output_size);
        for replacement in replacements.iter().rev() {
            match replacement {
                Replacement::Tokens(tokens) => {
                    result.extend(tokens);
                }
                Replacement::Parameter(i) => {
                    if let Some(argument) = arguments.get(*i) {
                        result.extend(argument.iter().rev().copied());
                    }
                }
            }
        }
        output_size
    }
}

impl Parameter {
    fn parse_argument<S: ParserState>(
        &self,
        input: &mut vm::ExpansionInput<S>,
        index: usize,
        result: &mut Vec<Token>,
    ) -> txl::Result<bool> {
        match self {
            Parameter::Undelimited => {
                Parameter::parse_undelimited_argument(input.unexpanded(), index + 1, result)?;
                Ok(false)
            }
            Parameter::Delimited(matcher) => {
                Parameter::parse_delimited_argument(input.unexpanded(), matcher, index + 1, result)
            }
        }
    }

    fn parse_delimited_argument<S: ParserState>(
        stream: &mut vm::UnexpandedStream<S>,
        matcher_factory: &Matcher<Value>,
        param_num: usize,
        result: &mut Vec<Token>,
    ) -> txl::Result<bool> {
        let mut matcher = matcher_factory.start();
        let mut scope_depth = 0;

        // A delimiter ending in `{` (the `#{` syntax) is found at depth 1:
        // the `{` itself has been counted and everything before it is balanced.
        let closing_scope_depth = match matcher_factory.pattern().last() {
            Some(token::Value::BeginGroup(_)) => 1,
            _ => 0,
        };
        let start_index = result.len();
        loop {
            let token = stream.next_or_err(DelimitedArgumentEndOfInputError {
                param_num,
                delimiter_len: matcher_factory.pattern().len(),
            })?;
            match token.value() {
                token::Value::BeginGroup(_) => {
                    scope_depth += 1;
                }
                token::Value::EndGroup(_) => {
                    scope_depth -= 1;
                }
                _ => (),
            };
            let matches_delimiter = matcher.next(&token.value());
            result.push(token);
            if scope_depth == closing_scope_depth && matches_delimiter {
                for _ in 0..matcher_factory.pattern().len() {
                    result.pop();
                }
                return Ok(Parameter::should_trim_outer_braces_if_present(
                    &result[start_index..],
                ));
            }
        }
    }

    // `{ab}` is trimmed but `{a}{b}` is not.
    fn should_trim_outer_braces_if_present(list: &[Token]) -> bool {
        if list.len() <= 1 {
            return false;
        }
        match (list[0].value(), list[list.len() - 1].value()) {
            (token::Value::BeginGroup(_), token::Value::EndGroup(_)) => (),
            _ => return false,
        }
        let mut depth = 0_usize;
        for (i, token) in list.iter().enumerate() {
            match token.value() {
                token::Value::BeginGroup(_) => depth += 1,
                token::Value::EndGroup(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && i + 1 < list.len() {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }

    fn parse_undelimited_argument<S: ParserState>(
        input: &mut vm::UnexpandedStream<S>,
        param_num: usize,
        result: &mut Vec<Token>,
    ) -> txl::Result<()> {
        let token = loop {
            let token = input.next_or_err(UnDelimitedArgumentEndOfInputError { param_num })?;
            if !matches!(token.value(), token::Value::Space(_)) {
                break token;
            }
        };
        match token.value() {
            token::Value::BeginGroup(_) => parse::finish_parsing_balanced_tokens(input, token, result),
            _ => {
                result.push(token);
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
struct DelimitedArgumentEndOfInputError {
    param_num: usize,
    delimiter_len: usize,
}

impl error::EndOfInputError for DelimitedArgumentEndOfInputError {
    fn doing(&self) -> String {
        "parsing a delimited argument for a macro".into()
    }
    fn notes(&self) -> Vec<String> {
        vec![
            format!("this is argument number {} for this macro", self.param_num),
            format!(
                "the argument ends at the first balanced occurrence of its {} delimiter token(s)",
                self.delimiter_len
            ),
        ]
    }
}

#[derive(Debug)]
struct UnDelimitedArgumentEndOfInputError {
    param_num: usize,
}

impl error::EndOfInputError for UnDelimitedArgumentEndOfInputError {
    fn doing(&self) -> String {
        "parsing an undelimited argument for a macro".into()
    }
    fn notes(&self) -> Vec<String> {
        vec![format!("this is argument number {} for this macro", self.param_num)]
    }
}

fn colored_parameter_number(n: usize) -> String {
    let s = format!["#{n}"];
    match n {
        1 => format!["{}", s.as_str().bright_yellow().bold()],
        _ => format!["{}", s.as_str().bright_blue().bold()],
    }
}

fn write_token_values(values: &[Value], interner: &token::CsNameInterner) -> String {
    let tokens: Vec<Token> = values
        .iter()
        .map(|v| Token::new_from_value(*v, token::trace::Key::dummy()))
        .collect();
    token::write_tokens(&tokens, interner)
}

fn pretty_print_prefix_and_parameters(
    prefix: &[Token],
    parameters: &[Parameter],
    interner: &token::CsNameInterner,
) -> String {
    let mut d = String::default();
    if prefix.is_empty() {
        d.push_str(" . No prefix\n");
    } else {
        d.push_str(&format![
            " . Prefix: `{}`\n",
            token::write_tokens(prefix, interner)
        ]);
    }

    d.push_str(&format![" . Parameters ({}):\n", parameters.len()]);
    for (i, parameter) in parameters.iter().enumerate() {
        match parameter {
            Parameter::Undelimited => {
                d.push_str(&format![
                    "    {}: undelimited\n",
                    colored_parameter_number(i + 1),
                ]);
            }
            Parameter::Delimited(matcher) => {
                d.push_str(&format![
                    "    {}: delimited by `{}`\n",
                    colored_parameter_number(i + 1),
                    write_token_values(matcher.pattern(), interner)
                ]);
            }
        }
    }

    d.push_str(" . Full argument specification: `");
    d.push_str(&token::write_tokens(prefix, interner));
    for (i, parameter) in parameters.iter().enumerate() {
        d.push_str(&colored_parameter_number(i + 1));
        if let Parameter::Delimited(matcher) = parameter {
            d.push_str(&write_token_values(matcher.pattern(), interner));
        }
    }
    d.push('`');
    d
}

fn pretty_print_replacement_text(
    replacements: &[Replacement],
    interner: &token::CsNameInterner,
) -> String {
    let mut b = String::default();
    for replacement in replacements.iter() {
        match replacement {
            Replacement::Parameter(i) => {
                b.push_str(colored_parameter_number(*i + 1).as_str());
            }
            Replacement::Tokens(tokens) => {
                let tokens: Vec<Token> = tokens.iter().rev().copied().collect();
                b.push_str(&token::write_tokens(&tokens, interner));
            }
        }
    }
    b
}

/// Removes the provided tokens from the front of the stream.
///
/// Returns an error if the stream does not start with the tokens.
fn remove_tokens_from_stream<S: ParserState>(
    macro_token: Token,
    tokens: &[Token],
    stream: &mut vm::UnexpandedStream<S>,
) -> txl::Result<()> {
    for prefix_token in tokens.iter() {
        let stream_token = stream.next_or_err(PrefixEndOfInputError {})?;
        if stream_token.value() != prefix_token.value() {
            let name = match macro_token.command_ref() {
                Some(command_ref) => command_ref.to_string(stream.vm().cs_name_interner()),
                None => "the macro".into(),
            };
            return Err(stream.fatal_error(
                error::SimpleTokenError::new(
                    stream_token,
                    format!["use of {name} doesn't match its definition"],
                )
                .with_note("the tokens after the macro must match the prefix in its definition"),
            ));
        }
    }
    Ok(())
}

#[derive(Debug)]
struct PrefixEndOfInputError;

impl error::EndOfInputError for PrefixEndOfInputError {
    fn doing(&self) -> String {
        "matching the prefix of a user-defined macro".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(s: &str) -> Vec<Token> {
        s.chars()
            .map(|c| Token::new_letter(c, token::trace::Key::dummy()))
            .collect()
    }

    #[test]
    fn perform_replacement() {
        let replacements = vec![
            Replacement::Tokens(letters("ba")),
            Replacement::Parameter(1),
            Replacement::Parameter(0),
        ];
        let first = letters("xy");
        let second = letters("z");
        let mut result = vec![];
        let n = Macro::perform_replacement(&replacements, &[&first, &second], &mut result);
        assert_eq!(n, 5);
        result.reverse();
        assert_eq!(result, letters("abzxy"));
    }

    #[test]
    fn trim_outer_braces() {
        let open = Token::new_begin_group('{', token::trace::Key::dummy());
        let close = Token::new_end_group('}', token::trace::Key::dummy());
        let a = letters("a")[0];
        assert!(Parameter::should_trim_outer_braces_if_present(&[open, a, close]));
        assert!(!Parameter::should_trim_outer_braces_if_present(&[
            open, a, close, open, a, close
        ]));
        assert!(!Parameter::should_trim_outer_braces_if_present(&[a]));
    }

    #[test]
    fn meaning() {
        let interner = token::CsNameInterner::default();
        let m = Macro::new(
            vec![],
            vec![Parameter::Undelimited],
            vec![
                Replacement::Tokens(letters("(")),
                Replacement::Parameter(0),
                Replacement::Tokens(letters(")")),
            ],
        )
        .with_long(true);
        assert_eq!(m.meaning(&interner), "\\long macro:#1->(#1)");
    }
}
