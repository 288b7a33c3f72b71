//! Terminal rendering of errors
//!
//! An error is printed as a title, the line of source code it happened on
//!     with the offending token underlined, the error's notes, and finally
//!     the stack of commands that were running when it happened:
//!
//! ```text
//! Error: undefined control sequence
//!  --> main.tex:3:5
//!   |
//! 3 | abc \foo
//!   |     ^^^^ control sequence
//!   |
//!   = note: did you mean \for?
//! ```

use crate::error::{self, Error};
use crate::token::trace::SourceCodeTrace;
use texparser_stdext::color::{ColoredString, Colorize};

#[derive(Debug, Clone, Copy)]
enum LineKind {
    Error,
    Context,
}

impl LineKind {
    fn paint(&self, s: &str) -> ColoredString {
        match self {
            LineKind::Error => s.bright_red(),
            LineKind::Context => s.bright_yellow(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            LineKind::Error => "Error",
            LineKind::Context => "Context",
        }
    }
}

pub fn format_error(f: &mut std::fmt::Formatter<'_>, err: &Error) -> std::fmt::Result {
    let immediate_command = err.stack_trace.first();
    let (source, context) = match (&err.trace, immediate_command) {
        (Some(trace), _) => (Some(trace), immediate_command),
        (None, Some(frame)) => (Some(&frame.trace), None),
        (None, None) => (None, None),
    };
    let line = PrimaryLine {
        kind: LineKind::Error,
        source,
        title: err.error.title(),
        token_annotation: err.error.source_annotation(),
        notes: err.error.notes(),
    };
    write!(f, "{line}")?;

    if let Some(frame) = context {
        let mut notes = vec![];
        if err.stack_trace.len() > 1 {
            notes.push(format![
                "this is the full stack trace of the error:\n\n{}",
                ErrorStack(&err.stack_trace)
            ]);
        }
        let line = PrimaryLine {
            kind: LineKind::Context,
            source: Some(&frame.trace),
            title: format!["this error occurred while {}:", frame.operation.action()],
            token_annotation: "".into(),
            notes,
        };
        write!(f, "\n{line}")?;
    }
    Ok(())
}

struct PrimaryLine<'a> {
    kind: LineKind,
    source: Option<&'a SourceCodeTrace>,
    title: String,
    token_annotation: String,
    notes: Vec<String>,
}

impl<'a> std::fmt::Display for PrimaryLine<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{}: {}",
            self.kind.paint(self.kind.label()).bold(),
            self.title.as_str().bold()
        )?;
        let margin = match self.source {
            None => 1,
            Some(s) => s.line_number.to_string().len() + 1,
        };
        let printer = Printer { margin };
        if let Some(s) = self.source {
            printer.location(f, s)?;
            printer.line(f, "", '|', "")?;
            printer.line(
                f,
                &s.line_number.to_string(),
                '|',
                &highlight_substring(&s.line_content, s.index, s.value.chars().count()),
            )?;
            printer.line(
                f,
                "",
                '|',
                &format![
                    "{}{} {}",
                    " ".repeat(s.index),
                    self.kind.paint(&"^".repeat(s.value.chars().count().max(1))).bold(),
                    self.kind.paint(&self.token_annotation).bold(),
                ],
            )?;
        }
        for note in &self.notes {
            let mut note_lines = note.trim_end().lines();
            let first = match note_lines.next() {
                None => continue,
                Some(s) => s,
            };
            printer.line(f, "", '|', "")?;
            printer.line(f, "", '=', &format!["{} {}", "note:".bold(), first])?;
            for l in note_lines {
                printer.line(f, "", ' ', &format!["      {l}"])?;
            }
        }
        Ok(())
    }
}

struct Printer {
    margin: usize,
}

impl Printer {
    fn line(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        margin_content: &str,
        separator: char,
        content: &str,
    ) -> std::fmt::Result {
        let margin = format![
            "{}{} ",
            " ".repeat(self.margin.saturating_sub(margin_content.len() + 1)),
            margin_content
        ];
        writeln!(
            f,
            "{}{}{}",
            margin.as_str().bright_cyan(),
            format!["{separator} "].as_str().bright_cyan(),
            content.trim_end()
        )
    }

    fn location(&self, f: &mut std::fmt::Formatter<'_>, s: &SourceCodeTrace) -> std::fmt::Result {
        writeln!(
            f,
            "{}{} {}:{}:{}",
            " ".repeat(self.margin.saturating_sub(1)),
            "-->".bright_cyan().bold(),
            s.origin,
            s.line_number,
            s.index + 1
        )
    }
}

struct ErrorStack<'a>(&'a [error::StackTraceElement]);

impl<'a> std::fmt::Display for ErrorStack<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, frame) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let s = &frame.trace;
            let prefix = format!("  {}:{}:{}", s.origin, s.line_number, s.index + 1);
            writeln!(
                f,
                "{}  {}",
                prefix,
                highlight_substring(&s.line_content, s.index, s.value.chars().count())
            )?;
            write!(
                f,
                "{}  {} {}",
                " ".repeat(prefix.len() + s.index),
                LineKind::Context
                    .paint(&"^".repeat(s.value.chars().count().max(1)))
                    .bold(),
                frame.operation.action(),
            )?;
        }
        Ok(())
    }
}

fn highlight_substring(line: &str, start: usize, length: usize) -> String {
    let chars: Vec<char> = line.chars().collect();
    if chars.len() < start + length {
        return line.into();
    }
    let before: String = chars[..start].iter().collect();
    let middle: String = chars[start..start + length].iter().collect();
    let after: String = chars[start + length..].iter().collect();
    format!["{}{}{}", before, middle.as_str().bold(), after.trim_end()]
}
