//! A listener that flattens the document to plain text.

use std::io::Write;
use texparser::error::Error;
use texparser::object::Object;
use texparser::settings::Settings;
use texparser::traits::Listener;

/// Collects the text of a document and reports warnings as they happen.
pub struct PlainText {
    text: String,
    diagnostics: Box<dyn Write>,
    json_errors: bool,
}

impl PlainText {
    pub fn new(diagnostics: Box<dyn Write>, json_errors: bool) -> PlainText {
        PlainText {
            text: String::new(),
            diagnostics,
            json_errors,
        }
    }

    /// Returns the text collected so far with surrounding whitespace trimmed,
    ///     and clears it.
    pub fn take_text(&mut self) -> String {
        let text = std::mem::take(&mut self.text);
        text.trim().to_string()
    }

    fn script(&mut self, marker: char, text: &str) {
        self.text.push(marker);
        if text.chars().count() == 1 {
            self.text.push_str(text);
        } else {
            self.text.push('{');
            self.text.push_str(text);
            self.text.push('}');
        }
    }
}

/// Renders an error for the terminal, or as a single line of JSON.
pub fn format_error(error: &Error, json: bool) -> String {
    if !json {
        return format!["{error}"];
    }
    match serde_json::to_string(error) {
        Ok(s) => s,
        Err(err) => format!["{{\"kind\":\"Io\",\"title\":\"{err}\"}}"],
    }
}

impl Listener for PlainText {
    fn write(&mut self, text: &str, _: &Settings) {
        self.text.push_str(text);
    }

    fn par(&mut self) {
        let trimmed = self.text.trim_end_matches([' ', '\t']).len();
        self.text.truncate(trimmed);
        if !self.text.is_empty() && !self.text.ends_with("\n\n") {
            self.text.push_str("\n\n");
        }
    }

    fn tab(&mut self) {
        self.text.push('\t');
    }

    fn verb(&mut self, text: &str, _: bool) {
        self.text.push_str(text);
    }

    fn href(&mut self, url: &str, text: &str) {
        if text.is_empty() || text == url {
            self.text.push_str(url);
        } else {
            self.text.push_str(&format!["{text} <{url}>"]);
        }
    }

    fn subscript(&mut self, _: &Object, text: &str) {
        self.script('_', text);
    }

    fn superscript(&mut self, _: &Object, text: &str) {
        self.script('^', text);
    }

    fn warning(&mut self, error: &Error) {
        let rendered = format_error(error, self.json_errors);
        _ = writeln!(self.diagnostics, "{rendered}");
    }
}
