//! The listener contract
//!
//! A listener receives everything the interpreter produces.
//! Each output format (HTML, plain text, a search index, ...) implements [Listener]
//!     and is installed in the VM with [crate::vm::VM::set_listener].
//!
//! The methods fall into three groups:
//!
//! - factory methods, which create the objects the VM tracks for open groups,
//! - sink methods, called when a command produces output,
//! - diagnostic hooks, called for warnings and substitutions.
//!
//! Every method has a default implementation that ignores the event,
//!     so a listener only implements what it cares about.

use crate::error::Error;
use crate::object::{Group, GroupKind, Ignoreable, Object};
use crate::settings::Settings;
use crate::token::trace::Origin;
use crate::token::Token;

/// Receiver of the interpreter's output.
pub trait Listener {
    /// Called when [crate::vm::VM::parse] starts.
    fn begin_parse(&mut self, origin: &Origin) {
        _ = origin;
    }

    /// Called when [crate::vm::VM::parse] finishes, whether or not it succeeded.
    fn end_parse(&mut self) {}

    /// Creates the object for a group that is opening.
    fn create_group(&mut self, kind: GroupKind, open: Token) -> Group {
        Group::new(kind, open)
    }

    /// Creates the object for a math group that is opening.
    fn create_math_group(&mut self, display: bool, open: Token) -> Group {
        Group::new(GroupKind::Math { display }, open)
    }

    /// Called after a group has opened.
    fn begin_group(&mut self, group: &Group) {
        _ = group;
    }

    /// Called after a group has closed.
    fn end_group(&mut self, group: &Group) {
        _ = group;
    }

    /// Writes text, typeset with the given settings.
    fn write(&mut self, text: &str, settings: &Settings) {
        _ = (text, settings);
    }

    /// A paragraph break.
    fn par(&mut self) {}

    /// An alignment tab, `&`.
    fn tab(&mut self) {}

    /// Verbatim text from `\verb`; `starred` is true for `\verb*`.
    fn verb(&mut self, text: &str, starred: bool) {
        _ = (text, starred);
    }

    /// A hyperlink.
    fn href(&mut self, url: &str, text: &str) {
        _ = (url, text);
    }

    /// An included graphic, with its `key=value` options in order.
    fn includegraphics(&mut self, options: &[(String, String)], name: &str) {
        _ = (options, name);
    }

    /// Called when a file is read through `\input`.
    fn input(&mut self, path: &std::path::Path) {
        _ = path;
    }

    /// Records a file the document depends on.
    fn add_file_reference(&mut self, path: &std::path::Path) {
        _ = path;
    }

    /// A subscript; `text` is the argument written as TeX source.
    fn subscript(&mut self, argument: &Object, text: &str) {
        _ = (argument, text);
    }

    /// A superscript; `text` is the argument written as TeX source.
    fn superscript(&mut self, argument: &Object, text: &str) {
        _ = (argument, text);
    }

    /// A recoverable error.
    fn warning(&mut self, error: &Error) {
        _ = error;
    }

    /// Reports that part of the input was replaced by something else.
    fn substituting(&mut self, original: &str, replacement: &str) {
        _ = (original, replacement);
    }

    /// Reports input that has no effect, such as a comment.
    fn skipping(&mut self, ignoreable: &Ignoreable) {
        _ = ignoreable;
    }

    /// A message for the user, from `\message`.
    fn message(&mut self, text: &str) {
        _ = text;
    }
}

/// A listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl Listener for NullListener {}
