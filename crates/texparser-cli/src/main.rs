use clap::Parser;
use colored::Colorize;
use std::cell::RefCell;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use texparser::vm;
use texparser_stdlib::output;
use texparser_stdlib::StdLibState;

mod plaintext;

/// This program interprets TeX and LaTeX source and prints the text it produces.
/// See the subcommands for things it can do.
#[derive(Parser)]
#[clap(version)]
struct Cli {
    #[clap(subcommand)]
    sub_command: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    Doc(Doc),
    Run(Run),
}

/// Print documentation for a command
#[derive(Parser)]
struct Doc {
    /// Name of the control sequence, with or without the backslash
    name: Option<String>,
}

/// Parse a file and print its text
#[derive(Parser)]
struct Run {
    /// Path to the file to parse; the .tex extension may be omitted
    file_path: PathBuf,

    /// Make undefined commands fatal errors
    #[arg(long)]
    strict: bool,

    /// Cancel the parse after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Maximum number of expansions before the parse is abandoned
    #[arg(long)]
    max_expansions: Option<usize>,

    /// Print errors and warnings as JSON, one per line
    #[arg(long)]
    json_errors: bool,
}

fn main() {
    let args: Cli = Cli::parse();
    let result = match args.sub_command {
        SubCommand::Doc(d) => doc(&StdLibState::new_vm(), d.name),
        SubCommand::Run(run_args) => {
            let stdout = std::io::stdout();
            run(&run_args, &mut stdout.lock(), Box::new(std::io::stderr()))
        }
    };
    if let Err(err) = result {
        eprintln!["{err}"];
        std::process::exit(1);
    }
}

fn run(args: &Run, out: &mut dyn Write, diagnostics: Box<dyn Write>) -> Result<(), String> {
    let mut path = args.file_path.clone();
    if path.extension().is_none() {
        path.set_extension("tex");
    }
    let mut vm = StdLibState::new_vm();
    vm.config.strict_undefined = args.strict;
    if let Some(max_expansions) = args.max_expansions {
        vm.config.max_expansions = max_expansions;
    }
    let listener = Rc::new(RefCell::new(plaintext::PlainText::new(
        diagnostics,
        args.json_errors,
    )));
    vm.set_listener(listener.clone());

    let watchdog = args.timeout_ms.map(|timeout_ms| {
        let cancellation = vm::CancellationToken::new();
        vm.cancellation = Some(cancellation.clone());
        Watchdog::start(cancellation, Duration::from_millis(timeout_ms))
    });
    let result = vm.parse_file::<output::Handlers>(&path);
    if let Some(watchdog) = watchdog {
        watchdog.stop();
    }

    let text = listener.borrow_mut().take_text();
    if !text.is_empty() {
        writeln!(out, "{text}").map_err(|err| format!["failed to write the output: {err}"])?;
    }
    result.map_err(|err| plaintext::format_error(&err, args.json_errors))
}

/// A thread that cancels a parse once a timeout has elapsed.
struct Watchdog {
    done: mpsc::Sender<()>,
    handle: thread::JoinHandle<()>,
}

impl Watchdog {
    fn start(cancellation: vm::CancellationToken, timeout: Duration) -> Watchdog {
        let (done, receiver) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            if let Err(mpsc::RecvTimeoutError::Timeout) = receiver.recv_timeout(timeout) {
                cancellation.cancel();
            }
        });
        Watchdog { done, handle }
    }

    fn stop(self) {
        drop(self.done);
        _ = self.handle.join();
    }
}

fn doc(vm: &vm::VM<StdLibState>, name: Option<String>) -> Result<(), String> {
    let interner = vm.cs_name_interner();
    let built_ins = vm.commands_map.built_in_commands();
    match name {
        None => {
            let mut docs: Vec<(&str, &str)> = built_ins
                .iter()
                .filter_map(|(cs_name, built_in)| {
                    let name = interner.resolve(*cs_name)?;
                    Some((name, built_in.doc().unwrap_or("")))
                })
                .filter(|(name, _)| !name.starts_with('@'))
                .collect();
            docs.sort();
            let mut last_prefix = None;
            for (i, (name, doc)) in docs.into_iter().enumerate() {
                let prefix = name.chars().next().map(|c| c.to_ascii_lowercase());
                if last_prefix != prefix {
                    last_prefix = prefix;
                    if i != 0 {
                        println!();
                    }
                }
                let first_line = doc.split('\n').next().unwrap_or("");
                println!["\\{}  {}", name.bold(), first_line];
            }
            Ok(())
        }
        Some(name) => {
            let name = name.trim_start_matches('\\');
            let doc = interner
                .get(name)
                .and_then(|cs_name| built_ins.get(&cs_name))
                .map(|built_in| built_in.doc().unwrap_or(""));
            match doc {
                None => Err(format!["Unknown command \\{name}"]),
                Some(doc) => {
                    println!["\\{}  {}", name.bold(), doc];
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn args(path: &Path) -> Run {
        Run {
            file_path: path.to_path_buf(),
            strict: false,
            timeout_ms: None,
            max_expansions: None,
            json_errors: false,
        }
    }

    fn run_source(source: &str, customize: fn(&mut Run)) -> (Result<(), String>, String, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.tex");
        std::fs::write(&path, source).unwrap();
        let mut args = args(&path);
        customize(&mut args);
        let mut out = vec![];
        let diagnostics = SharedBuffer::default();
        let result = run(&args, &mut out, Box::new(diagnostics.clone()));
        (result, String::from_utf8(out).unwrap(), diagnostics.contents())
    }

    #[test]
    fn run_prints_text() {
        let source = "\\newcommand{\\x}{World}\nHello \\x!\n\nBye\n";
        let (result, out, diagnostics) = run_source(source, |_| {});
        assert_eq!(result, Ok(()));
        assert_eq!(out, "Hello World!\n\nBye\n");
        assert_eq!(diagnostics, "");
    }

    #[test]
    fn tex_extension_is_inferred() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.tex"), "text").unwrap();
        let mut out = vec![];
        let result = run(
            &args(&dir.path().join("doc")),
            &mut out,
            Box::new(std::io::sink()),
        );
        assert_eq!(result, Ok(()));
        assert_eq!(String::from_utf8(out).unwrap(), "text\n");
    }

    #[test]
    fn undefined_command_is_a_warning() {
        let (result, out, diagnostics) = run_source(r"a\undefined b", |_| {});
        assert_eq!(result, Ok(()));
        assert_eq!(out, "ab\n");
        assert!(diagnostics.contains("undefined"));
    }

    #[test]
    fn undefined_command_is_fatal_when_strict() {
        let (result, out, _) = run_source(r"a\undefined b", |args| args.strict = true);
        assert!(result.is_err());
        assert_eq!(out, "a\n");
    }

    #[test]
    fn warnings_as_json() {
        let (_, _, diagnostics) = run_source(r"\undefined", |args| args.json_errors = true);
        assert!(diagnostics.contains("\"kind\":\"UndefinedCommand\""));
    }

    #[test]
    fn max_expansions_stops_infinite_recursion() {
        let (result, _, _) = run_source(r"\def\a{\a}\a", |args| {
            args.max_expansions = Some(1000);
            args.json_errors = true;
        });
        assert!(result.unwrap_err().contains("\"kind\":\"NonTermination\""));
    }

    #[test]
    fn timeout_cancels_the_parse() {
        let (result, _, _) = run_source(r"\def\a{\a}\a", |args| {
            args.max_expansions = Some(usize::MAX);
            args.timeout_ms = Some(20);
            args.json_errors = true;
        });
        assert!(result.unwrap_err().contains("\"kind\":\"Cancelled\""));
    }

    #[test]
    fn missing_file() {
        let (result, _, _) = run_source("", |args| args.file_path = PathBuf::from("/nonexistent/a.tex"));
        assert!(result.is_err());
    }

    #[test]
    fn doc_for_known_and_unknown_commands() {
        let vm = StdLibState::new_vm();
        assert_eq!(doc(&vm, Some("\\def".into())), Ok(()));
        assert!(doc(&vm, Some("nonexistent".into())).is_err());
    }
}
