//! REPL (Read-Eval-Print Loop) for hoc

use crate::config::Config;
use crate::error::{report_error, HocError};
use crate::machine::{format_number, WriterSink};
use crate::session::Session;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

const PROMPT: &str = "hoc> ";
const HISTORY_FILE: &str = ".hoc_history";

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    sink: WriterSink<std::io::Stdout>,
    history_path: Option<PathBuf>,
    show_tape: bool,
}

impl Repl {
    /// Create a new REPL
    pub fn new(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        let editor = DefaultEditor::new()?;
        let history_path = if config.history {
            dirs_home().map(|h| h.join(HISTORY_FILE))
        } else {
            None
        };
        let sink = WriterSink::stdout(config.precision);
        let session = Session::new(config)?;

        let mut repl = Repl {
            editor,
            session,
            sink,
            history_path,
            show_tape: false,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Run the REPL
    pub fn run(&mut self) -> rustyline::Result<()> {
        println!("hoc {}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    self.eval_input(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    /// Handle REPL commands (starting with :). Returns true to exit.
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => true,
            ":help" | ":h" | ":?" => {
                self.print_help();
                false
            }
            ":vars" => {
                self.print_variables();
                false
            }
            ":tape" => {
                self.show_tape = !self.show_tape;
                println!("tape listing {}", if self.show_tape { "on" } else { "off" });
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn print_help(&self) {
        println!("hoc REPL Commands:");
        println!("  :help, :h, :?   Show this help");
        println!("  :quit, :q       Exit the REPL");
        println!("  :vars           List assigned variables");
        println!("  :tape           Toggle listing of each compiled tape");
        println!("  :clear          Clear the screen");
        println!();
        println!("You can enter:");
        println!("  - Expressions: 1 + 2 * 3, -2^2, (1 + 2) / 3");
        println!("  - Assignments: x = 3, a = b = 2");
        println!("  - Several statements separated by ';'");
        println!();
        println!("Built-in functions:");
        println!("  sin cos atan exp log log10 sqrt int abs   one argument");
        println!("  pow(x, y)                                 x raised to y");
        println!("Constants: PI E GAMMA DEG PHI");
    }

    fn print_variables(&self) {
        let precision = self.session.config().precision;
        for (name, value) in self.session.symbols().variables() {
            println!("  {name} = {}", format_number(value, precision));
        }
    }

    fn eval_input(&mut self, input: &str) {
        let result = self.session.run_line(input, &mut self.sink);
        if self.show_tape {
            for tape in self.session.tapes() {
                print!("{}", tape.disassemble(self.session.symbols()));
            }
        }
        if let Err(err) = result {
            report(input, &err);
        }
    }
}

/// Print a session error for one line of input
pub fn report(input: &str, err: &HocError) {
    match err {
        HocError::Compile { line, source } => {
            let name = format!("<line {line}>");
            if report_error(&name, input, source).is_err() {
                eprintln!("hoc: {err}");
            }
        }
        _ => eprintln!("hoc: {err}"),
    }
}

/// Get home directory
fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
