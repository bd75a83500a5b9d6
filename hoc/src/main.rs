//! hoc CLI

use clap::{Parser, Subcommand};
use hoc::config::Config;
use hoc::machine::WriterSink;
use hoc::repl::{report, Repl};
use hoc::session::Session;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hoc", version, about = "hoc - stack-machine calculator")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Significant digits printed for each value
    #[arg(long, global = true)]
    precision: Option<usize>,

    /// Instruction budget per line
    #[arg(long, global = true)]
    max_steps: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a hoc script
    Run {
        /// Script to run
        file: PathBuf,
    },
    /// Start the interactive calculator (default)
    Repl,
    /// Compile each line and dump its tape (debug)
    Tape {
        /// Script to compile
        file: PathBuf,
        /// Emit JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Parse each line and dump its AST as JSON (debug)
    Parse {
        /// Script to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Repl) {
        Command::Run { file } => run_file(&file, config),
        Command::Repl => run_repl(config),
        Command::Tape { file, json } => dump_tape(&file, config, json),
        Command::Parse { file } => parse_file(&file),
        Command::Tokens { file } => tokenize_file(&file),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Enable with `RUST_LOG=hoc=debug` or `RUST_LOG=hoc=trace`
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<Config, hoc::HocError> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(precision) = cli.precision {
        config.precision = precision;
    }
    if cli.max_steps.is_some() {
        config.max_steps = cli.max_steps;
    }
    config.validate()?;
    Ok(config)
}

fn run_file(path: &Path, config: Config) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let mut sink = WriterSink::stdout(config.precision);
    let mut session = Session::new(config)?;

    let errors = session.run_source(&source, &mut sink);
    for err in &errors {
        let text = err
            .line()
            .and_then(|n| source.lines().nth(n - 1))
            .unwrap_or("");
        report(text, err);
    }

    Ok(if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_repl(config: Config) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut repl = Repl::new(config)?;
    repl.run()?;
    Ok(ExitCode::SUCCESS)
}

fn dump_tape(
    path: &Path,
    config: Config,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let mut session = Session::new(config)?;

    for (i, line) in source.lines().enumerate() {
        session.compile_line(line)?;
        let tapes = session.tapes();
        if json {
            println!("{}", serde_json::to_string(tapes)?);
        } else {
            println!("# line {}: {}", i + 1, line.trim());
            for tape in tapes {
                print!("{}", tape.disassemble(session.symbols()));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn parse_file(path: &Path) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    for line in source.lines() {
        let ast = hoc::parser::parse_str(line)?;
        println!("{}", serde_json::to_string_pretty(&ast)?);
    }

    Ok(ExitCode::SUCCESS)
}

fn tokenize_file(path: &Path) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    let tokens = hoc::lexer::tokenize(&source)?;
    for (tok, span) in &tokens {
        println!("{:?} @ {}..{}", tok, span.start, span.end);
    }

    Ok(ExitCode::SUCCESS)
}
