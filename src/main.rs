use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use mmlc::{parse, tokenize_file, tokenize_string, Evaluator, Options, DEFAULT_SEED};

/// Compile ZIMPL-style models.
///
/// Without a file, statements are read interactively and executed as soon as
/// they are terminated by `;`.
#[derive(Debug, Parser)]
#[command(name = "mmlc", version)]
struct Cli {
    /// Model file to compile
    file: Option<PathBuf>,

    /// Seed for `random(a, b)`
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Print the syntax tree before evaluating
    #[arg(long)]
    tree: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn install_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    install_tracing(cli.verbose);
    let options = Options::default().with_seed(cli.seed);
    let ok = match &cli.file {
        Some(path) => run_file(path, options, cli.tree),
        None => run_repl(options, cli.tree),
    };
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_file(path: &Path, options: Options, tree: bool) -> bool {
    info!(file = %path.display(), "compiling");
    let tokens = match tokenize_file(path) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{}: {e}", path.display());
            return false;
        }
    };
    let (program, errors) = parse(&tokens);
    if !errors.is_empty() {
        for e in errors.iter() {
            eprintln!("{}: {e}", path.display());
        }
        return false;
    }
    if tree {
        for statement in program.statements.iter() {
            println!("{statement:?}");
        }
    }
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut evaluator = Evaluator::new(&options.with_base_dir(base_dir));
    if let Err(e) = evaluator.run(&program) {
        eprintln!("{}: {e}", path.display());
        return false;
    }
    if evaluator.check_failures() > 0 {
        eprintln!("{} check(s) failed", evaluator.check_failures());
    }
    println!("{}", evaluator.model());
    true
}

fn run_repl(options: Options, tree: bool) -> bool {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Error: {e}");
            return false;
        }
    };
    let mut evaluator = Evaluator::new(&options);
    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { ">> " } else { ".. " };
        match rl.readline(prompt) {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                buffer.push_str(&line);
                buffer.push('\n');
                if !buffer.trim_end().ends_with(';') {
                    continue;
                }
                execute_input(&mut evaluator, &buffer, tree);
                buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err:?}");
                return false;
            }
        }
    }
    println!("{}", evaluator.model());
    true
}

/// Runs one chunk of interactive input. Errors are reported and leave the
/// state built by earlier statements in place.
fn execute_input(evaluator: &mut Evaluator, input: &str, tree: bool) {
    let tokens = match tokenize_string(input) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };
    let (program, errors) = parse(&tokens);
    for e in errors.iter() {
        eprintln!("{e}");
    }
    for statement in program.statements.iter() {
        if tree {
            println!("{statement:?}");
        }
        debug!("executing interactive statement");
        if let Err(e) = evaluator.execute(statement) {
            eprintln!("{e}");
        }
    }
}
