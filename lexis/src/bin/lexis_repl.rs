// Lexis Interactive REPL
// Read-eval-print loop over a shared evaluator, with string, file and pipe input

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::process::ExitCode;
use yansi::Paint;

use lexis::input_handling::{read_input_content, validate_input_args, InputConfig, InputSource};
use lexis::{Evaluator, RuntimeConfig, RuntimeError, Value};

#[derive(Parser)]
#[command(name = "lexis-repl")]
#[command(about = "Lexis interactive REPL with multi-source input support")]
struct Args {
    /// Input source type
    #[arg(short, long, value_enum, default_value_t = InputSource::Interactive)]
    input: InputSource,

    /// Input string (when using --input string)
    #[arg(short, long)]
    string: Option<String>,

    /// Input file path (when using --input file)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Runtime configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {}", e);
    }
    // route the library's `log` records into tracing
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("failed to bridge log records: {}", e);
    }
}

fn report(error: &RuntimeError) {
    match error.eid() {
        Some(eid) => eprintln!("{} {}", eid.red().bold(), error),
        None => eprintln!("{} {}", "internal".red().bold(), error),
    }
}

fn run_source(evaluator: &Evaluator, source: &str) -> Result<Value, RuntimeError> {
    evaluator.evaluate_str(source)
}

/// Nesting depth of parentheses outside string literals.
fn open_parens(source: &str) -> i64 {
    let mut depth = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut in_comment = false;
    for c in source.chars() {
        if in_comment {
            in_comment = c != '\n';
            continue;
        }
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '#' => in_comment = true,
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn interactive(evaluator: &Evaluator) -> ExitCode {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("failed to start line editor: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("Lexis REPL. :names lists visible names, :quit exits.");

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "lexis> " } else { "  ...> " };
        match editor.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');
                if open_parens(&buffer) > 0 {
                    continue;
                }
                let input = std::mem::take(&mut buffer);
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                match trimmed {
                    ":quit" | ":q" => break,
                    ":names" => match evaluator.global().visible_names() {
                        Ok(names) => println!("{}", names.join(" ")),
                        Err(e) => report(&e),
                    },
                    source => match run_source(evaluator, source) {
                        Ok(value) => println!("{}", value.green()),
                        Err(e) => report(&e),
                    },
                }
            }
            Err(ReadlineError::Interrupted) => buffer.clear(),
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("input error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => match RuntimeConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{} {}", "config".red().bold(), e);
                return ExitCode::FAILURE;
            }
        },
        None => RuntimeConfig::default(),
    };
    log::debug!("runtime config: {:?}", config);
    let evaluator = Evaluator::with_config(config);

    if let Err(e) = validate_input_args(args.input, &args.file, &args.string) {
        eprintln!("{} {}", "input".red().bold(), e);
        return ExitCode::FAILURE;
    }

    let input_config = match args.input {
        InputSource::Interactive => return interactive(&evaluator),
        InputSource::String => InputConfig::from_string(args.string.unwrap_or_default()),
        InputSource::File => InputConfig::from_file(args.file.unwrap_or_default()),
        InputSource::Pipe => InputConfig::from_pipe(),
    };
    let input = match read_input_content(&input_config) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("{} {}", "input".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    log::debug!("evaluating {}", input.source_name);

    match run_source(&evaluator, &input.content) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::open_parens;

    #[test]
    fn counts_parens_outside_strings_and_comments() {
        assert_eq!(open_parens("(f (g"), 2);
        assert_eq!(open_parens("(f \"(\")"), 0);
        assert_eq!(open_parens("(f # )\n"), 1);
        assert_eq!(open_parens("(f \"\\\"(\")"), 0);
    }
}
