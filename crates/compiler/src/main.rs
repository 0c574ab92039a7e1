//! Sigma compiler CLI.
//!
//! `sigmac file.sigma` compiles and runs a program; `-o` links a native
//! executable instead, `--emit-ir`, `--tokens` and `--ast` dump
//! intermediate stages. With no file the driver starts a line-oriented
//! REPL.

use clap::{CommandFactory, Parser as ClapParser};
use clap_complete::{generate, Shell};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;

use sigmac::{Lexer, Parser, Reporter};

#[derive(ClapParser)]
#[command(name = "sigmac")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sigma compiler - compile .sigma programs to executables", long_about = None)]
struct Cli {
    /// Input .sigma source file (omit to start a REPL)
    input: Option<PathBuf>,

    /// Compile and run the program (default when a file is given)
    #[arg(long)]
    run: bool,

    /// Compile to a native executable at this path
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Keep the intermediate LLVM IR file (.ll) next to the output
    #[arg(long, requires = "output")]
    keep_ir: bool,

    /// Write the generated LLVM IR to standard output
    #[arg(long)]
    emit_ir: bool,

    /// Dump the token stream and exit
    #[arg(long)]
    tokens: bool,

    /// Dump the parsed AST and exit
    #[arg(long)]
    ast: bool,

    /// Generate shell completion scripts
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "sigmac", &mut io::stdout());
        return;
    }

    let code = match cli.input {
        Some(input) => {
            if cli.tokens {
                run_tokens(&input)
            } else if cli.ast {
                run_ast(&input)
            } else if cli.emit_ir {
                run_emit_ir(&input)
            } else if cli.run {
                // explicit --run wins over -o
                run_run(&input)
            } else if let Some(output) = cli.output {
                run_build(&input, &output, cli.keep_ir)
            } else {
                run_run(&input)
            }
        }
        None => run_repl(),
    };
    process::exit(code);
}

fn color_errors() -> bool {
    io::stderr().is_terminal()
}

fn read_source(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

/// Print recorded diagnostics plus a summary line; returns the exit code.
fn report_failure(reporter: &Reporter) -> i32 {
    reporter.print_errors(color_errors());
    eprintln!("error: {} error(s)", reporter.error_count());
    1
}

fn run_tokens(input: &Path) -> i32 {
    let source = match read_source(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut reporter = Reporter::new();
    reporter.set_current_file(&input.display().to_string());
    let tokens = Lexer::new(sigmac::strip_shebang(&source), &mut reporter).scan();
    for token in &tokens {
        println!("{:>4}  {:?} {:?}", token.line, token.kind, token.lexeme);
    }
    if reporter.had_error() {
        return report_failure(&reporter);
    }
    0
}

fn run_ast(input: &Path) -> i32 {
    let source = match read_source(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut reporter = Reporter::new();
    reporter.set_current_file(&input.display().to_string());
    let tokens = Lexer::new(sigmac::strip_shebang(&source), &mut reporter).scan();
    if reporter.had_error() {
        return report_failure(&reporter);
    }
    let program = Parser::new(tokens, &mut reporter).parse();
    if reporter.had_error() {
        return report_failure(&reporter);
    }
    println!("{:#?}", program);
    0
}

fn run_emit_ir(input: &Path) -> i32 {
    let source = match read_source(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut reporter = Reporter::new();
    match sigmac::compile_to_ir(
        sigmac::strip_shebang(&source),
        &input.display().to_string(),
        &mut reporter,
    ) {
        Some(ir) => {
            print!("{}", ir);
            0
        }
        None => report_failure(&reporter),
    }
}

fn run_build(input: &Path, output: &Path, keep_ir: bool) -> i32 {
    let mut reporter = Reporter::new();
    match sigmac::compile_file(input, output, keep_ir, &mut reporter) {
        Ok(()) => {
            println!("Compiled {} -> {}", input.display(), output.display());
            0
        }
        Err(e) => {
            if reporter.had_error() {
                reporter.print_errors(color_errors());
            }
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn run_run(input: &Path) -> i32 {
    let mut reporter = Reporter::new();
    match sigmac::run_file(input, &mut reporter) {
        Ok(status) => status,
        Err(e) => {
            if reporter.had_error() {
                reporter.print_errors(color_errors());
            }
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Line-oriented REPL: each submitted line is compiled and run as a
/// standalone program.
fn run_repl() -> i32 {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    println!(
        "Sigma {} - type a statement to compile and run it (Ctrl-D to exit)",
        env!("CARGO_PKG_VERSION")
    );

    loop {
        match editor.readline("sigma> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);

                let mut reporter = Reporter::new();
                match sigmac::run_source(line, "<repl>", &mut reporter) {
                    Ok(0) => {}
                    Ok(status) => {
                        reporter.runtime_error(format!("program exited with status {}", status));
                        reporter.print_errors(color_errors());
                    }
                    Err(e) => {
                        if reporter.had_error() {
                            reporter.print_errors(color_errors());
                        } else {
                            eprintln!("Error: {}", e);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }
    0
}
