//! Sigma compiler library.
//!
//! Provides compilation from Sigma source to LLVM IR and to native
//! executables. The pipeline is lexer -> parser -> IR generator; all
//! three stages record diagnostics into a caller-owned [`Reporter`], and a
//! stage whose predecessor reported anything never runs.
//!
//! ```rust,ignore
//! use sigmac::{compile_to_ir, Reporter};
//!
//! let mut reporter = Reporter::new();
//! match compile_to_ir("say 42", "demo.sigma", &mut reporter) {
//!     Some(ir) => println!("{}", ir),
//!     None => reporter.print_errors(false),
//! }
//! ```

pub mod ast;
pub mod codegen;
pub mod errors;
pub mod lexer;
pub mod parser;

pub use codegen::{CodeGen, CodeGenError};
pub use errors::{Diagnostic, ErrorKind, Reporter};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use tracing::{debug, info};

/// Minimum clang/LLVM version required.
/// The generated IR uses opaque pointers (`ptr`), which needs LLVM 15+.
const MIN_CLANG_VERSION: u32 = 15;

/// Cache for the clang version probe: Ok(version) or Err(message).
/// The probe only runs once per process.
static CLANG_VERSION_CHECKED: OnceLock<Result<u32, String>> = OnceLock::new();

/// Drop an optional `#!...` first line before lexing. The newline itself
/// is kept so token line numbers still match the file.
pub fn strip_shebang(source: &str) -> &str {
    if let Some(rest) = source.strip_prefix("#!") {
        return match rest.find('\n') {
            Some(idx) => &rest[idx..],
            None => "",
        };
    }
    source
}

/// Compile source text to a textual LLVM IR module.
///
/// Returns `None` if any stage reported an error; the diagnostics are in
/// the reporter. Stages never run on a stream their predecessor failed on.
pub fn compile_to_ir(source: &str, filename: &str, reporter: &mut Reporter) -> Option<String> {
    reporter.set_current_file(filename);

    let tokens = Lexer::new(source, reporter).scan();
    if reporter.had_error() {
        return None;
    }
    debug!(tokens = tokens.len(), "lexed");

    let program = Parser::new(tokens, reporter).parse();
    if reporter.had_error() {
        return None;
    }
    debug!(statements = program.len(), "parsed");

    let ir = CodeGen::new(reporter).codegen_program(&program).ok()?;
    if reporter.had_error() {
        return None;
    }
    debug!(bytes = ir.len(), "generated IR");
    Some(ir)
}

/// Compile a Sigma source file to a native executable.
///
/// Writes `<output>.ll` next to the output, then links it with clang. The
/// IR file is removed afterwards unless `keep_ir` is set.
pub fn compile_file(
    source_path: &Path,
    output_path: &Path,
    keep_ir: bool,
    reporter: &mut Reporter,
) -> Result<(), String> {
    let source = fs::read_to_string(source_path)
        .map_err(|e| format!("Failed to read source file: {}", e))?;

    let filename = source_path.display().to_string();
    let ir = compile_to_ir(strip_shebang(&source), &filename, reporter)
        .ok_or_else(|| format!("compilation failed with {} error(s)", reporter.error_count()))?;

    let ir_path = output_path.with_extension("ll");
    fs::write(&ir_path, &ir).map_err(|e| format!("Failed to write IR file: {}", e))?;

    check_clang_version()?;

    info!(output = %output_path.display(), "linking with clang");
    let output = Command::new("clang")
        .arg("-O0")
        .arg(&ir_path)
        .arg("-o")
        .arg(output_path)
        .output()
        .map_err(|e| format!("Failed to run clang: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("Clang compilation failed:\n{}", stderr));
    }

    if !keep_ir {
        fs::remove_file(&ir_path).ok();
    }

    Ok(())
}

/// Compile source text to a temporary executable and run it.
///
/// Returns the executed program's exit status. A nonzero status is not an
/// error here; failing to build or spawn is.
pub fn run_source(source: &str, filename: &str, reporter: &mut Reporter) -> Result<i32, String> {
    let ir = compile_to_ir(strip_shebang(source), filename, reporter)
        .ok_or_else(|| format!("compilation failed with {} error(s)", reporter.error_count()))?;

    check_clang_version()?;

    let dir = std::env::temp_dir().join(format!("sigma-run-{}", std::process::id()));
    fs::create_dir_all(&dir).map_err(|e| format!("Failed to create temp dir: {}", e))?;
    let ir_path = dir.join("program.ll");
    let bin_path = dir.join("program");

    fs::write(&ir_path, &ir).map_err(|e| format!("Failed to write IR file: {}", e))?;

    let output = Command::new("clang")
        .arg("-O0")
        .arg(&ir_path)
        .arg("-o")
        .arg(&bin_path)
        .output()
        .map_err(|e| format!("Failed to run clang: {}", e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("Clang compilation failed:\n{}", stderr));
    }

    let status = Command::new(&bin_path)
        .status()
        .map_err(|e| format!("Failed to run program: {}", e))?;

    fs::remove_file(&ir_path).ok();
    fs::remove_file(&bin_path).ok();

    Ok(status.code().unwrap_or(-1))
}

/// Compile a Sigma source file to a temporary executable and run it.
pub fn run_file(source_path: &Path, reporter: &mut Reporter) -> Result<i32, String> {
    let source = fs::read_to_string(source_path)
        .map_err(|e| format!("Failed to read source file: {}", e))?;
    run_source(&source, &source_path.display().to_string(), reporter)
}

/// Check that clang is available and recent enough. Cached per process.
pub fn check_clang_version() -> Result<u32, String> {
    CLANG_VERSION_CHECKED
        .get_or_init(|| {
            let output = Command::new("clang")
                .arg("--version")
                .output()
                .map_err(|e| {
                    format!(
                        "Failed to run clang: {}. Please install clang {} or later.",
                        e, MIN_CLANG_VERSION
                    )
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(format!(
                    "clang --version failed with exit code {:?}: {}",
                    output.status.code(),
                    stderr
                ));
            }

            let version_str = String::from_utf8_lossy(&output.stdout);
            let version = parse_clang_version(&version_str).ok_or_else(|| {
                format!(
                    "Could not parse clang version from: {}\n\
                     sigmac requires clang {} or later (for opaque pointer support).",
                    version_str.lines().next().unwrap_or(&version_str),
                    MIN_CLANG_VERSION
                )
            })?;

            // Apple clang versions run ahead of their LLVM base; Apple
            // clang 14 already carries LLVM 15
            let is_apple = version_str.contains("Apple clang");
            let effective_min = if is_apple { 14 } else { MIN_CLANG_VERSION };

            if version < effective_min {
                return Err(format!(
                    "clang version {} detected, but sigmac requires {} {} or later.\n\
                     The generated LLVM IR uses opaque pointers (requires LLVM 15+).",
                    version,
                    if is_apple { "Apple clang" } else { "clang" },
                    effective_min
                ));
            }

            Ok(version)
        })
        .clone()
}

/// Parse the major version number from `clang --version` output.
fn parse_clang_version(output: &str) -> Option<u32> {
    // Look for a "clang version X.Y.Z" line; this covers plain, Apple,
    // Homebrew and distro-prefixed spellings
    for line in output.lines() {
        if !line.contains("clang version") {
            continue;
        }
        if let Some(idx) = line.find("version ") {
            let after_version = &line[idx + 8..];
            let major: String = after_version
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if !major.is_empty() {
                return major.parse().ok();
            }
        }
    }
    None
}
