//! Diagnostic collection for the compiler pipeline.
//!
//! Every stage (lexer, parser, IR generator) records errors into a
//! [`Reporter`] that the driver owns and threads through by `&mut` borrow.
//! A stage never aborts on its first error; the driver checks
//! [`Reporter::had_error`] between stages and refuses to run downstream
//! stages once anything has been recorded.

use colored::Colorize;

/// Which stage produced a diagnostic. Rendered verbatim in error output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexer,
    Syntax,
    Semantic,
    Runtime,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Lexer => "Lexer Error",
            ErrorKind::Syntax => "Syntax Error",
            ErrorKind::Semantic => "Semantic Error",
            ErrorKind::Runtime => "Runtime Error",
        };
        write!(f, "{}", label)
    }
}

/// A single recorded error.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub file: String,
    /// 1-indexed source line; 0 when no source location applies.
    pub line: usize,
    pub message: String,
    pub hint: Option<String>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line > 0 {
            write!(
                f,
                "[{}:{}] {}: {}",
                self.file, self.line, self.kind, self.message
            )?;
        } else {
            write!(f, "{}: {}", self.kind, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

/// Collects diagnostics across all compilation stages.
///
/// Compile errors and runtime errors are tracked with separate flags so the
/// driver can distinguish "the program never built" from "the program built
/// and failed while running".
#[derive(Debug, Default)]
pub struct Reporter {
    file: String,
    diagnostics: Vec<Diagnostic>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Reporter {
    pub fn new() -> Self {
        Reporter {
            file: String::from("<input>"),
            diagnostics: Vec::new(),
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Clear all recorded diagnostics and both error flags.
    pub fn reset(&mut self) {
        self.diagnostics.clear();
        self.had_error = false;
        self.had_runtime_error = false;
    }

    /// Associate subsequent diagnostics with a source file name.
    pub fn set_current_file(&mut self, name: &str) {
        self.file = name.to_string();
    }

    pub fn lexer_error(&mut self, line: usize, message: impl Into<String>) {
        self.push(ErrorKind::Lexer, line, message.into(), None);
    }

    pub fn lexer_error_with_hint(
        &mut self,
        line: usize,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.push(ErrorKind::Lexer, line, message.into(), Some(hint.into()));
    }

    /// Record a syntax error at a token. The offending lexeme is folded into
    /// the message; an empty lexeme means the error is at end of input.
    pub fn parser_error(&mut self, line: usize, lexeme: &str, message: impl Into<String>) {
        let message = if lexeme.is_empty() {
            format!("{} at end", message.into())
        } else {
            format!("{} at '{}'", message.into(), lexeme)
        };
        self.push(ErrorKind::Syntax, line, message, None);
    }

    pub fn parser_error_with_hint(
        &mut self,
        line: usize,
        lexeme: &str,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        let message = if lexeme.is_empty() {
            format!("{} at end", message.into())
        } else {
            format!("{} at '{}'", message.into(), lexeme)
        };
        self.push(ErrorKind::Syntax, line, message, Some(hint.into()));
    }

    pub fn semantic_error(&mut self, line: usize, message: impl Into<String>) {
        self.push(ErrorKind::Semantic, line, message.into(), None);
    }

    pub fn semantic_error_with_hint(
        &mut self,
        line: usize,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.push(ErrorKind::Semantic, line, message.into(), Some(hint.into()));
    }

    pub fn runtime_error(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            kind: ErrorKind::Runtime,
            file: self.file.clone(),
            line: 0,
            message: message.into(),
            hint: None,
        });
        self.had_runtime_error = true;
    }

    fn push(&mut self, kind: ErrorKind, line: usize, message: String, hint: Option<String>) {
        self.diagnostics.push(Diagnostic {
            kind,
            file: self.file.clone(),
            line,
            message,
            hint,
        });
        self.had_error = true;
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print all diagnostics to stderr, colorized when `color` is set.
    pub fn print_errors(&self, color: bool) {
        for diag in &self.diagnostics {
            if color {
                let kind = diag.kind.to_string().red().bold();
                if diag.line > 0 {
                    eprintln!(
                        "{} {}: {}",
                        format!("[{}:{}]", diag.file, diag.line).dimmed(),
                        kind,
                        diag.message
                    );
                } else {
                    eprintln!("{}: {}", kind, diag.message);
                }
                if let Some(hint) = &diag.hint {
                    eprintln!("  {}: {}", "hint".cyan(), hint);
                }
            } else {
                eprintln!("{}", diag);
            }
        }
    }
}
