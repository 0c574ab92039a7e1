//! Code generation error types.

/// Why IR generation stopped. The generator does not recover: the first
/// error unwinds out of `codegen_program` and no module is produced.
///
/// Semantic and verification failures are also recorded in the reporter at
/// the point they arise; the variants here carry enough context (source
/// line, offending function) for callers that only see the unwound error.
#[derive(Debug)]
pub enum CodeGenError {
    /// The program being lowered is invalid: an undefined name, a wrong
    /// argument count, an operand of the wrong physical type.
    Semantic { line: usize, message: String },
    /// An emitted function failed the structural check (a basic block
    /// without a terminator, an instruction after one).
    Verify { function: String, message: String },
    /// Writing into an IR buffer failed; surfaced by `?` on `writeln!`.
    Format(std::fmt::Error),
}

impl std::fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeGenError::Semantic { line, message } if *line > 0 => {
                write!(f, "line {}: {}", line, message)
            }
            CodeGenError::Semantic { message, .. } => write!(f, "{}", message),
            CodeGenError::Verify { function, message } => {
                write!(f, "verification of '{}' failed: {}", function, message)
            }
            CodeGenError::Format(e) => write!(f, "failed to write IR: {}", e),
        }
    }
}

impl std::error::Error for CodeGenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodeGenError::Format(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::fmt::Error> for CodeGenError {
    fn from(e: std::fmt::Error) -> Self {
        CodeGenError::Format(e)
    }
}
