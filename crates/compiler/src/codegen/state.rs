//! CodeGen state and core types.
//!
//! The generator emits into two per-function buffers: `entry` collects the
//! allocas (and parameter stores) that belong in the function's entry
//! block, `body` collects everything else. When a function is finished the
//! buffers are stitched together with an `entry:` label and a branch into
//! the first body block, so allocas always dominate their uses.

use std::collections::HashMap;

use crate::errors::Reporter;

use super::CodeGenError;

/// Physical kind of a variable binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum VarKind {
    Number,
    Str,
    Array { len: usize },
}

/// A name's binding: the stack cell that holds it and what the cell holds.
/// For arrays the "cell" is the array allocation itself and reads go
/// straight through it; numbers and strings load from the cell.
#[derive(Debug, Clone)]
pub(super) struct VarInfo {
    pub cell: String,
    pub kind: VarKind,
}

/// Branch targets for `skip` / `mog` inside the innermost loop.
#[derive(Debug, Clone)]
pub(super) struct LoopFrame {
    pub continue_target: String,
    pub break_target: String,
}

/// A computed value together with its physical type. The payload is a
/// complete LLVM operand: an SSA name (`%t3`), a hex double constant, or a
/// string global (`@.str.0`).
#[derive(Debug, Clone)]
pub(super) enum Value {
    Num(String),
    Str(String),
    Array { ptr: String, len: usize },
}

/// Format a double as a hex IEEE-754 constant, which LLVM accepts for any
/// value (decimal float syntax only covers exactly-representable decimals).
pub(super) fn fmt_double(value: f64) -> String {
    format!("0x{:016X}", value.to_bits())
}

pub struct CodeGen<'r> {
    pub(super) reporter: &'r mut Reporter,

    // Finished user-function definitions, in emission order
    pub(super) functions_ir: String,

    // Current function's buffers and insertion state
    pub(super) entry: String,
    pub(super) body: String,
    pub(super) current_block: String,
    pub(super) terminated: bool,
    pub(super) in_function: bool,

    // String-literal and format-string globals, deduplicated by content
    pub(super) string_globals: String,
    pub(super) string_constants: HashMap<String, String>,
    pub(super) string_counter: usize,

    pub(super) temp_counter: usize,
    pub(super) block_counter: usize,
    pub(super) cell_counter: usize,

    /// Predeclared functions: name -> arity
    pub(super) functions: HashMap<String, usize>,
    /// Lexical scope frames, innermost last
    pub(super) scopes: Vec<HashMap<String, VarInfo>>,
    /// Loop frames, innermost last
    pub(super) loop_frames: Vec<LoopFrame>,
}

impl<'r> CodeGen<'r> {
    pub fn new(reporter: &'r mut Reporter) -> Self {
        CodeGen {
            reporter,
            functions_ir: String::new(),
            entry: String::new(),
            body: String::new(),
            current_block: String::new(),
            terminated: true,
            in_function: false,
            string_globals: String::new(),
            string_constants: HashMap::new(),
            string_counter: 0,
            temp_counter: 0,
            block_counter: 0,
            cell_counter: 0,
            functions: HashMap::new(),
            scopes: vec![HashMap::new()],
            loop_frames: Vec::new(),
        }
    }

    /// Generate a fresh temporary name (without the leading `%`).
    pub(super) fn fresh_temp(&mut self) -> String {
        let name = format!("t{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    /// Generate a fresh block label.
    pub(super) fn fresh_block(&mut self, prefix: &str) -> String {
        let name = format!("{}{}", prefix, self.block_counter);
        self.block_counter += 1;
        name
    }

    /// Generate a fresh stack-cell name for a variable. The counter keeps
    /// rebindings of the same source name distinct.
    pub(super) fn fresh_cell(&mut self, name: &str) -> String {
        let cell = format!("{}.{}", name, self.cell_counter);
        self.cell_counter += 1;
        cell
    }

    /// Start inserting into a new basic block.
    pub(super) fn set_block(&mut self, label: &str) -> Result<(), CodeGenError> {
        use std::fmt::Write as _;
        writeln!(&mut self.body, "{}:", label)?;
        self.current_block = label.to_string();
        self.terminated = false;
        Ok(())
    }

    /// Resolve a name, searching scope frames innermost first.
    pub(super) fn resolve(&self, name: &str) -> Option<VarInfo> {
        for frame in self.scopes.iter().rev() {
            if let Some(info) = frame.get(name) {
                return Some(info.clone());
            }
        }
        None
    }

    /// Bind a name in the innermost scope frame, shadowing any outer
    /// binding of the same name.
    pub(super) fn bind(&mut self, name: &str, info: VarInfo) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name.to_string(), info);
    }

    /// Record a semantic error and return it as a generator error. The
    /// generator does not recover: callers propagate this with `?`.
    pub(super) fn semantic_err(&mut self, line: usize, message: impl Into<String>) -> CodeGenError {
        let message = message.into();
        self.reporter.semantic_error(line, message.clone());
        CodeGenError::Semantic { line, message }
    }

    pub(super) fn semantic_err_with_hint(
        &mut self,
        line: usize,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> CodeGenError {
        let message = message.into();
        self.reporter
            .semantic_error_with_hint(line, message.clone(), hint);
        CodeGenError::Semantic { line, message }
    }

    /// Record a verification failure for an emitted function and return it
    /// as a generator error.
    pub(super) fn verify_err(
        &mut self,
        line: usize,
        function: &str,
        message: String,
    ) -> CodeGenError {
        self.reporter.semantic_error(
            line,
            format!("Function '{}' failed IR verification: {}", function, message),
        );
        CodeGenError::Verify {
            function: function.to_string(),
            message,
        }
    }

    /// Unwrap a numeric operand or report why it isn't one.
    pub(super) fn expect_number(
        &mut self,
        value: Value,
        line: usize,
        what: &str,
    ) -> Result<String, CodeGenError> {
        match value {
            Value::Num(op) => Ok(op),
            Value::Str(_) => Err(self.semantic_err(line, format!("{} must be a number, not a string", what))),
            Value::Array { .. } => {
                Err(self.semantic_err(line, format!("{} must be a number, not an array", what)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_double_is_hex_ieee() {
        assert_eq!(fmt_double(0.0), "0x0000000000000000");
        assert_eq!(fmt_double(1.0), "0x3FF0000000000000");
        assert_eq!(fmt_double(30.0), "0x403E000000000000");
    }

    #[test]
    fn resolve_searches_innermost_first() {
        let mut reporter = Reporter::new();
        let mut cg = CodeGen::new(&mut reporter);
        cg.bind(
            "x",
            VarInfo {
                cell: "x.0".into(),
                kind: VarKind::Number,
            },
        );
        cg.scopes.push(HashMap::new());
        cg.bind(
            "x",
            VarInfo {
                cell: "x.1".into(),
                kind: VarKind::Str,
            },
        );
        assert_eq!(cg.resolve("x").unwrap().cell, "x.1");
        cg.scopes.pop();
        assert_eq!(cg.resolve("x").unwrap().cell, "x.0");
        assert!(cg.resolve("y").is_none());
    }
}
