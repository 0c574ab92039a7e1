//! Function predeclaration, definition and return lowering.
//!
//! Every user function takes N doubles and returns a double; symbols get
//! an `sg_` prefix so user names can never collide with libc. A function
//! definition suspends whatever function is currently being emitted
//! (usually `main`), emits into fresh buffers with a fresh scope stack,
//! then restores the suspended state.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::ast::{Expr, Stmt};

use super::state::{fmt_double, LoopFrame, VarInfo, VarKind};
use super::{CodeGen, CodeGenError};

/// Suspended per-function emission state.
struct SavedFunction {
    entry: String,
    body: String,
    current_block: String,
    terminated: bool,
    in_function: bool,
    scopes: Vec<HashMap<String, VarInfo>>,
    loop_frames: Vec<LoopFrame>,
}

impl CodeGen<'_> {
    /// Pass 1: register every top-level function's name and arity so later
    /// bodies can call earlier and later functions alike.
    pub(super) fn predeclare(&mut self, program: &[Stmt]) -> Result<(), CodeGenError> {
        for stmt in program {
            if let Stmt::FuncDef {
                name, params, line, ..
            } = stmt
            {
                self.declare_function(name, params, *line)?;
            }
        }
        Ok(())
    }

    fn declare_function(
        &mut self,
        name: &str,
        params: &[String],
        line: usize,
    ) -> Result<(), CodeGenError> {
        if self.functions.contains_key(name) {
            return Err(
                self.semantic_err(line, format!("Function '{}' is already defined", name))
            );
        }
        for (i, param) in params.iter().enumerate() {
            if params[..i].contains(param) {
                return Err(self.semantic_err(
                    line,
                    format!("Duplicate parameter '{}' in function '{}'", param, name),
                ));
            }
        }
        self.functions.insert(name.to_string(), params.len());
        Ok(())
    }

    pub(super) fn codegen_func_def(
        &mut self,
        name: &str,
        params: &[String],
        body: &[Stmt],
        line: usize,
    ) -> Result<(), CodeGenError> {
        // Top-level definitions were predeclared; a nested definition is
        // registered here, at the point it appears
        if !self.functions.contains_key(name) {
            self.declare_function(name, params, line)?;
        }

        let saved = SavedFunction {
            entry: std::mem::take(&mut self.entry),
            body: std::mem::take(&mut self.body),
            current_block: std::mem::take(&mut self.current_block),
            terminated: self.terminated,
            in_function: self.in_function,
            scopes: std::mem::replace(&mut self.scopes, vec![HashMap::new()]),
            loop_frames: std::mem::take(&mut self.loop_frames),
        };
        self.in_function = true;

        let result = self.codegen_func_body(name, params, body, line);

        self.entry = saved.entry;
        self.body = saved.body;
        self.current_block = saved.current_block;
        self.terminated = saved.terminated;
        self.in_function = saved.in_function;
        self.scopes = saved.scopes;
        self.loop_frames = saved.loop_frames;

        result
    }

    fn codegen_func_body(
        &mut self,
        name: &str,
        params: &[String],
        body: &[Stmt],
        line: usize,
    ) -> Result<(), CodeGenError> {
        let body_block = self.fresh_block("body");
        self.set_block(&body_block)?;

        // One stack cell per parameter, filled from the incoming argument.
        // Parameters live in an `arg.` namespace so a source name can never
        // collide with generated temps or block labels.
        for param in params {
            let cell = self.fresh_cell(param);
            writeln!(&mut self.entry, "  %{} = alloca double", cell)?;
            writeln!(
                &mut self.entry,
                "  store double %arg.{}, ptr %{}",
                param, cell
            )?;
            self.bind(
                param,
                VarInfo {
                    cell,
                    kind: VarKind::Number,
                },
            );
        }

        self.codegen_stmts(body)?;

        if !self.terminated {
            writeln!(&mut self.body, "  ret double {}", fmt_double(0.0))?;
            self.terminated = true;
        }

        let signature = params
            .iter()
            .map(|p| format!("double %arg.{}", p))
            .collect::<Vec<_>>()
            .join(", ");
        let mut text = String::new();
        writeln!(&mut text, "define double @sg_{}({}) {{", name, signature)?;
        writeln!(&mut text, "entry:")?;
        text.push_str(&self.entry);
        writeln!(&mut text, "  br label %{}", body_block)?;
        text.push_str(&self.body);
        writeln!(&mut text, "}}")?;

        if let Err(msg) = verify_function_text(&text) {
            return Err(self.verify_err(line, name, msg));
        }

        self.functions_ir.push_str(&text);
        self.functions_ir.push('\n');
        Ok(())
    }

    /// `send`. A bare return yields 0.0; outside a function body there is
    /// nothing to return from.
    pub(super) fn codegen_return(
        &mut self,
        value: Option<&Expr>,
        line: usize,
    ) -> Result<(), CodeGenError> {
        if !self.in_function {
            return Err(self.semantic_err(line, "return outside of function"));
        }

        let operand = match value {
            Some(expr) => {
                let value = self.codegen_expr(expr)?;
                self.expect_number(value, expr.line(), "Return value")?
            }
            None => fmt_double(0.0),
        };
        writeln!(&mut self.body, "  ret double {}", operand)?;
        self.terminated = true;

        let dead = self.fresh_block("unreachable");
        self.set_block(&dead)
    }
}

/// Structural check over an emitted function: every block must end in a
/// terminator and no instruction may follow one within a block.
pub(super) fn verify_function_text(text: &str) -> Result<(), String> {
    let mut current: Option<String> = None;
    let mut terminated = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("define") {
            continue;
        }
        if !line.starts_with(' ') {
            if let Some(label) = trimmed.strip_suffix(':') {
                if let Some(prev) = &current {
                    if !terminated {
                        return Err(format!("block '{}' lacks a terminator", prev));
                    }
                }
                current = Some(label.to_string());
                terminated = false;
                continue;
            }
            if trimmed == "}" {
                if let Some(prev) = &current {
                    if !terminated {
                        return Err(format!("block '{}' lacks a terminator", prev));
                    }
                }
                current = None;
                continue;
            }
        }
        // An instruction line
        if terminated {
            return Err(format!(
                "instruction after terminator in block '{}'",
                current.as_deref().unwrap_or("?")
            ));
        }
        terminated = trimmed.starts_with("br ")
            || trimmed.starts_with("ret ")
            || trimmed == "unreachable";
    }
    Ok(())
}
