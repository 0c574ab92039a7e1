//! Statement code generation.
//!
//! Dispatches each statement form; variable declarations allocate stack
//! cells, `say` composes a printf call, blocks push and pop one scope
//! frame. Control flow and function forms live in their own modules.

use std::fmt::Write as _;

use crate::ast::{Expr, Stmt};

use super::state::Value;
use super::{CodeGen, CodeGenError};

impl CodeGen<'_> {
    pub(super) fn codegen_stmt(&mut self, stmt: &Stmt) -> Result<(), CodeGenError> {
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                let value = self.codegen_expr(init)?;
                self.bind_value(name, &value)
            }
            Stmt::Print { expr, line } => self.codegen_print(expr, *line),
            Stmt::Expression { expr } => {
                self.codegen_expr(expr)?;
                Ok(())
            }
            Stmt::Block { statements, .. } => {
                self.scopes.push(Default::default());
                let result = self.codegen_stmts(statements);
                self.scopes.pop();
                result
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                line,
            } => self.codegen_if(cond, then_branch, else_branch.as_deref(), *line),
            Stmt::While { cond, body, line } => self.codegen_while(cond, body, *line),
            Stmt::For {
                init,
                cond,
                incr,
                body,
                line,
            } => self.codegen_for(init.as_deref(), cond.as_ref(), incr.as_ref(), body, *line),
            Stmt::Switch {
                scrutinee,
                cases,
                line,
            } => self.codegen_switch(scrutinee, cases, *line),
            Stmt::TryCatch {
                try_block,
                catch_block,
                ..
            } => self.codegen_try_catch(try_block, catch_block),
            Stmt::Break { line } => self.codegen_break(*line),
            Stmt::Continue { line } => self.codegen_continue(*line),
            Stmt::FuncDef {
                name,
                params,
                body,
                line,
            } => self.codegen_func_def(name, params, body, *line),
            Stmt::Return { value, line } => self.codegen_return(value.as_ref(), *line),
        }
    }

    pub(super) fn codegen_stmts(&mut self, statements: &[Stmt]) -> Result<(), CodeGenError> {
        for stmt in statements {
            self.codegen_stmt(stmt)?;
        }
        Ok(())
    }

    /// Lower `say`. An interpolated argument composes one format string
    /// from its literal parts and a `%g`/`%s` spec per value; anything
    /// else dispatches on the value's physical type. The format string
    /// always ends in a newline.
    fn codegen_print(&mut self, expr: &Expr, line: usize) -> Result<(), CodeGenError> {
        if let Expr::InterpolatedString { parts, exprs, .. } = expr {
            let mut format = String::new();
            let mut operands = Vec::with_capacity(exprs.len());
            format.push_str(&parts[0]);
            for (part, piece) in parts[1..].iter().zip(exprs) {
                let value = self.codegen_expr(piece)?;
                match value {
                    Value::Num(op) => {
                        format.push_str("%g");
                        operands.push(format!("double {}", op));
                    }
                    Value::Str(op) => {
                        format.push_str("%s");
                        operands.push(format!("ptr {}", op));
                    }
                    Value::Array { .. } => {
                        return Err(self
                            .semantic_err(piece.line(), "Cannot format an array value"));
                    }
                }
                format.push_str(part);
            }
            format.push('\n');
            return self.emit_printf(&format, &operands);
        }

        let value = self.codegen_expr(expr)?;
        match value {
            Value::Num(op) => self.emit_printf("%g\n", &[format!("double {}", op)]),
            Value::Str(op) => self.emit_printf("%s\n", &[format!("ptr {}", op)]),
            Value::Array { .. } => Err(self.semantic_err_with_hint(
                line,
                "Cannot print an array value",
                "print a single element, like a[0]",
            )),
        }
    }

    fn emit_printf(&mut self, format: &str, operands: &[String]) -> Result<(), CodeGenError> {
        let global = self.get_string_global(format)?;
        let result = self.fresh_temp();
        let mut args = format!("ptr {}", global);
        for op in operands {
            args.push_str(", ");
            args.push_str(op);
        }
        writeln!(
            &mut self.body,
            "  %{} = call i32 (ptr, ...) @printf({})",
            result, args
        )?;
        Ok(())
    }
}
