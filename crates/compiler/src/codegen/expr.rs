//! Expression code generation.
//!
//! Every numeric value is a 64-bit float. Comparisons and logical
//! operators collapse to `1.0`/`0.0`; bitwise operators round-trip through
//! `i64`. Strings are pointers into private globals; arrays are
//! fixed-length stack allocations of doubles.

use std::fmt::Write as _;

use crate::ast::{BinaryOp, Expr, IncOp, LiteralValue, LogicalOp, UnaryOp};

use super::state::{fmt_double, Value, VarInfo, VarKind};
use super::{CodeGen, CodeGenError};

impl CodeGen<'_> {
    pub(super) fn codegen_expr(&mut self, expr: &Expr) -> Result<Value, CodeGenError> {
        match expr {
            Expr::Literal { value, .. } => self.codegen_literal(value),
            Expr::Identifier { name, line } => self.codegen_identifier(name, *line),
            Expr::Grouping { inner } => self.codegen_expr(inner),
            Expr::Binary {
                left,
                op,
                right,
                line,
            } => self.codegen_binary(left, *op, right, *line),
            Expr::Unary { op, operand, line } => self.codegen_unary(*op, operand, *line),
            Expr::Logical {
                left,
                op,
                right,
                line,
            } => self.codegen_logical(left, *op, right, *line),
            Expr::Call { callee, args, line } => self.codegen_call(callee, args, *line),
            Expr::Assign { name, value, line } => self.codegen_assign(name, value, *line),
            Expr::CompoundAssign {
                name,
                op,
                value,
                line,
            } => self.codegen_compound_assign(name, *op, value, *line),
            Expr::Increment {
                name,
                op,
                prefix,
                line,
            } => self.codegen_increment(name, *op, *prefix, *line),
            Expr::Index {
                object,
                index,
                line,
            } => {
                let slot = self.codegen_element_ptr(object, index, *line)?;
                let value = self.fresh_temp();
                writeln!(&mut self.body, "  %{} = load double, ptr %{}", value, slot)?;
                Ok(Value::Num(format!("%{}", value)))
            }
            Expr::IndexAssign {
                object,
                index,
                value,
                line,
            } => {
                let slot = self.codegen_element_ptr(object, index, *line)?;
                let rhs = self.codegen_expr(value)?;
                let rhs = self.expect_number(rhs, value.line(), "Array element")?;
                writeln!(&mut self.body, "  store double {}, ptr %{}", rhs, slot)?;
                Ok(Value::Num(rhs))
            }
            Expr::ArrayLiteral { elements, .. } => self.codegen_array_literal(elements),
            Expr::InterpolatedString { line, .. } => Err(self.semantic_err(
                *line,
                "Interpolated strings can only be used with 'say'",
            )),
        }
    }

    fn codegen_literal(&mut self, value: &LiteralValue) -> Result<Value, CodeGenError> {
        match value {
            LiteralValue::Int(v) => Ok(Value::Num(fmt_double(*v as f64))),
            LiteralValue::Float(v) => Ok(Value::Num(fmt_double(*v))),
            LiteralValue::Bool(true) => Ok(Value::Num(fmt_double(1.0))),
            LiteralValue::Bool(false) | LiteralValue::Null => Ok(Value::Num(fmt_double(0.0))),
            LiteralValue::Str(s) => {
                let global = self.get_string_global(s)?;
                Ok(Value::Str(global))
            }
        }
    }

    fn codegen_identifier(&mut self, name: &str, line: usize) -> Result<Value, CodeGenError> {
        let info = match self.resolve(name) {
            Some(info) => info,
            None => {
                return Err(self.semantic_err_with_hint(
                    line,
                    format!("Undefined variable '{}'", name),
                    format!("declare it first with 'fr {} = ...'", name),
                ));
            }
        };
        match info.kind {
            VarKind::Number => {
                let value = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = load double, ptr %{}",
                    value, info.cell
                )?;
                Ok(Value::Num(format!("%{}", value)))
            }
            VarKind::Str => {
                let value = self.fresh_temp();
                writeln!(&mut self.body, "  %{} = load ptr, ptr %{}", value, info.cell)?;
                Ok(Value::Str(format!("%{}", value)))
            }
            VarKind::Array { len } => Ok(Value::Array {
                ptr: format!("%{}", info.cell),
                len,
            }),
        }
    }

    fn codegen_binary(
        &mut self,
        left: &Expr,
        op: BinaryOp,
        right: &Expr,
        _line: usize,
    ) -> Result<Value, CodeGenError> {
        let lhs = self.codegen_expr(left)?;
        let lhs = self.expect_number(lhs, left.line(), &operand_desc(op))?;
        let rhs = self.codegen_expr(right)?;
        let rhs = self.expect_number(rhs, right.line(), &operand_desc(op))?;

        match op {
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem => {
                let instr = match op {
                    BinaryOp::Add => "fadd",
                    BinaryOp::Sub => "fsub",
                    BinaryOp::Mul => "fmul",
                    BinaryOp::Div => "fdiv",
                    _ => "frem",
                };
                let result = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = {} double {}, {}",
                    result, instr, lhs, rhs
                )?;
                Ok(Value::Num(format!("%{}", result)))
            }

            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge => {
                let pred = match op {
                    BinaryOp::Eq => "oeq",
                    BinaryOp::Ne => "one",
                    BinaryOp::Lt => "olt",
                    BinaryOp::Gt => "ogt",
                    BinaryOp::Le => "ole",
                    _ => "oge",
                };
                let cmp = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = fcmp {} double {}, {}",
                    cmp, pred, lhs, rhs
                )?;
                let result = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = uitofp i1 %{} to double",
                    result, cmp
                )?;
                Ok(Value::Num(format!("%{}", result)))
            }

            BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::Shl
            | BinaryOp::Shr => {
                let instr = match op {
                    BinaryOp::BitAnd => "and",
                    BinaryOp::BitOr => "or",
                    BinaryOp::BitXor => "xor",
                    BinaryOp::Shl => "shl",
                    _ => "ashr",
                };
                let lhs_int = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = fptosi double {} to i64",
                    lhs_int, lhs
                )?;
                let rhs_int = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = fptosi double {} to i64",
                    rhs_int, rhs
                )?;
                let result_int = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = {} i64 %{}, %{}",
                    result_int, instr, lhs_int, rhs_int
                )?;
                let result = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = sitofp i64 %{} to double",
                    result, result_int
                )?;
                Ok(Value::Num(format!("%{}", result)))
            }
        }
    }

    fn codegen_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        line: usize,
    ) -> Result<Value, CodeGenError> {
        let value = self.codegen_expr(operand)?;
        match op {
            UnaryOp::Neg => {
                let value = self.expect_number(value, line, "Operand of unary '-'")?;
                let result = self.fresh_temp();
                writeln!(&mut self.body, "  %{} = fneg double {}", result, value)?;
                Ok(Value::Num(format!("%{}", result)))
            }
            UnaryOp::Not => {
                let value = self.expect_number(value, line, "Operand of '!'")?;
                let cmp = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = fcmp oeq double {}, {}",
                    cmp,
                    value,
                    fmt_double(0.0)
                )?;
                let result = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = uitofp i1 %{} to double",
                    result, cmp
                )?;
                Ok(Value::Num(format!("%{}", result)))
            }
            UnaryOp::BitNot => {
                let value = self.expect_number(value, line, "Operand of '~'")?;
                let as_int = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = fptosi double {} to i64",
                    as_int, value
                )?;
                let flipped = self.fresh_temp();
                writeln!(&mut self.body, "  %{} = xor i64 %{}, -1", flipped, as_int)?;
                let result = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = sitofp i64 %{} to double",
                    result, flipped
                )?;
                Ok(Value::Num(format!("%{}", result)))
            }
        }
    }

    /// Short-circuit `&&` / `||`.
    ///
    /// The phi's incoming edge for the right operand must name the block
    /// that is current after the operand has been emitted: the operand may
    /// itself split blocks (a nested `||`, say), so the block captured
    /// before emission would produce invalid SSA.
    fn codegen_logical(
        &mut self,
        left: &Expr,
        op: LogicalOp,
        right: &Expr,
        _line: usize,
    ) -> Result<Value, CodeGenError> {
        let (prefix, short_value) = match op {
            LogicalOp::And => ("and", 0.0),
            LogicalOp::Or => ("or", 1.0),
        };
        let symbol = match op {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        };

        let lhs = self.codegen_expr(left)?;
        let cond = self.truthiness(lhs, left.line(), &format!("Operand of '{}'", symbol))?;
        let lhs_block = self.current_block.clone();

        let rhs_block = self.fresh_block(&format!("{}_rhs", prefix));
        let merge_block = self.fresh_block(&format!("{}_merge", prefix));

        match op {
            // On a true left operand `||` skips the right operand
            LogicalOp::Or => writeln!(
                &mut self.body,
                "  br i1 {}, label %{}, label %{}",
                cond, merge_block, rhs_block
            )?,
            // On a false left operand `&&` skips the right operand
            LogicalOp::And => writeln!(
                &mut self.body,
                "  br i1 {}, label %{}, label %{}",
                cond, rhs_block, merge_block
            )?,
        }
        self.terminated = true;

        self.set_block(&rhs_block)?;
        let rhs = self.codegen_expr(right)?;
        let rhs_cond =
            self.truthiness(rhs, right.line(), &format!("Operand of '{}'", symbol))?;
        let rhs_value = self.fresh_temp();
        writeln!(
            &mut self.body,
            "  %{} = uitofp i1 {} to double",
            rhs_value, rhs_cond
        )?;
        // Re-read the insertion block: right-operand emission may have
        // moved it
        let rhs_end = self.current_block.clone();
        writeln!(&mut self.body, "  br label %{}", merge_block)?;
        self.terminated = true;

        self.set_block(&merge_block)?;
        let result = self.fresh_temp();
        writeln!(
            &mut self.body,
            "  %{} = phi double [ {}, %{} ], [ %{}, %{} ]",
            result,
            fmt_double(short_value),
            lhs_block,
            rhs_value,
            rhs_end
        )?;
        Ok(Value::Num(format!("%{}", result)))
    }

    /// Convert a value to an `i1` by comparing against zero. Returns the
    /// full operand (`%tN`).
    pub(super) fn truthiness(
        &mut self,
        value: Value,
        line: usize,
        what: &str,
    ) -> Result<String, CodeGenError> {
        let num = self.expect_number(value, line, what)?;
        let cond = self.fresh_temp();
        writeln!(
            &mut self.body,
            "  %{} = fcmp one double {}, {}",
            cond,
            num,
            fmt_double(0.0)
        )?;
        Ok(format!("%{}", cond))
    }

    fn codegen_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        line: usize,
    ) -> Result<Value, CodeGenError> {
        let name = match callee {
            Expr::Identifier { name, .. } => name.clone(),
            _ => return Err(self.semantic_err(line, "Can only call named functions")),
        };

        let arity = match self.functions.get(&name) {
            Some(&arity) => arity,
            None => {
                return Err(self.semantic_err_with_hint(
                    line,
                    format!("Undefined function '{}'", name),
                    format!("define it with 'vibe {}(...) {{ ... }}'", name),
                ));
            }
        };
        if args.len() != arity {
            return Err(self.semantic_err(
                line,
                format!(
                    "Function '{}' expects {} argument(s), got {}",
                    name,
                    arity,
                    args.len()
                ),
            ));
        }

        let mut operands = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.codegen_expr(arg)?;
            let value = self.expect_number(
                value,
                arg.line(),
                &format!("Argument to '{}'", name),
            )?;
            operands.push(format!("double {}", value));
        }

        let result = self.fresh_temp();
        writeln!(
            &mut self.body,
            "  %{} = call double @sg_{}({})",
            result,
            name,
            operands.join(", ")
        )?;
        Ok(Value::Num(format!("%{}", result)))
    }

    fn codegen_assign(
        &mut self,
        name: &str,
        value_expr: &Expr,
        line: usize,
    ) -> Result<Value, CodeGenError> {
        let value = self.codegen_expr(value_expr)?;
        let info = match self.resolve(name) {
            Some(info) => info,
            None => {
                return Err(self.semantic_err_with_hint(
                    line,
                    format!("Undefined variable '{}'", name),
                    format!("declare it first with 'fr {} = ...'", name),
                ));
            }
        };

        match (&info.kind, &value) {
            (VarKind::Number, Value::Num(op)) => {
                writeln!(&mut self.body, "  store double {}, ptr %{}", op, info.cell)?;
            }
            (VarKind::Str, Value::Str(op)) => {
                writeln!(&mut self.body, "  store ptr {}, ptr %{}", op, info.cell)?;
            }
            // Physical type changed: allocate a fresh cell and rebind
            _ => self.bind_value(name, &value)?,
        }
        Ok(value)
    }

    fn codegen_compound_assign(
        &mut self,
        name: &str,
        op: BinaryOp,
        value_expr: &Expr,
        line: usize,
    ) -> Result<Value, CodeGenError> {
        let info = match self.resolve(name) {
            Some(info) => info,
            None => {
                return Err(self.semantic_err(line, format!("Undefined variable '{}'", name)));
            }
        };
        if info.kind != VarKind::Number {
            return Err(self.semantic_err(
                line,
                format!("Operand of '{}=' must be a number", op.symbol()),
            ));
        }

        let value = self.codegen_expr(value_expr)?;
        let value = self.expect_number(
            value,
            value_expr.line(),
            &format!("Operand of '{}='", op.symbol()),
        )?;

        let old = self.fresh_temp();
        writeln!(&mut self.body, "  %{} = load double, ptr %{}", old, info.cell)?;
        let instr = match op {
            BinaryOp::Add => "fadd",
            BinaryOp::Sub => "fsub",
            BinaryOp::Mul => "fmul",
            BinaryOp::Div => "fdiv",
            _ => "frem",
        };
        let new = self.fresh_temp();
        writeln!(
            &mut self.body,
            "  %{} = {} double %{}, {}",
            new, instr, old, value
        )?;
        writeln!(&mut self.body, "  store double %{}, ptr %{}", new, info.cell)?;
        Ok(Value::Num(format!("%{}", new)))
    }

    fn codegen_increment(
        &mut self,
        name: &str,
        op: IncOp,
        prefix: bool,
        line: usize,
    ) -> Result<Value, CodeGenError> {
        let symbol = match op {
            IncOp::Inc => "++",
            IncOp::Dec => "--",
        };
        let info = match self.resolve(name) {
            Some(info) => info,
            None => {
                return Err(self.semantic_err(line, format!("Undefined variable '{}'", name)));
            }
        };
        if info.kind != VarKind::Number {
            return Err(
                self.semantic_err(line, format!("Operand of '{}' must be a number", symbol))
            );
        }

        let old = self.fresh_temp();
        writeln!(&mut self.body, "  %{} = load double, ptr %{}", old, info.cell)?;
        let instr = match op {
            IncOp::Inc => "fadd",
            IncOp::Dec => "fsub",
        };
        let new = self.fresh_temp();
        writeln!(
            &mut self.body,
            "  %{} = {} double %{}, {}",
            new,
            instr,
            old,
            fmt_double(1.0)
        )?;
        writeln!(&mut self.body, "  store double %{}, ptr %{}", new, info.cell)?;

        let result = if prefix { new } else { old };
        Ok(Value::Num(format!("%{}", result)))
    }

    /// Compute the address of `object[index]`. The index is truncated from
    /// its float value to a signed integer; no bounds check is emitted.
    fn codegen_element_ptr(
        &mut self,
        object: &Expr,
        index: &Expr,
        line: usize,
    ) -> Result<String, CodeGenError> {
        let obj = self.codegen_expr(object)?;
        let (ptr, len) = match obj {
            Value::Array { ptr, len } => (ptr, len),
            _ => return Err(self.semantic_err(line, "Can only index arrays")),
        };

        let idx = self.codegen_expr(index)?;
        let idx = self.expect_number(idx, index.line(), "Array index")?;
        let idx_int = self.fresh_temp();
        writeln!(
            &mut self.body,
            "  %{} = fptosi double {} to i64",
            idx_int, idx
        )?;

        let slot = self.fresh_temp();
        writeln!(
            &mut self.body,
            "  %{} = getelementptr [{} x double], ptr {}, i64 0, i64 %{}",
            slot, len, ptr, idx_int
        )?;
        Ok(slot)
    }

    fn codegen_array_literal(&mut self, elements: &[Expr]) -> Result<Value, CodeGenError> {
        let len = elements.len();
        let cell = self.fresh_cell("arr");
        writeln!(&mut self.entry, "  %{} = alloca [{} x double]", cell, len)?;

        for (i, element) in elements.iter().enumerate() {
            let value = self.codegen_expr(element)?;
            let value = self.expect_number(value, element.line(), "Array element")?;
            let slot = self.fresh_temp();
            writeln!(
                &mut self.body,
                "  %{} = getelementptr [{} x double], ptr %{}, i64 0, i64 {}",
                slot, len, cell, i
            )?;
            writeln!(&mut self.body, "  store double {}, ptr %{}", value, slot)?;
        }

        Ok(Value::Array {
            ptr: format!("%{}", cell),
            len,
        })
    }

    /// Create a fresh binding for `name` holding `value` in the innermost
    /// scope frame. Numbers and strings get a stack cell; an array binding
    /// records the allocation pointer and length directly.
    pub(super) fn bind_value(&mut self, name: &str, value: &Value) -> Result<(), CodeGenError> {
        match value {
            Value::Num(op) => {
                let cell = self.fresh_cell(name);
                writeln!(&mut self.entry, "  %{} = alloca double", cell)?;
                writeln!(&mut self.body, "  store double {}, ptr %{}", op, cell)?;
                self.bind(
                    name,
                    VarInfo {
                        cell,
                        kind: VarKind::Number,
                    },
                );
            }
            Value::Str(op) => {
                let cell = self.fresh_cell(name);
                writeln!(&mut self.entry, "  %{} = alloca ptr", cell)?;
                writeln!(&mut self.body, "  store ptr {}, ptr %{}", op, cell)?;
                self.bind(
                    name,
                    VarInfo {
                        cell,
                        kind: VarKind::Str,
                    },
                );
            }
            Value::Array { ptr, len } => {
                self.bind(
                    name,
                    VarInfo {
                        cell: ptr.trim_start_matches('%').to_string(),
                        kind: VarKind::Array { len: *len },
                    },
                );
            }
        }
        Ok(())
    }
}

fn operand_desc(op: BinaryOp) -> String {
    format!("Operand of '{}'", op.symbol())
}
