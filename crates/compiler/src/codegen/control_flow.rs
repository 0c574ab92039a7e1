//! Control-flow code generation.
//!
//! Conditionals, loops, switch cascades and try/catch. Loops push a frame
//! of branch targets consulted by `mog`/`skip`; a branch body that already
//! terminated (returned, broke, continued) is not given a trailing branch
//! to the merge block.

use std::fmt::Write as _;

use crate::ast::{Expr, Stmt, SwitchCase};

use super::state::LoopFrame;
use super::{CodeGen, CodeGenError};

impl CodeGen<'_> {
    pub(super) fn codegen_if(
        &mut self,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
        _line: usize,
    ) -> Result<(), CodeGenError> {
        let value = self.codegen_expr(cond)?;
        let cond_op = self.truthiness(value, cond.line(), "Condition of 'lowkey'")?;

        let then_block = self.fresh_block("if_then");
        let else_block = if else_branch.is_some() {
            Some(self.fresh_block("if_else"))
        } else {
            None
        };
        let merge_block = self.fresh_block("if_merge");

        let false_target = else_block.as_deref().unwrap_or(&merge_block);
        writeln!(
            &mut self.body,
            "  br i1 {}, label %{}, label %{}",
            cond_op, then_block, false_target
        )?;
        self.terminated = true;

        self.set_block(&then_block)?;
        self.codegen_stmt(then_branch)?;
        if !self.terminated {
            writeln!(&mut self.body, "  br label %{}", merge_block)?;
            self.terminated = true;
        }

        if let (Some(else_block), Some(else_branch)) = (else_block, else_branch) {
            self.set_block(&else_block)?;
            self.codegen_stmt(else_branch)?;
            if !self.terminated {
                writeln!(&mut self.body, "  br label %{}", merge_block)?;
                self.terminated = true;
            }
        }

        self.set_block(&merge_block)
    }

    pub(super) fn codegen_while(
        &mut self,
        cond: &Expr,
        body: &Stmt,
        _line: usize,
    ) -> Result<(), CodeGenError> {
        let cond_block = self.fresh_block("while_cond");
        let body_block = self.fresh_block("while_body");
        let after_block = self.fresh_block("while_after");

        writeln!(&mut self.body, "  br label %{}", cond_block)?;
        self.terminated = true;

        self.set_block(&cond_block)?;
        let value = self.codegen_expr(cond)?;
        let cond_op = self.truthiness(value, cond.line(), "Condition of 'goon'")?;
        writeln!(
            &mut self.body,
            "  br i1 {}, label %{}, label %{}",
            cond_op, body_block, after_block
        )?;
        self.terminated = true;

        self.loop_frames.push(LoopFrame {
            continue_target: cond_block.clone(),
            break_target: after_block.clone(),
        });
        self.set_block(&body_block)?;
        let result = self.codegen_stmt(body);
        self.loop_frames.pop();
        result?;

        if !self.terminated {
            writeln!(&mut self.body, "  br label %{}", cond_block)?;
            self.terminated = true;
        }

        self.set_block(&after_block)
    }

    /// `edge` loops get their own scope frame so an `fr` initializer is
    /// visible in the condition, increment and body but nowhere after.
    /// `skip` branches to the increment block, `mog` past the loop.
    pub(super) fn codegen_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        incr: Option<&Expr>,
        body: &Stmt,
        _line: usize,
    ) -> Result<(), CodeGenError> {
        self.scopes.push(Default::default());
        let result = self.codegen_for_inner(init, cond, incr, body);
        self.scopes.pop();
        result
    }

    fn codegen_for_inner(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        incr: Option<&Expr>,
        body: &Stmt,
    ) -> Result<(), CodeGenError> {
        if let Some(init) = init {
            self.codegen_stmt(init)?;
        }

        let cond_block = self.fresh_block("for_cond");
        let body_block = self.fresh_block("for_body");
        let incr_block = self.fresh_block("for_incr");
        let after_block = self.fresh_block("for_after");

        writeln!(&mut self.body, "  br label %{}", cond_block)?;
        self.terminated = true;

        self.set_block(&cond_block)?;
        match cond {
            Some(cond) => {
                let value = self.codegen_expr(cond)?;
                let cond_op = self.truthiness(value, cond.line(), "Condition of 'edge'")?;
                writeln!(
                    &mut self.body,
                    "  br i1 {}, label %{}, label %{}",
                    cond_op, body_block, after_block
                )?;
            }
            // Empty condition: loop unconditionally
            None => writeln!(&mut self.body, "  br label %{}", body_block)?,
        }
        self.terminated = true;

        self.loop_frames.push(LoopFrame {
            continue_target: incr_block.clone(),
            break_target: after_block.clone(),
        });
        self.set_block(&body_block)?;
        let result = self.codegen_stmt(body);
        self.loop_frames.pop();
        result?;

        if !self.terminated {
            writeln!(&mut self.body, "  br label %{}", incr_block)?;
            self.terminated = true;
        }

        self.set_block(&incr_block)?;
        if let Some(incr) = incr {
            self.codegen_expr(incr)?;
        }
        writeln!(&mut self.body, "  br label %{}", cond_block)?;
        self.terminated = true;

        self.set_block(&after_block)
    }

    pub(super) fn codegen_break(&mut self, line: usize) -> Result<(), CodeGenError> {
        let target = match self.loop_frames.last() {
            Some(frame) => frame.break_target.clone(),
            None => return Err(self.semantic_err(line, "break outside of loop")),
        };
        writeln!(&mut self.body, "  br label %{}", target)?;
        self.terminated = true;
        // Dead code after the jump lands in its own unreachable block
        let dead = self.fresh_block("unreachable");
        self.set_block(&dead)
    }

    pub(super) fn codegen_continue(&mut self, line: usize) -> Result<(), CodeGenError> {
        let target = match self.loop_frames.last() {
            Some(frame) => frame.continue_target.clone(),
            None => return Err(self.semantic_err(line, "continue outside of loop")),
        };
        writeln!(&mut self.body, "  br label %{}", target)?;
        self.terminated = true;
        let dead = self.fresh_block("unreachable");
        self.set_block(&dead)
    }

    /// `simp` dispatches through a cascade of float equality tests: case
    /// values are doubles, so there is no integer jump table to use. Each
    /// arm is independent; finishing an arm branches to the merge block,
    /// never into the next arm.
    pub(super) fn codegen_switch(
        &mut self,
        scrutinee: &Expr,
        cases: &[SwitchCase],
        _line: usize,
    ) -> Result<(), CodeGenError> {
        let value = self.codegen_expr(scrutinee)?;
        let value = self.expect_number(value, scrutinee.line(), "Switch value")?;

        let merge_block = self.fresh_block("switch_merge");

        let mut arm_blocks = Vec::new();
        let mut default: Option<(&SwitchCase, String)> = None;
        for case in cases {
            if case.is_default {
                if default.is_none() {
                    default = Some((case, self.fresh_block("switch_default")));
                }
            } else {
                arm_blocks.push((case, self.fresh_block("switch_case")));
            }
        }
        let fallthrough = default
            .as_ref()
            .map(|(_, block)| block.clone())
            .unwrap_or_else(|| merge_block.clone());

        // Dispatch chain
        if arm_blocks.is_empty() {
            writeln!(&mut self.body, "  br label %{}", fallthrough)?;
            self.terminated = true;
        } else {
            let last = arm_blocks.len() - 1;
            for (i, (case, arm_block)) in arm_blocks.iter().enumerate() {
                let case_value = case.value.as_ref().expect("non-default case has a value");
                let cv = self.codegen_expr(case_value)?;
                let cv = self.expect_number(cv, case_value.line(), "Case value")?;
                let eq = self.fresh_temp();
                writeln!(
                    &mut self.body,
                    "  %{} = fcmp oeq double {}, {}",
                    eq, value, cv
                )?;
                let next = if i == last {
                    fallthrough.clone()
                } else {
                    self.fresh_block("switch_test")
                };
                writeln!(
                    &mut self.body,
                    "  br i1 %{}, label %{}, label %{}",
                    eq, arm_block, next
                )?;
                self.terminated = true;
                if i != last {
                    self.set_block(&next)?;
                }
            }
        }

        // Arm bodies
        for (case, arm_block) in &arm_blocks {
            self.set_block(arm_block)?;
            self.scopes.push(Default::default());
            let result = self.codegen_stmts(&case.body);
            self.scopes.pop();
            result?;
            if !self.terminated {
                writeln!(&mut self.body, "  br label %{}", merge_block)?;
                self.terminated = true;
            }
        }
        if let Some((case, default_block)) = default {
            self.set_block(&default_block)?;
            self.scopes.push(Default::default());
            let result = self.codegen_stmts(&case.body);
            self.scopes.pop();
            result?;
            if !self.terminated {
                writeln!(&mut self.body, "  br label %{}", merge_block)?;
                self.terminated = true;
            }
        }

        self.set_block(&merge_block)
    }

    /// Without an exception runtime the `yeet` body simply runs in normal
    /// flow; the `caught` body is emitted as a block with no predecessors.
    pub(super) fn codegen_try_catch(
        &mut self,
        try_block: &Stmt,
        catch_block: &Stmt,
    ) -> Result<(), CodeGenError> {
        let try_body = self.fresh_block("try_body");
        let catch_body = self.fresh_block("catch_body");
        let merge_block = self.fresh_block("try_merge");

        writeln!(&mut self.body, "  br label %{}", try_body)?;
        self.terminated = true;

        self.set_block(&try_body)?;
        self.codegen_stmt(try_block)?;
        if !self.terminated {
            writeln!(&mut self.body, "  br label %{}", merge_block)?;
            self.terminated = true;
        }

        self.set_block(&catch_body)?;
        self.codegen_stmt(catch_block)?;
        if !self.terminated {
            writeln!(&mut self.body, "  br label %{}", merge_block)?;
            self.terminated = true;
        }

        self.set_block(&merge_block)
    }
}
