//! Whole-program code generation.
//!
//! Two passes over the top-level statement list: the first registers every
//! function signature, the second emits `main` and, in place, each
//! function body. The finished module is assembled here: header, string
//! globals, the lone `printf` declaration, user functions, `main`.

use std::fmt::Write as _;

use crate::ast::Stmt;

use super::functions::verify_function_text;
use super::{CodeGen, CodeGenError};

impl CodeGen<'_> {
    /// Generate the textual IR module for a parsed program.
    pub fn codegen_program(&mut self, program: &[Stmt]) -> Result<String, CodeGenError> {
        // Pass 1: predeclare function symbols
        self.predeclare(program)?;

        // Pass 2: emit top-level code into main, functions in place
        let body_block = self.fresh_block("body");
        self.set_block(&body_block)?;
        self.codegen_stmts(program)?;

        if !self.terminated {
            writeln!(&mut self.body, "  ret i32 0")?;
            self.terminated = true;
        }

        let mut main_text = String::new();
        writeln!(&mut main_text, "define i32 @main() {{")?;
        writeln!(&mut main_text, "entry:")?;
        main_text.push_str(&self.entry);
        writeln!(&mut main_text, "  br label %{}", body_block)?;
        main_text.push_str(&self.body);
        writeln!(&mut main_text, "}}")?;

        if let Err(msg) = verify_function_text(&main_text) {
            return Err(self.verify_err(0, "main", msg));
        }

        // Assemble the module
        let mut ir = String::new();
        writeln!(&mut ir, "; ModuleID = 'sigma'")?;
        writeln!(&mut ir, "target triple = \"{}\"", get_target_triple())?;
        writeln!(&mut ir)?;

        if !self.string_globals.is_empty() {
            ir.push_str(&self.string_globals);
            writeln!(&mut ir)?;
        }

        writeln!(&mut ir, "declare i32 @printf(ptr, ...)")?;
        writeln!(&mut ir)?;

        ir.push_str(&self.functions_ir);
        ir.push_str(&main_text);

        Ok(ir)
    }
}

/// Target triple for the host platform, derived from the compiler's own
/// build target.
///
/// The module is always handed to the host clang, which links it against
/// the host libc for the `printf` calls, so the triple must name the
/// machine sigmac itself runs on. Without one clang still compiles the
/// module but warns that it is overriding the target, and macOS linkers
/// reject modules with no deployment version.
pub fn get_target_triple() -> String {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        // Apple spells the 64-bit ARM architecture "arm64" in triples and
        // wants a minimum OS version on it
        ("macos", "aarch64") => "arm64-apple-macosx14.0.0".to_string(),
        ("macos", arch) => format!("{}-apple-darwin", arch),
        ("linux", arch) => format!("{}-unknown-linux-gnu", arch),
        // Anything else: name the platform and let clang take it from there
        (os, arch) => format!("{}-unknown-{}", arch, os),
    }
}

#[cfg(test)]
mod tests {
    use super::get_target_triple;

    #[test]
    fn target_triple_names_a_platform() {
        let triple = get_target_triple();
        assert!(triple.contains('-'));
        assert!(!triple.starts_with('-') && !triple.ends_with('-'));
    }
}
