//! Compilation options.
//!
//! The defaults are the least aggressive settings: no let lifting, no nested
//! clamp rewriting, silent diagnostics. Options are read through the
//! [`crate::ctx::CompilerContext`] that owns them and must be set before any
//! analysis runs.

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Lift a `LetStmt` found immediately inside a `For` loop out of the
    /// loop, unless it rebinds the loop variable.
    pub lift_let: bool,
    /// Enable the rewrites that reassociate and collapse nested
    /// clamp-shaped min/max chains against constants.
    pub simplify_nested_clamp: bool,
    /// Diagnostic verbosity; 0 is silent.
    pub verbosity: u8,
    /// Restrict diagnostics to one category tag; `None` shows all.
    pub log_category: Option<String>,
}
