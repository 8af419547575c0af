//! Per-compilation state.
//!
//! One [`CompilerContext`] owns everything a compilation pass shares: the
//! options record, the context manager, the unique-name counter and the
//! function registry. Independent compilations use independent contexts;
//! nothing here is process-global. All interior mutability is single-thread
//! `RefCell`/`Cell` — the core is single-threaded cooperative by design.

use std::cell::{Cell, RefCell, RefMut};

use crate::{
    context::ContextManager,
    function::FunctionContents,
    options::Options,
};

pub struct CompilerContext {
    pub options: Options,
    context: RefCell<ContextManager>,
    name_counter: Cell<u32>,
    pub(crate) functions: RefCell<Vec<FunctionContents>>,
}

impl Default for CompilerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerContext {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            context: RefCell::new(ContextManager::new()),
            name_counter: Cell::new(0),
            functions: RefCell::new(Vec::new()),
        }
    }

    /// The shared context manager. Borrow transiently; holding the borrow
    /// across a traversal step would conflict with nested analyses.
    pub(crate) fn context_mut(&self) -> RefMut<'_, ContextManager> {
        self.context.borrow_mut()
    }

    /// A fresh name of the form `<prefix><n>`; the counter is shared across
    /// the whole compilation so generated names never collide.
    pub fn unique_name(&self, prefix: char) -> String {
        let n = self.name_counter.get();
        self.name_counter.set(n + 1);
        format!("{prefix}{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names_count_up() {
        let cc = CompilerContext::new();
        assert_eq!(cc.unique_name('.'), ".0");
        assert_eq!(cc.unique_name('.'), ".1");
        assert_eq!(cc.unique_name('f'), "f2");
    }
}
