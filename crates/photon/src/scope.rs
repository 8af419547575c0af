//! A stack-structured symbol table.
//!
//! Bindings for the same name shadow each other; `push`/`pop` must be
//! strictly nested within a pass. `depth` exposes a monotonically increasing
//! stamp per binding so callers can compare which of two live bindings was
//! introduced more recently.

use ahash::AHashMap;

pub struct Scope<T> {
    map: AHashMap<String, Vec<(u64, T)>>,
    counter: u64,
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scope<T> {
    pub fn new() -> Self {
        Self {
            map: AHashMap::new(),
            counter: 0,
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: T) {
        self.counter += 1;
        self.map
            .entry(name.into())
            .or_default()
            .push((self.counter, value));
    }

    pub fn pop(&mut self, name: &str) {
        let stack = self
            .map
            .get_mut(name)
            .unwrap_or_else(|| panic!("Scope pop of unbound name {name}"));
        stack.pop().expect("Scope pop of unbound name");
        if stack.is_empty() {
            self.map.remove(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.map.get(name).and_then(|s| s.last()).map(|(_, v)| v)
    }

    /// Stamp of the innermost binding of `name`; 0 if unbound.
    pub fn depth(&self, name: &str) -> u64 {
        self.map
            .get(name)
            .and_then(|s| s.last())
            .map_or(0, |(d, _)| *d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing() {
        let mut s: Scope<i32> = Scope::new();
        s.push("x", 1);
        let outer = s.depth("x");
        s.push("x", 2);
        assert_eq!(s.get("x"), Some(&2));
        assert!(s.depth("x") > outer);
        s.pop("x");
        assert_eq!(s.get("x"), Some(&1));
        s.pop("x");
        assert!(!s.contains("x"));
    }

    #[test]
    #[should_panic(expected = "unbound")]
    fn unbalanced_pop_panics() {
        let mut s: Scope<i32> = Scope::new();
        s.pop("x");
    }
}
