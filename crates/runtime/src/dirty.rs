use std::cell::Cell;
use std::rc::Rc;

/// Per-session "camera changed" marker shared between writers and the
/// pre-frame hook.
///
/// Clones observe the same flag. Setting is idempotent, so any number of
/// updates within one frame collapse into a single pending recompute.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag {
    inner: Rc<Cell<bool>>,
}

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that starts dirty, so the first frame always recomputes.
    pub fn new_dirty() -> Self {
        let flag = Self::new();
        flag.set();
        flag
    }

    pub fn set(&self) {
        self.inner.set(true);
    }

    pub fn is_set(&self) -> bool {
        self.inner.get()
    }

    /// Returns whether the flag was set, clearing it in the same step.
    pub fn test_and_clear(&self) -> bool {
        self.inner.replace(false)
    }
}

#[cfg(test)]
mod tests {
    use super::DirtyFlag;

    #[test]
    fn repeated_sets_coalesce_into_one_clear() {
        let flag = DirtyFlag::new();
        let writer = flag.clone();
        writer.set();
        writer.set();
        writer.set();
        assert!(flag.test_and_clear());
        assert!(!flag.test_and_clear());
        assert!(!writer.is_set());
    }

    #[test]
    fn starts_dirty_when_requested() {
        assert!(DirtyFlag::new_dirty().is_set());
        assert!(!DirtyFlag::new().is_set());
    }
}
