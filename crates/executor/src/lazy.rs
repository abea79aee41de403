use std::sync::{Arc, Mutex};

use value::ConstValue;

use crate::ExecuteError;

/// A single-assignment cell for values produced when the batch registry
/// drains.
///
/// This is the "deferred value" of the execution model: a resolver hands one
/// out instead of a value, the registry fills it during the tick's flush, and
/// the executor reads it synchronously afterwards on the same logical task.
/// It is set exactly once.
#[derive(Clone, Default)]
pub struct Lazy {
    slot: Arc<Mutex<Option<Result<ConstValue, ExecuteError>>>>,
}

impl Lazy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the cell. Filling twice is a registry bug; the first value wins.
    pub fn set(&self, value: Result<ConstValue, ExecuteError>) {
        let mut slot = self.slot.lock().expect("lazy slot poisoned");
        debug_assert!(slot.is_none(), "lazy value resolved twice");
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    pub fn is_set(&self) -> bool {
        self.slot.lock().expect("lazy slot poisoned").is_some()
    }

    /// Take the resolved value out of the cell.
    pub fn take(&self) -> Option<Result<ConstValue, ExecuteError>> {
        self.slot.lock().expect("lazy slot poisoned").take()
    }
}

impl std::fmt::Debug for Lazy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lazy").field("set", &self.is_set()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_take() {
        let lazy = Lazy::new();
        assert!(!lazy.is_set());
        lazy.set(Ok(ConstValue::from(1)));
        assert!(lazy.is_set());
        assert_eq!(lazy.take().unwrap().unwrap(), ConstValue::from(1));
        assert!(!lazy.is_set());
    }
}
