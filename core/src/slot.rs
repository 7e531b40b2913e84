//! Caller-owned cells shared with arrows.
//!
//! A `Slot` is how a pipeline reads late-bound request values and exports
//! captured response values back to the test, without a separate result
//! channel. Cloning a slot clones the handle, not the value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub struct Slot<T>(Rc<RefCell<T>>);

impl<T> Slot<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Replace the held value.
    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }

    pub fn take(&self) -> T
    where
        T: Default,
    {
        self.0.take()
    }

    /// Borrow the held value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow())
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Default> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&self.0.borrow()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_value() {
        let slot = Slot::new(String::from("a"));
        let handle = slot.clone();
        handle.set("b".to_string());
        assert_eq!(slot.get(), "b");
    }

    #[test]
    fn take_leaves_default() {
        let slot = Slot::new(vec![1u8, 2]);
        assert_eq!(slot.take(), vec![1, 2]);
        assert!(slot.with(|v| v.is_empty()));
    }
}
