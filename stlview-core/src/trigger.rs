//! Per-frame callbacks ("triggers") and the ordered registry holding them.
//!
//! Every registration gets its own [`TriggerHandle`], so the same shared
//! trigger may be registered several times and removed one registration at
//! a time. Shared triggers compare by identity, never by value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type TriggerFn = dyn FnMut() -> anyhow::Result<()>;

/// A trigger that can be registered and later looked up by identity
pub type Trigger = Rc<RefCell<TriggerFn>>;

/// Wrap a closure as a shareable trigger
pub fn trigger<F>(f: F) -> Trigger
where
    F: FnMut() -> anyhow::Result<()> + 'static,
{
    Rc::new(RefCell::new(f))
}

/// Identifies one registration. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerHandle(u64);

impl fmt::Display for TriggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
pub struct TriggerRegistry {
    entries: Vec<(TriggerHandle, Trigger)>,
    next_handle: u64,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, f: F) -> TriggerHandle
    where
        F: FnMut() -> anyhow::Result<()> + 'static,
    {
        self.add_shared(&trigger(f))
    }

    pub fn add_shared(&mut self, trigger: &Trigger) -> TriggerHandle {
        let handle = TriggerHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push((handle, Rc::clone(trigger)));
        handle
    }

    /// Remove one registration. Returns `false` if it was not registered.
    pub fn remove(&mut self, handle: TriggerHandle) -> bool {
        match self.entries.iter().position(|(h, _)| *h == handle) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove the first registration of `trigger`, compared by identity
    pub fn remove_shared(&mut self, trigger: &Trigger) -> Option<TriggerHandle> {
        let index = self
            .entries
            .iter()
            .position(|(_, t)| Rc::ptr_eq(t, trigger))?;
        Some(self.entries.remove(index).0)
    }

    pub fn contains(&self, handle: TriggerHandle) -> bool {
        self.entries.iter().any(|(h, _)| *h == handle)
    }

    /// Registered handles in execution order
    pub fn handles(&self) -> Vec<TriggerHandle> {
        self.entries.iter().map(|(h, _)| *h).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The sequence as it stands now. A cycle iterates this copy so that
    /// triggers may add or remove registrations while it runs.
    pub fn snapshot(&self) -> Vec<(TriggerHandle, Trigger)> {
        self.entries.clone()
    }
}

impl fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerRegistry")
            .field("handles", &self.handles())
            .finish()
    }
}

/// Cloneable handle to a registry, for use from inside triggers
#[derive(Clone, Default, Debug)]
pub struct Triggers(Rc<RefCell<TriggerRegistry>>);

impl Triggers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trigger<F>(&self, f: F) -> TriggerHandle
    where
        F: FnMut() -> anyhow::Result<()> + 'static,
    {
        self.0.borrow_mut().add(f)
    }

    pub fn add_shared(&self, trigger: &Trigger) -> TriggerHandle {
        self.0.borrow_mut().add_shared(trigger)
    }

    pub fn off_trigger(&self, handle: TriggerHandle) -> bool {
        self.0.borrow_mut().remove(handle)
    }

    pub fn off_shared(&self, trigger: &Trigger) -> Option<TriggerHandle> {
        self.0.borrow_mut().remove_shared(trigger)
    }

    pub fn contains(&self, handle: TriggerHandle) -> bool {
        self.0.borrow().contains(handle)
    }

    pub fn handles(&self) -> Vec<TriggerHandle> {
        self.0.borrow().handles()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn snapshot(&self) -> Vec<(TriggerHandle, Trigger)> {
        self.0.borrow().snapshot()
    }
}
