//! Triggers registered from JavaScript values.
//!
//! `addTrigger` accepts any value and keeps only callables. `offTrigger`
//! removes the earliest registration of the same function.

use anyhow::anyhow;
use js_sys::Function;
use stlview_core::{TriggerHandle, Triggers};
use wasm_bindgen::{JsCast, JsValue};

/// A callable that can be recovered from a loosely typed value
pub(crate) trait Callback: Clone + 'static {
    type Value;

    /// `None` when the value cannot be called
    fn from_value(value: Self::Value) -> Option<Self>;

    /// Identity comparison against a value passed back by the caller
    fn matches(&self, value: &Self::Value) -> bool;

    fn invoke(&self) -> anyhow::Result<()>;
}

impl Callback for Function {
    type Value = JsValue;

    fn from_value(value: JsValue) -> Option<Self> {
        value.dyn_into().ok()
    }

    fn matches(&self, value: &JsValue) -> bool {
        AsRef::<JsValue>::as_ref(self) == value
    }

    fn invoke(&self) -> anyhow::Result<()> {
        self.call0(&JsValue::NULL)
            .map(|_| ())
            .map_err(|e| anyhow!("JS trigger threw: {e:?}"))
    }
}

/// Registrations made through a loosely typed API, in registration order
pub(crate) struct CallbackTriggers<C: Callback> {
    triggers: Triggers,
    registered: Vec<(C, TriggerHandle)>,
}

impl<C: Callback> CallbackTriggers<C> {
    pub fn new(triggers: Triggers) -> Self {
        Self {
            triggers,
            registered: Vec::new(),
        }
    }

    pub fn add(&mut self, value: C::Value) -> Option<TriggerHandle> {
        let Some(callback) = C::from_value(value) else {
            log::debug!("addTrigger ignored a non-function value");
            return None;
        };

        let call = callback.clone();
        let handle = self.triggers.add_trigger(move || call.invoke());
        self.registered.push((callback, handle));
        Some(handle)
    }

    /// Remove the first registration matching `value`. Unknown values are a no-op.
    pub fn off(&mut self, value: &C::Value) -> bool {
        let Some(index) = self
            .registered
            .iter()
            .position(|(callback, _)| callback.matches(value))
        else {
            return false;
        };
        let (_, handle) = self.registered.remove(index);
        self.triggers.off_trigger(handle)
    }
}
