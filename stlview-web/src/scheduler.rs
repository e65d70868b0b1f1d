//! Frame scheduling on top of `window.requestAnimationFrame`.
//!
//! Each request keeps its `Closure` alive on the Rust side until the browser
//! has called it or the request is cancelled, then drops it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::anyhow;
use stlview_core::{FrameCallback, FrameRequest, FrameScheduler};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::Window;

struct Slot<T> {
    handle: i32,
    value: T,
    finished: Rc<Cell<bool>>,
}

/// Values owned on behalf of outstanding frame requests
pub(crate) struct FrameSlots<T> {
    slots: Vec<Slot<T>>,
}

impl<T> Default for FrameSlots<T> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<T> FrameSlots<T> {
    pub fn insert(&mut self, handle: i32, value: T, finished: Rc<Cell<bool>>) {
        self.slots.push(Slot {
            handle,
            value,
            finished,
        });
    }

    /// Drop the values of requests whose callback has returned.
    ///
    /// A callback that is still running keeps its slot until a later call.
    pub fn retire_finished(&mut self) {
        self.slots.retain(|slot| !slot.finished.get());
    }

    pub fn remove(&mut self, handle: i32) -> Option<T> {
        let index = self.slots.iter().position(|slot| slot.handle == handle)?;
        Some(self.slots.remove(index).value)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

pub struct AnimationFrameScheduler {
    window: Window,
    slots: RefCell<FrameSlots<Closure<dyn FnMut()>>>,
}

impl AnimationFrameScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            slots: RefCell::new(FrameSlots::default()),
        }
    }
}

impl FrameScheduler for AnimationFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> anyhow::Result<FrameRequest> {
        self.slots.borrow_mut().retire_finished();

        let finished = Rc::new(Cell::new(false));
        let done = Rc::clone(&finished);
        let mut callback = Some(callback);
        let closure = Closure::<dyn FnMut()>::new(move || {
            if let Some(callback) = callback.take() {
                callback();
            }
            done.set(true);
        });

        let handle = self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map_err(|e| anyhow!("requestAnimationFrame failed: {e:?}"))?;
        let mut slots = self.slots.borrow_mut();
        slots.insert(handle, closure, finished);
        log::trace!("frame {handle} requested, {} outstanding", slots.len());
        Ok(FrameRequest::new(u64::from(handle as u32)))
    }

    fn cancel_frame(&self, request: FrameRequest) {
        let handle = request.id() as i32;
        let Some(closure) = self.slots.borrow_mut().remove(handle) else {
            return;
        };
        if let Err(e) = self.window.cancel_animation_frame(handle) {
            log::warn!("cancelAnimationFrame failed: {e:?}");
        }
        drop(closure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(slots: &mut FrameSlots<String>, handle: i32) -> Rc<Cell<bool>> {
        let finished = Rc::new(Cell::new(false));
        slots.insert(handle, format!("frame {handle}"), Rc::clone(&finished));
        finished
    }

    #[test]
    fn test_cancelled_request_releases_its_value() {
        let mut slots = FrameSlots::default();
        slot(&mut slots, 1);
        slot(&mut slots, 2);

        assert_eq!(slots.remove(1).as_deref(), Some("frame 1"));
        assert_eq!(slots.len(), 1);
        assert!(slots.remove(1).is_none());
        assert!(slots.remove(99).is_none());
    }

    #[test]
    fn test_only_finished_requests_are_retired() {
        let mut slots = FrameSlots::default();
        let first = slot(&mut slots, 1);
        slot(&mut slots, 2);

        slots.retire_finished();
        assert_eq!(slots.len(), 2);

        first.set(true);
        slots.retire_finished();
        assert_eq!(slots.len(), 1);
        assert!(slots.remove(2).is_some());
    }
}
