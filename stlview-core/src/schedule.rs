//! Frame scheduling: the host's "call me on the next display frame" primitive.

use std::cell::{Cell, RefCell};

pub type FrameCallback = Box<dyn FnOnce()>;

/// Identifies a pending frame request so it can be cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

impl FrameRequest {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Delivers callbacks aligned to the host's frame cadence.
///
/// Callbacks are never invoked synchronously from `request_frame`.
pub trait FrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> anyhow::Result<FrameRequest>;

    /// Cancelling an unknown or already-delivered request is a no-op
    fn cancel_frame(&self, request: FrameRequest);
}

/// A frame clock advanced by hand.
///
/// The terminal host calls [`ManualScheduler::advance`] once per tick of its
/// own timer; tests call it to step the loop deterministically.
#[derive(Default)]
pub struct ManualScheduler {
    pending: RefCell<Vec<(FrameRequest, FrameCallback)>>,
    next_id: Cell<u64>,
    frames: Cell<u64>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one frame: run every callback requested before this call.
    ///
    /// Callbacks requested while the frame runs are delivered on the next
    /// advance. Returns the number of callbacks run.
    pub fn advance(&self) -> usize {
        let due = std::mem::take(&mut *self.pending.borrow_mut());
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        self.frames.set(self.frames.get() + 1);
        count
    }

    pub fn advance_by(&self, frames: usize) {
        for _ in 0..frames {
            self.advance();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Frames delivered so far
    pub fn frames(&self) -> u64 {
        self.frames.get()
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&self, callback: FrameCallback) -> anyhow::Result<FrameRequest> {
        let request = FrameRequest(self.next_id.get());
        self.next_id.set(request.0 + 1);
        self.pending.borrow_mut().push((request, callback));
        Ok(request)
    }

    fn cancel_frame(&self, request: FrameRequest) {
        self.pending.borrow_mut().retain(|(r, _)| *r != request);
    }
}
