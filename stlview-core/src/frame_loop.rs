//! The render loop: once per frame, run every registered trigger and then
//! draw the scene.
//!
//! Each cycle asks the scheduler for the next one before doing any work, so
//! a failing trigger or renderer costs one frame, never the loop. Scheduled
//! callbacks only hold a weak reference; dropping the [`FrameLoop`] stops it
//! and releases the pending frame request.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use anyhow::anyhow;
use serde::Deserialize;

use crate::error::FrameFault;
use crate::schedule::{FrameRequest, FrameScheduler};
use crate::trigger::{Trigger, TriggerHandle, Triggers};

/// Draws a scene as seen from a camera.
pub trait Renderer<S, C> {
    fn render(&mut self, scene: &S, camera: &C) -> anyhow::Result<()>;

    /// Resize the output surface
    fn set_size(&mut self, width: u32, height: u32);
}

/// What a cycle does after a trigger returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultPolicy {
    /// Report the fault and keep going with the remaining triggers and the render
    #[default]
    Isolate,
    /// Report the fault and skip the rest of this cycle
    AbortCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub cycles: u64,
    pub renders: u64,
    pub triggers_invoked: u64,
    pub trigger_faults: u64,
    pub render_faults: u64,
}

type FaultHandler = Box<dyn FnMut(&FrameFault)>;

struct LoopInner<S, C, R> {
    scene: Rc<RefCell<S>>,
    camera: Rc<RefCell<C>>,
    renderer: Rc<RefCell<R>>,
    scheduler: Rc<dyn FrameScheduler>,
    triggers: Triggers,
    policy: Cell<FaultPolicy>,
    state: Cell<LoopState>,
    pending: Cell<Option<FrameRequest>>,
    in_cycle: Cell<bool>,
    skip_render: Cell<bool>,
    stats: Cell<FrameStats>,
    on_fault: RefCell<Option<FaultHandler>>,
}

impl<S, C, R> LoopInner<S, C, R> {
    fn stop(&self) {
        if self.state.get() != LoopState::Running {
            return;
        }
        self.state.set(LoopState::Stopped);
        if let Some(request) = self.pending.take() {
            self.scheduler.cancel_frame(request);
        }
        if self.in_cycle.get() {
            self.skip_render.set(true);
        }
        log::debug!("frame loop stopped after {} cycles", self.stats.get().cycles);
    }

    fn update_stats(&self, update: impl FnOnce(&mut FrameStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    fn report(&self, fault: FrameFault) {
        match &fault {
            FrameFault::Trigger { .. } => log::warn!("{fault}"),
            FrameFault::Render { .. } | FrameFault::Schedule { .. } => log::error!("{fault}"),
        }
        // A handler that faults the loop from inside itself is not re-entered
        if let Ok(mut handler) = self.on_fault.try_borrow_mut() {
            if let Some(handler) = handler.as_mut() {
                handler(&fault);
            }
        }
    }

    /// Returns `false` if the cycle was aborted by a trigger fault
    fn invoke_triggers(&self) -> bool {
        for (handle, trigger) in self.triggers.snapshot() {
            let outcome = match trigger.try_borrow_mut() {
                Ok(mut f) => (&mut *f)(),
                Err(_) => Err(anyhow!("trigger is already running")),
            };
            self.update_stats(|s| s.triggers_invoked += 1);

            if let Err(cause) = outcome {
                self.update_stats(|s| s.trigger_faults += 1);
                self.report(FrameFault::Trigger { handle, cause });
                if self.policy.get() == FaultPolicy::AbortCycle {
                    return false;
                }
            }
        }
        true
    }
}

impl<S, C, R> LoopInner<S, C, R>
where
    S: 'static,
    C: 'static,
    R: Renderer<S, C> + 'static,
{
    fn schedule_next(self: &Rc<Self>) -> Result<(), FrameFault> {
        let weak = Rc::downgrade(self);
        let request = self
            .scheduler
            .request_frame(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.run_cycle();
                }
            }))
            .map_err(|cause| FrameFault::Schedule { cause })?;
        self.pending.set(Some(request));
        Ok(())
    }

    fn run_cycle(self: &Rc<Self>) {
        self.pending.set(None);
        if self.state.get() != LoopState::Running {
            return;
        }
        if self.in_cycle.get() {
            // A host delivered a frame from inside this cycle; run it later instead
            log::warn!("frame delivered during a running cycle, deferring");
            if let Err(fault) = self.schedule_next() {
                self.report(fault);
            }
            return;
        }

        if let Err(fault) = self.schedule_next() {
            self.state.set(LoopState::Stopped);
            self.report(fault);
        }

        let _cycle = CycleGuard::enter(&self.in_cycle, &self.skip_render);
        self.update_stats(|s| s.cycles += 1);

        if self.invoke_triggers() && !self.skip_render.get() {
            self.render();
        }
    }

    fn render(&self) {
        let result = match (
            self.scene.try_borrow(),
            self.camera.try_borrow(),
            self.renderer.try_borrow_mut(),
        ) {
            (Ok(scene), Ok(camera), Ok(mut renderer)) => renderer.render(&scene, &camera),
            _ => Err(anyhow!("scene, camera or renderer is borrowed elsewhere")),
        };

        match result {
            Ok(()) => self.update_stats(|s| s.renders += 1),
            Err(cause) => {
                self.update_stats(|s| s.render_faults += 1);
                self.report(FrameFault::Render { cause });
            }
        }
    }
}

/// Marks a cycle as running; cleared on exit even if a trigger unwinds
struct CycleGuard<'a> {
    in_cycle: &'a Cell<bool>,
    skip_render: &'a Cell<bool>,
}

impl<'a> CycleGuard<'a> {
    fn enter(in_cycle: &'a Cell<bool>, skip_render: &'a Cell<bool>) -> Self {
        in_cycle.set(true);
        skip_render.set(false);
        Self {
            in_cycle,
            skip_render,
        }
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.in_cycle.set(false);
        self.skip_render.set(false);
    }
}

trait LoopControl {
    fn stop(&self);
    fn state(&self) -> LoopState;
}

impl<S, C, R> LoopControl for LoopInner<S, C, R> {
    fn stop(&self) {
        LoopInner::stop(self);
    }

    fn state(&self) -> LoopState {
        self.state.get()
    }
}

/// Weak, type-erased control over a loop, for use from inside triggers
#[derive(Clone)]
pub struct LoopHandle(Weak<dyn LoopControl>);

impl LoopHandle {
    /// Stop the loop if it still exists
    pub fn stop(&self) {
        if let Some(control) = self.0.upgrade() {
            control.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.0
            .upgrade()
            .is_some_and(|control| control.state() == LoopState::Running)
    }
}

/// Runs triggers and renders `(scene, camera)` once per scheduled frame.
///
/// The scene, camera and renderer are shared with the caller, who keeps
/// ownership of their lifecycle.
pub struct FrameLoop<S, C, R> {
    inner: Rc<LoopInner<S, C, R>>,
}

impl<S, C, R> FrameLoop<S, C, R>
where
    S: 'static,
    C: 'static,
    R: Renderer<S, C> + 'static,
{
    pub fn new(
        scene: Rc<RefCell<S>>,
        camera: Rc<RefCell<C>>,
        renderer: Rc<RefCell<R>>,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Self {
        Self {
            inner: Rc::new(LoopInner {
                scene,
                camera,
                renderer,
                scheduler,
                triggers: Triggers::new(),
                policy: Cell::new(FaultPolicy::default()),
                state: Cell::new(LoopState::Idle),
                pending: Cell::new(None),
                in_cycle: Cell::new(false),
                skip_render: Cell::new(false),
                stats: Cell::new(FrameStats::default()),
                on_fault: RefCell::new(None),
            }),
        }
    }

    pub fn with_policy(self, policy: FaultPolicy) -> Self {
        self.inner.policy.set(policy);
        self
    }

    /// Begin cycling. Calling this while running does nothing.
    pub fn start(&self) -> Result<(), FrameFault> {
        if self.inner.state.get() == LoopState::Running {
            log::debug!("frame loop already running");
            return Ok(());
        }
        self.inner.state.set(LoopState::Running);
        if let Err(fault) = self.inner.schedule_next() {
            self.inner.state.set(LoopState::Stopped);
            return Err(fault);
        }
        log::debug!("frame loop started");
        Ok(())
    }

    pub fn handle(&self) -> LoopHandle {
        let weak: Weak<LoopInner<S, C, R>> = Rc::downgrade(&self.inner);
        LoopHandle(weak as Weak<dyn LoopControl>)
    }
}

impl<S, C, R> FrameLoop<S, C, R> {
    /// Stop cycling and release the pending frame request.
    ///
    /// When called from a trigger, the current cycle skips its render.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn state(&self) -> LoopState {
        self.inner.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub fn stats(&self) -> FrameStats {
        self.inner.stats.get()
    }

    pub fn policy(&self) -> FaultPolicy {
        self.inner.policy.get()
    }

    pub fn set_policy(&self, policy: FaultPolicy) {
        self.inner.policy.set(policy);
    }

    /// Called with every fault after it has been logged
    pub fn on_fault(&self, handler: impl FnMut(&FrameFault) + 'static) {
        *self.inner.on_fault.borrow_mut() = Some(Box::new(handler));
    }

    pub fn add_trigger<F>(&self, f: F) -> TriggerHandle
    where
        F: FnMut() -> anyhow::Result<()> + 'static,
    {
        self.inner.triggers.add_trigger(f)
    }

    pub fn add_shared(&self, trigger: &Trigger) -> TriggerHandle {
        self.inner.triggers.add_shared(trigger)
    }

    pub fn off_trigger(&self, handle: TriggerHandle) -> bool {
        self.inner.triggers.off_trigger(handle)
    }

    pub fn off_shared(&self, trigger: &Trigger) -> Option<TriggerHandle> {
        self.inner.triggers.off_shared(trigger)
    }

    /// Shared handle to the registry, usable from inside triggers
    pub fn triggers(&self) -> Triggers {
        self.inner.triggers.clone()
    }

    pub fn scene(&self) -> &Rc<RefCell<S>> {
        &self.inner.scene
    }

    pub fn camera(&self) -> &Rc<RefCell<C>> {
        &self.inner.camera
    }

    pub fn renderer(&self) -> &Rc<RefCell<R>> {
        &self.inner.renderer
    }
}

impl<S, C, R> Drop for FrameLoop<S, C, R> {
    fn drop(&mut self) {
        self.inner.stop();
    }
}
