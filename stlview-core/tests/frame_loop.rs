use std::cell::{Cell, RefCell};
use std::rc::Rc;

use stlview_core::{
    trigger, FaultPolicy, FrameFault, FrameLoop, LoopState, ManualScheduler, Renderer, Trigger,
};

// Not zero-sized, so each instance has its own address
struct MockScene(u8);
struct MockCamera(u8);

/// Records the address of every (scene, camera) pair it is asked to draw
#[derive(Default)]
struct RecordingRenderer {
    calls: Vec<(usize, usize)>,
    log: Option<Rc<RefCell<Vec<String>>>>,
}

impl Renderer<MockScene, MockCamera> for RecordingRenderer {
    fn render(&mut self, scene: &MockScene, camera: &MockCamera) -> anyhow::Result<()> {
        self.calls.push((
            scene as *const MockScene as usize,
            camera as *const MockCamera as usize,
        ));
        if let Some(log) = &self.log {
            log.borrow_mut().push("render".to_string());
        }
        Ok(())
    }

    fn set_size(&mut self, _width: u32, _height: u32) {}
}

type TestLoop = FrameLoop<MockScene, MockCamera, RecordingRenderer>;

fn setup() -> (Rc<ManualScheduler>, TestLoop, Rc<RefCell<Vec<String>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let scheduler = Rc::new(ManualScheduler::new());
    let renderer = RecordingRenderer {
        calls: Vec::new(),
        log: Some(Rc::clone(&log)),
    };
    let frame_loop = FrameLoop::new(
        Rc::new(RefCell::new(MockScene(0))),
        Rc::new(RefCell::new(MockCamera(0))),
        Rc::new(RefCell::new(renderer)),
        scheduler.clone(),
    );
    (scheduler, frame_loop, log)
}

fn logging(log: &Rc<RefCell<Vec<String>>>, name: &str) -> Trigger {
    let log = Rc::clone(log);
    let name = name.to_string();
    trigger(move || {
        log.borrow_mut().push(name.clone());
        Ok(())
    })
}

fn take(log: &Rc<RefCell<Vec<String>>>) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

#[test]
fn triggers_run_in_registration_order_before_render() {
    let (scheduler, frame_loop, log) = setup();
    for name in ["a", "b", "c"] {
        frame_loop.add_shared(&logging(&log, name));
    }
    frame_loop.start().unwrap();

    scheduler.advance();

    assert_eq!(take(&log), ["a", "b", "c", "render"]);
}

#[test]
fn removed_before_cycle_is_not_invoked() {
    let (scheduler, frame_loop, log) = setup();
    let a = logging(&log, "a");
    let b = logging(&log, "b");
    frame_loop.add_shared(&a);
    let b_handle = frame_loop.add_shared(&b);
    frame_loop.add_shared(&logging(&log, "c"));
    frame_loop.start().unwrap();

    scheduler.advance();
    take(&log);
    assert!(frame_loop.off_trigger(b_handle));
    scheduler.advance();

    assert_eq!(take(&log), ["a", "c", "render"]);
}

#[test]
fn add_then_off_leaves_equal_valued_trigger_registered() {
    let (scheduler, frame_loop, log) = setup();
    // Two distinct triggers with identical behavior
    let original = logging(&log, "x");
    let lookalike = logging(&log, "x");
    frame_loop.add_shared(&original);
    let before = frame_loop.triggers().handles();

    frame_loop.add_shared(&lookalike);
    frame_loop.off_shared(&lookalike);

    assert_eq!(frame_loop.triggers().handles(), before);
    frame_loop.start().unwrap();
    scheduler.advance();
    assert_eq!(take(&log), ["x", "render"]);
}

#[test]
fn off_unknown_or_empty_does_not_alter_registry() {
    let (_scheduler, frame_loop, log) = setup();
    let stranger = logging(&log, "stranger");

    assert!(frame_loop.off_shared(&stranger).is_none());
    assert!(frame_loop.triggers().is_empty());

    frame_loop.add_shared(&logging(&log, "a"));
    let before = frame_loop.triggers().handles();
    assert!(frame_loop.off_shared(&stranger).is_none());
    assert_eq!(frame_loop.triggers().handles(), before);
}

#[test]
fn duplicate_registration_removed_once_still_fires_once() {
    let (scheduler, frame_loop, log) = setup();
    let twice = logging(&log, "twice");
    frame_loop.add_shared(&twice);
    frame_loop.add_shared(&twice);
    frame_loop.start().unwrap();

    scheduler.advance();
    assert_eq!(take(&log), ["twice", "twice", "render"]);

    frame_loop.off_shared(&twice);
    scheduler.advance_by(2);
    assert_eq!(take(&log), ["twice", "render", "twice", "render"]);
}

#[test]
fn n_advances_render_n_times_with_same_scene_and_camera() {
    let (scheduler, frame_loop, _log) = setup();
    let counts = Rc::new(RefCell::new([0u32; 2]));
    for i in 0..2 {
        let counts = Rc::clone(&counts);
        frame_loop.add_trigger(move || {
            counts.borrow_mut()[i] += 1;
            Ok(())
        });
    }
    frame_loop.start().unwrap();

    scheduler.advance_by(7);

    let renderer = frame_loop.renderer().borrow();
    assert_eq!(renderer.calls.len(), 7);
    let expected = (
        &*frame_loop.scene().borrow() as *const MockScene as usize,
        &*frame_loop.camera().borrow() as *const MockCamera as usize,
    );
    assert!(renderer.calls.iter().all(|call| *call == expected));
    assert_eq!(*counts.borrow(), [7, 7]);
    assert_eq!(frame_loop.stats().cycles, 7);
}

#[test]
fn trigger_added_during_cycle_runs_from_next_cycle() {
    let (scheduler, frame_loop, log) = setup();
    let triggers = frame_loop.triggers();
    let late = logging(&log, "late");
    let added = Rc::new(Cell::new(false));
    {
        let log = Rc::clone(&log);
        let added = Rc::clone(&added);
        frame_loop.add_trigger(move || {
            log.borrow_mut().push("adder".to_string());
            if !added.replace(true) {
                triggers.add_shared(&late);
            }
            Ok(())
        });
    }
    frame_loop.start().unwrap();

    scheduler.advance();
    assert_eq!(take(&log), ["adder", "render"]);

    scheduler.advance();
    assert_eq!(take(&log), ["adder", "late", "render"]);
}

#[test]
fn trigger_removed_by_earlier_trigger_still_runs_this_cycle() {
    let (scheduler, frame_loop, log) = setup();
    let triggers = frame_loop.triggers();
    let victim = logging(&log, "victim");
    {
        let log = Rc::clone(&log);
        let victim = Rc::clone(&victim);
        frame_loop.add_trigger(move || {
            log.borrow_mut().push("remover".to_string());
            triggers.off_shared(&victim);
            Ok(())
        });
    }
    frame_loop.add_shared(&victim);
    frame_loop.start().unwrap();

    scheduler.advance();
    assert_eq!(take(&log), ["remover", "victim", "render"]);

    scheduler.advance();
    assert_eq!(take(&log), ["remover", "render"]);
}

#[test]
fn isolated_fault_keeps_cycle_going_and_is_reported() {
    let (scheduler, frame_loop, log) = setup();
    let faults = Rc::new(RefCell::new(Vec::new()));
    {
        let faults = Rc::clone(&faults);
        frame_loop.on_fault(move |fault| faults.borrow_mut().push(fault.to_string()));
    }
    let bad = frame_loop.add_trigger(|| anyhow::bail!("mesh went missing"));
    frame_loop.add_shared(&logging(&log, "after"));
    frame_loop.start().unwrap();

    scheduler.advance_by(2);

    assert_eq!(take(&log), ["after", "render", "after", "render"]);
    assert_eq!(frame_loop.stats().trigger_faults, 2);
    let faults = faults.borrow();
    assert_eq!(faults.len(), 2);
    assert!(faults[0].contains(&bad.to_string()));
    assert!(faults[0].contains("mesh went missing"));
}

#[test]
fn abort_policy_skips_rest_of_cycle_but_not_the_loop() {
    let (scheduler, frame_loop, log) = setup();
    let frame_loop = frame_loop.with_policy(FaultPolicy::AbortCycle);
    let fail_once = Rc::new(Cell::new(true));
    {
        let fail_once = Rc::clone(&fail_once);
        frame_loop.add_trigger(move || {
            if fail_once.replace(false) {
                anyhow::bail!("first frame only");
            }
            Ok(())
        });
    }
    frame_loop.add_shared(&logging(&log, "after"));
    frame_loop.start().unwrap();

    scheduler.advance();
    assert!(take(&log).is_empty());
    assert!(frame_loop.is_running());

    scheduler.advance();
    assert_eq!(take(&log), ["after", "render"]);
}

#[test]
fn stop_from_trigger_skips_render_and_ends_loop() {
    let (scheduler, frame_loop, log) = setup();
    let handle = frame_loop.handle();
    frame_loop.add_trigger(move || {
        handle.stop();
        Ok(())
    });
    frame_loop.add_shared(&logging(&log, "later"));
    frame_loop.start().unwrap();

    scheduler.advance();

    assert_eq!(take(&log), ["later"]);
    assert_eq!(frame_loop.state(), LoopState::Stopped);
    assert_eq!(scheduler.pending(), 0);
    scheduler.advance_by(3);
    assert!(take(&log).is_empty());
}

#[test]
fn fault_handler_sees_render_faults() {
    struct Broken;
    impl Renderer<MockScene, MockCamera> for Broken {
        fn render(&mut self, _: &MockScene, _: &MockCamera) -> anyhow::Result<()> {
            anyhow::bail!("surface lost")
        }
        fn set_size(&mut self, _: u32, _: u32) {}
    }

    let scheduler = Rc::new(ManualScheduler::new());
    let frame_loop = FrameLoop::new(
        Rc::new(RefCell::new(MockScene(0))),
        Rc::new(RefCell::new(MockCamera(0))),
        Rc::new(RefCell::new(Broken)),
        scheduler.clone(),
    );
    let seen = Rc::new(Cell::new(0));
    {
        let seen = Rc::clone(&seen);
        frame_loop.on_fault(move |fault| {
            if matches!(fault, FrameFault::Render { .. }) {
                seen.set(seen.get() + 1);
            }
        });
    }
    frame_loop.start().unwrap();

    scheduler.advance_by(4);

    assert_eq!(seen.get(), 4);
    assert!(frame_loop.is_running());
}

#[test]
fn reentrant_frame_delivery_is_deferred() {
    let (scheduler, frame_loop, log) = setup();
    let inner = Rc::clone(&scheduler);
    let nested = Rc::new(Cell::new(true));
    {
        let nested = Rc::clone(&nested);
        frame_loop.add_trigger(move || {
            if nested.replace(false) {
                // Delivers the frame this cycle just requested
                inner.advance();
            }
            Ok(())
        });
    }
    frame_loop.add_shared(&logging(&log, "t"));
    frame_loop.start().unwrap();

    scheduler.advance();

    assert_eq!(take(&log), ["t", "render"]);
    assert_eq!(frame_loop.stats().cycles, 1);
    assert_eq!(scheduler.pending(), 1);
}
