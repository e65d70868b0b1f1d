/// Terminal host for the STL viewer
use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{self},
};
use std::io::{stdout, Stdout};
use std::rc::Rc;
use std::time::{Duration, Instant};
use stlview_core::{
    LoadFailure, ManualScheduler, Mesh, StlViewer, Texture, ViewerConfig,
};

pub mod renderer;

pub use renderer::{AsciiRenderer, CELL_ASPECT};

/// What a key press asks the viewer to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Orbit { azimuth: i32, polar: i32 },
    Zoom(i32),
    LightY(i32),
    TogglePause,
}

impl Action {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        let action = match code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('a') | KeyCode::Left => Action::Orbit { azimuth: -1, polar: 0 },
            KeyCode::Char('d') | KeyCode::Right => Action::Orbit { azimuth: 1, polar: 0 },
            KeyCode::Char('w') | KeyCode::Up => Action::Orbit { azimuth: 0, polar: -1 },
            KeyCode::Char('s') | KeyCode::Down => Action::Orbit { azimuth: 0, polar: 1 },
            KeyCode::Char('+') | KeyCode::Char('=') => Action::Zoom(-1),
            KeyCode::Char('-') => Action::Zoom(1),
            KeyCode::Char(']') => Action::LightY(1),
            KeyCode::Char('[') => Action::LightY(-1),
            KeyCode::Char(' ') => Action::TogglePause,
            _ => return None,
        };
        Some(action)
    }
}

/// Main application struct for terminal model viewing
pub struct TerminalApp {
    viewer: StlViewer<AsciiRenderer<Stdout>>,
    scheduler: Rc<ManualScheduler>,
    frame_time: Duration,
    running: bool,
}

impl TerminalApp {
    /// Build the viewer at the current terminal size and attach the model.
    ///
    /// A model that failed to load is reported here, before the terminal is
    /// switched into raw mode.
    pub fn new(
        config: ViewerConfig,
        model: Result<Mesh, LoadFailure>,
        matcap: Option<Texture>,
    ) -> Result<Self> {
        let (columns, rows) = terminal::size().context("failed to query terminal size")?;
        let frame_time = Duration::from_secs(1) / config.frame.target_fps;

        let scheduler = Rc::new(ManualScheduler::new());
        let mut viewer = StlViewer::new(
            config,
            AsciiRenderer::new(columns as usize, rows as usize),
            scheduler.clone(),
            columns as u32,
            rows as u32 * CELL_ASPECT,
        );
        viewer
            .attach_model(model, matcap)
            .context("failed to load model")?;

        install_status_trigger(&viewer);

        Ok(Self {
            viewer,
            scheduler,
            frame_time,
            running: true,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        self.viewer.stop();
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<()> {
        self.viewer.start()?;

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::ZERO)? {
                let event = event::read()?;
                self.handle_event(event);
            }

            // Deliver this tick's frame to the loop
            self.scheduler.advance();

            let elapsed = frame_start.elapsed();
            if elapsed < self.frame_time {
                std::thread::sleep(self.frame_time - elapsed);
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => {
                if let Some(action) = Action::from_key(code) {
                    self.apply(action);
                }
            }
            Event::Resize(columns, rows) => {
                self.viewer
                    .resize(columns as u32, rows as u32 * CELL_ASPECT);
            }
            _ => {}
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Orbit { azimuth, polar } => self.viewer.orbit_steps(azimuth, polar),
            Action::Zoom(steps) => self.viewer.zoom_steps(steps),
            Action::LightY(steps) => {
                self.viewer.nudge_light_y(steps);
            }
            Action::TogglePause => {
                if self.viewer.is_running() {
                    self.viewer.stop();
                } else if let Err(e) = self.viewer.start() {
                    log::error!("could not resume: {e}");
                }
            }
        }
    }
}

/// Per-frame trigger that keeps the status line current
fn install_status_trigger(viewer: &StlViewer<AsciiRenderer<Stdout>>) {
    let scene = Rc::clone(viewer.scene());
    let renderer = Rc::clone(viewer.renderer());
    let light = viewer.light();
    let panel = viewer.debug_panel();
    let control = viewer.light_control();
    let label = panel.label(control).unwrap_or("light.y").to_string();
    let (min, max) = panel.bounds(control).unwrap_or((f32::NEG_INFINITY, f32::INFINITY));

    let mut counter = FpsCounter::new(Instant::now());
    viewer.frame_loop().add_trigger(move || {
        let fps = counter.tick(Instant::now());
        let light_y = scene
            .borrow()
            .light(light)
            .map_or(0.0, |l| l.position.y);
        renderer
            .borrow_mut()
            .set_status(status_line(fps, &label, light_y, (min, max)));
        Ok(())
    });
}

fn status_line(fps: f32, label: &str, value: f32, (min, max): (f32, f32)) -> String {
    format!(
        "stlview | FPS: {fps:.1} | {label}={value:.1} [{min}..{max}] | WASD/Arrows=Orbit +/-=Zoom [/]=Light Space=Pause Q=Quit"
    )
}

/// Frames per second, averaged over one-second windows
struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self, now: Instant) -> f32 {
        self.frames += 1;
        let elapsed = now.duration_since(self.window_start);
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.window_start = now;
        }
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(Action::from_key(KeyCode::Esc), Some(Action::Quit));
        assert_eq!(
            Action::from_key(KeyCode::Left),
            Some(Action::Orbit { azimuth: -1, polar: 0 })
        );
        assert_eq!(Action::from_key(KeyCode::Char('=')), Some(Action::Zoom(-1)));
        assert_eq!(Action::from_key(KeyCode::Char(']')), Some(Action::LightY(1)));
        assert_eq!(Action::from_key(KeyCode::Char('x')), None);
    }

    #[test]
    fn test_status_line_shows_control_bounds() {
        let line = status_line(29.96, "light.y", 5.0, (-10.0, 10.0));
        assert!(line.contains("FPS: 30.0"));
        assert!(line.contains("light.y=5.0 [-10..10]"));
    }

    #[test]
    fn test_fps_counter_averages_over_a_second() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);
        for i in 1..30 {
            assert_eq!(counter.tick(start + Duration::from_millis(i * 33)), 0.0);
        }
        let fps = counter.tick(start + Duration::from_secs(1));
        assert!((fps - 30.0).abs() < 1e-3);
    }
}
