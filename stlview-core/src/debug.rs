//! Debug controls: numeric properties exposed to the user with bounds.
//!
//! Each viewer owns its own panel. A control does not store the value; it
//! reads and writes the bound property through the getter and setter it was
//! registered with.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(usize);

struct NumberControl {
    label: String,
    min: f32,
    max: f32,
    step: Option<f32>,
    get: Box<dyn Fn() -> f32>,
    set: Box<dyn FnMut(f32)>,
}

impl NumberControl {
    fn constrain(&self, value: f32) -> f32 {
        let (lo, hi) = self.range();
        let value = match self.step {
            Some(step) => {
                let origin = if lo.is_finite() { lo } else { 0.0 };
                origin + ((value - origin) / step).round() * step
            }
            None => value,
        };
        value.clamp(lo, hi)
    }

    /// Bounds given in the wrong order still describe a range
    fn range(&self) -> (f32, f32) {
        if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        }
    }
}

#[derive(Default)]
pub struct DebugPanel {
    controls: Vec<NumberControl>,
}

/// Chained bounds for a freshly added control
pub struct NumberControlBuilder<'a> {
    id: ControlId,
    control: &'a mut NumberControl,
}

impl NumberControlBuilder<'_> {
    /// NaN leaves the bound unset
    pub fn min(self, min: f32) -> Self {
        if !min.is_nan() {
            self.control.min = min;
        }
        self
    }

    pub fn max(self, max: f32) -> Self {
        if !max.is_nan() {
            self.control.max = max;
        }
        self
    }

    /// Non-positive steps are ignored
    pub fn step(self, step: f32) -> Self {
        if step > 0.0 {
            self.control.step = Some(step);
        }
        self
    }

    pub fn id(self) -> ControlId {
        self.id
    }
}

impl DebugPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_number(
        &mut self,
        label: impl Into<String>,
        get: impl Fn() -> f32 + 'static,
        set: impl FnMut(f32) + 'static,
    ) -> NumberControlBuilder<'_> {
        let id = ControlId(self.controls.len());
        self.controls.push(NumberControl {
            label: label.into(),
            min: f32::NEG_INFINITY,
            max: f32::INFINITY,
            step: None,
            get: Box::new(get),
            set: Box::new(set),
        });
        NumberControlBuilder {
            id,
            control: &mut self.controls[id.0],
        }
    }

    /// Current value of the bound property
    pub fn value(&self, id: ControlId) -> Option<f32> {
        self.controls.get(id.0).map(|control| (control.get)())
    }

    /// Clamp and snap `value`, write it through, and return what was written
    pub fn set(&mut self, id: ControlId, value: f32) -> Option<f32> {
        let control = self.controls.get_mut(id.0)?;
        if value.is_nan() {
            return Some((control.get)());
        }
        let value = control.constrain(value);
        (control.set)(value);
        log::debug!("{} = {value}", control.label);
        Some(value)
    }

    /// Move by whole steps (or by 1 for controls without a step)
    pub fn nudge(&mut self, id: ControlId, steps: i32) -> Option<f32> {
        let control = self.controls.get(id.0)?;
        let current = (control.get)();
        let delta = control.step.unwrap_or(1.0) * steps as f32;
        self.set(id, current + delta)
    }

    pub fn label(&self, id: ControlId) -> Option<&str> {
        self.controls.get(id.0).map(|control| control.label.as_str())
    }

    pub fn bounds(&self, id: ControlId) -> Option<(f32, f32)> {
        self.controls
            .get(id.0)
            .map(NumberControl::range)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// `label=value` pairs, for status lines
    pub fn summary(&self) -> String {
        self.controls
            .iter()
            .map(|control| format!("{}={:.1}", control.label, (control.get)()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Debug for DebugPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.controls.iter().map(|control| &control.label))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn bound_cell(panel: &mut DebugPanel, initial: f32) -> (Rc<Cell<f32>>, ControlId) {
        let cell = Rc::new(Cell::new(initial));
        let (get_cell, set_cell) = (Rc::clone(&cell), Rc::clone(&cell));
        let id = panel
            .add_number("y", move || get_cell.get(), move |v| set_cell.set(v))
            .min(-10.0)
            .max(10.0)
            .step(0.1)
            .id();
        (cell, id)
    }

    #[test]
    fn test_set_clamps_to_bounds() {
        let mut panel = DebugPanel::new();
        let (cell, id) = bound_cell(&mut panel, 5.0);

        assert_eq!(panel.set(id, 42.0), Some(10.0));
        assert_eq!(cell.get(), 10.0);
        assert_eq!(panel.set(id, -42.0), Some(-10.0));
    }

    #[test]
    fn test_set_snaps_to_step() {
        let mut panel = DebugPanel::new();
        let (cell, id) = bound_cell(&mut panel, 5.0);

        panel.set(id, 3.14159);
        assert_relative_eq!(cell.get(), 3.1, epsilon = 1e-4);
    }

    #[test]
    fn test_nudge_moves_whole_steps() {
        let mut panel = DebugPanel::new();
        let (cell, id) = bound_cell(&mut panel, 5.0);

        panel.nudge(id, 3);
        assert_relative_eq!(cell.get(), 5.3, epsilon = 1e-4);
        panel.nudge(id, -1000);
        assert_eq!(cell.get(), -10.0);
    }

    #[test]
    fn test_value_reads_through_getter() {
        let mut panel = DebugPanel::new();
        let (cell, id) = bound_cell(&mut panel, 5.0);

        cell.set(-2.0);
        assert_eq!(panel.value(id), Some(-2.0));
        assert_eq!(panel.summary(), "y=-2.0");
    }

    #[test]
    fn test_inverted_bounds_clamp_instead_of_panicking() {
        let mut panel = DebugPanel::new();
        let cell = Rc::new(Cell::new(0.0));
        let (get_cell, set_cell) = (Rc::clone(&cell), Rc::clone(&cell));
        let id = panel
            .add_number("y", move || get_cell.get(), move |v| set_cell.set(v))
            .min(10.0)
            .max(-10.0)
            .min(f32::NAN)
            .id();

        assert_eq!(panel.set(id, 3.0), Some(3.0));
        assert_eq!(panel.set(id, 50.0), Some(10.0));
        assert_eq!(panel.set(id, -50.0), Some(-10.0));
        assert_eq!(panel.bounds(id), Some((-10.0, 10.0)));
        assert_eq!(panel.label(id), Some("y"));
    }

    #[test]
    fn test_nan_is_ignored() {
        let mut panel = DebugPanel::new();
        let (cell, id) = bound_cell(&mut panel, 5.0);

        assert_eq!(panel.set(id, f32::NAN), Some(5.0));
        assert_eq!(cell.get(), 5.0);
    }
}
