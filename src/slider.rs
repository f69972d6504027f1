use std::f32::consts::{PI, TAU};

use macroquad::prelude::*;

use crate::{
    look_and_feel::{
        LABEL_GREEN, draw_fitted_text, draw_rotary_slider, point_on_circumference, slider_angle,
        text_width,
    },
    params::{Parameter, ParameterKind, ValueRange},
};

pub const TEXT_HEIGHT: u16 = 14;

/// Knob sweep: 7:30 round to 4:30, leaving the gap at the bottom.
pub const ROTARY_START_ANGLE: f32 = (180.0 + 45.0) * PI / 180.0;
pub const ROTARY_END_ANGLE: f32 = (180.0 - 45.0) * PI / 180.0 + TAU;

/// Values whose magnitude exceeds this are shown in thousands.
pub const SCALE_THRESHOLD: f32 = 999.0;

const DRAG_SENSITIVITY: f32 = 0.005;
const WHEEL_STEP: f32 = 0.03;

#[derive(Clone, Debug, PartialEq)]
pub struct LabelPos {
    pub pos: f32,
    pub label: String,
}

/// Mouse state for one frame, gathered by the editor.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointerInput {
    pub position: Vec2,
    pub pressed: bool,
    pub down: bool,
    pub released: bool,
    pub wheel: f32,
}

impl PointerInput {
    pub fn poll() -> Self {
        let (x, y) = mouse_position();
        let (_, wheel) = mouse_wheel();
        Self {
            position: vec2(x, y),
            pressed: is_mouse_button_pressed(MouseButton::Left),
            down: is_mouse_button_down(MouseButton::Left),
            released: is_mouse_button_released(MouseButton::Left),
            wheel,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct DragOrigin {
    proportion: f32,
    mouse: Vec2,
}

/// A rotary knob for one parameter, with range labels placed around it.
#[derive(Clone, Debug)]
pub struct RotarySliderWithLabels {
    kind: ParameterKind,
    suffix: String,
    value: f32,
    bounds: Rect,
    labels: Vec<LabelPos>,
    drag: Option<DragOrigin>,
    user_change: Option<f32>,
}

impl RotarySliderWithLabels {
    pub fn new(parameter: &Parameter, unit_suffix: &str) -> Self {
        Self {
            kind: parameter.kind().clone(),
            suffix: unit_suffix.to_string(),
            value: parameter.value(),
            bounds: Rect::new(0.0, 0.0, 0.0, 0.0),
            labels: Vec::new(),
            drag: None,
            user_change: None,
        }
    }

    pub fn add_label(&mut self, pos: f32, label: &str) {
        debug_assert!((0.0..=1.0).contains(&pos), "label position {pos} outside 0..1");
        self.labels.push(LabelPos {
            pos,
            label: label.to_string(),
        });
    }

    pub fn text_height(&self) -> u16 {
        TEXT_HEIGHT
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    pub fn range(&self) -> ValueRange {
        self.kind.range()
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Moves the knob without marking it as a user edit.
    pub fn set_value(&mut self, value: f32) {
        self.value = self.kind.constrain(value);
    }

    pub fn proportion(&self) -> f32 {
        self.range().to_normalized(self.value)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The value the user moved the knob to since the last call, if any.
    pub fn take_user_change(&mut self) -> Option<f32> {
        self.user_change.take()
    }

    /// Square knob area: the smaller side minus room for two lines of text,
    /// centered horizontally, two pixels from the top.
    pub fn slider_bounds(&self) -> Rect {
        let size =
            (self.bounds.w.min(self.bounds.h) - self.text_height() as f32 * 2.0).max(0.0);
        Rect::new(
            self.bounds.x + (self.bounds.w - size) * 0.5,
            self.bounds.y + 2.0,
            size,
            size,
        )
    }

    pub fn display_string(&self) -> String {
        display_string(&self.kind, self.value, &self.suffix)
    }

    /// Where each label goes, given a way to measure text width.
    pub fn label_placements<F>(&self, measure: F) -> Vec<(Rect, &str)>
    where
        F: Fn(&str) -> f32,
    {
        let slider_bounds = self.slider_bounds();
        let center = slider_bounds.center();
        let radius = slider_bounds.w * 0.5;
        let text_height = self.text_height() as f32;
        self.labels
            .iter()
            .map(|label| {
                let rect = label_rect(
                    center,
                    radius,
                    text_height,
                    label.pos,
                    measure(&label.label),
                );
                (rect, label.label.as_str())
            })
            .collect()
    }

    pub fn handle_input(&mut self, input: &PointerInput) {
        let hit = self.slider_bounds().contains(input.position);
        if input.pressed && hit {
            self.drag = Some(DragOrigin {
                proportion: self.proportion(),
                mouse: input.position,
            });
        }
        if let Some(origin) = self.drag {
            if input.down {
                // Horizontal-vertical drag: right and up both turn clockwise.
                let travel = (input.position.x - origin.mouse.x)
                    + (origin.mouse.y - input.position.y);
                self.set_proportion_from_user(origin.proportion + travel * DRAG_SENSITIVITY);
            }
            if input.released || !input.down {
                self.drag = None;
            }
        }
        if hit && input.wheel.abs() > f32::EPSILON {
            self.set_proportion_from_user(self.proportion() + input.wheel.signum() * WHEEL_STEP);
        }
    }

    fn set_proportion_from_user(&mut self, proportion: f32) {
        let value = self
            .kind
            .constrain(self.range().from_normalized(proportion));
        if value != self.value {
            self.value = value;
            self.user_change = Some(value);
        }
    }

    pub fn paint(&self) {
        let slider_bounds = self.slider_bounds();
        draw_rotary_slider(
            slider_bounds,
            self.proportion(),
            ROTARY_START_ANGLE,
            ROTARY_END_ANGLE,
            self,
        );
        let size = self.text_height();
        for (rect, text) in self.label_placements(|text| text_width(text, size)) {
            draw_fitted_text(text, rect, size, LABEL_GREEN);
        }
    }
}

/// Label box for one ring entry: centered on the circle just outside the knob
/// at the entry's angle, then dropped by one text line.
pub fn label_rect(
    center: Vec2,
    knob_radius: f32,
    text_height: f32,
    fraction: f32,
    text_width: f32,
) -> Rect {
    debug_assert!(0.0 <= fraction);
    debug_assert!(fraction <= 1.0);
    let angle = slider_angle(fraction, ROTARY_START_ANGLE, ROTARY_END_ANGLE);
    let c = point_on_circumference(center, knob_radius + text_height * 0.5 + 1.0, angle);
    Rect::new(
        c.x - text_width * 0.5,
        c.y - text_height * 0.5 + text_height,
        text_width,
        text_height,
    )
}

/// Text for a parameter value. Choices show their name; numbers past the
/// threshold are shown in thousands, with a "k" in front of the unit.
pub fn display_string(kind: &ParameterKind, value: f32, suffix: &str) -> String {
    if let ParameterKind::Choice { .. } = kind {
        return kind.choice_name(value).unwrap_or_default().to_string();
    }
    let scaled = value.abs() > SCALE_THRESHOLD;
    let mut text = if scaled {
        format!("{:.2}", value / 1000.0)
    } else {
        whole_number(value)
    };
    if !suffix.is_empty() {
        text.push(' ');
        if scaled {
            text.push('k');
        }
        text.push_str(suffix);
    }
    text
}

fn whole_number(value: f32) -> String {
    let text = format!("{value:.0}");
    if text == "-0" { "0".to_string() } else { text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{GRAIN_DURATION, ParameterTree, SOURCE_WAVE};
    use float_cmp::approx_eq;

    fn float_kind(start: f32, end: f32) -> ParameterKind {
        ParameterKind::Float {
            range: ValueRange::new(start, end),
            default: start,
        }
    }

    fn duration_slider() -> RotarySliderWithLabels {
        let tree = ParameterTree::grain_synth();
        let mut slider = RotarySliderWithLabels::new(tree.get(GRAIN_DURATION).unwrap(), "Ms");
        slider.add_label(0.0, "5ms");
        slider.add_label(1.0, "500ms");
        slider.set_bounds(Rect::new(0.0, 0.0, 200.0, 120.0));
        slider
    }

    #[test]
    fn scale_applies_only_past_the_threshold() {
        let kind = float_kind(0.0, 20_000.0);
        assert_eq!(display_string(&kind, 999.0, "Hz"), "999 Hz");
        assert_eq!(display_string(&kind, 999.5, "Hz"), "1.00 kHz");
        assert_eq!(display_string(&kind, 1500.0, "Hz"), "1.50 kHz");
        assert_eq!(display_string(&kind, 80.0, ""), "80");
    }

    #[test]
    fn empty_suffix_drops_the_scale_letter() {
        let kind = float_kind(0.0, 20_000.0);
        assert_eq!(display_string(&kind, 12_340.0, ""), "12.34");
        assert_eq!(display_string(&kind, 500.0, ""), "500");
    }

    #[test]
    fn unscaled_values_are_whole_numbers() {
        let kind = float_kind(-6.0, 6.0);
        assert_eq!(display_string(&kind, 0.01, "Ms"), "0 Ms");
        assert_eq!(display_string(&kind, 2.4, "x"), "2 x");
        assert_eq!(display_string(&kind, 5.6, "x"), "6 x");
        assert_eq!(display_string(&kind, -6.0, "x"), "-6 x");
        assert_eq!(display_string(&kind, -0.001, "x"), "0 x");
    }

    #[test]
    fn choices_show_their_name() {
        let tree = ParameterTree::grain_synth();
        let kind = tree.get(SOURCE_WAVE).unwrap().kind().clone();
        assert_eq!(display_string(&kind, 3.0, "ignored"), "Sine");
        assert_eq!(display_string(&kind, 0.0, ""), "Saw");
    }

    #[test]
    fn slider_bounds_leave_room_for_labels() {
        let slider = duration_slider();
        let bounds = slider.slider_bounds();
        assert_eq!(bounds.w, 120.0 - 28.0);
        assert_eq!(bounds.h, bounds.w);
        assert_eq!(bounds.y, 2.0);
        assert!(approx_eq!(f32, bounds.center().x, 100.0));
    }

    #[test]
    fn end_labels_sit_below_the_knob_on_either_side() {
        let slider = duration_slider();
        let knob = slider.slider_bounds();
        let placements = slider.label_placements(|text| text.len() as f32 * 7.0);
        assert_eq!(placements.len(), 2);

        let (min_rect, min_text) = placements[0];
        let (max_rect, max_text) = placements[1];
        assert_eq!(min_text, "5ms");
        assert_eq!(max_text, "500ms");
        assert!(min_rect.center().x < knob.center().x);
        assert!(max_rect.center().x > knob.center().x);
        assert!(min_rect.y > knob.center().y);
        assert!(approx_eq!(f32, min_rect.y, max_rect.y, epsilon = 1e-3));
        assert_eq!(max_rect.w, 35.0);
    }

    #[test]
    fn label_ring_radius_clears_the_knob() {
        let center = vec2(0.0, 0.0);
        // The top of the ring is fraction 0.5.
        let rect = label_rect(center, 40.0, 14.0, 0.5, 20.0);
        assert!(approx_eq!(f32, rect.center().x, 0.0, epsilon = 1e-3));
        assert!(approx_eq!(f32, rect.center().y, -48.0 + 14.0, epsilon = 1e-3));
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn labels_outside_the_sweep_are_rejected() {
        let mut slider = duration_slider();
        slider.add_label(1.5, "too far");
    }

    #[test]
    fn vertical_drag_turns_the_knob() {
        let mut slider = duration_slider();
        let center = slider.slider_bounds().center();
        let start = slider.proportion();

        slider.handle_input(&PointerInput {
            position: center,
            pressed: true,
            down: true,
            ..Default::default()
        });
        slider.handle_input(&PointerInput {
            position: center - vec2(0.0, 40.0),
            down: true,
            ..Default::default()
        });
        assert!(slider.is_dragging());
        assert!(approx_eq!(f32, slider.proportion(), start + 0.2, epsilon = 1e-4));
        assert_eq!(slider.take_user_change(), Some(slider.value()));
        assert_eq!(slider.take_user_change(), None);

        slider.handle_input(&PointerInput {
            position: center - vec2(0.0, 40.0),
            released: true,
            ..Default::default()
        });
        assert!(!slider.is_dragging());
    }

    #[test]
    fn drag_clamps_and_wheel_nudges() {
        let mut slider = duration_slider();
        let center = slider.slider_bounds().center();
        slider.handle_input(&PointerInput {
            position: center,
            pressed: true,
            down: true,
            ..Default::default()
        });
        slider.handle_input(&PointerInput {
            position: center + vec2(5_000.0, 0.0),
            down: true,
            ..Default::default()
        });
        assert_eq!(slider.value(), 500.0);

        slider.handle_input(&PointerInput {
            position: center,
            released: true,
            wheel: -1.0,
            ..Default::default()
        });
        assert!(approx_eq!(f32, slider.proportion(), 0.97, epsilon = 1e-4));
    }

    #[test]
    fn external_updates_are_not_user_changes() {
        let mut slider = duration_slider();
        slider.set_value(250.0);
        assert_eq!(slider.value(), 250.0);
        assert_eq!(slider.take_user_change(), None);
        slider.set_value(10_000.0);
        assert_eq!(slider.value(), 500.0);
    }
}
