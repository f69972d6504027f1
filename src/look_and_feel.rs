//! Painting for the rotary knobs.
//!
//! Angles follow the clock face: zero points at 12 o'clock and positive angles
//! turn clockwise, which matches macroquad's y-down screen space.

use macroquad::{prelude::*, text::measure_text};

use crate::slider::RotarySliderWithLabels;

pub const KNOB_FILL: Color = Color {
    r: 97.0 / 255.0,
    g: 18.0 / 255.0,
    b: 167.0 / 255.0,
    a: 1.0,
};
pub const KNOB_OUTLINE: Color = Color {
    r: 1.0,
    g: 154.0 / 255.0,
    b: 1.0 / 255.0,
    a: 1.0,
};
pub const LABEL_GREEN: Color = Color {
    r: 0.0,
    g: 172.0 / 255.0,
    b: 1.0 / 255.0,
    a: 1.0,
};
pub const EDITOR_BACKGROUND: Color = Color {
    r: 0.12,
    g: 0.11,
    b: 0.14,
    a: 1.0,
};

const POINTER_HALF_WIDTH: f32 = 2.0;

/// Linear map of a proportional slider position onto the knob's sweep.
pub fn slider_angle(slider_pos_proportional: f32, start_angle: f32, end_angle: f32) -> f32 {
    debug_assert!(start_angle < end_angle);
    start_angle + slider_pos_proportional * (end_angle - start_angle)
}

pub fn point_on_circumference(center: Vec2, radius: f32, angle: f32) -> Vec2 {
    vec2(
        center.x + radius * angle.sin(),
        center.y - radius * angle.cos(),
    )
}

/// Rotates `point` clockwise about `pivot`.
pub fn rotate_about(point: Vec2, pivot: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    let d = point - pivot;
    vec2(
        pivot.x + d.x * cos - d.y * sin,
        pivot.y + d.x * sin + d.y * cos,
    )
}

/// Corners of the pointer bar (top-left, top-right, bottom-right,
/// bottom-left before rotation), rotated to `angle`.
pub fn pointer_quad(bounds: Rect, text_height: f32, angle: f32) -> [Vec2; 4] {
    let center = bounds.center();
    let top = bounds.y;
    let bottom = center.y - text_height * 1.5;
    [
        vec2(center.x - POINTER_HALF_WIDTH, top),
        vec2(center.x + POINTER_HALF_WIDTH, top),
        vec2(center.x + POINTER_HALF_WIDTH, bottom),
        vec2(center.x - POINTER_HALF_WIDTH, bottom),
    ]
    .map(|corner| rotate_about(corner, center, angle))
}

/// Box behind the value readout, centered on the knob.
pub fn readout_rect(bounds: Rect, text_width: f32, text_height: f32) -> Rect {
    let w = text_width + 4.0;
    let h = text_height + 2.0;
    let center = bounds.center();
    Rect::new(center.x - w * 0.5, center.y - h * 0.5, w, h)
}

pub fn text_width(text: &str, size: u16) -> f32 {
    measure_text(text, None, size, 1.0).width
}

pub fn draw_rotary_slider(
    bounds: Rect,
    slider_pos_proportional: f32,
    rotary_start_angle: f32,
    rotary_end_angle: f32,
    slider: &RotarySliderWithLabels,
) {
    let center = bounds.center();
    let radius = bounds.w.min(bounds.h) * 0.5;
    draw_circle(center.x, center.y, radius, KNOB_FILL);
    draw_circle_lines(center.x, center.y, radius, 1.0, KNOB_OUTLINE);

    let text_height = slider.text_height();
    let angle = slider_angle(
        slider_pos_proportional,
        rotary_start_angle,
        rotary_end_angle,
    );
    let [a, b, c, d] = pointer_quad(bounds, text_height as f32, angle);
    draw_triangle(a, b, c, KNOB_OUTLINE);
    draw_triangle(a, c, d, KNOB_OUTLINE);
    for cap in [(a + b) * 0.5, (c + d) * 0.5] {
        draw_circle(cap.x, cap.y, POINTER_HALF_WIDTH, KNOB_OUTLINE);
    }

    let text = slider.display_string();
    let readout = readout_rect(bounds, text_width(&text, text_height), text_height as f32);
    draw_rectangle(readout.x, readout.y, readout.w, readout.h, BLACK);
    draw_fitted_text(&text, readout, text_height, WHITE);
}

pub fn draw_fitted_text(text: &str, rect: Rect, size: u16, color: Color) {
    let measure = measure_text(text, None, size, 1.0);
    let x = rect.x + rect.w * 0.5 - measure.width * 0.5;
    let y = rect.y + rect.h * 0.5 + measure.offset_y * 0.5;
    draw_text_ex(
        text,
        x,
        y,
        TextParams {
            font_size: size,
            color,
            ..Default::default()
        },
    );
}
