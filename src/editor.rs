use std::sync::MutexGuard;

use log::{debug, info, warn};
use macroquad::prelude::*;

use crate::{
    attachment::SliderAttachment,
    layout::{SLIDER_COUNT, slider_regions},
    look_and_feel::{EDITOR_BACKGROUND, LABEL_GREEN, draw_fitted_text, text_width},
    params::{self, Parameter, ParameterError, ParameterTree, SharedParameters},
    slider::{PointerInput, RotarySliderWithLabels, TEXT_HEIGHT},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SliderRole {
    GrainDensity,
    GrainDuration,
    PlaybackSpeed,
    GrainAttack,
    GrainDecay,
    GrainSustain,
    GlobalAttack,
    GlobalDecay,
    GlobalSustain,
    GlobalRelease,
}

impl SliderRole {
    /// Same order as the layout regions.
    pub const ALL: [SliderRole; SLIDER_COUNT] = [
        SliderRole::GrainDensity,
        SliderRole::GrainDuration,
        SliderRole::PlaybackSpeed,
        SliderRole::GrainAttack,
        SliderRole::GrainDecay,
        SliderRole::GrainSustain,
        SliderRole::GlobalAttack,
        SliderRole::GlobalDecay,
        SliderRole::GlobalSustain,
        SliderRole::GlobalRelease,
    ];

    pub fn parameter_id(&self) -> &'static str {
        match self {
            SliderRole::GrainDensity => params::GRAIN_DENSITY,
            SliderRole::GrainDuration => params::GRAIN_DURATION,
            SliderRole::PlaybackSpeed => params::PLAYBACK_SPEED,
            SliderRole::GrainAttack => params::GRAIN_ATTACK,
            SliderRole::GrainDecay => params::GRAIN_DECAY,
            SliderRole::GrainSustain => params::GRAIN_SUSTAIN,
            SliderRole::GlobalAttack => params::GLOBAL_ATTACK,
            SliderRole::GlobalDecay => params::GLOBAL_DECAY,
            SliderRole::GlobalSustain => params::GLOBAL_SUSTAIN,
            SliderRole::GlobalRelease => params::GLOBAL_RELEASE,
        }
    }

    pub fn unit_suffix(&self) -> &'static str {
        match self {
            SliderRole::GrainDensity => "Grains",
            SliderRole::PlaybackSpeed => "x",
            _ => "Ms",
        }
    }

    /// Text at the two ends of the knob's sweep.
    pub fn range_labels(&self) -> [(f32, &'static str); 2] {
        let (low, high) = match self {
            SliderRole::GrainDensity => ("1", "256"),
            SliderRole::GrainDuration => ("5ms", "500ms"),
            SliderRole::PlaybackSpeed => ("-6x", "6x"),
            SliderRole::GrainAttack => ("0.1ms", "100ms"),
            SliderRole::GrainDecay => ("0.01ms", "10ms"),
            SliderRole::GrainSustain => ("0.1ms", "100ms"),
            SliderRole::GlobalAttack => ("0.5ms", "500ms"),
            SliderRole::GlobalDecay => ("0.05ms", "50ms"),
            SliderRole::GlobalSustain => ("5ms", "500ms"),
            SliderRole::GlobalRelease => ("0.5ms", "500ms"),
        };
        [(0.0, low), (1.0, high)]
    }
}

/// The plugin window: ten knobs bound to the shared parameter tree.
pub struct Editor {
    parameters: SharedParameters,
    sliders: Vec<RotarySliderWithLabels>,
    attachments: Vec<SliderAttachment>,
    size: Vec2,
}

impl Editor {
    pub fn new(parameters: SharedParameters, width: f32, height: f32) -> Result<Self, ParameterError> {
        let (sliders, attachments) = build_sliders(&lock_tree(&parameters))?;
        let mut editor = Self {
            parameters,
            sliders,
            attachments,
            size: Vec2::ZERO,
        };
        editor.resized(width, height);
        Ok(editor)
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn slider(&self, role: SliderRole) -> &RotarySliderWithLabels {
        &self.sliders[role as usize]
    }

    pub fn resized(&mut self, width: f32, height: f32) {
        self.size = vec2(width, height);
        let regions = slider_regions(Rect::new(0.0, 0.0, width, height));
        for (slider, region) in self.sliders.iter_mut().zip(regions) {
            slider.set_bounds(region);
        }
        debug!("editor laid out at {width}x{height}");
    }

    /// One frame of interaction: user edits go to the tree, then anything
    /// changed elsewhere comes back to the knobs.
    pub fn update(&mut self, input: &PointerInput) {
        let mut tree = lock_tree(&self.parameters);
        for (slider, attachment) in self.sliders.iter_mut().zip(self.attachments.iter_mut()) {
            slider.handle_input(input);
            attachment.push_to_tree(&mut tree, slider);
            attachment.sync_from_tree(&tree, slider);
        }
    }

    pub fn cycle_source_wave(&mut self) {
        let mut tree = lock_tree(&self.parameters);
        let Some(wave) = tree.get(params::SOURCE_WAVE) else {
            return;
        };
        let next = (wave.value() + 1.0) % (wave.range().end + 1.0);
        if tree.set_value(params::SOURCE_WAVE, next).is_ok() {
            info!("source wave: {}", source_wave_text(&tree));
        }
    }

    pub fn reset_parameters(&mut self) {
        lock_tree(&self.parameters).reset_to_defaults();
        info!("parameters reset to defaults");
    }

    pub fn paint(&self) {
        clear_background(EDITOR_BACKGROUND);
        for slider in &self.sliders {
            slider.paint();
        }
        let wave = source_wave_text(&lock_tree(&self.parameters));
        let caption = self.slider(SliderRole::GlobalAttack);
        let placement = caption_rect(
            caption.bounds(),
            caption.slider_bounds(),
            text_width(&wave, TEXT_HEIGHT),
            TEXT_HEIGHT as f32,
        );
        if let Some(rect) = placement {
            draw_fitted_text(&wave, rect, TEXT_HEIGHT, LABEL_GREEN);
        }
    }
}

/// Locks the tree, taking the data back if an earlier holder panicked.
fn lock_tree(parameters: &SharedParameters) -> MutexGuard<'_, ParameterTree> {
    parameters.lock().unwrap_or_else(|poisoned| {
        warn!("parameter tree lock was poisoned");
        poisoned.into_inner()
    })
}

/// Spot for the source wave readout: left of the knob, level with its top.
/// `None` when the gap beside the knob is too narrow for the text.
fn caption_rect(region: Rect, knob: Rect, text_width: f32, text_height: f32) -> Option<Rect> {
    const GAP: f32 = 4.0;
    let x = knob.x - GAP - text_width;
    (x >= region.x + GAP).then(|| Rect::new(x, knob.y, text_width, text_height))
}

fn build_sliders(
    tree: &ParameterTree,
) -> Result<(Vec<RotarySliderWithLabels>, Vec<SliderAttachment>), ParameterError> {
    let mut sliders = Vec::with_capacity(SLIDER_COUNT);
    let mut attachments = Vec::with_capacity(SLIDER_COUNT);
    for role in SliderRole::ALL {
        let parameter = tree.require(role.parameter_id())?;
        let mut slider = RotarySliderWithLabels::new(parameter, role.unit_suffix());
        for (pos, label) in role.range_labels() {
            slider.add_label(pos, label);
        }
        attachments.push(SliderAttachment::new(tree, role.parameter_id(), &mut slider)?);
        sliders.push(slider);
    }
    Ok((sliders, attachments))
}

fn source_wave_text(tree: &ParameterTree) -> String {
    tree.get(params::SOURCE_WAVE)
        .and_then(Parameter::current_choice_name)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use crate::params::ValueRange;

    fn editor() -> (Editor, SharedParameters) {
        let parameters = ParameterTree::grain_synth().into_shared();
        let editor = Editor::new(parameters.clone(), 800.0, 500.0).unwrap();
        (editor, parameters)
    }

    #[test]
    fn every_role_is_bound_and_labelled() {
        let (editor, _) = editor();
        let mut count = 0;
        for role in SliderRole::ALL {
            let slider = editor.slider(role);
            let texts: Vec<&str> = slider
                .label_placements(|text| text.len() as f32 * 7.0)
                .into_iter()
                .map(|(_, text)| text)
                .collect();
            let [low, high] = role.range_labels();
            assert_eq!(texts, [low.1, high.1]);
            assert!(slider.bounds().w > 0.0, "{role:?} has no room");
            count += 1;
        }
        assert_eq!(count, SLIDER_COUNT);
        assert_eq!(editor.slider(SliderRole::GrainDensity).display_string(), "16 Grains");
        assert_eq!(editor.slider(SliderRole::PlaybackSpeed).display_string(), "1 x");
    }

    #[test]
    fn missing_parameters_stop_construction() {
        let tree = ParameterTree::with_layout(vec![Parameter::float(
            params::GRAIN_DENSITY,
            ValueRange::new(1.0, 256.0),
            16.0,
        )]);
        let result = Editor::new(tree.into_shared(), 800.0, 500.0);
        assert_eq!(
            result.err(),
            Some(ParameterError::UnknownParameter(params::GRAIN_DURATION.into()))
        );
    }

    #[test]
    fn resizing_relays_the_knobs() {
        let (mut editor, _) = editor();
        let before = editor.slider(SliderRole::GlobalRelease).bounds();
        editor.resized(1200.0, 700.0);
        assert_eq!(editor.size(), vec2(1200.0, 700.0));
        let after = editor.slider(SliderRole::GlobalRelease).bounds();
        assert!(after.w > before.w);
        assert_eq!(after.y + after.h, 700.0);
    }

    #[test]
    fn dragging_a_knob_edits_the_tree() {
        let (mut editor, parameters) = editor();
        let center = editor.slider(SliderRole::GlobalDecay).slider_bounds().center();
        editor.update(&PointerInput {
            position: center,
            pressed: true,
            down: true,
            ..Default::default()
        });
        editor.update(&PointerInput {
            position: center - vec2(0.0, 60.0),
            down: true,
            ..Default::default()
        });
        let value = editor.slider(SliderRole::GlobalDecay).value();
        assert_eq!(parameters.lock().unwrap().value(params::GLOBAL_DECAY), Some(value));
        assert!(value > 30.0);
        // Only the knob under the pointer moved.
        assert_eq!(parameters.lock().unwrap().value(params::GLOBAL_ATTACK), Some(20.0));
    }

    #[test]
    fn reset_flows_back_to_the_knobs() {
        let (mut editor, parameters) = editor();
        parameters
            .lock()
            .unwrap()
            .set_value(params::GRAIN_DURATION, 400.0)
            .unwrap();
        editor.update(&PointerInput::default());
        assert_eq!(editor.slider(SliderRole::GrainDuration).value(), 400.0);

        editor.reset_parameters();
        editor.update(&PointerInput::default());
        assert_eq!(editor.slider(SliderRole::GrainDuration).value(), 80.0);
    }

    #[test]
    fn source_wave_cycles_through_every_choice() {
        let (mut editor, parameters) = editor();
        let mut seen = Vec::new();
        for _ in 0..params::SOURCE_WAVE_CHOICES.len() {
            editor.cycle_source_wave();
            seen.push(source_wave_text(&parameters.lock().unwrap()));
        }
        assert_eq!(seen, ["Pulse", "Triangle", "Sine", "Saw"]);
    }

    #[test]
    fn a_poisoned_tree_still_syncs() {
        let (mut editor, parameters) = editor();
        let holder = parameters.clone();
        let crashed = thread::spawn(move || {
            let _guard = holder.lock().unwrap();
            panic!("listener crashed while holding the tree");
        })
        .join();
        assert!(crashed.is_err());
        assert!(parameters.is_poisoned());

        lock_tree(&parameters)
            .set_value(params::GRAIN_DENSITY, 200.0)
            .unwrap();
        editor.update(&PointerInput::default());
        assert_eq!(editor.slider(SliderRole::GrainDensity).value(), 200.0);

        editor.cycle_source_wave();
        assert_eq!(source_wave_text(&lock_tree(&parameters)), "Pulse");
    }

    #[test]
    fn wave_caption_stays_clear_of_the_knob() {
        let (editor, _) = editor();
        let anchor = editor.slider(SliderRole::GlobalAttack);
        let knob = anchor.slider_bounds();
        let rect = caption_rect(anchor.bounds(), knob, 60.0, TEXT_HEIGHT as f32).unwrap();
        assert!(rect.x + rect.w < knob.x);
        assert!(rect.x >= anchor.bounds().x);
        assert_eq!(rect.y, knob.y);
        assert!(!rect.overlaps(&knob));
    }

    #[test]
    fn wave_caption_is_skipped_when_there_is_no_room() {
        let region = Rect::new(0.0, 5.0, 120.0, 200.0);
        let knob = Rect::new(14.0, 7.0, 92.0, 92.0);
        assert_eq!(caption_rect(region, knob, 60.0, 14.0), None);
    }
}
