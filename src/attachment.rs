use log::warn;

use crate::{
    params::{ParameterError, ParameterTree},
    slider::RotarySliderWithLabels,
};

/// Keeps one slider and one tree parameter in step, in both directions.
#[derive(Debug)]
pub struct SliderAttachment {
    parameter_id: String,
    seen_version: u64,
}

impl SliderAttachment {
    pub fn new(
        tree: &ParameterTree,
        parameter_id: &str,
        slider: &mut RotarySliderWithLabels,
    ) -> Result<Self, ParameterError> {
        let parameter = tree.require(parameter_id)?;
        slider.set_value(parameter.value());
        Ok(Self {
            parameter_id: parameter_id.to_string(),
            seen_version: parameter.version(),
        })
    }

    /// Writes a user edit into the tree, which tells the engine.
    pub fn push_to_tree(&mut self, tree: &mut ParameterTree, slider: &mut RotarySliderWithLabels) {
        let Some(value) = slider.take_user_change() else {
            return;
        };
        match tree.set_value(&self.parameter_id, value) {
            Ok(_) => {
                if let Some(parameter) = tree.get(&self.parameter_id) {
                    self.seen_version = parameter.version();
                }
            }
            Err(e) => warn!("dropping slider edit: {e}"),
        }
    }

    /// Follows changes made elsewhere. A knob the user is holding keeps its
    /// own value until it is released.
    pub fn sync_from_tree(&mut self, tree: &ParameterTree, slider: &mut RotarySliderWithLabels) {
        if slider.is_dragging() {
            return;
        }
        if let Some(parameter) = tree.get(&self.parameter_id) {
            if parameter.version() != self.seen_version {
                self.seen_version = parameter.version();
                slider.set_value(parameter.value());
            }
        }
    }
}
