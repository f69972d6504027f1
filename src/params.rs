use std::{
    collections::HashMap,
    sync::{Arc, Mutex, mpsc},
};

use log::debug;
use thiserror::Error;

pub const GRAIN_DENSITY: &str = "Grain Density";
pub const GRAIN_DURATION: &str = "Grain Duration";
pub const PLAYBACK_SPEED: &str = "Play-Back Speed";
pub const GRAIN_ATTACK: &str = "Grain-Attack";
pub const GRAIN_DECAY: &str = "Grain-Decay";
pub const GRAIN_SUSTAIN: &str = "Grain-Sustain";
pub const GLOBAL_ATTACK: &str = "Global-Attack";
pub const GLOBAL_DECAY: &str = "Global-Decay";
pub const GLOBAL_SUSTAIN: &str = "Global-Sustain";
pub const GLOBAL_RELEASE: &str = "Global-Release";
pub const SOURCE_WAVE: &str = "Source Wave";

pub const SOURCE_WAVE_CHOICES: [&str; 4] = ["Saw", "Pulse", "Triangle", "Sine"];

pub type SharedParameters = Arc<Mutex<ParameterTree>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("no parameter named \"{0}\" in the tree")]
    UnknownParameter(String),
}

/// Closed interval of plain parameter values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange {
    pub start: f32,
    pub end: f32,
}

impl ValueRange {
    pub const fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f32 {
        self.end - self.start
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.start, self.end)
    }

    pub fn to_normalized(&self, value: f32) -> f32 {
        if self.length() <= 0.0 {
            return 0.0;
        }
        (self.clamp(value) - self.start) / self.length()
    }

    pub fn from_normalized(&self, proportion: f32) -> f32 {
        self.start + proportion.clamp(0.0, 1.0) * self.length()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParameterKind {
    Float { range: ValueRange, default: f32 },
    /// Plain value is the index of the selected choice.
    Choice { choices: Vec<String>, default: usize },
}

impl ParameterKind {
    pub fn range(&self) -> ValueRange {
        match self {
            ParameterKind::Float { range, .. } => *range,
            ParameterKind::Choice { choices, .. } => {
                ValueRange::new(0.0, choices.len().saturating_sub(1) as f32)
            }
        }
    }

    pub fn default_value(&self) -> f32 {
        match self {
            ParameterKind::Float { range, default } => range.clamp(*default),
            ParameterKind::Choice { default, .. } => *default as f32,
        }
    }

    /// Clamps to the range; choices also snap to the nearest index.
    pub fn constrain(&self, value: f32) -> f32 {
        let clamped = self.range().clamp(value);
        match self {
            ParameterKind::Float { .. } => clamped,
            ParameterKind::Choice { .. } => clamped.round(),
        }
    }

    /// Name of the choice `value` selects, or `None` for float parameters.
    pub fn choice_name(&self, value: f32) -> Option<&str> {
        match self {
            ParameterKind::Choice { choices, .. } => choices
                .get(self.constrain(value) as usize)
                .map(String::as_str),
            ParameterKind::Float { .. } => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Parameter {
    id: String,
    kind: ParameterKind,
    value: f32,
    version: u64,
}

impl Parameter {
    pub fn float(id: &str, range: ValueRange, default: f32) -> Self {
        Self::new(id, ParameterKind::Float { range, default })
    }

    pub fn choice(id: &str, choices: &[&str], default: usize) -> Self {
        Self::new(
            id,
            ParameterKind::Choice {
                choices: choices.iter().map(|c| c.to_string()).collect(),
                default,
            },
        )
    }

    fn new(id: &str, kind: ParameterKind) -> Self {
        let value = kind.default_value();
        Self {
            id: id.to_string(),
            kind,
            value,
            version: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Bumped every time the value changes.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn range(&self) -> ValueRange {
        self.kind.range()
    }

    pub fn current_choice_name(&self) -> Option<&str> {
        self.kind.choice_name(self.value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterChange {
    pub id: String,
    pub value: f32,
}

/// Named parameters plus the listeners that want to hear about changes.
pub struct ParameterTree {
    parameters: Vec<Parameter>,
    index: HashMap<String, usize>,
    listeners: Vec<mpsc::Sender<ParameterChange>>,
}

impl ParameterTree {
    pub fn with_layout(parameters: Vec<Parameter>) -> Self {
        let index = parameters
            .iter()
            .enumerate()
            .map(|(slot, parameter)| (parameter.id.clone(), slot))
            .collect();
        Self {
            parameters,
            index,
            listeners: Vec::new(),
        }
    }

    pub fn grain_synth() -> Self {
        Self::with_layout(vec![
            Parameter::float(GRAIN_DENSITY, ValueRange::new(1.0, 256.0), 16.0),
            Parameter::float(GRAIN_DURATION, ValueRange::new(5.0, 500.0), 80.0),
            Parameter::float(PLAYBACK_SPEED, ValueRange::new(-6.0, 6.0), 1.0),
            Parameter::float(GRAIN_ATTACK, ValueRange::new(0.1, 100.0), 10.0),
            Parameter::float(GRAIN_DECAY, ValueRange::new(0.01, 10.0), 5.0),
            Parameter::float(GRAIN_SUSTAIN, ValueRange::new(0.1, 100.0), 40.0),
            Parameter::float(GLOBAL_ATTACK, ValueRange::new(0.5, 500.0), 20.0),
            Parameter::float(GLOBAL_DECAY, ValueRange::new(0.05, 50.0), 30.0),
            Parameter::float(GLOBAL_SUSTAIN, ValueRange::new(5.0, 500.0), 100.0),
            Parameter::float(GLOBAL_RELEASE, ValueRange::new(0.5, 500.0), 250.0),
            Parameter::choice(SOURCE_WAVE, &SOURCE_WAVE_CHOICES, 0),
        ])
    }

    pub fn into_shared(self) -> SharedParameters {
        Arc::new(Mutex::new(self))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Parameter> {
        self.index.get(id).map(|slot| &self.parameters[*slot])
    }

    pub fn require(&self, id: &str) -> Result<&Parameter, ParameterError> {
        self.get(id)
            .ok_or_else(|| ParameterError::UnknownParameter(id.to_string()))
    }

    pub fn value(&self, id: &str) -> Option<f32> {
        self.get(id).map(Parameter::value)
    }

    /// Stores a plain value, clamped to the parameter's range. Returns whether
    /// the stored value actually changed.
    pub fn set_value(&mut self, id: &str, value: f32) -> Result<bool, ParameterError> {
        let slot = *self
            .index
            .get(id)
            .ok_or_else(|| ParameterError::UnknownParameter(id.to_string()))?;
        let parameter = &mut self.parameters[slot];
        let value = parameter.kind.constrain(value);
        if value == parameter.value {
            return Ok(false);
        }
        parameter.value = value;
        parameter.version += 1;
        let change = ParameterChange {
            id: parameter.id.clone(),
            value,
        };
        self.notify(change);
        Ok(true)
    }

    pub fn reset_to_defaults(&mut self) {
        let defaults: Vec<(String, f32)> = self
            .parameters
            .iter()
            .map(|p| (p.id.clone(), p.kind.default_value()))
            .collect();
        for (id, value) in defaults {
            // Ids come from the tree itself.
            let _ = self.set_value(&id, value);
        }
    }

    pub fn add_listener(&mut self, listener: mpsc::Sender<ParameterChange>) {
        self.listeners.push(listener);
    }

    fn notify(&mut self, change: ParameterChange) {
        let before = self.listeners.len();
        self.listeners
            .retain(|listener| listener.send(change.clone()).is_ok());
        if self.listeners.len() != before {
            debug!(
                "dropped {} disconnected parameter listener(s)",
                before - self.listeners.len()
            );
        }
    }
}
