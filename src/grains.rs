use std::sync::{Arc, Mutex, mpsc};

use log::{debug, trace};
use tokio::{runtime::Runtime, task::JoinHandle};

use crate::{
    envelope::{EnvelopeTimes, GlobalEnvelope, grain_window},
    params::{self, ParameterChange, ParameterTree},
};

const MAX_GRAINS: usize = 256;
const OUTPUT_GAIN: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Saw,
    Pulse,
    Triangle,
    Sine,
}

impl Waveform {
    /// Order matches the choices of the source wave parameter.
    pub const VALUES: [Waveform; 4] = [
        Waveform::Saw,
        Waveform::Pulse,
        Waveform::Triangle,
        Waveform::Sine,
    ];

    pub fn from_index(index: f32) -> Self {
        let slot = (index.max(0.0) as usize).min(Self::VALUES.len() - 1);
        Self::VALUES[slot]
    }

    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Saw => 2.0 * (phase - 0.5),
            Waveform::Pulse => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
            Waveform::Sine => (phase * std::f32::consts::TAU).sin(),
        }
    }
}

/// Engine-side copy of the parameter values. Times are in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrainSettings {
    pub density: f32,
    pub duration: f32,
    pub speed: f32,
    pub grain_attack: f32,
    pub grain_decay: f32,
    pub grain_sustain: f32,
    pub global_attack: f32,
    pub global_decay: f32,
    pub global_sustain: f32,
    pub global_release: f32,
    pub waveform: Waveform,
}

impl Default for GrainSettings {
    fn default() -> Self {
        Self::from_tree(&ParameterTree::grain_synth())
    }
}

impl GrainSettings {
    pub fn from_tree(tree: &ParameterTree) -> Self {
        let mut settings = Self {
            density: 1.0,
            duration: 5.0,
            speed: 1.0,
            grain_attack: 0.0,
            grain_decay: 0.0,
            grain_sustain: 0.0,
            global_attack: 0.0,
            global_decay: 0.0,
            global_sustain: 0.0,
            global_release: 0.0,
            waveform: Waveform::Saw,
        };
        for parameter in tree.iter() {
            settings.apply(&ParameterChange {
                id: parameter.id().to_string(),
                value: parameter.value(),
            });
        }
        settings
    }

    /// Returns false for ids the engine does not use.
    pub fn apply(&mut self, change: &ParameterChange) -> bool {
        let value = change.value;
        match change.id.as_str() {
            params::GRAIN_DENSITY => self.density = value,
            params::GRAIN_DURATION => self.duration = value,
            params::PLAYBACK_SPEED => self.speed = value,
            params::GRAIN_ATTACK => self.grain_attack = value,
            params::GRAIN_DECAY => self.grain_decay = value,
            params::GRAIN_SUSTAIN => self.grain_sustain = value,
            params::GLOBAL_ATTACK => self.global_attack = value,
            params::GLOBAL_DECAY => self.global_decay = value,
            params::GLOBAL_SUSTAIN => self.global_sustain = value,
            params::GLOBAL_RELEASE => self.global_release = value,
            params::SOURCE_WAVE => self.waveform = Waveform::from_index(value),
            _ => return false,
        }
        true
    }

    pub fn global_times(&self) -> EnvelopeTimes {
        EnvelopeTimes::from_millis(
            self.global_attack,
            self.global_sustain,
            self.global_decay,
            self.global_release,
        )
    }

    pub fn into_shared(self) -> SharedSettings {
        Arc::new(Mutex::new(self))
    }
}

pub type SharedSettings = Arc<Mutex<GrainSettings>>;

/// Drains parameter changes into the engine's settings on a blocking worker.
pub fn spawn_parameter_listener(
    runtime: &Runtime,
    changes: mpsc::Receiver<ParameterChange>,
    settings: SharedSettings,
) -> JoinHandle<()> {
    runtime.spawn_blocking(move || {
        while let Ok(change) = changes.recv() {
            if let Ok(mut guard) = settings.lock() {
                if guard.apply(&change) {
                    trace!("{} -> {}", change.id, change.value);
                }
            }
        }
        debug!("parameter listener finished");
    })
}

#[derive(Clone, Copy, Debug)]
struct Grain {
    /// Read position in the source table, always inside `0..table.len()`.
    position: f32,
    age: usize,
    length: usize,
}

/// One second of the selected waveform at the current note.
struct SourceTable {
    samples: Vec<f32>,
    waveform: Waveform,
    frequency: f32,
}

impl SourceTable {
    fn build(waveform: Waveform, frequency: f32, sample_rate: f32) -> Self {
        let len = sample_rate.round().max(1.0) as usize;
        let cycle = frequency / sample_rate;
        let samples = (0..len)
            .map(|index| waveform.sample((index as f32 * cycle).fract()))
            .collect();
        Self {
            samples,
            waveform,
            frequency,
        }
    }

    fn len(&self) -> f32 {
        self.samples.len() as f32
    }

    /// Linear interpolation between neighbours, wrapping at the end.
    fn read(&self, position: f32) -> f32 {
        let len = self.samples.len();
        let index = position.floor();
        let frac = position - index;
        let a = self.samples[(index as usize) % len];
        let b = self.samples[(index as usize + 1) % len];
        a + (b - a) * frac
    }
}

/// Grain cloud over a periodic source at the current note.
pub struct GrainEngine {
    settings: SharedSettings,
    sample_rate: f32,
    frequency: f32,
    table: SourceTable,
    grains: Vec<Grain>,
    envelope: GlobalEnvelope,
    cursor: f32,
    spawn_countdown: f32,
    seed: u64,
}

impl GrainEngine {
    pub fn new(settings: SharedSettings) -> Self {
        let sample_rate = 44_100.0;
        let frequency = 220.0;
        Self {
            settings,
            sample_rate,
            frequency,
            table: SourceTable::build(Waveform::Saw, frequency, sample_rate),
            grains: Vec::with_capacity(MAX_GRAINS),
            envelope: GlobalEnvelope::new(),
            cursor: 0.0,
            spawn_countdown: 0.0,
            seed: 0x5EED,
        }
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
        self.rebuild_table(self.table.waveform);
    }

    pub fn set_gate(&mut self, gate: bool, frequency: f32) {
        if gate {
            self.frequency = frequency.max(1.0);
            self.envelope.trigger();
            self.spawn_countdown = 0.0;
        } else {
            self.envelope.release();
        }
    }

    /// Fills `out` with mono samples.
    pub fn render(&mut self, out: &mut [f32]) {
        let settings = match self.settings.lock() {
            Ok(guard) => *guard,
            Err(_) => {
                out.fill(0.0);
                return;
            }
        };
        if settings.waveform != self.table.waveform || self.frequency != self.table.frequency {
            self.rebuild_table(settings.waveform);
        }
        for slot in out.iter_mut() {
            *slot = self.next_sample(&settings);
        }
    }

    fn rebuild_table(&mut self, waveform: Waveform) {
        self.table = SourceTable::build(waveform, self.frequency, self.sample_rate);
        let len = self.table.len();
        self.cursor = self.cursor.rem_euclid(len);
        for grain in &mut self.grains {
            grain.position = grain.position.rem_euclid(len);
        }
        debug!(
            "source table: {waveform:?} at {:.2} Hz, {} samples",
            self.frequency, len
        );
    }

    fn next_sample(&mut self, settings: &GrainSettings) -> f32 {
        let dt = 1.0 / self.sample_rate;
        let level = self.envelope.advance(dt, &settings.global_times());
        let table_len = self.table.len();
        self.cursor = (self.cursor + 1.0).rem_euclid(table_len);
        if self.envelope.is_idle() {
            self.grains.clear();
            return 0.0;
        }

        let grain_length = (settings.duration * self.sample_rate / 1000.0).max(1.0);
        self.spawn_countdown -= 1.0;
        if self.spawn_countdown <= 0.0 {
            self.spawn_grain(grain_length);
            self.spawn_countdown += (grain_length / settings.density.max(1.0)).max(1.0);
        }

        let ms_per_sample = 1000.0 / self.sample_rate;
        let mut sum = 0.0;
        for grain in &mut self.grains {
            let window = grain_window(
                grain.age as f32 * ms_per_sample,
                settings.duration,
                settings.grain_attack,
                settings.grain_sustain,
                settings.grain_decay,
            );
            sum += self.table.read(grain.position) * window;
            grain.position = (grain.position + settings.speed).rem_euclid(table_len);
            grain.age += 1;
        }
        self.grains.retain(|grain| grain.age < grain.length);

        let active = self.grains.len().max(1) as f32;
        sum / active.sqrt() * level * OUTPUT_GAIN
    }

    fn spawn_grain(&mut self, grain_length: f32) {
        if self.grains.len() >= MAX_GRAINS {
            return;
        }
        let jitter = self.next_random() * grain_length;
        self.grains.push(Grain {
            position: (self.cursor + jitter).rem_euclid(self.table.len()),
            age: 0,
            length: grain_length as usize,
        });
    }

    fn next_random(&mut self) -> f32 {
        self.seed = self.seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((self.seed >> 40) as f32) / ((1u64 << 24) as f32)
    }
}
