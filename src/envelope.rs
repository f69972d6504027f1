/// Level the global envelope settles at while a key is held, after decay.
pub const GLOBAL_REST_LEVEL: f32 = 0.6;

/// Segment lengths in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeTimes {
    pub attack: f32,
    pub sustain: f32,
    pub decay: f32,
    pub release: f32,
}

impl EnvelopeTimes {
    pub fn from_millis(attack: f32, sustain: f32, decay: f32, release: f32) -> Self {
        Self {
            attack: attack / 1000.0,
            sustain: sustain / 1000.0,
            decay: decay / 1000.0,
            release: release / 1000.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvStage {
    Idle,
    Attack,
    Sustain,
    Decay,
    Rest,
    Release,
}

/// Note envelope: attack to full level, hold there for the sustain time,
/// decay to the rest level while the key stays down, release on key up.
#[derive(Clone, Debug)]
pub struct GlobalEnvelope {
    value: f32,
    stage: EnvStage,
    held_for: f32,
    release_from: f32,
}

impl GlobalEnvelope {
    pub fn new() -> Self {
        Self {
            value: 0.0,
            stage: EnvStage::Idle,
            held_for: 0.0,
            release_from: 0.0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.stage == EnvStage::Idle
    }

    pub fn trigger(&mut self) {
        self.stage = EnvStage::Attack;
        self.held_for = 0.0;
    }

    pub fn release(&mut self) {
        if !self.is_idle() {
            self.release_from = self.value;
            self.stage = EnvStage::Release;
        }
    }

    pub fn advance(&mut self, dt: f32, times: &EnvelopeTimes) -> f32 {
        match self.stage {
            EnvStage::Idle => {
                self.value = 0.0;
            }
            EnvStage::Attack => {
                self.value += dt / times.attack.max(dt);
                if self.value >= 1.0 {
                    self.value = 1.0;
                    self.stage = EnvStage::Sustain;
                }
            }
            EnvStage::Sustain => {
                self.held_for += dt;
                if self.held_for >= times.sustain {
                    self.stage = EnvStage::Decay;
                }
            }
            EnvStage::Decay => {
                self.value -= (1.0 - GLOBAL_REST_LEVEL) * dt / times.decay.max(dt);
                if self.value <= GLOBAL_REST_LEVEL {
                    self.value = GLOBAL_REST_LEVEL;
                    self.stage = EnvStage::Rest;
                }
            }
            EnvStage::Rest => {
                self.value = GLOBAL_REST_LEVEL;
            }
            EnvStage::Release => {
                self.value -= self.release_from * dt / times.release.max(dt);
                if self.value <= 0.0 {
                    self.value = 0.0;
                    self.stage = EnvStage::Idle;
                }
            }
        }
        self.value.clamp(0.0, 1.0)
    }
}

/// Trapezoid window for a single grain. Times are in milliseconds; when the
/// three segments do not fit in the grain they are shrunk proportionally.
pub fn grain_window(t: f32, duration: f32, attack: f32, sustain: f32, decay: f32) -> f32 {
    if t < 0.0 || t >= duration {
        return 0.0;
    }
    let total = attack + sustain + decay;
    let scale = if total > duration { duration / total } else { 1.0 };
    let (attack, sustain, decay) = (attack * scale, sustain * scale, decay * scale);
    if t < attack {
        t / attack
    } else if t < attack + sustain {
        1.0
    } else if t < attack + sustain + decay {
        1.0 - (t - attack - sustain) / decay
    } else {
        0.0
    }
}
