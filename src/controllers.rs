use macroquad::prelude::{KeyCode, is_key_pressed, is_key_released};

const MIDI_MIN: i32 = 21;
const MIDI_MAX: i32 = 108;
const BASE_NOTE: i32 = 48;

/// Computer keys laid out like a piano, as semitones above the base note.
const KEY_MAP: [(KeyCode, i32); 17] = [
    (KeyCode::Z, 0),
    (KeyCode::S, 1),
    (KeyCode::X, 2),
    (KeyCode::D, 3),
    (KeyCode::C, 4),
    (KeyCode::V, 5),
    (KeyCode::G, 6),
    (KeyCode::B, 7),
    (KeyCode::H, 8),
    (KeyCode::N, 9),
    (KeyCode::J, 10),
    (KeyCode::M, 11),
    (KeyCode::Comma, 12),
    (KeyCode::L, 13),
    (KeyCode::Period, 14),
    (KeyCode::Semicolon, 15),
    (KeyCode::Slash, 16),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteMessage {
    pub gate: bool,
    pub midi_note: i32,
    pub frequency: f32,
}

/// Last-note-priority keyboard. Releasing the newest key falls back to the
/// one held before it.
pub struct KeyboardController {
    pressed: Vec<KeyCode>,
    octave_shift: i32,
    last_note: i32,
}

impl KeyboardController {
    pub fn new() -> Self {
        Self {
            pressed: Vec::new(),
            octave_shift: 0,
            last_note: BASE_NOTE,
        }
    }

    pub fn poll(&mut self) -> Option<NoteMessage> {
        let mut changed = false;
        if is_key_pressed(KeyCode::Minus) {
            changed |= self.adjust_octave(-1);
        }
        if is_key_pressed(KeyCode::Equal) {
            changed |= self.adjust_octave(1);
        }
        for (keycode, _) in KEY_MAP {
            if is_key_pressed(keycode) {
                changed |= self.press_key(keycode);
            }
            if is_key_released(keycode) {
                changed |= self.release_key(keycode);
            }
        }
        changed.then(|| self.current_message())
    }

    pub fn press_key(&mut self, keycode: KeyCode) -> bool {
        if self.pressed.contains(&keycode) || semitone(keycode).is_none() {
            return false;
        }
        self.pressed.push(keycode);
        true
    }

    pub fn release_key(&mut self, keycode: KeyCode) -> bool {
        match self.pressed.iter().position(|code| *code == keycode) {
            Some(index) => {
                self.pressed.remove(index);
                true
            }
            None => false,
        }
    }

    /// Only reports a change while a key is sounding.
    pub fn adjust_octave(&mut self, delta: i32) -> bool {
        let highest = KEY_MAP.iter().map(|(_, s)| *s).max().unwrap_or(0);
        let min_shift = (MIDI_MIN - BASE_NOTE).div_euclid(12) + 1;
        let max_shift = (MIDI_MAX - BASE_NOTE - highest).div_euclid(12);
        self.octave_shift = (self.octave_shift + delta).clamp(min_shift, max_shift);
        !self.pressed.is_empty()
    }

    pub fn current_message(&mut self) -> NoteMessage {
        let held = self.pressed.last().and_then(|code| semitone(*code));
        match held {
            Some(offset) => {
                let midi = (BASE_NOTE + offset + self.octave_shift * 12).clamp(MIDI_MIN, MIDI_MAX);
                self.last_note = midi;
                NoteMessage {
                    gate: true,
                    midi_note: midi,
                    frequency: midi_to_frequency(midi),
                }
            }
            None => NoteMessage {
                gate: false,
                midi_note: self.last_note,
                frequency: midi_to_frequency(self.last_note),
            },
        }
    }
}

fn semitone(keycode: KeyCode) -> Option<i32> {
    KEY_MAP
        .iter()
        .find(|(code, _)| *code == keycode)
        .map(|(_, offset)| *offset)
}

pub fn midi_to_frequency(midi_note: i32) -> f32 {
    440.0 * 2.0f32.powf((midi_note - 69) as f32 / 12.0)
}
