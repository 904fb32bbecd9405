use crate::dsp::envelope::Envelope;

/// Convert MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_note_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// One slot in the fixed voice pool.
///
/// Owned exclusively by the `VoiceAllocator`; synthesis methods receive a
/// borrow for the duration of one audio block and must not retain it.
/// Invariant while `active`: `midi_note <= 127` and
/// `frequency == 440 * 2^((midi_note - 69) / 12)`.
#[derive(Debug, Clone)]
pub struct VoiceRecord {
    /// Stable index into the pool.
    pub id: usize,
    pub midi_note: u8,
    pub velocity: u8,
    pub frequency: f32,
    pub amplitude: f32,
    /// Stereo position, -1 (left) to +1 (right).
    pub pan: f32,
    pub active: bool,
    /// 0..=100, higher survives stealing longer.
    pub priority: i32,
    /// Incremented by `update_priorities`, capped at 100.
    pub age: i32,
    /// Set when this slot was taken from another note by stealing.
    pub stolen_from: Option<usize>,
    pub envelope: Envelope,
    /// Current phoneme id, and the one before it (diphone source).
    pub phoneme: u16,
    pub previous_phoneme: u16,
}

impl VoiceRecord {
    pub fn new(id: usize, sample_rate: f32) -> Self {
        Self {
            id,
            midi_note: 0,
            velocity: 0,
            frequency: 0.0,
            amplitude: 0.0,
            pan: 0.0,
            active: false,
            priority: 0,
            age: 0,
            stolen_from: None,
            envelope: Envelope::new(0.01, 0.05, 0.8, 0.3, sample_rate),
            phoneme: 0,
            previous_phoneme: 0,
        }
    }

    /// Bind this slot to a note. Called by the allocator only.
    pub(crate) fn bind(&mut self, midi_note: u8, velocity: u8, stolen_from: Option<usize>) {
        self.midi_note = midi_note;
        self.velocity = velocity;
        self.frequency = midi_note_to_freq(midi_note);
        self.amplitude = velocity as f32 / 127.0;
        self.pan = 0.0;
        self.active = true;
        self.age = 0;
        self.stolen_from = stolen_from;
        self.envelope.note_on();
    }

    /// Begin the release phase. The slot stays active until the envelope
    /// completes; the engine then frees it through the allocator.
    pub fn release(&mut self) {
        self.envelope.note_off();
    }

    /// True once the release envelope has finished.
    pub fn release_complete(&self) -> bool {
        self.active && !self.envelope.is_active()
    }

    pub(crate) fn clear(&mut self) {
        self.midi_note = 0;
        self.velocity = 0;
        self.frequency = 0.0;
        self.amplitude = 0.0;
        self.pan = 0.0;
        self.active = false;
        self.priority = 0;
        self.age = 0;
        self.stolen_from = None;
        self.envelope.reset();
    }
}
