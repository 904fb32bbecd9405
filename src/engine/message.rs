#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::synth::SynthMethodKind;

/// One entry in the phoneme sequence driving the engine.
///
/// `phoneme` is an inventory id; hosts resolve IPA symbols through
/// `PhonemeInventory::lookup` before queueing so the event stays `Copy`
/// and can travel through the lock-free control channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhonemeEvent {
    pub phoneme: u16,
    pub duration_s: f32,
    /// When set, active voices glide toward this pitch for the event.
    pub pitch_target_hz: Option<f32>,
    pub stressed: bool,
}

/// Host-to-engine control messages. All variants are `Copy` so the rtrb
/// channel never allocates or drops non-trivially on the audio thread.
#[derive(Debug, Copy, Clone)]
pub enum ControlMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    AllNotesOff,
    QueuePhoneme(PhonemeEvent),
    SetMethod(SynthMethodKind),
    SetGain(f32),
    SetAttack(f32),
    SetRelease(f32),
    SetVibrato { rate_hz: f32, depth: f32 },
    SetEnhancement(f32),
}

/// Abstraction over the control channel's consuming end, so the engine can
/// be driven by an rtrb ring buffer or anything test code fakes up.
pub trait ControlReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

#[cfg(feature = "rtrb")]
impl ControlReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}
