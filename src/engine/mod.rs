pub mod message;

use std::f32::consts::{FRAC_PI_4, TAU};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::dsp::smoother::LinearSmoother;
use crate::dsp::spectral::SpectralEnhancer;
use crate::phoneme::PhonemeInventory;
use crate::synth::{SynthMethod, SynthMethodKind, VoiceAllocator};
use crate::{MAX_BLOCK_SIZE, MAX_VOICES};

pub use message::{ControlMessage, ControlReceiver, PhonemeEvent};

/*
Engine
======

The top level: phoneme events and note messages in, stereo audio out.

`process_block` is the audio-thread entry point and is allocation-free:
every buffer, synthesis method, and FFT plan is built in `new`. Control
arrives either through direct method calls (host owns the engine) or
through a `ControlReceiver` drained at the top of each block (host on
another thread, rtrb ring in between). Method switching selects among
three preallocated method instances, so even that path never allocates.

Per block:

    drain control -> advance phoneme sequence -> age/reprioritize voices
    -> synthesize each active voice into mono scratch -> envelope,
    vibrato, constant-power pan into L/R -> spectral enhancer -> smoothed
    master gain -> publish stats

Stats cross to the host through `SharedStats` atomics; the audio thread
only ever stores, the host only ever loads.
*/

const SEQUENCE_CAPACITY: usize = 256;
const DEFAULT_PHONEME: &str = "ɑ";
const STRESS_ACCENT: f32 = 1.2;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),
    #[error("max_voices must be 1..={MAX_VOICES}, got {0}")]
    InvalidVoiceCount(usize),
    #[error("default phoneme missing from inventory")]
    MissingDefaultPhoneme,
}

/// Construction-time engine parameters.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub max_voices: usize,
    pub method: SynthMethodKind,
    /// FFT window for the spectral enhancer.
    pub fft_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            max_voices: MAX_VOICES,
            method: SynthMethodKind::Formant,
            fft_size: 1_024,
        }
    }
}

/// Snapshot of the engine's load counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub active_voices: usize,
    pub total_allocations: u64,
    pub stolen_voices: u64,
}

/// Lock-free stats mailbox shared between the audio thread and the host.
#[derive(Debug, Default)]
pub struct SharedStats {
    active_voices: AtomicUsize,
    total_allocations: AtomicU64,
    stolen_voices: AtomicU64,
}

impl SharedStats {
    pub fn snapshot(&self) -> EngineStats {
        EngineStats {
            active_voices: self.active_voices.load(Ordering::Relaxed),
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            stolen_voices: self.stolen_voices.load(Ordering::Relaxed),
        }
    }
}

// Fixed-capacity event ring: the sequence queue must not allocate when fed
// from the audio thread.
struct SequenceQueue {
    events: [Option<PhonemeEvent>; SEQUENCE_CAPACITY],
    head: usize,
    len: usize,
}

impl SequenceQueue {
    fn new() -> Self {
        Self {
            events: [None; SEQUENCE_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    fn push(&mut self, event: PhonemeEvent) -> bool {
        if self.len == SEQUENCE_CAPACITY {
            return false;
        }
        let slot = (self.head + self.len) % SEQUENCE_CAPACITY;
        self.events[slot] = Some(event);
        self.len += 1;
        true
    }

    fn pop(&mut self) -> Option<PhonemeEvent> {
        if self.len == 0 {
            return None;
        }
        let event = self.events[self.head].take();
        self.head = (self.head + 1) % SEQUENCE_CAPACITY;
        self.len -= 1;
        event
    }

    fn clear(&mut self) {
        self.events = [None; SEQUENCE_CAPACITY];
        self.head = 0;
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Real-time vocal synthesis engine.
pub struct VoxEngine {
    sample_rate: f32,
    inventory: PhonemeInventory,
    allocator: VoiceAllocator,

    // All three methods live for the engine's lifetime; switching picks an
    // index instead of allocating.
    methods: [SynthMethod; 3],
    active_method: usize,

    enhancer_left: SpectralEnhancer,
    enhancer_right: SpectralEnhancer,

    master_gain: LinearSmoother,
    accent: LinearSmoother,
    pitch_glide: LinearSmoother,
    pitch_glide_active: bool,

    vibrato_rate_hz: f32,
    vibrato_depth: f32,
    vibrato_phase: f32,

    sequence: SequenceQueue,
    current_event: Option<PhonemeEvent>,
    event_remaining_samples: u64,
    current_phoneme: u16,

    receiver: Option<Box<dyn ControlReceiver + Send>>,
    scratch: Vec<f32>,
    stats: Arc<SharedStats>,
}

impl VoxEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_inventory(config, PhonemeInventory::builtin())
    }

    pub fn with_inventory(
        config: EngineConfig,
        inventory: PhonemeInventory,
    ) -> Result<Self, EngineError> {
        if config.sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(config.sample_rate));
        }
        if config.max_voices == 0 || config.max_voices > MAX_VOICES {
            return Err(EngineError::InvalidVoiceCount(config.max_voices));
        }
        let current_phoneme = inventory
            .lookup(DEFAULT_PHONEME)
            .map(|p| p.id)
            .or_else(|| inventory.iter().next().map(|p| p.id))
            .ok_or(EngineError::MissingDefaultPhoneme)?;

        let fs = config.sample_rate;
        let methods = [
            SynthMethod::new(SynthMethodKind::Formant, fs, config.max_voices),
            SynthMethod::new(SynthMethodKind::Subharmonic, fs, config.max_voices),
            SynthMethod::new(SynthMethodKind::Diphone, fs, config.max_voices),
        ];
        let active_method = method_index(config.method);

        let mut master_gain = LinearSmoother::new(0.01, fs);
        master_gain.set_target_immediate(0.8);
        let mut accent = LinearSmoother::new(0.02, fs);
        accent.set_target_immediate(1.0);
        let mut pitch_glide = LinearSmoother::new(0.05, fs);
        pitch_glide.set_target_immediate(220.0);

        info!(
            "engine up: fs={} voices={} method={:?} fft={}",
            fs, config.max_voices, config.method, config.fft_size
        );

        Ok(Self {
            sample_rate: fs,
            inventory,
            allocator: VoiceAllocator::new(config.max_voices, fs),
            methods,
            active_method,
            enhancer_left: SpectralEnhancer::new(config.fft_size),
            enhancer_right: SpectralEnhancer::new(config.fft_size),
            master_gain,
            accent,
            pitch_glide,
            pitch_glide_active: false,
            vibrato_rate_hz: 5.0,
            vibrato_depth: 0.0,
            vibrato_phase: 0.0,
            sequence: SequenceQueue::new(),
            current_event: None,
            event_remaining_samples: 0,
            current_phoneme,
            receiver: None,
            scratch: vec![0.0; MAX_BLOCK_SIZE],
            stats: Arc::new(SharedStats::default()),
        })
    }

    /// Attach the consuming end of a control channel, drained at the top
    /// of every block.
    pub fn attach_receiver(&mut self, receiver: Box<dyn ControlReceiver + Send>) {
        self.receiver = Some(receiver);
    }

    /// Handle for the host side to read load counters.
    pub fn stats_handle(&self) -> Arc<SharedStats> {
        Arc::clone(&self.stats)
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.snapshot()
    }

    pub fn inventory(&self) -> &PhonemeInventory {
        &self.inventory
    }

    pub fn active_voice_count(&self) -> usize {
        self.allocator.active_voice_count()
    }

    pub fn method(&self) -> SynthMethodKind {
        self.methods[self.active_method].kind()
    }

    // Control plane. Safe from the audio thread too; none of these allocate.

    pub fn note_on(&mut self, note: u8, velocity: u8) -> bool {
        let result = self.allocator.allocate(note, velocity);
        if result.success {
            if let Some(voice) = self.allocator.voice_mut(result.voice_id) {
                voice.previous_phoneme = self.current_phoneme;
                voice.phoneme = self.current_phoneme;
            }
        }
        result.success
    }

    pub fn note_off(&mut self, note: u8) {
        self.allocator.release_note(note);
    }

    pub fn all_notes_off(&mut self) {
        for voice in self.allocator.voices_mut() {
            if voice.active {
                voice.release();
            }
        }
    }

    /// Append a phoneme event to the sequence. Returns `false` when the
    /// queue is full or the phoneme id is unknown.
    pub fn queue_phoneme(&mut self, event: PhonemeEvent) -> bool {
        if self.inventory.by_id(event.phoneme).is_none() {
            warn!("queue_phoneme: unknown phoneme id {}", event.phoneme);
            return false;
        }
        self.sequence.push(event)
    }

    /// Symbol-resolving convenience for hosts holding IPA strings.
    pub fn queue_phoneme_symbol(
        &mut self,
        symbol: &str,
        duration_s: f32,
        pitch_target_hz: Option<f32>,
        stressed: bool,
    ) -> bool {
        match self.inventory.lookup(symbol) {
            Some(phoneme) => {
                let id = phoneme.id;
                self.queue_phoneme(PhonemeEvent {
                    phoneme: id,
                    duration_s,
                    pitch_target_hz,
                    stressed,
                })
            }
            None => {
                warn!("queue_phoneme: unknown symbol {:?}", symbol);
                false
            }
        }
    }

    pub fn queued_events(&self) -> usize {
        self.sequence.len()
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.master_gain.set_target(gain.clamp(0.0, 2.0));
    }

    pub fn set_attack(&mut self, seconds: f32) {
        for voice in self.allocator.voices_mut() {
            voice.envelope.set_attack(seconds);
        }
    }

    pub fn set_release(&mut self, seconds: f32) {
        for voice in self.allocator.voices_mut() {
            voice.envelope.set_release(seconds);
        }
    }

    /// Vibrato depth is fractional frequency deviation (0.01 = +-1%).
    pub fn set_vibrato(&mut self, rate_hz: f32, depth: f32) {
        self.vibrato_rate_hz = rate_hz.clamp(0.0, 20.0);
        self.vibrato_depth = depth.clamp(0.0, 0.1);
    }

    pub fn set_enhancement(&mut self, amount: f32) {
        self.enhancer_left.set_enhancement(amount);
        self.enhancer_right.set_enhancement(amount);
    }

    /// Switch the synthesis method. The incoming method's per-voice DSP
    /// state is cleared so no stale filter history bleeds in.
    pub fn set_method(&mut self, kind: SynthMethodKind) {
        let index = method_index(kind);
        if index == self.active_method {
            return;
        }
        self.methods[index].reset();
        self.active_method = index;
        info!("synthesis method -> {:?}", kind);
    }

    /// Render one stereo block. Zero-length, oversized, or mismatched
    /// buffers are rejected with `false` and left untouched.
    pub fn process_block(&mut self, out_left: &mut [f32], out_right: &mut [f32]) -> bool {
        let n = out_left.len();
        if n == 0 || n > MAX_BLOCK_SIZE || n != out_right.len() {
            return false;
        }

        self.drain_control();
        self.advance_sequence(n as u64);
        self.allocator.update_priorities();

        out_left.fill(0.0);
        out_right.fill(0.0);

        // Block-rate modulators. Vibrato at a few Hz moves slowly relative
        // to any legal block length, so one multiplier per block is smooth
        // enough; the glottal phase accumulator keeps it click-free.
        let vibrato_mult = 1.0 + self.vibrato_depth * self.vibrato_phase.sin();
        self.vibrato_phase += TAU * self.vibrato_rate_hz * n as f32 / self.sample_rate;
        self.vibrato_phase %= TAU;

        for _ in 0..n {
            self.accent.process();
            self.pitch_glide.process();
        }
        let accent = self.accent.current();
        let pitch_override = self.pitch_glide_active.then(|| self.pitch_glide.current());

        let method = &mut self.methods[self.active_method];
        for id in 0..self.allocator.max_voices() {
            let Some(voice) = self.allocator.voice(id) else {
                continue;
            };
            if !voice.active {
                continue;
            }

            let mut record = voice.clone();
            if let Some(hz) = pitch_override {
                record.frequency = hz;
            }
            record.frequency *= vibrato_mult;
            record.amplitude *= accent;

            let Some(phoneme) = self.inventory.by_id(record.phoneme) else {
                continue;
            };

            let scratch = &mut self.scratch[..n];
            if !method.synthesize_voice(&record, phoneme, scratch).success {
                continue;
            }

            let pan_angle = (record.pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
            let (gain_left, gain_right) = (pan_angle.cos(), pan_angle.sin());

            let Some(voice) = self.allocator.voice_mut(id) else {
                continue;
            };
            for (i, &sample) in scratch.iter().enumerate() {
                let shaped = sample * voice.envelope.next_sample();
                out_left[i] += shaped * gain_left;
                out_right[i] += shaped * gain_right;
            }
            if voice.release_complete() {
                self.allocator.free(id);
            }
        }

        self.enhancer_left.process(out_left);
        self.enhancer_right.process(out_right);

        for i in 0..n {
            let gain = self.master_gain.process();
            out_left[i] *= gain;
            out_right[i] *= gain;
        }

        self.publish_stats();
        true
    }

    /// Silence everything and clear the sequence. Stats counters survive.
    pub fn reset(&mut self) {
        self.allocator.reset_all();
        for method in self.methods.iter_mut() {
            method.reset();
        }
        self.enhancer_left.reset();
        self.enhancer_right.reset();
        self.sequence.clear();
        self.current_event = None;
        self.event_remaining_samples = 0;
        self.pitch_glide_active = false;
        self.vibrato_phase = 0.0;
        self.publish_stats();
    }

    fn drain_control(&mut self) {
        while let Some(message) = self.receiver.as_mut().and_then(|r| r.pop()) {
            self.apply_message(message);
        }
    }

    fn apply_message(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::NoteOn { note, velocity } => {
                self.note_on(note, velocity);
            }
            ControlMessage::NoteOff { note } => self.note_off(note),
            ControlMessage::AllNotesOff => self.all_notes_off(),
            ControlMessage::QueuePhoneme(event) => {
                self.queue_phoneme(event);
            }
            ControlMessage::SetMethod(kind) => self.set_method(kind),
            ControlMessage::SetGain(gain) => self.set_gain(gain),
            ControlMessage::SetAttack(seconds) => self.set_attack(seconds),
            ControlMessage::SetRelease(seconds) => self.set_release(seconds),
            ControlMessage::SetVibrato { rate_hz, depth } => self.set_vibrato(rate_hz, depth),
            ControlMessage::SetEnhancement(amount) => self.set_enhancement(amount),
        }
    }

    fn advance_sequence(&mut self, samples: u64) {
        let mut remaining = samples;
        loop {
            if self.current_event.is_some() {
                if self.event_remaining_samples > remaining {
                    self.event_remaining_samples -= remaining;
                    return;
                }
                remaining -= self.event_remaining_samples;
                self.current_event = None;
            }

            match self.sequence.pop() {
                Some(event) => self.begin_event(event),
                None => {
                    // Sequence exhausted: hold the last phoneme, drop any
                    // stress accent and pitch glide.
                    self.accent.set_target(1.0);
                    self.pitch_glide_active = false;
                    return;
                }
            }
        }
    }

    fn begin_event(&mut self, event: PhonemeEvent) {
        self.event_remaining_samples =
            (event.duration_s.max(0.0) as f64 * self.sample_rate as f64).round() as u64;
        self.current_event = Some(event);

        for voice in self.allocator.voices_mut() {
            if voice.active {
                voice.previous_phoneme = voice.phoneme;
                voice.phoneme = event.phoneme;
            }
        }
        self.current_phoneme = event.phoneme;

        self.accent
            .set_target(if event.stressed { STRESS_ACCENT } else { 1.0 });

        match event.pitch_target_hz {
            Some(hz) if hz > 0.0 => {
                if !self.pitch_glide_active {
                    // Glide starts from the lowest sounding voice rather
                    // than from whatever the smoother last held.
                    let start = self
                        .allocator
                        .voices()
                        .iter()
                        .filter(|v| v.active)
                        .map(|v| v.frequency)
                        .fold(f32::NAN, f32::min);
                    if start.is_finite() {
                        self.pitch_glide.set_target_immediate(start);
                    }
                }
                self.pitch_glide.set_target(hz);
                self.pitch_glide_active = true;
            }
            _ => self.pitch_glide_active = false,
        }
    }

    fn publish_stats(&self) {
        let allocator_stats = self.allocator.stats();
        self.stats
            .active_voices
            .store(self.allocator.active_voice_count(), Ordering::Relaxed);
        self.stats
            .total_allocations
            .store(allocator_stats.total_allocations, Ordering::Relaxed);
        self.stats
            .stolen_voices
            .store(allocator_stats.stolen_voices, Ordering::Relaxed);
    }
}

fn method_index(kind: SynthMethodKind) -> usize {
    match kind {
        SynthMethodKind::Formant => 0,
        SynthMethodKind::Subharmonic => 1,
        SynthMethodKind::Diphone => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> VoxEngine {
        VoxEngine::new(EngineConfig {
            sample_rate: 48_000.0,
            max_voices: 8,
            method: SynthMethodKind::Formant,
            fft_size: 256,
        })
        .expect("valid config")
    }

    fn render(engine: &mut VoxEngine, blocks: usize, block_size: usize) -> (Vec<f32>, Vec<f32>) {
        let mut all_left = Vec::new();
        let mut all_right = Vec::new();
        let mut left = vec![0.0f32; block_size];
        let mut right = vec![0.0f32; block_size];
        for _ in 0..blocks {
            assert!(engine.process_block(&mut left, &mut right));
            all_left.extend_from_slice(&left);
            all_right.extend_from_slice(&right);
        }
        (all_left, all_right)
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(
            VoxEngine::new(EngineConfig {
                sample_rate: 0.0,
                ..EngineConfig::default()
            }),
            Err(EngineError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            VoxEngine::new(EngineConfig {
                max_voices: 0,
                ..EngineConfig::default()
            }),
            Err(EngineError::InvalidVoiceCount(0))
        ));
        assert!(matches!(
            VoxEngine::new(EngineConfig {
                max_voices: MAX_VOICES + 1,
                ..EngineConfig::default()
            }),
            Err(EngineError::InvalidVoiceCount(_))
        ));
    }

    #[test]
    fn invalid_block_is_rejected_without_touching_buffers() {
        let mut engine = engine();
        let mut left = vec![0.25f32; 128];
        let mut right = vec![0.25f32; 64];

        assert!(!engine.process_block(&mut left, &mut right));
        assert!(left.iter().all(|&s| s == 0.25));

        let mut empty_l: [f32; 0] = [];
        let mut empty_r: [f32; 0] = [];
        assert!(!engine.process_block(&mut empty_l, &mut empty_r));

        let mut big_l = vec![0.0f32; MAX_BLOCK_SIZE + 1];
        let mut big_r = vec![0.0f32; MAX_BLOCK_SIZE + 1];
        assert!(!engine.process_block(&mut big_l, &mut big_r));
    }

    #[test]
    fn note_produces_audio_after_enhancer_latency() {
        let mut engine = engine();
        engine.note_on(60, 100);

        let (left, right) = render(&mut engine, 40, 512);
        let latency = 256; // fft_size configured above
        assert!(rms(&left[latency..]) > 1e-5);
        assert!(rms(&right[latency..]) > 1e-5);
        assert!(left.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn note_off_eventually_frees_the_voice() {
        let mut engine = engine();
        engine.set_release(0.02);
        engine.note_on(60, 100);
        render(&mut engine, 4, 512);
        assert_eq!(engine.active_voice_count(), 1);

        engine.note_off(60);
        render(&mut engine, 20, 512); // Well past the 20ms release
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn all_notes_off_releases_everything() {
        let mut engine = engine();
        engine.set_release(0.01);
        for note in 60..66 {
            engine.note_on(note, 90);
        }
        engine.all_notes_off();
        render(&mut engine, 20, 512);
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn phoneme_sequence_advances_by_duration() {
        let mut engine = engine();
        let a = engine.inventory().lookup("ɑ").unwrap().id;
        let i = engine.inventory().lookup("i").unwrap().id;

        engine.note_on(60, 100);
        assert!(engine.queue_phoneme_symbol("ɑ", 0.01, None, false));
        assert!(engine.queue_phoneme_symbol("i", 10.0, None, false));
        assert_eq!(engine.queued_events(), 2);

        // 0.01s at 48k is 480 samples; one 512 block crosses both events.
        render(&mut engine, 1, 512);
        assert_eq!(engine.queued_events(), 0);
        let voice = engine.allocator.voices().iter().find(|v| v.active).unwrap();
        assert_eq!(voice.phoneme, i);
        assert_eq!(voice.previous_phoneme, a);
    }

    #[test]
    fn unknown_phoneme_event_is_rejected() {
        let mut engine = engine();
        assert!(!engine.queue_phoneme(PhonemeEvent {
            phoneme: 9_999,
            duration_s: 0.1,
            pitch_target_hz: None,
            stressed: false,
        }));
        assert!(!engine.queue_phoneme_symbol("xyzzy", 0.1, None, false));
    }

    #[test]
    fn method_switch_changes_kind_and_keeps_rendering() {
        let mut engine = engine();
        engine.note_on(48, 100);
        render(&mut engine, 4, 512);

        engine.set_method(SynthMethodKind::Subharmonic);
        assert_eq!(engine.method(), SynthMethodKind::Subharmonic);
        let (left, _) = render(&mut engine, 20, 512);
        assert!(left.iter().all(|s| s.is_finite()));
        assert!(rms(&left[2_048..]) > 1e-6);

        engine.set_method(SynthMethodKind::Diphone);
        assert_eq!(engine.method(), SynthMethodKind::Diphone);
        let (left, _) = render(&mut engine, 10, 512);
        assert!(left.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn control_messages_drive_the_engine() {
        struct ScriptReceiver(Vec<ControlMessage>);
        impl ControlReceiver for ScriptReceiver {
            fn pop(&mut self) -> Option<ControlMessage> {
                if self.0.is_empty() {
                    None
                } else {
                    Some(self.0.remove(0))
                }
            }
        }

        let mut engine = engine();
        engine.attach_receiver(Box::new(ScriptReceiver(vec![
            ControlMessage::SetGain(0.5),
            ControlMessage::NoteOn {
                note: 64,
                velocity: 110,
            },
            ControlMessage::SetVibrato {
                rate_hz: 6.0,
                depth: 0.02,
            },
        ])));

        let (left, _) = render(&mut engine, 20, 512);
        assert_eq!(engine.active_voice_count(), 1);
        assert!(rms(&left[1_024..]) > 1e-6);
    }

    #[test]
    fn stats_reflect_allocation_activity() {
        let mut engine = engine();
        let handle = engine.stats_handle();
        for note in 60..70 {
            engine.note_on(note, 80); // 8-voice pool: 2 steals
        }
        render(&mut engine, 1, 256);

        let stats = handle.snapshot();
        assert_eq!(stats.active_voices, 8);
        assert_eq!(stats.total_allocations, 10);
        assert_eq!(stats.stolen_voices, 2);
        assert_eq!(stats, engine.stats());
    }

    #[test]
    fn reset_silences_and_clears_sequence() {
        let mut engine = engine();
        engine.note_on(60, 100);
        engine.queue_phoneme_symbol("i", 1.0, None, false);
        render(&mut engine, 4, 512);

        engine.reset();
        assert_eq!(engine.active_voice_count(), 0);
        assert_eq!(engine.queued_events(), 0);

        let (left, _) = render(&mut engine, 4, 512);
        assert!(rms(&left) < 1e-6, "engine must be silent after reset");
    }
}
