use crate::dsp::excitation::{GlottalSource, NoiseSource};
use crate::dsp::resonator::FormantResonator;
use crate::dsp::smoother::SmootherBank;
use crate::phoneme::Phoneme;
use crate::synth::voice::VoiceRecord;

/*
Formant Synthesis
=================

Classic source-filter model. A glottal pulse train (voiced) or white noise
(unvoiced) excites a bank of four bandpass resonators tuned to the
phoneme's F1-F4. The resonators run in PARALLEL and their outputs sum; a
serial cascade would multiply the per-band gains and make level depend on
formant spacing.

Formant targets are never applied directly. Each channel routes them
through a smoother bank (four frequencies, four bandwidths) so a phoneme
change glides over the transition time instead of clicking. The resonators
are retuned from the smoothed values every sample.

Every voice gets its own channel with its own filter state. Filter state
shared across voices bleeds one note's vowel into another the moment two
notes sound different phonemes.
*/

const NUM_FORMANTS: usize = 4;
const DEFAULT_TRANSITION_TIME: f32 = 0.02;
const BANK_GAIN: f32 = 0.3;
const NOISE_GAIN: f32 = 0.25;

struct FormantChannel {
    glottal: GlottalSource,
    noise: NoiseSource,
    resonators: [FormantResonator; NUM_FORMANTS],
    /// Indices 0..4 are formant frequencies, 4..8 bandwidths.
    smoothers: SmootherBank,
    current_phoneme: Option<u16>,
}

impl FormantChannel {
    fn new(id: usize, sample_rate: f32) -> Self {
        Self {
            glottal: GlottalSource::new(),
            noise: NoiseSource::new(0x9e37_79b9 ^ id as u32),
            resonators: [FormantResonator::new(500.0, 80.0, sample_rate); NUM_FORMANTS],
            smoothers: SmootherBank::new(NUM_FORMANTS * 2, DEFAULT_TRANSITION_TIME, sample_rate),
            current_phoneme: None,
        }
    }

    fn retarget(&mut self, phoneme: &Phoneme) {
        let mut targets = [0.0f32; NUM_FORMANTS * 2];
        targets[..NUM_FORMANTS].copy_from_slice(&phoneme.formants.frequencies);
        targets[NUM_FORMANTS..].copy_from_slice(&phoneme.formants.bandwidths);

        if self.current_phoneme.is_none() {
            // First phoneme on a fresh channel: no transition to glide from.
            self.smoothers.set_targets_immediate(&targets);
        } else {
            self.smoothers.set_targets(&targets);
        }
        self.current_phoneme = Some(phoneme.id);
    }

    fn reset(&mut self) {
        self.glottal.reset();
        self.noise.reset();
        for resonator in self.resonators.iter_mut() {
            resonator.reset();
        }
        self.current_phoneme = None;
    }
}

/// Per-voice parallel formant-bank synthesizer.
pub struct FormantSynth {
    channels: Vec<FormantChannel>,
    sample_rate: f32,
    transition_time: f32,
}

impl FormantSynth {
    pub fn new(sample_rate: f32, max_voices: usize) -> Self {
        Self {
            channels: (0..max_voices)
                .map(|id| FormantChannel::new(id, sample_rate))
                .collect(),
            sample_rate,
            transition_time: DEFAULT_TRANSITION_TIME,
        }
    }

    /// Formant glide time in seconds for phoneme changes.
    pub fn set_transition_time(&mut self, seconds: f32) {
        self.transition_time = seconds.clamp(0.001, 1.0);
        for channel in self.channels.iter_mut() {
            channel
                .smoothers
                .set_time_constant(self.transition_time, self.sample_rate);
        }
    }

    pub(crate) fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Render one voice into `out`, overwriting it.
    pub fn synthesize_voice(&mut self, voice: &VoiceRecord, phoneme: &Phoneme, out: &mut [f32]) {
        let channel = &mut self.channels[voice.id];
        if channel.current_phoneme != Some(phoneme.id) {
            channel.retarget(phoneme);
        }

        let sample_rate = self.sample_rate;
        for sample in out.iter_mut() {
            let excitation = if phoneme.voiced {
                channel.glottal.generate(voice.frequency, sample_rate)
            } else {
                channel.noise.generate() * NOISE_GAIN
            };

            channel.smoothers.step();
            let mut sum = 0.0f32;
            for (i, resonator) in channel.resonators.iter_mut().enumerate() {
                resonator.set_parameters(
                    channel.smoothers.current(i),
                    channel.smoothers.current(NUM_FORMANTS + i),
                    sample_rate,
                );
                sum += resonator.process(excitation);
            }

            *sample = sum * BANK_GAIN * voice.amplitude;
        }
    }

    pub fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phoneme::PhonemeInventory;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn test_voice(id: usize) -> VoiceRecord {
        let mut voice = VoiceRecord::new(id, SAMPLE_RATE);
        voice.bind(60, 100, None);
        voice
    }

    #[test]
    fn voiced_phoneme_produces_audio() {
        let inventory = PhonemeInventory::builtin();
        let mut synth = FormantSynth::new(SAMPLE_RATE, 4);
        let voice = test_voice(0);
        let a = inventory.lookup("ɑ").unwrap();

        let mut out = vec![0.0f32; 4_096];
        synth.synthesize_voice(&voice, a, &mut out);

        let rms = (out.iter().map(|s| s * s).sum::<f32>() / out.len() as f32).sqrt();
        assert!(rms > 1e-4, "expected audible output, rms={}", rms);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn unvoiced_phoneme_produces_audio() {
        let inventory = PhonemeInventory::builtin();
        let mut synth = FormantSynth::new(SAMPLE_RATE, 4);
        let voice = test_voice(0);
        let s = inventory.lookup("s").unwrap();

        let mut out = vec![0.0f32; 4_096];
        synth.synthesize_voice(&voice, s, &mut out);

        let rms = (out.iter().map(|x| x * x).sum::<f32>() / out.len() as f32).sqrt();
        assert!(rms > 1e-5);
    }

    #[test]
    fn output_is_bounded_over_long_run() {
        let inventory = PhonemeInventory::builtin();
        let mut synth = FormantSynth::new(SAMPLE_RATE, 4);
        let voice = test_voice(0);
        let i = inventory.lookup("i").unwrap();

        let mut out = vec![0.0f32; 512];
        for _ in 0..200 {
            synth.synthesize_voice(&voice, i, &mut out);
            for &sample in out.iter() {
                assert!(sample.abs() < 4.0, "formant output unbounded: {}", sample);
            }
        }
    }

    #[test]
    fn phoneme_change_does_not_click() {
        let inventory = PhonemeInventory::builtin();
        let mut synth = FormantSynth::new(SAMPLE_RATE, 4);
        let voice = test_voice(0);
        let a = inventory.lookup("ɑ").unwrap();
        let i = inventory.lookup("i").unwrap();

        let mut out = vec![0.0f32; 2_048];
        synth.synthesize_voice(&voice, a, &mut out);
        let tail = out[out.len() - 1];

        synth.synthesize_voice(&voice, i, &mut out);
        assert!(
            (out[0] - tail).abs() < 0.5,
            "phoneme switch produced a discontinuity: {} -> {}",
            tail,
            out[0]
        );
    }

    #[test]
    fn voices_have_independent_filter_state() {
        let inventory = PhonemeInventory::builtin();
        let mut synth = FormantSynth::new(SAMPLE_RATE, 4);
        let voice_a = test_voice(0);
        let voice_b = test_voice(1);
        let a = inventory.lookup("ɑ").unwrap();
        let i = inventory.lookup("i").unwrap();

        // Reference: voice 0 alone on phoneme a.
        let mut reference = vec![0.0f32; 1_024];
        synth.synthesize_voice(&voice_a, a, &mut reference);

        // Same again but with voice 1 interleaved on a different phoneme.
        synth.reset();
        let mut out_a = vec![0.0f32; 1_024];
        let mut out_b = vec![0.0f32; 1_024];
        synth.synthesize_voice(&voice_a, a, &mut out_a);
        synth.synthesize_voice(&voice_b, i, &mut out_b);

        assert_eq!(reference, out_a, "voice 1 must not disturb voice 0 state");
    }
}
