use crate::phoneme::Phoneme;
use crate::synth::diphone::DiphoneSynth;
use crate::synth::formant::FormantSynth;
use crate::synth::subharmonic::SubharmonicSynth;
use crate::synth::voice::VoiceRecord;
use crate::MAX_BLOCK_SIZE;

/// Selects which synthesis model renders the voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SynthMethodKind {
    Formant,
    Subharmonic,
    Diphone,
}

/// Outcome of a synthesis call.
///
/// `cpu_usage` is a rough per-voice cost estimate relative to the block
/// duration; hosts use it to budget voice counts, not to meter actual load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisResult {
    pub success: bool,
    pub cpu_usage: f32,
}

impl SynthesisResult {
    fn failure() -> Self {
        Self {
            success: false,
            cpu_usage: 0.0,
        }
    }
}

/// A synthesis method instance holding per-voice channel state.
///
/// Construction allocates everything up front; `synthesize_voice` and
/// `synthesize_batch` are allocation-free and safe on the audio thread.
pub enum SynthMethod {
    Formant(FormantSynth),
    Subharmonic(SubharmonicSynth),
    Diphone(DiphoneSynth),
}

impl SynthMethod {
    pub fn new(kind: SynthMethodKind, sample_rate: f32, max_voices: usize) -> Self {
        match kind {
            SynthMethodKind::Formant => Self::Formant(FormantSynth::new(sample_rate, max_voices)),
            SynthMethodKind::Subharmonic => {
                Self::Subharmonic(SubharmonicSynth::new(sample_rate, max_voices))
            }
            SynthMethodKind::Diphone => Self::Diphone(DiphoneSynth::new(sample_rate, max_voices)),
        }
    }

    pub fn kind(&self) -> SynthMethodKind {
        match self {
            Self::Formant(_) => SynthMethodKind::Formant,
            Self::Subharmonic(_) => SynthMethodKind::Subharmonic,
            Self::Diphone(_) => SynthMethodKind::Diphone,
        }
    }

    fn num_channels(&self) -> usize {
        match self {
            Self::Formant(s) => s.num_channels(),
            Self::Subharmonic(s) => s.num_channels(),
            Self::Diphone(s) => s.num_channels(),
        }
    }

    /// Render one voice into `out`, overwriting it. An inactive voice, an
    /// empty or oversized buffer, or an out-of-range voice id fails without
    /// touching the buffer.
    pub fn synthesize_voice(
        &mut self,
        voice: &VoiceRecord,
        phoneme: &Phoneme,
        out: &mut [f32],
    ) -> SynthesisResult {
        if !voice.active
            || out.is_empty()
            || out.len() > MAX_BLOCK_SIZE
            || voice.id >= self.num_channels()
        {
            return SynthesisResult::failure();
        }

        let cpu_usage = match self {
            Self::Formant(s) => {
                s.synthesize_voice(voice, phoneme, out);
                0.010
            }
            Self::Subharmonic(s) => {
                s.synthesize_voice(voice, phoneme, out);
                0.015
            }
            Self::Diphone(s) => {
                s.synthesize_voice(voice, phoneme, out);
                0.020
            }
        };

        SynthesisResult {
            success: true,
            cpu_usage,
        }
    }

    /// Render every (voice, phoneme) pair and mix the results into `out`
    /// with 1/n gain. Failed voices are skipped; the result reports the
    /// count that rendered.
    pub fn synthesize_batch(
        &mut self,
        voices: &[(&VoiceRecord, &Phoneme)],
        out: &mut [f32],
    ) -> usize {
        out.fill(0.0);
        if voices.is_empty() || out.is_empty() || out.len() > MAX_BLOCK_SIZE {
            return 0;
        }

        let mut scratch = [0.0f32; MAX_BLOCK_SIZE];
        let scratch = &mut scratch[..out.len()];
        let gain = 1.0 / voices.len() as f32;

        let mut rendered = 0;
        for &(voice, phoneme) in voices {
            if !self.synthesize_voice(voice, phoneme, scratch).success {
                continue;
            }
            for (mixed, &sample) in out.iter_mut().zip(scratch.iter()) {
                *mixed += sample * gain;
            }
            rendered += 1;
        }
        rendered
    }

    /// Clear all per-voice channel state.
    pub fn reset(&mut self) {
        match self {
            Self::Formant(s) => s.reset(),
            Self::Subharmonic(s) => s.reset(),
            Self::Diphone(s) => s.reset(),
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
    fn all_kinds_construct_and_render() {
        let inventory = PhonemeInventory::builtin();
        let phoneme = inventory.lookup("ɑ").unwrap();
        let voice = test_voice(0);

        for kind in [
            SynthMethodKind::Formant,
            SynthMethodKind::Subharmonic,
            SynthMethodKind::Diphone,
        ] {
            let mut method = SynthMethod::new(kind, SAMPLE_RATE, 4);
            assert_eq!(method.kind(), kind);

            let mut out = vec![0.0f32; 2_048];
            let result = method.synthesize_voice(&voice, phoneme, &mut out);
            assert!(result.success);
            assert!(result.cpu_usage > 0.0);
            assert!(out.iter().all(|s| s.is_finite()));
        }
    }

    #[test]
    fn inactive_voice_fails_without_touching_buffer() {
        let inventory = PhonemeInventory::builtin();
        let phoneme = inventory.lookup("ɑ").unwrap();
        let voice = VoiceRecord::new(0, SAMPLE_RATE); // Never bound

        let mut method = SynthMethod::new(SynthMethodKind::Formant, SAMPLE_RATE, 4);
        let mut out = vec![0.5f32; 256];
        let result = method.synthesize_voice(&voice, phoneme, &mut out);

        assert!(!result.success);
        assert!(out.iter().all(|&s| s == 0.5), "buffer must be untouched");
    }

    #[test]
    fn oversized_buffer_is_rejected() {
        let inventory = PhonemeInventory::builtin();
        let phoneme = inventory.lookup("ɑ").unwrap();
        let voice = test_voice(0);

        let mut method = SynthMethod::new(SynthMethodKind::Formant, SAMPLE_RATE, 4);
        let mut out = vec![0.0f32; MAX_BLOCK_SIZE + 1];
        assert!(!method.synthesize_voice(&voice, phoneme, &mut out).success);

        let mut empty: [f32; 0] = [];
        assert!(!method.synthesize_voice(&voice, phoneme, &mut empty).success);
    }

    #[test]
    fn out_of_range_voice_id_is_rejected() {
        let inventory = PhonemeInventory::builtin();
        let phoneme = inventory.lookup("ɑ").unwrap();
        let voice = test_voice(9); // Beyond the 4-channel pool

        let mut method = SynthMethod::new(SynthMethodKind::Formant, SAMPLE_RATE, 4);
        let mut out = vec![0.0f32; 256];
        assert!(!method.synthesize_voice(&voice, phoneme, &mut out).success);
    }

    #[test]
    fn batch_mixes_with_equal_gain() {
        let inventory = PhonemeInventory::builtin();
        let phoneme = inventory.lookup("ɑ").unwrap();
        let voice_a = test_voice(0);
        let voice_b = test_voice(1);

        let mut method = SynthMethod::new(SynthMethodKind::Formant, SAMPLE_RATE, 4);
        let mut out = vec![0.0f32; 1_024];
        let rendered = method.synthesize_batch(
            &[(&voice_a, phoneme), (&voice_b, phoneme)],
            &mut out,
        );

        assert_eq!(rendered, 2);
        let rms = (out.iter().map(|s| s * s).sum::<f32>() / out.len() as f32).sqrt();
        assert!(rms > 1e-4);
    }

    #[test]
    fn batch_skips_failed_voices() {
        let inventory = PhonemeInventory::builtin();
        let phoneme = inventory.lookup("ɑ").unwrap();
        let active = test_voice(0);
        let inactive = VoiceRecord::new(1, SAMPLE_RATE);

        let mut method = SynthMethod::new(SynthMethodKind::Formant, SAMPLE_RATE, 4);
        let mut out = vec![0.0f32; 512];
        let rendered = method.synthesize_batch(
            &[(&active, phoneme), (&inactive, phoneme)],
            &mut out,
        );
        assert_eq!(rendered, 1);
    }
}
