use crate::dsp::excitation::GlottalSource;
use crate::dsp::resonator::FormantResonator;
use crate::dsp::smoother::SmootherBank;
use crate::dsp::subharmonic::SubharmonicGenerator;
use crate::phoneme::Phoneme;
use crate::synth::voice::VoiceRecord;

/*
Subharmonic Synthesis
=====================

Throat-singing and chest-voice timbres: a glottal pulse train at the note
fundamental blended with a PLL-locked subharmonic below it, the mix then
shaped by the phoneme's formant bank. The phoneme record carries both the
subharmonic ratio (0.5 = octave down, 0.33 = a twelfth) and the blend
amount; a host override can pin the divisor for all voices regardless of
phoneme.

The PLL holds lock down to 20 Hz fundamentals, so low drone material keeps
its subharmonic in tune over arbitrarily long holds.
*/

const NUM_FORMANTS: usize = 4;
const DEFAULT_TRANSITION_TIME: f32 = 0.02;
const BANK_GAIN: f32 = 0.3;

struct SubharmonicChannel {
    glottal: GlottalSource,
    pll: SubharmonicGenerator,
    resonators: [FormantResonator; NUM_FORMANTS],
    smoothers: SmootherBank,
    current_phoneme: Option<u16>,
}

impl SubharmonicChannel {
    fn new(sample_rate: f32) -> Self {
        Self {
            glottal: GlottalSource::new(),
            pll: SubharmonicGenerator::new(2),
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
            self.smoothers.set_targets_immediate(&targets);
        } else {
            self.smoothers.set_targets(&targets);
        }
        self.current_phoneme = Some(phoneme.id);
    }

    fn reset(&mut self) {
        self.glottal.reset();
        self.pll.reset();
        for resonator in self.resonators.iter_mut() {
            resonator.reset();
        }
        self.current_phoneme = None;
    }
}

/// Per-voice subharmonic synthesizer with formant shaping.
pub struct SubharmonicSynth {
    channels: Vec<SubharmonicChannel>,
    sample_rate: f32,
    /// Host override: when set, every voice uses this divisor instead of
    /// the one derived from the phoneme's subharmonic ratio.
    divisor_override: Option<u32>,
    formant_shaping: bool,
}

impl SubharmonicSynth {
    pub fn new(sample_rate: f32, max_voices: usize) -> Self {
        Self {
            channels: (0..max_voices)
                .map(|_| SubharmonicChannel::new(sample_rate))
                .collect(),
            sample_rate,
            divisor_override: None,
            formant_shaping: true,
        }
    }

    pub fn set_divisor_override(&mut self, divisor: Option<u32>) {
        self.divisor_override = divisor.map(|d| d.max(1));
    }

    pub fn set_formant_shaping(&mut self, enabled: bool) {
        self.formant_shaping = enabled;
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

        let divisor = self
            .divisor_override
            .unwrap_or_else(|| divisor_from_ratio(phoneme.subharmonic_ratio));
        if channel.pll.divisor() != divisor {
            channel.pll.set_divisor(divisor);
        }

        let blend = phoneme.subharmonic_amplitude;
        let sample_rate = self.sample_rate;

        for sample in out.iter_mut() {
            let fundamental = channel.glottal.generate(voice.frequency, sample_rate);
            let sub = channel.pll.generate(voice.frequency, sample_rate);
            let mixed = fundamental * (1.0 - blend) + sub * blend;

            let shaped = if self.formant_shaping {
                channel.smoothers.step();
                let mut sum = 0.0f32;
                for (i, resonator) in channel.resonators.iter_mut().enumerate() {
                    resonator.set_parameters(
                        channel.smoothers.current(i),
                        channel.smoothers.current(NUM_FORMANTS + i),
                        sample_rate,
                    );
                    sum += resonator.process(mixed);
                }
                sum * BANK_GAIN
            } else {
                mixed
            };

            *sample = shaped * voice.amplitude;
        }
    }

    pub fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.reset();
        }
    }
}

/// Map a subharmonic ratio (1/N) to its integer divisor.
fn divisor_from_ratio(ratio: f32) -> u32 {
    if ratio <= 0.0 {
        return 2;
    }
    (1.0 / ratio).round().max(1.0) as u32
}
