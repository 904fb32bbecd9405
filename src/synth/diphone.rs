use crate::dsp::excitation::{GlottalSource, NoiseSource};
use crate::dsp::resonator::FormantResonator;
use crate::phoneme::{FormantData, Phoneme, PhonemeCategory};
use crate::synth::voice::VoiceRecord;

/*
Diphone Synthesis
=================

Instead of smoothing formant targets independently, this method renders the
TRANSITION between two phonemes as the unit of synthesis. When a voice's
phoneme changes, the channel snapshots its current formant values as the
crossfade source and glides to the new target over a fixed transition
duration, with timing weighted by the phoneme pair:

    consonant -> vowel   formants move fast early (30% of the transition
                         covers the first half of the distance)
    vowel -> consonant   mirrored, movement concentrated late
    vowel -> vowel       linear
    consonant -> consonant  linear

The position-to-ratio map is additionally shaped by a power curve; an
exponent above 1 eases in, below 1 eases out. Voicing crossfades on the
same ratio, so a voiced-to-unvoiced pair morphs its excitation along with
its formants.

Drones and subharmonic phonemes take vowel-style timing; they are sustained
material and behave like vowels at boundaries.
*/

const NUM_FORMANTS: usize = 4;
const DEFAULT_TRANSITION_DURATION: f32 = 0.08;
const DEFAULT_CROSSFADE_CURVE: f32 = 1.0;
const BANK_GAIN: f32 = 0.3;
const NOISE_GAIN: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionTiming {
    ConsonantToVowel,
    VowelToConsonant,
    Linear,
}

impl TransitionTiming {
    fn classify(from: PhonemeCategory, to: PhonemeCategory) -> Self {
        let vowel_like = |c: PhonemeCategory| c != PhonemeCategory::Consonant;
        match (vowel_like(from), vowel_like(to)) {
            (false, true) => Self::ConsonantToVowel,
            (true, false) => Self::VowelToConsonant,
            _ => Self::Linear,
        }
    }

    /// Map normalized transition position to a raw crossfade ratio.
    fn ratio(self, position: f32) -> f32 {
        match self {
            // Half the distance in the first 30% of the transition.
            Self::ConsonantToVowel => {
                if position < 0.3 {
                    position / 0.3 * 0.5
                } else {
                    0.5 + (position - 0.3) / 0.7 * 0.5
                }
            }
            // Mirrored: only half the distance by the 70% mark.
            Self::VowelToConsonant => {
                if position < 0.7 {
                    position / 0.7 * 0.5
                } else {
                    0.5 + (position - 0.7) / 0.3 * 0.5
                }
            }
            Self::Linear => position,
        }
    }
}

struct DiphoneChannel {
    glottal: GlottalSource,
    noise: NoiseSource,
    resonators: [FormantResonator; NUM_FORMANTS],

    source: FormantData,
    target: FormantData,
    source_voiced: bool,
    target_voiced: bool,
    timing: TransitionTiming,

    current_phoneme: Option<u16>,
    /// 0..=1 through the current transition.
    position: f32,
    transitioning: bool,
}

impl DiphoneChannel {
    fn new(id: usize, sample_rate: f32) -> Self {
        let neutral = FormantData::new(
            [500.0, 1_500.0, 2_500.0, 3_500.0],
            [80.0, 100.0, 120.0, 130.0],
        );
        Self {
            glottal: GlottalSource::new(),
            noise: NoiseSource::new(0x85eb_ca6b ^ id as u32),
            resonators: [FormantResonator::new(500.0, 80.0, sample_rate); NUM_FORMANTS],
            source: neutral,
            target: neutral,
            source_voiced: true,
            target_voiced: true,
            timing: TransitionTiming::Linear,
            current_phoneme: None,
            position: 1.0,
            transitioning: false,
        }
    }

    /// Snapshot the in-flight state as the new crossfade source and begin
    /// a transition toward the phoneme.
    fn begin_transition(&mut self, phoneme: &Phoneme, previous_category: PhonemeCategory) {
        if self.current_phoneme.is_none() {
            // First phoneme: land on it directly.
            self.source = phoneme.formants;
            self.target = phoneme.formants;
            self.source_voiced = phoneme.voiced;
            self.target_voiced = phoneme.voiced;
            self.timing = TransitionTiming::Linear;
            self.position = 1.0;
            self.transitioning = false;
        } else {
            let ratio = self.timing.ratio(self.position.min(1.0));
            self.source = interpolate(&self.source, &self.target, ratio);
            self.source_voiced = self.target_voiced;
            self.target = phoneme.formants;
            self.target_voiced = phoneme.voiced;
            self.timing = TransitionTiming::classify(previous_category, phoneme.category);
            self.position = 0.0;
            self.transitioning = true;
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
        self.position = 1.0;
        self.transitioning = false;
    }
}

/// Per-voice diphone transition synthesizer.
pub struct DiphoneSynth {
    channels: Vec<DiphoneChannel>,
    sample_rate: f32,
    transition_duration: f32,
    crossfade_curve: f32,
}

impl DiphoneSynth {
    pub fn new(sample_rate: f32, max_voices: usize) -> Self {
        Self {
            channels: (0..max_voices)
                .map(|id| DiphoneChannel::new(id, sample_rate))
                .collect(),
            sample_rate,
            transition_duration: DEFAULT_TRANSITION_DURATION,
            crossfade_curve: DEFAULT_CROSSFADE_CURVE,
        }
    }

    pub fn set_transition_duration(&mut self, seconds: f32) {
        self.transition_duration = seconds.clamp(0.01, 1.0);
    }

    /// Power-curve exponent shaping the crossfade; 1.0 is linear.
    pub fn set_crossfade_curve(&mut self, exponent: f32) {
        self.crossfade_curve = exponent.clamp(0.1, 3.0);
    }

    pub(crate) fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Render one voice into `out`, overwriting it.
    pub fn synthesize_voice(&mut self, voice: &VoiceRecord, phoneme: &Phoneme, out: &mut [f32]) {
        let channel = &mut self.channels[voice.id];
        if channel.current_phoneme != Some(phoneme.id) {
            let previous_category = channel
                .current_phoneme
                .map(|_| infer_previous_category(channel))
                .unwrap_or(phoneme.category);
            channel.begin_transition(phoneme, previous_category);
        }

        let sample_rate = self.sample_rate;
        let position_increment = 1.0 / (self.transition_duration * sample_rate);
        let curve = self.crossfade_curve;

        for sample in out.iter_mut() {
            if channel.transitioning {
                channel.position += position_increment;
                if channel.position >= 1.0 {
                    channel.position = 1.0;
                    channel.transitioning = false;
                }
            }

            let ratio = channel.timing.ratio(channel.position).powf(curve);
            let formants = interpolate(&channel.source, &channel.target, ratio);

            // Voicing crossfades on the same ratio as the formants.
            let voiced_amount = match (channel.source_voiced, channel.target_voiced) {
                (true, true) => 1.0,
                (false, false) => 0.0,
                (false, true) => ratio,
                (true, false) => 1.0 - ratio,
            };
            let pulse = channel.glottal.generate(voice.frequency, sample_rate);
            let hiss = channel.noise.generate() * NOISE_GAIN;
            let excitation = pulse * voiced_amount + hiss * (1.0 - voiced_amount);

            let mut sum = 0.0f32;
            for (i, resonator) in channel.resonators.iter_mut().enumerate() {
                resonator.set_parameters(
                    formants.frequencies[i],
                    formants.bandwidths[i],
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

fn interpolate(source: &FormantData, target: &FormantData, ratio: f32) -> FormantData {
    let mut frequencies = [0.0f32; NUM_FORMANTS];
    let mut bandwidths = [0.0f32; NUM_FORMANTS];
    for i in 0..NUM_FORMANTS {
        frequencies[i] =
            source.frequencies[i] + (target.frequencies[i] - source.frequencies[i]) * ratio;
        bandwidths[i] =
            source.bandwidths[i] + (target.bandwidths[i] - source.bandwidths[i]) * ratio;
    }
    FormantData::new(frequencies, bandwidths)
}

// The channel only stores formant snapshots, so the outgoing category is
// reconstructed from voicing: voiced material is treated as vowel-like.
fn infer_previous_category(channel: &DiphoneChannel) -> PhonemeCategory {
    if channel.target_voiced {
        PhonemeCategory::Vowel
    } else {
        PhonemeCategory::Consonant
    }
}
