//! Excitation sources for vocal synthesis.
//!
//! Voiced phonemes are driven by a Rosenberg-model glottal pulse train,
//! unvoiced phonemes by deterministic white noise. Both are allocation-free
//! and reproducible after `reset`.

use std::f64::consts::PI;

/// Rosenberg glottal pulse train.
///
/// One period is split into an opening phase (sinusoidal rise), a return
/// phase (exponential fall), and a closed phase (silence). The open and
/// speed quotients shape the split and with it the brightness of the voice.
#[derive(Debug, Clone, Copy)]
pub struct GlottalSource {
    phase: f64,
    open_quotient: f32,
    speed_quotient: f32,
}

impl GlottalSource {
    pub fn new() -> Self {
        Self {
            phase: 0.0,
            open_quotient: 0.5,
            speed_quotient: 0.5,
        }
    }

    pub fn set_pulse_shape(&mut self, open_quotient: f32, speed_quotient: f32) {
        self.open_quotient = open_quotient.clamp(0.1, 0.9);
        self.speed_quotient = speed_quotient.clamp(0.1, 0.9);
    }

    /// Generate one sample of the pulse train at the given fundamental.
    #[inline]
    pub fn generate(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        if frequency <= 0.0 || sample_rate <= 0.0 {
            return 0.0;
        }

        let sample = self.pulse_at(self.phase);

        self.phase += (frequency / sample_rate) as f64;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }

    /// Centered around zero so the resonator bank is not fed a DC offset.
    fn pulse_at(&self, phase: f64) -> f32 {
        let t_open = self.open_quotient as f64;
        let t_return = t_open + (1.0 - t_open) * self.speed_quotient as f64;

        let raw = if phase < t_open {
            // Opening: sinusoidal rise 0 -> 1
            let normalized = phase / t_open;
            0.5 * (1.0 - (PI * normalized).cos())
        } else if phase < t_return {
            // Return: exponential fall
            let normalized = (phase - t_open) / (t_return - t_open);
            (-3.0 * normalized).exp()
        } else {
            // Closed
            0.0
        };

        (raw - 0.4) as f32
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

impl Default for GlottalSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic white noise (linear congruential generator).
///
/// Seeded, so an identical call sequence after `reset` produces identical
/// samples; that is what makes unvoiced synthesis reproducible in tests.
#[derive(Debug, Clone, Copy)]
pub struct NoiseSource {
    seed: u32,
    state: u32,
}

impl NoiseSource {
    pub fn new(seed: u32) -> Self {
        Self { seed, state: seed }
    }

    #[inline]
    pub fn generate(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        ((self.state >> 16) & 0x7fff) as f32 / 16_384.0 - 1.0
    }

    pub fn reset(&mut self) {
        self.state = self.seed;
    }
}
