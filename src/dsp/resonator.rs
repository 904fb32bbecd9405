use std::f32::consts::PI;

/*
Formant Resonator
=================

A single vocal-tract resonance modeled as a real-coefficient biquad
bandpass. Four of these per voice (tuned to F1-F4) shape the glottal
excitation into a vowel.

Pole placement follows the classic formant-resonator recipe:

    theta = 2*pi*Fc / Fs           resonance angle
    r     = exp(-pi*BW / Fs)       pole radius (bandwidth -> decay)

with a conjugate pole pair at r*e^(+-j*theta). A matching zero pair sits
inside the poles at radius r*alpha; alpha in [0, 1) shapes how sharply the
skirt falls away from the resonance without moving the peak. The filter is
Direct-Form-I:

    y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]

The b-coefficients carry a normalization factor so the gain at the center
frequency is exactly 1. That is what makes the boundedness contract hold:
the pole radius is clamped strictly below 1 and the peak gain cannot grow
past unity no matter how the parameters are modulated, so bounded input
stays bounded for hours of audio.
*/

const MAX_POLE_RADIUS: f32 = 0.9995;
const DEFAULT_ALPHA: f32 = 0.5;

/// Tunable bandpass resonator for one formant band.
#[derive(Debug, Clone, Copy)]
pub struct FormantResonator {
    // Coefficients (b normalized for unity gain at the center frequency)
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // Two-sample delay lines
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,

    center_frequency: f32,
    bandwidth: f32,
    sample_rate: f32,
    alpha: f32,
}

impl FormantResonator {
    pub fn new(center_frequency: f32, bandwidth: f32, sample_rate: f32) -> Self {
        let mut resonator = Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
            center_frequency,
            bandwidth,
            sample_rate,
            alpha: DEFAULT_ALPHA,
        };
        resonator.compute_coefficients();
        resonator
    }

    /// Retune the resonator. Delay-line state is kept so continuous
    /// parameter modulation stays click-free.
    pub fn set_parameters(&mut self, center_frequency: f32, bandwidth: f32, sample_rate: f32) {
        self.center_frequency = center_frequency;
        self.bandwidth = bandwidth;
        self.sample_rate = sample_rate;
        self.compute_coefficients();
    }

    /// Resonance-shaping term: zero radius as a fraction of the pole radius.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 0.95);
        self.compute_coefficients();
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    pub fn process_block(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Zero the delay lines. The impulse response after `reset` is
    /// bit-for-bit reproducible.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    pub fn coefficients(&self) -> [f32; 5] {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
    }

    fn compute_coefficients(&mut self) {
        // Degenerate parameters fall back to a passthrough, matching the
        // "invalid input never corrupts state" contract.
        if self.sample_rate <= 0.0 || self.center_frequency <= 0.0 || self.bandwidth <= 0.0 {
            self.b0 = 1.0;
            self.b1 = 0.0;
            self.b2 = 0.0;
            self.a1 = 0.0;
            self.a2 = 0.0;
            return;
        }

        // Keep the resonance below Nyquist even under host automation.
        let fc = self.center_frequency.min(self.sample_rate * 0.45);
        let theta = 2.0 * PI * fc / self.sample_rate;
        let r = (-PI * self.bandwidth / self.sample_rate).exp().min(MAX_POLE_RADIUS);
        let rz = r * self.alpha;

        let cos_theta = theta.cos();

        self.a1 = -2.0 * r * cos_theta;
        self.a2 = r * r;

        let b1 = -2.0 * rz * cos_theta;
        let b2 = rz * rz;

        // Normalize for unity gain at the center frequency.
        let gain = evaluate_magnitude(1.0, b1, b2, theta) / evaluate_magnitude(1.0, self.a1, self.a2, theta);
        let scale = if gain > 1e-9 { 1.0 / gain } else { 1.0 };

        self.b0 = scale;
        self.b1 = b1 * scale;
        self.b2 = b2 * scale;
    }
}

/// |c0 + c1*z^-1 + c2*z^-2| evaluated at z = e^(j*theta).
fn evaluate_magnitude(c0: f32, c1: f32, c2: f32, theta: f32) -> f32 {
    let re = c0 + c1 * theta.cos() + c2 * (2.0 * theta).cos();
    let im = -(c1 * theta.sin() + c2 * (2.0 * theta).sin());
    (re * re + im * im).sqrt()
}
