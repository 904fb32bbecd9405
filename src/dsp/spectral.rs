use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/*
Spectral Enhancer
=================

Short-time Fourier processing that tilts the spectral envelope toward
brightness without introducing block-boundary discontinuities. The chain
per frame:

  periodic Hann window -> forward FFT -> magnitude tilt -> inverse FFT
  -> overlap-add

Frames are fft_size samples with a 50% hop. The periodic Hann window
satisfies w[n] + w[n + N/2] = 1 exactly, so with no spectral modification
the overlap-add reconstructs the input bit-for-bit (after the one-window
latency); the tilt is a smooth per-bin gain with phase preserved, so
reshaped frames still cross-fade cleanly at the hop boundary.

Latency is exactly one FFT window. That is a fixed, documented cost: the
hop pipeline itself delays by fft_size - hop samples, and the output ring
is primed with the remaining hop_size zeros at construction and after
`reset`.

All buffers, FFT plans, and scratch space are allocated in `new`;
`process` never touches the allocator.
*/

const DEFAULT_FFT_SIZE: usize = 1024;
const MIN_FFT_SIZE: usize = 256;

pub struct SpectralEnhancer {
    fft_size: usize,
    hop_size: usize,
    enhancement: f32,

    window: Vec<f32>,
    /// Sliding analysis frame (last fft_size input samples).
    analysis: Vec<f32>,
    /// Incoming samples waiting for the next hop boundary.
    staging: Vec<f32>,
    staged: usize,
    /// Overlap-add accumulator.
    ola: Vec<f32>,

    /// Output delay ring, primed so total latency is one window.
    out_ring: Vec<f32>,
    ring_read: usize,
    ring_write: usize,

    fft_forward: Arc<dyn Fft<f32>>,
    fft_inverse: Arc<dyn Fft<f32>>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectralEnhancer {
    /// `fft_size` is rounded up to a power of two (minimum 256).
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.next_power_of_two().max(MIN_FFT_SIZE);
        let hop_size = fft_size / 2;

        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(fft_size);
        let fft_inverse = planner.plan_fft_inverse(fft_size);

        // Periodic Hann: w[n] + w[n + N/2] = 1, the overlap-add identity.
        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / fft_size as f32).cos()))
            .collect();

        let scratch_len = fft_forward
            .get_inplace_scratch_len()
            .max(fft_inverse.get_inplace_scratch_len());

        let ring_capacity = fft_size * 2;
        let mut enhancer = Self {
            fft_size,
            hop_size,
            enhancement: 0.5,
            window,
            analysis: vec![0.0; fft_size],
            staging: vec![0.0; hop_size],
            staged: 0,
            ola: vec![0.0; fft_size],
            out_ring: vec![0.0; ring_capacity],
            ring_read: 0,
            ring_write: 0,
            fft_forward,
            fft_inverse,
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        };
        enhancer.prime_latency();
        enhancer
    }

    pub fn with_default_size() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }

    /// Processing delay in samples (one analysis window).
    pub fn latency(&self) -> usize {
        self.fft_size
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Enhancement amount, 0 (transparent) to 1 (full tilt).
    pub fn set_enhancement(&mut self, amount: f32) {
        self.enhancement = amount.clamp(0.0, 1.0);
    }

    /// Process a buffer of arbitrary length in place.
    pub fn process(&mut self, audio: &mut [f32]) {
        for sample in audio.iter_mut() {
            self.staging[self.staged] = *sample;
            self.staged += 1;
            if self.staged == self.hop_size {
                self.staged = 0;
                self.process_hop();
            }
            *sample = self.pop_output();
        }
    }

    /// Clear all state and re-prime the latency window.
    pub fn reset(&mut self) {
        self.analysis.fill(0.0);
        self.staging.fill(0.0);
        self.staged = 0;
        self.ola.fill(0.0);
        self.out_ring.fill(0.0);
        self.ring_read = 0;
        self.ring_write = 0;
        self.prime_latency();
    }

    // The hop pipeline itself delays by fft_size - hop samples; priming the
    // remaining hop makes the total latency exactly one window and keeps the
    // ring from underrunning before the first frame completes.
    fn prime_latency(&mut self) {
        for _ in 0..self.hop_size {
            self.push_output(0.0);
        }
    }

    /// One full analysis/resynthesis step on a hop's worth of new input.
    fn process_hop(&mut self) {
        let hop = self.hop_size;
        let n = self.fft_size;

        // Slide the analysis frame and append the staged samples.
        self.analysis.copy_within(hop.., 0);
        self.analysis[n - hop..].copy_from_slice(&self.staging);

        for i in 0..n {
            self.spectrum[i] = Complex::new(self.analysis[i] * self.window[i], 0.0);
        }
        self.fft_forward
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        self.reshape_envelope();

        self.fft_inverse
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        // Overlap-add the (unnormalized) inverse transform.
        let scale = 1.0 / n as f32;
        for i in 0..n {
            self.ola[i] += self.spectrum[i].re * scale;
        }

        // The first hop of the accumulator is complete; emit and slide.
        for i in 0..hop {
            let out = self.ola[i];
            self.push_output(out);
        }
        self.ola.copy_within(hop.., 0);
        self.ola[n - hop..].fill(0.0);
    }

    /// Smooth high-frequency tilt on the magnitude spectrum, phase preserved.
    /// Gain ramps from 1.0 at quarter-Nyquist to (1 + enhancement) at
    /// Nyquist; conjugate bins are scaled together to keep the inverse
    /// transform real.
    fn reshape_envelope(&mut self) {
        if self.enhancement <= 0.0 {
            return;
        }

        let half = self.fft_size / 2;
        let knee = half / 4;
        for i in knee..=half {
            let t = (i - knee) as f32 / (half - knee) as f32;
            let boost = 1.0 + self.enhancement * t;
            self.spectrum[i] *= boost;
            if i != 0 && i != half {
                self.spectrum[self.fft_size - i] *= boost;
            }
        }
    }

    #[inline]
    fn push_output(&mut self, sample: f32) {
        self.out_ring[self.ring_write] = sample;
        self.ring_write = (self.ring_write + 1) % self.out_ring.len();
    }

    #[inline]
    fn pop_output(&mut self) -> f32 {
        let sample = self.out_ring[self.ring_read];
        self.ring_read = (self.ring_read + 1) % self.out_ring.len();
        sample
    }
}
