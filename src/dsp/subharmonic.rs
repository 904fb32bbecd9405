use std::f64::consts::{PI, TAU};

/*
Subharmonic Generation via Phase-Locked Loop
============================================

Derives a sub-multiple of a driving fundamental (an octave down for a
divisor of 2, a twelfth for 3, ...) for chest-voice and throat-singing
timbres. The naive approach - running a second oscillator at f/N and
nudging it with a one-pole filter - accumulates phase error without bound
and is audibly detuned after a few minutes. This implementation keeps the
subharmonic phase-locked indefinitely.

Two phase accumulators run side by side:

  fundamental_phase   free-running, advanced by 2*pi*f/fs each sample
  sub_phase           the generated subharmonic's phase

Each sample the loop computes where the subharmonic *should* be
(target = fundamental_phase / N), wraps the difference into [-pi, pi], and
feeds it to a PI controller:

  integral  += error * ki        (clamped: anti-windup)
  correction = kp * error + integral
  sub_phase += (2*pi*f/fs) / N + correction

The feedforward term tracks frequency changes immediately; the controller
only has to absorb numeric residue, so the phase error stays near zero and
does not trend over time.

Both accumulators are wrapped jointly: when the fundamental exceeds
2*pi*N it drops by exactly 2*pi*N and the subharmonic by 2*pi at the same
instant, which leaves the error term untouched. That joint wrap is the
invariant that makes hours-long runs drift-free; wrapping each accumulator
on its own (as one-pole designs do) is where drift comes from.
*/

const INTEGRAL_LIMIT: f64 = 0.2;
const DEFAULT_KP: f64 = 0.1;
const DEFAULT_KI: f64 = 1.0e-3;

/// PLL-locked subharmonic oscillator.
#[derive(Debug, Clone, Copy)]
pub struct SubharmonicGenerator {
    divisor: u32,
    mix: f32,

    fundamental_phase: f64,
    sub_phase: f64,
    integral: f64,
    phase_error: f64,

    kp: f64,
    ki: f64,
}

impl SubharmonicGenerator {
    /// `divisor` N produces a subharmonic at f/N (N = 2 is an octave down).
    pub fn new(divisor: u32) -> Self {
        Self {
            divisor: divisor.max(1),
            mix: 1.0,
            fundamental_phase: 0.0,
            sub_phase: 0.0,
            integral: 0.0,
            phase_error: 0.0,
            kp: DEFAULT_KP,
            ki: DEFAULT_KI,
        }
    }

    pub fn set_divisor(&mut self, divisor: u32) {
        self.divisor = divisor.max(1);
    }

    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Generate one sample of the subharmonic for the given fundamental.
    #[inline]
    pub fn generate(&mut self, fundamental_freq: f32, sample_rate: f32) -> f32 {
        if fundamental_freq <= 0.0 || sample_rate <= 0.0 {
            return 0.0;
        }

        let ratio = 1.0 / self.divisor as f64;
        let phase_increment = TAU * fundamental_freq as f64 / sample_rate as f64;

        self.fundamental_phase += phase_increment;

        let target_phase = self.fundamental_phase * ratio;
        self.phase_error = wrap_phase(target_phase - self.sub_phase);

        self.integral = (self.integral + self.phase_error * self.ki)
            .clamp(-INTEGRAL_LIMIT, INTEGRAL_LIMIT);
        let correction = self.kp * self.phase_error + self.integral;

        self.sub_phase += phase_increment * ratio + correction;

        // Joint wrap: dropping the fundamental by 2*pi*N and the
        // subharmonic by 2*pi at the same instant leaves the error term
        // exactly unchanged.
        let span = TAU * self.divisor as f64;
        while self.fundamental_phase >= span {
            self.fundamental_phase -= span;
            self.sub_phase -= TAU;
        }

        (self.sub_phase.sin() as f32) * self.mix
    }

    pub fn generate_block(
        &mut self,
        output: &mut [f32],
        fundamental_freq: f32,
        sample_rate: f32,
    ) {
        for sample in output.iter_mut() {
            *sample = self.generate(fundamental_freq, sample_rate);
        }
    }

    /// Instantaneous phase error in radians, wrapped into [-pi, pi].
    pub fn phase_error(&self) -> f32 {
        self.phase_error as f32
    }

    pub fn reset(&mut self) {
        self.fundamental_phase = 0.0;
        self.sub_phase = 0.0;
        self.integral = 0.0;
        self.phase_error = 0.0;
    }
}

#[inline]
fn wrap_phase(mut p: f64) -> f64 {
    while p > PI {
        p -= TAU;
    }
    while p < -PI {
        p += TAU;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;

    #[test]
    fn ten_seconds_locked_without_drift() {
        let mut generator = SubharmonicGenerator::new(2);
        let total = (10.0 * SAMPLE_RATE) as usize;
        let half = total / 2;

        let mut first_half_error = 0.0f64;
        let mut second_half_error = 0.0f64;

        for n in 0..total {
            generator.generate(220.0, SAMPLE_RATE);
            let err = generator.phase_error().abs() as f64;
            if n < half {
                first_half_error += err;
            } else {
                second_half_error += err;
            }
        }

        let first_avg = first_half_error / half as f64;
        let second_avg = second_half_error / half as f64;
        let overall_avg = (first_half_error + second_half_error) / total as f64;

        assert!(
            overall_avg < 0.05,
            "average phase error too large: {}",
            overall_avg
        );
        assert!(
            (second_avg + 1e-9) / (first_avg + 1e-9) < 2.0,
            "phase error trending upward: first={}, second={}",
            first_avg,
            second_avg
        );
    }

    #[test]
    fn relocks_after_frequency_step() {
        let mut generator = SubharmonicGenerator::new(2);
        for _ in 0..4_410 {
            generator.generate(220.0, SAMPLE_RATE);
        }

        // Step the fundamental and check the loop settles within 1000 samples.
        for _ in 0..1_000 {
            generator.generate(180.0, SAMPLE_RATE);
        }
        for _ in 0..1_000 {
            generator.generate(180.0, SAMPLE_RATE);
            assert!(
                generator.phase_error().abs() < 0.2,
                "PLL failed to re-lock: error={}",
                generator.phase_error()
            );
        }
    }

    #[test]
    fn stable_at_sub_audio_fundamentals() {
        for &freq in &[20.0f32, 25.0, 32.0, 40.0] {
            let mut generator = SubharmonicGenerator::new(3);
            for _ in 0..(2.0 * SAMPLE_RATE) as usize {
                let out = generator.generate(freq, SAMPLE_RATE);
                assert!(out.is_finite());
                assert!(out.abs() <= 1.0);
            }
            assert!(
                generator.phase_error().abs() < 0.05,
                "PLL unlocked at {} Hz: error={}",
                freq,
                generator.phase_error()
            );
        }
    }

    #[test]
    fn octave_down_halves_zero_crossing_rate() {
        let mut generator = SubharmonicGenerator::new(2);
        let mut crossings = 0;
        let mut previous = generator.generate(220.0, SAMPLE_RATE);
        for _ in 1..(SAMPLE_RATE as usize) {
            let sample = generator.generate(220.0, SAMPLE_RATE);
            if previous <= 0.0 && sample > 0.0 {
                crossings += 1;
            }
            previous = sample;
        }
        // 110 Hz subharmonic: ~110 rising zero crossings per second.
        assert!(
            (100..=120).contains(&crossings),
            "expected ~110 cycles, counted {}",
            crossings
        );
    }

    #[test]
    fn invalid_input_is_silent() {
        let mut generator = SubharmonicGenerator::new(2);
        assert_eq!(generator.generate(-1.0, SAMPLE_RATE), 0.0);
        assert_eq!(generator.generate(220.0, 0.0), 0.0);
    }

    #[test]
    fn reset_then_identical_input_yields_identical_output() {
        let mut generator = SubharmonicGenerator::new(2);
        let first: Vec<f32> = (0..512).map(|_| generator.generate(220.0, SAMPLE_RATE)).collect();
        generator.reset();
        let second: Vec<f32> = (0..512).map(|_| generator.generate(220.0, SAMPLE_RATE)).collect();
        assert_eq!(first, second);
    }
}
