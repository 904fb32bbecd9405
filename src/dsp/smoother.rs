/*
Parameter Smoothing
===================

Every audible parameter in this crate (formant frequencies, gain, mix
levels) is driven through a one-pole exponential smoother. Stepping a
parameter directly produces a discontinuity in the output signal, which the
ear hears as a click; the smoother turns the step into an exponential glide.

The recurrence is

    current += (target - current) * coefficient

with the coefficient derived from a time constant tau and the sample rate:

    coefficient = 1 - exp(-1 / (tau * fs))

After one time constant the output has covered ~63% of the distance to the
target; after five it is within 1% regardless of sample rate, which is the
settling contract the tests assert.

`set_target_immediate` jumps both values at once. It exists for
(re)initialization only; calling it while audio is running reintroduces the
click the smoother is there to prevent.
*/

/// One-pole exponential smoother for a single scalar parameter.
#[derive(Debug, Clone, Copy)]
pub struct LinearSmoother {
    current: f32,
    target: f32,
    coefficient: f32,
}

impl LinearSmoother {
    /// Create a smoother with the given time constant (seconds).
    pub fn new(time_constant: f32, sample_rate: f32) -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            coefficient: coefficient_for(time_constant, sample_rate),
        }
    }

    pub fn set_time_constant(&mut self, time_constant: f32, sample_rate: f32) {
        self.coefficient = coefficient_for(time_constant, sample_rate);
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump to the target with no transition. Initialization only.
    pub fn set_target_immediate(&mut self, target: f32) {
        self.target = target;
        self.current = target;
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn process(&mut self) -> f32 {
        self.current += (self.target - self.current) * self.coefficient;
        self.current
    }

    pub fn process_block(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            *sample = self.process();
        }
    }

    /// Snap the current value onto the target.
    pub fn reset(&mut self) {
        self.current = self.target;
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

/// Batched smoother for N independent parameters sharing one time constant.
///
/// Storage is allocated once at construction; `step` advances every
/// parameter by one sample without touching the allocator. Used for the
/// per-voice formant frequency/bandwidth tracks where four to eight values
/// move together.
pub struct SmootherBank {
    current: Vec<f32>,
    target: Vec<f32>,
    coefficient: f32,
}

impl SmootherBank {
    pub fn new(num_params: usize, time_constant: f32, sample_rate: f32) -> Self {
        Self {
            current: vec![0.0; num_params],
            target: vec![0.0; num_params],
            coefficient: coefficient_for(time_constant, sample_rate),
        }
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn set_time_constant(&mut self, time_constant: f32, sample_rate: f32) {
        self.coefficient = coefficient_for(time_constant, sample_rate);
    }

    /// Set targets for the leading `targets.len()` parameters.
    pub fn set_targets(&mut self, targets: &[f32]) {
        for (t, &v) in self.target.iter_mut().zip(targets) {
            *t = v;
        }
    }

    pub fn set_target(&mut self, index: usize, target: f32) {
        if let Some(t) = self.target.get_mut(index) {
            *t = target;
        }
    }

    /// Jump every parameter onto its target. Initialization only.
    pub fn set_targets_immediate(&mut self, targets: &[f32]) {
        self.set_targets(targets);
        self.reset();
    }

    /// Advance every parameter by one sample.
    #[inline]
    pub fn step(&mut self) {
        for (c, &t) in self.current.iter_mut().zip(self.target.iter()) {
            *c += (t - *c) * self.coefficient;
        }
    }

    #[inline]
    pub fn current(&self, index: usize) -> f32 {
        self.current[index]
    }

    pub fn reset(&mut self) {
        self.current.copy_from_slice(&self.target);
    }
}

fn coefficient_for(time_constant: f32, sample_rate: f32) -> f32 {
    if time_constant > 0.0 && sample_rate > 0.0 {
        1.0 - (-1.0 / (time_constant * sample_rate)).exp()
    } else {
        1.0 // No smoothing
    }
}
