//! Low-level DSP primitives used by the synthesis methods.
//!
//! These components are allocation-free and realtime-safe once constructed,
//! making them safe to embed directly inside voice channels. They stay
//! focused on the signal-processing math; orchestration and voice binding
//! live in `synth` and `engine`.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// Glottal pulse train and deterministic noise excitation.
pub mod excitation;
/// Formant bandpass resonator (biquad).
pub mod resonator;
/// Exponential parameter smoothing, single and batched.
pub mod smoother;
/// Overlap-add spectral envelope enhancement.
pub mod spectral;
/// Phase-locked-loop subharmonic oscillator.
pub mod subharmonic;

pub use envelope::EnvelopeStage;
