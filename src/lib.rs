pub mod dsp;
pub mod engine; // Phoneme events in, stereo blocks out
pub mod phoneme; // Immutable phoneme/formant data model
pub mod synth; // Voice pool, allocation, synthesis methods

/// Largest block `process_block` accepts; all scratch buffers are sized to this.
pub const MAX_BLOCK_SIZE: usize = 2048;
/// Fixed voice pool capacity.
pub const MAX_VOICES: usize = 60;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
