// Voice lifecycle and synthesis method dispatch.
// This layer sits between the DSP primitives and the engine.

pub mod allocator;
pub mod diphone;
pub mod formant;
pub mod method;
pub mod subharmonic;
pub mod voice;

pub use allocator::{AllocationResult, StealingStats, VoiceAllocator};
pub use method::{SynthMethod, SynthMethodKind, SynthesisResult};
pub use voice::VoiceRecord;
