//! Overloads the voice pool on purpose and prints the stealing stats.
//!
//! Run with: cargo run --example steal_demo

use vox_dsp::engine::{EngineConfig, VoxEngine};
use vox_dsp::synth::SynthMethodKind;

const SAMPLE_RATE: f32 = 48_000.0;
const BLOCK_SIZE: usize = 512;

fn main() {
    env_logger::init();

    let mut engine = VoxEngine::new(EngineConfig {
        sample_rate: SAMPLE_RATE,
        max_voices: 8,
        method: SynthMethodKind::Formant,
        fft_size: 512,
    })
    .expect("valid config");

    let mut left = vec![0.0f32; BLOCK_SIZE];
    let mut right = vec![0.0f32; BLOCK_SIZE];

    // Fire 24 notes at an 8-voice pool, soft notes first so they become
    // steal victims as louder material arrives.
    for wave in 0..3u8 {
        let velocity = 40 + wave * 40;
        for i in 0..8u8 {
            let note = 40 + wave * 8 + i;
            engine.note_on(note, velocity);
            engine.process_block(&mut left, &mut right);
        }
        let stats = engine.stats();
        println!(
            "after wave {} (velocity {:>3}): active={} allocations={} stolen={}",
            wave + 1,
            velocity,
            stats.active_voices,
            stats.total_allocations,
            stats.stolen_voices
        );
    }
}
