//! Renders a short choir phrase offline and prints per-phoneme loudness.
//!
//! Run with: cargo run --example choir_demo

use vox_dsp::engine::{EngineConfig, VoxEngine};
use vox_dsp::synth::SynthMethodKind;

const SAMPLE_RATE: f32 = 48_000.0;
const BLOCK_SIZE: usize = 512;

fn main() {
    env_logger::init();

    let mut engine = VoxEngine::new(EngineConfig {
        sample_rate: SAMPLE_RATE,
        max_voices: 16,
        method: SynthMethodKind::Formant,
        fft_size: 1_024,
    })
    .expect("valid config");

    engine.set_gain(0.7);
    engine.set_vibrato(5.5, 0.015);

    // A minor chord, choir-style.
    for &(note, velocity) in &[(45u8, 100u8), (52, 95), (57, 90), (60, 85)] {
        engine.note_on(note, velocity);
    }

    // "ah - oo - ee - eh", half a second each, with a stressed opening.
    let phrase = [("ɑ", true), ("u", false), ("i", false), ("ɛ", false)];
    for (symbol, stressed) in phrase {
        assert!(engine.queue_phoneme_symbol(symbol, 0.5, None, stressed));
    }

    let mut left = vec![0.0f32; BLOCK_SIZE];
    let mut right = vec![0.0f32; BLOCK_SIZE];

    let blocks_per_phoneme = (0.5 * SAMPLE_RATE) as usize / BLOCK_SIZE;
    for (symbol, _) in phrase {
        let mut energy = 0.0f64;
        let mut samples = 0usize;
        for _ in 0..blocks_per_phoneme {
            engine.process_block(&mut left, &mut right);
            for &s in left.iter() {
                energy += (s as f64) * (s as f64);
            }
            samples += BLOCK_SIZE;
        }
        let rms = (energy / samples as f64).sqrt();
        println!("{symbol:>2}  rms = {rms:.4}");
    }

    let stats = engine.stats();
    println!(
        "voices active: {}, allocations: {}, stolen: {}",
        stats.active_voices, stats.total_allocations, stats.stolen_voices
    );
}
