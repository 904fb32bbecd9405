use crate::MIN_TIME;

/*
ADSR Envelope
=============

Linear attack/decay/sustain/release envelope, one per voice slot. The
stage machine:

    Idle --note_on--> Attack --level=1--> Decay --level=S--> Sustain
                         |                   |                  |
                         +------- note_off (from any stage) ----+
                                             |
                                             v
                                          Release --level=0--> Idle

note_off triggers Release from ANY stage, and Release always starts from
the current level rather than the sustain level; that is what keeps an
early release click-free. Release completion is what tells the allocator a
voice slot can be reclaimed (see `synth::voice`).
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,
    sample_rate: f32,

    stage: EnvelopeStage,
    level: f32,

    // Release interpolates from a snapshot so it hits exactly 0.
    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32, sample_rate: f32) -> Self {
        Self {
            attack_time: attack.max(MIN_TIME),
            decay_time: decay.max(MIN_TIME),
            sustain_level: sustain.clamp(0.0, 1.0),
            release_time: release.max(MIN_TIME),
            sample_rate,
            stage: EnvelopeStage::Idle,
            level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        }
    }

    pub fn set_attack(&mut self, attack: f32) {
        self.attack_time = attack.max(MIN_TIME);
    }

    pub fn set_release(&mut self, release: f32) {
        self.release_time = release.max(MIN_TIME);
    }

    /// Gate high: restart the attack from zero for a clean retrigger.
    pub fn note_on(&mut self) {
        self.level = 0.0;
        self.stage = EnvelopeStage::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: release from the current level.
    pub fn note_off(&mut self) {
        if self.stage == EnvelopeStage::Idle {
            return;
        }

        self.release_start_level = self.level;
        self.release_total_samples = (self.release_time * self.sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeStage::Release;
    }

    /// Advance one sample and return the new level.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => {
                self.level = 0.0;
            }
            EnvelopeStage::Attack => {
                self.level += 1.0 / (self.attack_time * self.sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = EnvelopeStage::Decay;
                }
            }
            EnvelopeStage::Decay => {
                let drop = 1.0 - self.sustain_level;
                self.level -= drop / (self.decay_time * self.sample_rate);
                if self.level <= self.sustain_level {
                    self.level = self.sustain_level;
                    self.stage = EnvelopeStage::Sustain;
                }
            }
            EnvelopeStage::Sustain => {
                self.level = self.sustain_level;
            }
            EnvelopeStage::Release => {
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);
                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);

                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeStage::Idle;
        self.level = 0.0;
        self.release_start_level = 0.0;
        self.release_elapsed_samples = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn advance(env: &mut Envelope, samples: usize) {
        for _ in 0..samples {
            env.next_sample();
        }
    }

    #[test]
    fn attack_reaches_full_level() {
        let mut env = Envelope::new(0.01, 0.1, 0.7, 0.2, SAMPLE_RATE);
        env.note_on();
        advance(&mut env, (0.01 * SAMPLE_RATE) as usize + 1);

        assert!(env.level() > 0.99, "attack should reach full level");
        assert_ne!(env.stage(), EnvelopeStage::Attack);
    }

    #[test]
    fn sustain_holds_target_level() {
        let sustain = 0.6;
        let mut env = Envelope::new(0.01, 0.05, sustain, 0.2, SAMPLE_RATE);
        env.note_on();
        advance(&mut env, ((0.01 + 0.05) * SAMPLE_RATE) as usize + 5);

        assert_eq!(env.stage(), EnvelopeStage::Sustain);
        assert!((env.level() - sustain).abs() < 0.05);
    }

    #[test]
    fn release_falls_back_to_idle() {
        let release = 0.03;
        let mut env = Envelope::new(0.01, 0.05, 0.5, release, SAMPLE_RATE);
        env.note_on();
        advance(&mut env, (0.02 * SAMPLE_RATE) as usize);

        env.note_off();
        advance(&mut env, (release * SAMPLE_RATE) as usize + 2);

        assert_eq!(env.level(), 0.0);
        assert_eq!(env.stage(), EnvelopeStage::Idle);
        assert!(!env.is_active());
    }

    #[test]
    fn release_from_attack_starts_at_current_level() {
        let mut env = Envelope::new(0.1, 0.05, 0.5, 0.05, SAMPLE_RATE);
        env.note_on();
        advance(&mut env, 20); // Partway through the attack
        let level_before = env.level();
        assert!(level_before < 1.0);

        env.note_off();
        let level_after = env.next_sample();
        assert!(
            (level_after - level_before).abs() < 0.1,
            "release must start from current level, not sustain"
        );
    }
}
