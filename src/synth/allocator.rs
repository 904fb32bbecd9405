use log::{debug, trace};

use crate::synth::voice::VoiceRecord;

/*
Voice Allocation and Stealing
=============================

A fixed pool of voice slots with a free list for O(1) allocation. When the
pool is exhausted we steal the LOWEST-priority active voice:

    priority = velocity/127 * 50 + min(age, 100)/100 * 30      (0..=100)

Velocity dominates (a hard-struck note survives longer) and age contributes
the rest (a note that has been sounding a while has earned its place over a
brand-new quiet one). Ties go to the voice with the lowest age, i.e. the
newest claimant loses first.

Stealing is tracked in `StealingStats` so hosts can surface how hard the
pool is being pushed. A steal of a voice whose priority was above 50 counts
as "high priority stolen", a signal that the pool is undersized for the
material being played.
*/

const VELOCITY_WEIGHT: f32 = 50.0;
const AGE_WEIGHT: f32 = 30.0;
const MAX_AGE: i32 = 100;
const HIGH_PRIORITY_THRESHOLD: i32 = 50;

/// Outcome of an allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationResult {
    pub success: bool,
    pub voice_id: usize,
    pub stolen: bool,
    /// Slot id of the evicted voice, when `stolen`. Slots are reused in
    /// place, so this always equals `voice_id`; it is reported separately
    /// so hosts can correlate against their own note bookkeeping.
    pub stolen_from_id: Option<usize>,
    /// MIDI note that was evicted, when `stolen`.
    pub stolen_note: Option<u8>,
}

impl AllocationResult {
    fn failure() -> Self {
        Self {
            success: false,
            voice_id: 0,
            stolen: false,
            stolen_from_id: None,
            stolen_note: None,
        }
    }
}

/// Cumulative allocation counters since the last `reset_stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StealingStats {
    pub total_allocations: u64,
    pub stolen_voices: u64,
    pub low_priority_stolen: u64,
    pub high_priority_stolen: u64,
}

/// Fixed-pool voice allocator with priority-based stealing.
pub struct VoiceAllocator {
    voices: Vec<VoiceRecord>,
    free_ids: Vec<usize>,
    stats: StealingStats,
}

impl VoiceAllocator {
    pub fn new(max_voices: usize, sample_rate: f32) -> Self {
        let voices = (0..max_voices)
            .map(|id| VoiceRecord::new(id, sample_rate))
            .collect();
        // Pop order favors low slot ids first.
        let free_ids = (0..max_voices).rev().collect();

        Self {
            voices,
            free_ids,
            stats: StealingStats::default(),
        }
    }

    /// Claim a voice slot for the note. Steals the lowest-priority active
    /// voice when the pool is full. A note above 127 is rejected without
    /// touching the pool.
    pub fn allocate(&mut self, midi_note: u8, velocity: u8) -> AllocationResult {
        if midi_note > 127 || velocity > 127 {
            return AllocationResult::failure();
        }

        self.stats.total_allocations += 1;

        if let Some(id) = self.free_ids.pop() {
            self.voices[id].bind(midi_note, velocity, None);
            self.voices[id].priority = compute_priority(velocity, 0);
            trace!("allocated voice {} for note {}", id, midi_note);
            return AllocationResult {
                success: true,
                voice_id: id,
                stolen: false,
                stolen_from_id: None,
                stolen_note: None,
            };
        }

        // Pool full: evict the lowest-priority voice, ties to lowest age.
        let victim = match self.find_steal_victim() {
            Some(id) => id,
            None => return AllocationResult::failure(),
        };

        let victim_note = self.voices[victim].midi_note;
        let victim_priority = self.voices[victim].priority;
        self.stats.stolen_voices += 1;
        if victim_priority > HIGH_PRIORITY_THRESHOLD {
            self.stats.high_priority_stolen += 1;
        } else {
            self.stats.low_priority_stolen += 1;
        }
        debug!(
            "stealing voice {} (note {}, priority {}) for note {}",
            victim, victim_note, victim_priority, midi_note
        );

        self.voices[victim].bind(midi_note, velocity, Some(victim));
        self.voices[victim].priority = compute_priority(velocity, 0);
        AllocationResult {
            success: true,
            voice_id: victim,
            stolen: true,
            stolen_from_id: Some(victim),
            stolen_note: Some(victim_note),
        }
    }

    fn find_steal_victim(&self) -> Option<usize> {
        self.voices
            .iter()
            .filter(|v| v.active)
            .min_by_key(|v| (v.priority, v.age))
            .map(|v| v.id)
    }

    /// Begin the release phase for every active voice holding this note.
    pub fn release_note(&mut self, midi_note: u8) {
        for voice in self.voices.iter_mut() {
            if voice.active && voice.midi_note == midi_note {
                voice.release();
            }
        }
    }

    /// Return a slot to the free list. Invalid or already-free ids are
    /// ignored.
    pub fn free(&mut self, voice_id: usize) {
        let Some(voice) = self.voices.get_mut(voice_id) else {
            return;
        };
        if !voice.active {
            return;
        }
        voice.clear();
        self.free_ids.push(voice_id);
    }

    /// Immediately silence and reclaim every voice.
    pub fn reset_all(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.clear();
        }
        self.free_ids.clear();
        self.free_ids.extend((0..self.voices.len()).rev());
    }

    /// Advance ages and recompute priorities. Called once per audio block,
    /// so age is measured in blocks: a fixed +1 per call, capped at 100,
    /// rather than wall-clock time. Any steady call rate preserves the
    /// "older voice outranks newer at equal velocity" ordering.
    pub fn update_priorities(&mut self) {
        for voice in self.voices.iter_mut() {
            if !voice.active {
                continue;
            }
            voice.age = (voice.age + 1).min(MAX_AGE);
            voice.priority = compute_priority(voice.velocity, voice.age);
        }
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    pub fn max_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn voice(&self, id: usize) -> Option<&VoiceRecord> {
        self.voices.get(id)
    }

    pub fn voice_mut(&mut self, id: usize) -> Option<&mut VoiceRecord> {
        self.voices.get_mut(id)
    }

    pub fn voices(&self) -> &[VoiceRecord] {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut [VoiceRecord] {
        &mut self.voices
    }

    pub fn stats(&self) -> StealingStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = StealingStats::default();
    }
}

fn compute_priority(velocity: u8, age: i32) -> i32 {
    let velocity_term = velocity as f32 / 127.0 * VELOCITY_WEIGHT;
    let age_term = age.min(MAX_AGE) as f32 / MAX_AGE as f32 * AGE_WEIGHT;
    ((velocity_term + age_term).round() as i32).clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::voice::midi_note_to_freq;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn allocation_returns_valid_slot() {
        let mut allocator = VoiceAllocator::new(8, SAMPLE_RATE);
        let result = allocator.allocate(60, 100);

        assert!(result.success);
        assert!(result.voice_id < 8);
        assert!(!result.stolen);

        let voice = allocator.voice(result.voice_id).unwrap();
        assert!(voice.active);
        assert!((voice.frequency - midi_note_to_freq(60)).abs() < 0.01);
    }

    #[test]
    fn distinct_notes_get_distinct_slots() {
        let mut allocator = VoiceAllocator::new(8, SAMPLE_RATE);
        let mut ids = Vec::new();
        for note in 60..68 {
            let result = allocator.allocate(note, 90);
            assert!(result.success);
            ids.push(result.voice_id);
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8, "slots must be unique while the pool holds");
    }

    #[test]
    fn full_pool_steals_lowest_priority() {
        let mut allocator = VoiceAllocator::new(4, SAMPLE_RATE);

        // Fill with ascending velocities: slot of note 60 has the lowest
        // priority once ages are equal.
        allocator.allocate(60, 20);
        allocator.allocate(61, 60);
        allocator.allocate(62, 100);
        allocator.allocate(63, 127);
        allocator.update_priorities();

        let result = allocator.allocate(64, 80);
        assert!(result.success);
        assert!(result.stolen);
        assert_eq!(result.stolen_note, Some(60));
        assert_eq!(result.stolen_from_id, Some(result.voice_id));
        assert_eq!(allocator.active_voice_count(), 4);
    }

    #[test]
    fn steal_tie_breaks_toward_newest() {
        let mut allocator = VoiceAllocator::new(2, SAMPLE_RATE);

        allocator.allocate(60, 64);
        allocator.update_priorities(); // Note 60 ages by one block
        allocator.allocate(61, 64);

        let result = allocator.allocate(62, 64);
        assert!(result.stolen);
        assert_eq!(
            result.stolen_note,
            Some(61),
            "equal velocity must evict the younger voice"
        );
    }

    #[test]
    fn aging_raises_priority() {
        let mut allocator = VoiceAllocator::new(4, SAMPLE_RATE);
        let result = allocator.allocate(60, 64);
        let before = allocator.voice(result.voice_id).unwrap().priority;

        for _ in 0..50 {
            allocator.update_priorities();
        }
        let after = allocator.voice(result.voice_id).unwrap().priority;
        assert!(after > before);
        assert!(after <= 100);
    }

    #[test]
    fn age_and_priority_are_capped() {
        let mut allocator = VoiceAllocator::new(1, SAMPLE_RATE);
        let result = allocator.allocate(60, 127);
        for _ in 0..500 {
            allocator.update_priorities();
        }
        let voice = allocator.voice(result.voice_id).unwrap();
        assert_eq!(voice.age, 100);
        assert!(voice.priority <= 100);
    }

    #[test]
    fn free_returns_slot_to_pool() {
        let mut allocator = VoiceAllocator::new(2, SAMPLE_RATE);
        let a = allocator.allocate(60, 90);
        allocator.allocate(61, 90);
        assert_eq!(allocator.active_voice_count(), 2);

        allocator.free(a.voice_id);
        assert_eq!(allocator.active_voice_count(), 1);

        let again = allocator.allocate(62, 90);
        assert!(again.success);
        assert!(!again.stolen, "freed slot should be reused without stealing");
    }

    #[test]
    fn free_ignores_invalid_and_inactive_ids() {
        let mut allocator = VoiceAllocator::new(2, SAMPLE_RATE);
        allocator.free(99);
        allocator.free(0); // Never allocated
        assert_eq!(allocator.active_voice_count(), 0);

        // Double free must not corrupt the free list.
        let result = allocator.allocate(60, 90);
        allocator.free(result.voice_id);
        allocator.free(result.voice_id);
        allocator.allocate(61, 90);
        allocator.allocate(62, 90);
        assert_eq!(allocator.active_voice_count(), 2);
    }

    #[test]
    fn out_of_range_inputs_are_rejected() {
        let mut allocator = VoiceAllocator::new(2, SAMPLE_RATE);
        assert!(!allocator.allocate(200, 90).success);
        assert!(!allocator.allocate(60, 200).success);
        assert_eq!(allocator.active_voice_count(), 0);
        assert_eq!(allocator.stats().total_allocations, 0);
    }

    #[test]
    fn stats_track_steals() {
        let mut allocator = VoiceAllocator::new(2, SAMPLE_RATE);
        allocator.allocate(60, 10);
        allocator.allocate(61, 10);
        allocator.allocate(62, 10); // Steal

        let stats = allocator.stats();
        assert_eq!(stats.total_allocations, 3);
        assert_eq!(stats.stolen_voices, 1);
        assert_eq!(stats.low_priority_stolen, 1);
        assert_eq!(stats.high_priority_stolen, 0);

        allocator.reset_stats();
        assert_eq!(allocator.stats(), StealingStats::default());
    }

    #[test]
    fn stealing_high_priority_is_counted_separately() {
        let mut allocator = VoiceAllocator::new(1, SAMPLE_RATE);
        allocator.allocate(60, 127);
        for _ in 0..100 {
            allocator.update_priorities();
        }
        allocator.allocate(61, 127);
        assert_eq!(allocator.stats().high_priority_stolen, 1);
    }

    #[test]
    fn reset_all_reclaims_everything() {
        let mut allocator = VoiceAllocator::new(4, SAMPLE_RATE);
        for note in 60..64 {
            allocator.allocate(note, 90);
        }
        allocator.reset_all();
        assert_eq!(allocator.active_voice_count(), 0);

        for note in 60..64 {
            assert!(!allocator.allocate(note, 90).stolen);
        }
    }
}
