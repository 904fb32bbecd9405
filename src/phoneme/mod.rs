//! Immutable phoneme data model.
//!
//! Phonemes are loaded once (from host-supplied records or the builtin
//! inventory) and only ever borrowed by the synthesis methods during a
//! call. The core mandates no persistence format; the optional `serde`
//! feature derives the traits a host needs to load inventories from JSON
//! or anything else.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Audible range sanity bounds for formant validation.
const MIN_FORMANT_HZ: f32 = 50.0;
const MAX_FORMANT_HZ: f32 = 20_000.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhonemeCategory {
    Vowel,
    Consonant,
    /// Sustained vocal drone (throat-singing material).
    Drone,
    /// Phoneme whose identity lives in its subharmonic content.
    Subharmonic,
}

/// Four-formant model: F1-F4 center frequencies with their bandwidths.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormantData {
    pub frequencies: [f32; 4],
    pub bandwidths: [f32; 4],
}

impl FormantData {
    pub const fn new(frequencies: [f32; 4], bandwidths: [f32; 4]) -> Self {
        Self {
            frequencies,
            bandwidths,
        }
    }
}

/// One phoneme record. Immutable after inventory construction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Phoneme {
    /// Stable index into the inventory.
    pub id: u16,
    /// IPA symbol, the lookup key.
    pub symbol: String,
    pub category: PhonemeCategory,
    pub voiced: bool,
    pub formants: FormantData,
    /// Subharmonic divisor expressed as a ratio (0.5 = octave down).
    pub subharmonic_ratio: f32,
    /// Mix level of the subharmonic component, 0..1.
    pub subharmonic_amplitude: f32,
}

#[derive(Debug, Error)]
pub enum PhonemeError {
    #[error("inventory contains no phonemes")]
    Empty,
    #[error("duplicate phoneme symbol {0:?}")]
    DuplicateSymbol(String),
    #[error("phoneme {symbol:?}: {detail}")]
    InvalidRecord { symbol: String, detail: String },
}

/// Validated, immutable phoneme collection with lookup by symbol or id.
pub struct PhonemeInventory {
    phonemes: Vec<Phoneme>,
    by_symbol: HashMap<String, u16>,
}

impl PhonemeInventory {
    /// Build an inventory from host-supplied records. Ids are reassigned
    /// to match inventory order so they stay dense and stable.
    pub fn from_records(records: Vec<Phoneme>) -> Result<Self, PhonemeError> {
        if records.is_empty() {
            return Err(PhonemeError::Empty);
        }

        let mut phonemes = Vec::with_capacity(records.len());
        let mut by_symbol = HashMap::with_capacity(records.len());

        for (index, mut phoneme) in records.into_iter().enumerate() {
            validate(&phoneme)?;
            phoneme.id = index as u16;
            if by_symbol
                .insert(phoneme.symbol.clone(), phoneme.id)
                .is_some()
            {
                return Err(PhonemeError::DuplicateSymbol(phoneme.symbol));
            }
            phonemes.push(phoneme);
        }

        log::debug!("phoneme inventory loaded: {} records", phonemes.len());
        Ok(Self {
            phonemes,
            by_symbol,
        })
    }

    /// The builtin inventory: Peterson & Barney (1952) adult-male vowel
    /// formants plus a small consonant and drone set. Enough to drive the
    /// engine without any external data.
    pub fn builtin() -> Self {
        Self::from_records(builtin_records()).expect("builtin inventory is valid")
    }

    pub fn lookup(&self, symbol: &str) -> Option<&Phoneme> {
        self.by_symbol
            .get(symbol)
            .map(|&id| &self.phonemes[id as usize])
    }

    pub fn by_id(&self, id: u16) -> Option<&Phoneme> {
        self.phonemes.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.phonemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phonemes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Phoneme> {
        self.phonemes.iter()
    }
}

fn validate(phoneme: &Phoneme) -> Result<(), PhonemeError> {
    let invalid = |detail: String| PhonemeError::InvalidRecord {
        symbol: phoneme.symbol.clone(),
        detail,
    };

    if phoneme.symbol.is_empty() {
        return Err(invalid("empty symbol".into()));
    }
    for (i, &f) in phoneme.formants.frequencies.iter().enumerate() {
        if !(MIN_FORMANT_HZ..=MAX_FORMANT_HZ).contains(&f) {
            return Err(invalid(format!("formant F{} out of range: {} Hz", i + 1, f)));
        }
    }
    for (i, &bw) in phoneme.formants.bandwidths.iter().enumerate() {
        if bw <= 0.0 || bw > 4_000.0 {
            return Err(invalid(format!("bandwidth B{} out of range: {} Hz", i + 1, bw)));
        }
    }
    if !(0.0..=1.0).contains(&phoneme.subharmonic_ratio) {
        return Err(invalid(format!(
            "subharmonic ratio out of range: {}",
            phoneme.subharmonic_ratio
        )));
    }
    if !(0.0..=1.0).contains(&phoneme.subharmonic_amplitude) {
        return Err(invalid(format!(
            "subharmonic amplitude out of range: {}",
            phoneme.subharmonic_amplitude
        )));
    }
    Ok(())
}

fn record(
    symbol: &str,
    category: PhonemeCategory,
    voiced: bool,
    frequencies: [f32; 4],
    bandwidths: [f32; 4],
    subharmonic_ratio: f32,
    subharmonic_amplitude: f32,
) -> Phoneme {
    Phoneme {
        id: 0, // Reassigned by from_records
        symbol: symbol.into(),
        category,
        voiced,
        formants: FormantData::new(frequencies, bandwidths),
        subharmonic_ratio,
        subharmonic_amplitude,
    }
}

fn builtin_records() -> Vec<Phoneme> {
    use PhonemeCategory::*;

    vec![
        // Vowels: Peterson & Barney adult male averages, F4 extrapolated.
        record("i", Vowel, true, [270.0, 2290.0, 3010.0, 3700.0], [60.0, 90.0, 100.0, 120.0], 0.5, 0.0),
        record("ɪ", Vowel, true, [390.0, 1990.0, 2550.0, 3600.0], [60.0, 90.0, 100.0, 120.0], 0.5, 0.0),
        record("ɛ", Vowel, true, [530.0, 1840.0, 2480.0, 3500.0], [60.0, 90.0, 100.0, 120.0], 0.5, 0.0),
        record("æ", Vowel, true, [660.0, 1720.0, 2410.0, 3500.0], [70.0, 100.0, 120.0, 130.0], 0.5, 0.0),
        record("ɑ", Vowel, true, [730.0, 1090.0, 2440.0, 3500.0], [70.0, 100.0, 120.0, 130.0], 0.5, 0.0),
        record("ɔ", Vowel, true, [570.0, 840.0, 2410.0, 3400.0], [70.0, 100.0, 120.0, 130.0], 0.5, 0.0),
        record("ʊ", Vowel, true, [440.0, 1020.0, 2240.0, 3400.0], [60.0, 90.0, 110.0, 130.0], 0.5, 0.0),
        record("u", Vowel, true, [300.0, 870.0, 2240.0, 3300.0], [60.0, 90.0, 110.0, 130.0], 0.5, 0.0),
        record("ʌ", Vowel, true, [640.0, 1190.0, 2390.0, 3400.0], [70.0, 100.0, 120.0, 130.0], 0.5, 0.0),
        record("ə", Vowel, true, [500.0, 1500.0, 2500.0, 3500.0], [70.0, 100.0, 120.0, 130.0], 0.5, 0.0),
        // Consonants: broad-band targets, mostly noise-excited.
        record("s", Consonant, false, [5_000.0, 6_000.0, 7_000.0, 8_000.0], [1_000.0, 1_000.0, 1_000.0, 1_000.0], 0.5, 0.0),
        record("z", Consonant, true, [5_000.0, 6_000.0, 7_000.0, 8_000.0], [1_000.0, 1_000.0, 1_000.0, 1_000.0], 0.5, 0.0),
        record("f", Consonant, false, [4_000.0, 5_500.0, 7_000.0, 8_500.0], [1_200.0, 1_200.0, 1_200.0, 1_200.0], 0.5, 0.0),
        record("m", Consonant, true, [250.0, 1_200.0, 2_400.0, 3_300.0], [80.0, 150.0, 200.0, 250.0], 0.5, 0.0),
        record("n", Consonant, true, [280.0, 1_700.0, 2_600.0, 3_400.0], [80.0, 150.0, 200.0, 250.0], 0.5, 0.0),
        record("h", Consonant, false, [500.0, 1_500.0, 2_500.0, 3_500.0], [400.0, 500.0, 600.0, 700.0], 0.5, 0.0),
        // Drones for subharmonic synthesis.
        record("ō", Drone, true, [450.0, 800.0, 2_400.0, 3_300.0], [70.0, 100.0, 120.0, 130.0], 0.5, 0.6),
        record("ū", Drone, true, [300.0, 870.0, 2_240.0, 3_300.0], [60.0, 90.0, 110.0, 130.0], 0.5, 0.7),
    ]
}
