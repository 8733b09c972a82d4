use std::collections::HashMap;

use serde::Serialize;

use crate::{MetronomeError, Result};

/// Equal-tempered pitches (A4 = 440 Hz) for the three octaves a guitar tuner
/// needs. Flat spellings alias the sharp entry of the same pitch.
const STANDARD_PITCHES: &[(&str, &str, f64)] = &[
    ("C2", "", 65.406),
    ("C#2", "Db2", 69.296),
    ("D2", "", 73.416),
    ("D#2", "Eb2", 77.782),
    ("E2", "", 82.407),
    ("F2", "", 87.307),
    ("F#2", "Gb2", 92.499),
    ("G2", "", 97.999),
    ("G#2", "Ab2", 103.826),
    ("A2", "", 110.0),
    ("A#2", "Bb2", 116.541),
    ("B2", "", 123.471),
    ("C3", "", 130.813),
    ("C#3", "Db3", 138.591),
    ("D3", "", 146.832),
    ("D#3", "Eb3", 155.563),
    ("E3", "", 164.814),
    ("F3", "", 174.614),
    ("F#3", "Gb3", 184.997),
    ("G3", "", 195.998),
    ("G#3", "Ab3", 207.652),
    ("A3", "", 220.0),
    ("A#3", "Bb3", 233.082),
    ("B3", "", 246.942),
    ("C4", "", 261.626),
    ("C#4", "Db4", 277.183),
    ("D4", "", 293.665),
    ("D#4", "Eb4", 311.127),
    ("E4", "", 329.628),
    ("F4", "", 349.228),
    ("F#4", "Gb4", 369.994),
    ("G4", "", 391.995),
    ("G#4", "Ab4", 415.305),
    ("A4", "", 440.0),
    ("A#4", "Bb4", 466.164),
    ("B4", "", 493.883),
];

/// Number of strings every tuning set covers.
pub const STRINGS: usize = 6;

/// Immutable note name to frequency mapping.
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    frequencies: HashMap<&'static str, f64>,
}

impl FrequencyTable {
    pub fn standard() -> Self {
        let mut frequencies = HashMap::with_capacity(STANDARD_PITCHES.len() * 2);
        for &(sharp, flat, hz) in STANDARD_PITCHES {
            frequencies.insert(sharp, hz);
            if !flat.is_empty() {
                frequencies.insert(flat, hz);
            }
        }
        Self { frequencies }
    }

    pub fn get(&self, note: &str) -> Option<f64> {
        self.frequencies.get(note).copied()
    }

    /// Like [`FrequencyTable::get`] but reports unknown names as errors.
    pub fn frequency(&self, note: &str) -> Result<f64> {
        self.get(note)
            .ok_or_else(|| MetronomeError::UnknownNote(note.to_string()))
    }

    pub fn contains(&self, note: &str) -> bool {
        self.frequencies.contains_key(note)
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Named set of six note names, low string to high string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TuningSet {
    pub name: &'static str,
    pub notes: [&'static str; STRINGS],
}

impl TuningSet {
    pub const REGULAR: TuningSet = TuningSet {
        name: "regular",
        notes: ["E2", "A2", "D3", "G3", "B3", "E4"],
    };

    pub const HALF_DOWN: TuningSet = TuningSet {
        name: "half-down",
        notes: ["Eb2", "Ab2", "Db3", "Gb3", "Bb3", "Eb4"],
    };

    pub fn all() -> [TuningSet; 2] {
        [Self::REGULAR, Self::HALF_DOWN]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tuning_note_is_in_the_table() {
        let table = FrequencyTable::standard();
        for set in TuningSet::all() {
            for note in set.notes {
                assert!(table.contains(note), "{note} missing from {}", set.name);
            }
        }
    }

    #[test]
    fn flats_alias_sharps() {
        let table = FrequencyTable::standard();
        assert_eq!(table.get("Eb2"), table.get("D#2"));
        assert_eq!(table.get("Bb3"), table.get("A#3"));
        assert_eq!(table.get("A2"), Some(110.0));
    }

    #[test]
    fn half_down_is_a_semitone_below_regular() {
        let table = FrequencyTable::standard();
        let semitone = 2f64.powf(1.0 / 12.0);
        for (low, high) in TuningSet::HALF_DOWN.notes.iter().zip(TuningSet::REGULAR.notes) {
            let ratio = table.get(high).unwrap() / table.get(low).unwrap();
            assert!((ratio - semitone).abs() < 1e-4, "{low} -> {high}: {ratio}");
        }
    }

    #[test]
    fn unknown_note_is_an_error() {
        let table = FrequencyTable::standard();
        let err = table.frequency("H2").unwrap_err();
        assert!(matches!(err, MetronomeError::UnknownNote(ref n) if n == "H2"));
    }
}
