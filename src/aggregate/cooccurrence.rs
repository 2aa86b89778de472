// Proximity-window co-occurrence counting.
//
// A location mention is associated with every distinct person who has a
// mention inside the window around it:
//
//   place_pos - before  <=  person_pos  <=  place_pos + after
//
// Distances are in characters. The window may be asymmetric: people usually
// precede the places they are linked to ("Alice flew to Paris"), so the
// default reaches further back than forward.
//
// Counting rules:
//   - a person's count is the number of their PERSON mentions
//   - a place's count under a person is the number of that place's mentions
//     that had at least one of the person's mentions inside the window
//     (two nearby mentions of the same person still count the place once)
//
// People are reported in order of first mention, places in order of first
// association. Equal positions keep input order.

use std::collections::HashMap;

use thiserror::Error;

use super::models::{PersonRecord, PlaceRecord};
use crate::entities::{EntityCategory, Occurrence};

/// Character-distance window around a location mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityWindow {
    /// How far before the place a person mention may start.
    pub before: usize,
    /// How far after the place a person mention may start.
    pub after: usize,
}

impl ProximityWindow {
    pub const fn new(before: usize, after: usize) -> Self {
        Self { before, after }
    }

    pub const fn symmetric(radius: usize) -> Self {
        Self::new(radius, radius)
    }

    /// Only people mentioned up to `radius` characters before the place (or
    /// at the same offset).
    pub const fn preceding(radius: usize) -> Self {
        Self::new(radius, 0)
    }

    /// Inclusive range of person positions associated with a place at `position`.
    pub fn bounds(&self, position: usize) -> (usize, usize) {
        (
            position.saturating_sub(self.before),
            position.saturating_add(self.after),
        )
    }
}

impl Default for ProximityWindow {
    fn default() -> Self {
        Self::new(150, 50)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("occurrence {index} has a blank name")]
    BlankName { index: usize },
}

/// Aggregate occurrences into per-person records.
///
/// Every occurrence is validated before anything is counted, so a malformed
/// input never produces a partial result.
pub fn aggregate(
    occurrences: &[Occurrence],
    window: ProximityWindow,
) -> Result<Vec<PersonRecord>, AggregateError> {
    for (index, occurrence) in occurrences.iter().enumerate() {
        if occurrence.name.trim().is_empty() {
            return Err(AggregateError::BlankName { index });
        }
    }

    let mut ordered: Vec<&Occurrence> = occurrences.iter().collect();
    ordered.sort_by_key(|o| o.position);

    // Pass over people: counts, first-mention order, sorted positions
    let mut people: Vec<PersonRecord> = Vec::new();
    let mut person_slots: HashMap<&str, usize> = HashMap::new();
    let mut person_mentions: Vec<(usize, usize)> = Vec::new(); // (position, slot)

    for occurrence in ordered
        .iter()
        .filter(|o| o.category == EntityCategory::Person)
    {
        let name = occurrence.name.trim();
        let slot = *person_slots.entry(name).or_insert_with(|| {
            people.push(PersonRecord::new(name));
            people.len() - 1
        });
        people[slot].count += 1;
        person_mentions.push((occurrence.position, slot));
    }

    if people.is_empty() {
        return Ok(Vec::new());
    }

    // Per-person place index, parallel to `people`
    let mut place_slots: Vec<HashMap<String, usize>> = vec![HashMap::new(); people.len()];
    let mut nearby: Vec<usize> = Vec::new();

    for occurrence in ordered
        .iter()
        .filter(|o| o.category == EntityCategory::Location)
    {
        let (low, high) = window.bounds(occurrence.position);
        let first = person_mentions.partition_point(|(pos, _)| *pos < low);

        nearby.clear();
        for &(_, slot) in person_mentions[first..]
            .iter()
            .take_while(|(pos, _)| *pos <= high)
        {
            if !nearby.contains(&slot) {
                nearby.push(slot);
            }
        }

        let place = occurrence.name.trim();
        for &slot in &nearby {
            let person = &mut people[slot];
            match place_slots[slot].get(place) {
                Some(&idx) => person.associated_places[idx].count += 1,
                None => {
                    place_slots[slot].insert(place.to_string(), person.associated_places.len());
                    person.associated_places.push(PlaceRecord {
                        name: place.to_string(),
                        count: 1,
                    });
                }
            }
        }
    }

    Ok(people)
}
