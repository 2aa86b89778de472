// Unit tests for co-occurrence aggregation.
//
// Covers the counting invariants, window semantics, ordering guarantees and
// validation: all pure, no network.

use std::collections::HashMap;

use dramatis::aggregate::{aggregate, AggregateError, PersonRecord, ProximityWindow};
use dramatis::entities::{EntityCategory, Occurrence};

fn person<'a>(people: &'a [PersonRecord], name: &str) -> &'a PersonRecord {
    people
        .iter()
        .find(|p| p.name == name)
        .unwrap_or_else(|| panic!("{name} missing from {people:?}"))
}

/// A longer mixed sequence used by the invariant tests.
fn sample_sequence() -> Vec<Occurrence> {
    vec![
        Occurrence::person("Alice", 0),
        Occurrence::location("Paris", 12),
        Occurrence::person("Bob", 20),
        Occurrence::person("Alice", 25),
        Occurrence::location("Paris", 30),
        Occurrence::location("Rome", 41),
        Occurrence::person("Carol", 90),
        Occurrence::location("Oslo", 95),
        Occurrence::location("Paris", 200),
        Occurrence::person("Bob", 210),
        Occurrence::location("Rome", 212),
    ]
}

// ============================================================
// Worked example and edge cases
// ============================================================

#[test]
fn example_has_no_cross_association() {
    let occs = vec![
        Occurrence::person("Alice", 0),
        Occurrence::location("Paris", 5),
        Occurrence::person("Bob", 10),
        Occurrence::location("Rome", 12),
    ];
    let people = aggregate(&occs, ProximityWindow::preceding(6)).unwrap();

    assert_eq!(people.len(), 2);
    let alice = person(&people, "Alice");
    assert_eq!(alice.count, 1);
    assert_eq!(alice.associated_places.len(), 1);
    assert_eq!(alice.place("Paris").unwrap().count, 1);

    let bob = person(&people, "Bob");
    assert_eq!(bob.count, 1);
    assert_eq!(bob.associated_places.len(), 1);
    assert_eq!(bob.place("Rome").unwrap().count, 1);
}

#[test]
fn symmetric_window_reaches_forward() {
    // Same input, but a symmetric window also pairs Paris (5) with Bob (10)
    let occs = vec![
        Occurrence::person("Alice", 0),
        Occurrence::location("Paris", 5),
        Occurrence::person("Bob", 10),
        Occurrence::location("Rome", 12),
    ];
    let people = aggregate(&occs, ProximityWindow::symmetric(6)).unwrap();

    let bob = person(&people, "Bob");
    assert_eq!(bob.place("Paris").map(|p| p.count), Some(1));
    assert_eq!(bob.place("Rome").map(|p| p.count), Some(1));
    // Rome is 12 away from Alice: still outside
    assert!(person(&people, "Alice").place("Rome").is_none());
}

#[test]
fn empty_input_yields_empty_result() {
    let people = aggregate(&[], ProximityWindow::default()).unwrap();
    assert!(people.is_empty());
}

#[test]
fn only_locations_yields_empty_result() {
    let occs = vec![
        Occurrence::location("Paris", 0),
        Occurrence::location("Rome", 10),
    ];
    let people = aggregate(&occs, ProximityWindow::default()).unwrap();
    assert!(people.is_empty());
}

#[test]
fn location_outside_window_contributes_nothing() {
    let occs = vec![
        Occurrence::person("Alice", 0),
        Occurrence::location("Paris", 500),
    ];
    let people = aggregate(&occs, ProximityWindow::symmetric(100)).unwrap();
    assert_eq!(people.len(), 1);
    assert!(people[0].associated_places.is_empty());
}

#[test]
fn window_edges_are_inclusive() {
    let occs = vec![
        Occurrence::person("Alice", 0),
        Occurrence::location("Paris", 10),
        Occurrence::person("Bob", 15),
    ];
    let people = aggregate(&occs, ProximityWindow::new(10, 5)).unwrap();
    assert!(person(&people, "Alice").place("Paris").is_some());
    assert!(person(&people, "Bob").place("Paris").is_some());
}

#[test]
fn person_without_nearby_place_still_listed() {
    let occs = vec![Occurrence::person("Alice", 0)];
    let people = aggregate(&occs, ProximityWindow::default()).unwrap();
    assert_eq!(
        people,
        vec![PersonRecord {
            name: "Alice".to_string(),
            count: 1,
            associated_places: vec![],
        }]
    );
}

#[test]
fn place_near_two_mentions_of_same_person_counts_once() {
    let occs = vec![
        Occurrence::person("Alice", 0),
        Occurrence::person("Alice", 4),
        Occurrence::location("Paris", 8),
    ];
    let people = aggregate(&occs, ProximityWindow::symmetric(10)).unwrap();
    assert_eq!(people[0].count, 2);
    assert_eq!(people[0].place("Paris").unwrap().count, 1);
}

#[test]
fn place_counts_accumulate_across_mentions() {
    let occs = vec![
        Occurrence::person("Alice", 0),
        Occurrence::location("Paris", 5),
        Occurrence::location("Paris", 9),
        Occurrence::person("Alice", 300),
        Occurrence::location("Paris", 305),
    ];
    let people = aggregate(&occs, ProximityWindow::preceding(20)).unwrap();
    assert_eq!(people[0].place("Paris").unwrap().count, 3);
}

#[test]
fn names_match_exactly_after_trimming() {
    let occs = vec![
        Occurrence::person("Alice", 0),
        Occurrence::person(" Alice ", 10),
        Occurrence::person("alice", 20),
    ];
    let people = aggregate(&occs, ProximityWindow::default()).unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(person(&people, "Alice").count, 2);
    assert_eq!(person(&people, "alice").count, 1);
}

// ============================================================
// Ordering
// ============================================================

#[test]
fn people_ordered_by_first_mention() {
    let occs = vec![
        Occurrence::person("Carol", 50),
        Occurrence::person("Alice", 0),
        Occurrence::person("Bob", 20),
        Occurrence::person("Alice", 60),
    ];
    let people = aggregate(&occs, ProximityWindow::default()).unwrap();
    let names: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
}

#[test]
fn equal_positions_keep_input_order() {
    let occs = vec![
        Occurrence::person("Zed", 5),
        Occurrence::person("Amy", 5),
    ];
    let people = aggregate(&occs, ProximityWindow::default()).unwrap();
    assert_eq!(people[0].name, "Zed");
    assert_eq!(people[1].name, "Amy");
}

#[test]
fn places_ordered_by_first_association() {
    let occs = vec![
        Occurrence::person("Alice", 0),
        Occurrence::location("Rome", 5),
        Occurrence::location("Paris", 7),
        Occurrence::location("Rome", 9),
    ];
    let people = aggregate(&occs, ProximityWindow::preceding(20)).unwrap();
    let places: Vec<(&str, u32)> = people[0]
        .associated_places
        .iter()
        .map(|p| (p.name.as_str(), p.count))
        .collect();
    assert_eq!(places, vec![("Rome", 2), ("Paris", 1)]);
}

#[test]
fn unsorted_input_is_handled() {
    let occs = vec![
        Occurrence::location("Rome", 12),
        Occurrence::person("Bob", 10),
        Occurrence::location("Paris", 5),
        Occurrence::person("Alice", 0),
    ];
    let people = aggregate(&occs, ProximityWindow::preceding(6)).unwrap();
    assert_eq!(people[0].name, "Alice");
    assert!(people[0].place("Paris").is_some());
    assert!(people[1].place("Rome").is_some());
}

// ============================================================
// Validation
// ============================================================

#[test]
fn blank_name_is_rejected() {
    let occs = vec![
        Occurrence::person("Alice", 0),
        Occurrence::location("   ", 5),
    ];
    let err = aggregate(&occs, ProximityWindow::default()).unwrap_err();
    assert_eq!(err, AggregateError::BlankName { index: 1 });
}

#[test]
fn blank_name_rejected_even_after_valid_records() {
    let mut occs = sample_sequence();
    occs.push(Occurrence::person("", 999));
    assert!(aggregate(&occs, ProximityWindow::default()).is_err());
}

// ============================================================
// Invariants
// ============================================================

#[test]
fn person_counts_sum_to_person_occurrences() {
    let occs = sample_sequence();
    let people = aggregate(&occs, ProximityWindow::default()).unwrap();
    let total: u32 = people.iter().map(|p| p.count).sum();
    let expected = occs
        .iter()
        .filter(|o| o.category == EntityCategory::Person)
        .count() as u32;
    assert_eq!(total, expected);
}

#[test]
fn place_counts_bounded_by_location_occurrences() {
    let occs = sample_sequence();
    let mut location_totals: HashMap<&str, u32> = HashMap::new();
    for o in occs.iter().filter(|o| o.category == EntityCategory::Location) {
        *location_totals.entry(o.name.as_str()).or_default() += 1;
    }

    for window in [
        ProximityWindow::symmetric(0),
        ProximityWindow::preceding(30),
        ProximityWindow::symmetric(50),
        ProximityWindow::symmetric(10_000),
    ] {
        let people = aggregate(&occs, window).unwrap();
        for p in &people {
            assert!(p.count >= 1);
            for place in &p.associated_places {
                assert!(place.count >= 1);
                assert!(
                    place.count <= location_totals[place.name.as_str()],
                    "{} under {} exceeds total mentions with {window:?}",
                    place.name,
                    p.name
                );
            }
        }
    }
}

#[test]
fn huge_window_associates_every_place_with_everyone() {
    let occs = sample_sequence();
    let people = aggregate(&occs, ProximityWindow::symmetric(usize::MAX)).unwrap();
    for p in &people {
        assert_eq!(p.place("Paris").unwrap().count, 3);
        assert_eq!(p.place("Rome").unwrap().count, 2);
        assert_eq!(p.place("Oslo").unwrap().count, 1);
    }
}

#[test]
fn aggregation_is_idempotent() {
    let occs = sample_sequence();
    let window = ProximityWindow::default();
    let first = aggregate(&occs, window).unwrap();
    let second = aggregate(&occs, window).unwrap();
    assert_eq!(first, second);
}

#[test]
fn serializes_to_response_shape() {
    let occs = vec![
        Occurrence::person("Alice", 0),
        Occurrence::location("Paris", 5),
    ];
    let people = aggregate(&occs, ProximityWindow::default()).unwrap();
    let json = serde_json::to_value(&people).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"name": "Alice", "count": 1, "associated_places": [{"name": "Paris", "count": 1}]}
        ])
    );
}
