// Aggregation result types. These serialize directly into the `people`
// array of the HTTP response.

use serde::{Deserialize, Serialize};

/// A distinct location that co-occurred with a person at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    pub count: u32,
}

/// A distinct person, how often they are mentioned, and the places
/// mentioned near them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub name: String,
    pub count: u32,
    pub associated_places: Vec<PlaceRecord>,
}

impl PersonRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            associated_places: Vec::new(),
        }
    }

    /// Look up an associated place by exact name.
    pub fn place(&self, name: &str) -> Option<&PlaceRecord> {
        self.associated_places.iter().find(|p| p.name == name)
    }
}
