// Co-occurrence aggregation: who appears, how often, and near which places.

pub mod cooccurrence;
pub mod models;

pub use cooccurrence::{aggregate, AggregateError, ProximityWindow};
pub use models::{PersonRecord, PlaceRecord};
