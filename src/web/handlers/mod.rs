// Axum route handlers, one module per resource.

pub mod people;
