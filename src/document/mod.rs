// Document retrieval: turns a user-supplied URL into text.

pub mod fetcher;

pub use fetcher::{DocumentFetcher, FetchError, HttpFetcher};
