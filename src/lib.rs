// dramatis: people, places and where they meet in a document.
//
// This is the library root. The request flow is
//   document (fetch) -> entities (NER) -> aggregate (co-occurrence)
// wired together by `pipeline` and served over HTTP by `web`.

pub mod aggregate;
pub mod config;
pub mod document;
pub mod entities;
pub mod output;
pub mod pipeline;
pub mod web;
