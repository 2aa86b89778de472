// Entity extraction: trait-based abstraction over swappable NER backends.
//
// The EntityExtractor trait defines the interface. HuggingFaceExtractor calls
// the hosted inference API; OnnxExtractor runs the same model family locally.
// Both narrow their output to PERSON/LOCATION Occurrences in document order.

pub mod chunk;
pub mod download;
pub mod huggingface;
pub mod labels;
pub mod onnx;
pub mod rate_limiter;
pub mod traits;

pub use traits::{EntityCategory, EntityExtractor, EntitySpan, Occurrence};
