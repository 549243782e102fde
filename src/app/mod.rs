// Application layer: entry points that feed records into the core processor
// (API payloads, CSV/JSON files) and write its results back out.

pub mod api;
pub mod codec;
pub mod pipelines;
