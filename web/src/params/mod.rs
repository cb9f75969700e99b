//! Typed parameters for endpoint inputs.
//!
//! Query strings and request bodies are deserialized into these types before a
//! handler runs, so malformed input is rejected at the boundary and never reaches
//! the pipeline.

pub(crate) mod log_record;
