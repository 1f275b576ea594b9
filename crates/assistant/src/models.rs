//! These models represent the objects passed around by the pipeline
//!
//! There are two related formats we need to interact with:
//! - execution events, emitted by the multi-agent engine and attributed to an agent
//! - content items, the normalized units delivered to clients as JSON or SSE frames
//!
//! Engine events are decoded into [`event::RawEvent`] as soon as they arrive, and
//! everything downstream of the runner only ever sees [`content::Content`].
pub mod content;
pub mod event;
