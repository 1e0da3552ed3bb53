//! API layer
//!
//! HTTP handlers for:
//! - Outbox (add_to_outbox, inspection)
//! - Content lifecycle events (the content store's publication endpoint)
//! - Actor documents (ActivityPub dereference target)
//! - Metrics (Prometheus)

mod actors;
mod content;
pub mod metrics;
mod outbox;

pub use actors::actors_router;
pub use content::content_router;
pub use metrics::metrics_router;
pub use outbox::outbox_router;
