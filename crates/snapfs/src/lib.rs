//! The snapshot engine: content-addressed dataset storage and versioning.
//!
//! The write pipeline ([`create_dataset`]) accepts an in-memory dataset
//! description plus a streaming body, derives structural metadata while the
//! body streams into the store exactly once, generates a human-readable
//! commit message from a structural diff against the previous snapshot,
//! signs the result, and writes a cross-referenced bundle of component
//! objects under a single root address. The read pipeline
//! ([`load_dataset`], [`load_body`]) is the symmetric inverse.
//!
//! The engine is polymorphic over any [`store::ObjectStore`]; progress is
//! reported through an injected [`EventPublisher`]; per-save behavior is
//! gated by [`SaveSwitches`].

mod body;
mod config;
mod error;
mod event;
mod read;
mod render;
mod stats;
mod switches;
mod write;

pub use config::{Config, BATCH_SIZE, BODY_SIZE_SMALL_ENOUGH_TO_DIFF, OPEN_FILE_TIMEOUT};
pub use error::Error;
pub use event::{ChannelPublisher, EventPublisher, NullPublisher, SaveEvent, Topic};
pub use read::{load_body, load_dataset};
pub use render::Renderer;
pub use switches::{Clock, SaveSwitches};
pub use write::{create_dataset, Body, SaveRequest};

// The body-handling signal shared with the diff layer.
pub use delta::BodyAction;

// Cancellation of in-flight saves uses tokio-util's token.
pub use tokio_util::sync::CancellationToken;
