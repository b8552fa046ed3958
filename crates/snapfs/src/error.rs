use dataset::Component;
use store::StoreError;

/// Error type returned by save and load operations. The first four variants
/// are sentinels returned unwrapped so callers can match on them; the rest
/// carry wrapped context from the layer that failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The candidate is semantically identical to the previous snapshot.
    #[error("no changes to save")]
    NoChanges,

    /// The body failed schema validation and the structure is strict.
    #[error("dataset body failed strict schema validation: {count} errors")]
    StrictValidationFailed { count: u64 },

    /// Neither the candidate nor its previous snapshot carries a body.
    #[error("dataset has no body")]
    MissingBody,

    /// Saves must be signed; no private key was supplied.
    #[error("a private key is required to save a dataset")]
    NoPrivateKey,

    /// A required sub-component could not be loaded or parsed.
    #[error("invalid {component} component: {source}")]
    InvalidComponent {
        component: Component,
        #[source]
        source: serde_json::Error,
    },

    /// The candidate itself is malformed.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// The structure's schema could not be compiled.
    #[error("invalid schema: {0}")]
    Schema(String),

    /// Rendering was requested but failed or is unavailable.
    #[error("rendering viz: {0}")]
    Render(String),

    /// The save was cancelled externally.
    #[error("save cancelled")]
    Cancelled,

    #[error("reading body: {0}")]
    Body(#[from] rows::ReadError),

    #[error("encoding component: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
