use serde_json::Value;

/// External collaborator that renders a viz script against a dataset body.
/// Injected by the caller; the engine only stores whatever bytes come back.
pub trait Renderer: Send + Sync {
    /// Render `script`, with the decoded body when it was small enough to
    /// buffer. Returns the rendered document bytes.
    fn render(&self, script: &[u8], body: Option<&Value>) -> anyhow::Result<Vec<u8>>;
}
