use serde::Deserialize;
use url::Url;

fn default_capacity() -> usize {
    200
}

fn default_render_interval_ms() -> u64 {
    33
}

fn default_recall_intensity() -> u8 {
    3
}

fn default_true() -> bool {
    true
}

/// Configuration for one chat surface instance.
///
/// Every value here is resolved once when the surface is constructed and is
/// never re-read afterwards; mode flags do not change behind a running
/// session's back.
#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceConfig {
    /// Base URL of the retrieval backend.
    pub base_url: Url,
    /// Source filters sent with every request.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Conversation to resume on the backend side, if any.
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Model override forwarded verbatim to the backend.
    #[serde(default)]
    pub model_override: Option<String>,
    /// Maximum number of messages kept in history; oldest entries are
    /// evicted beyond this.
    #[serde(default = "default_capacity")]
    pub history_capacity: usize,
    /// Minimum interval between published snapshots, in milliseconds.
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,
    #[serde(default = "default_true")]
    pub include_vector: bool,
    #[serde(default = "default_true")]
    pub include_sparse: bool,
    #[serde(default = "default_true")]
    pub include_graph: bool,
    #[serde(default = "default_recall_intensity")]
    pub recall_intensity: u8,
    /// Skip the streaming transport entirely and answer via single-shot
    /// requests. Used by smoke setups where a live body is unavailable.
    #[serde(default)]
    pub fast_mode: bool,
}

impl SurfaceConfig {
    /// Creates a configuration with defaults for everything but the backend
    /// address.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            sources: Vec::new(),
            conversation_id: None,
            model_override: None,
            history_capacity: default_capacity(),
            render_interval_ms: default_render_interval_ms(),
            include_vector: true,
            include_sparse: true,
            include_graph: true,
            recall_intensity: default_recall_intensity(),
            fast_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_omitted_fields() {
        let cfg: SurfaceConfig =
            serde_json::from_str(r#"{"base_url": "http://localhost:8001/"}"#).unwrap();
        assert_eq!(cfg.history_capacity, 200);
        assert_eq!(cfg.render_interval_ms, 33);
        assert_eq!(cfg.recall_intensity, 3);
        assert!(cfg.include_vector && cfg.include_sparse && cfg.include_graph);
        assert!(!cfg.fast_mode);
        assert!(cfg.sources.is_empty());
    }
}
