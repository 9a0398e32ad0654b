use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// How change entries are presented to the caller.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChangeView {
    /// One merged row per change.
    #[default]
    Row,
    /// Key, old, new and large-object images kept apart.
    Vector,
}

#[derive(Debug, Serialize, Deserialize, Eq, PartialEq, Clone)]
pub struct StreamConfig {
    /// Records buffered before a batch is handed out; Default: 1000
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Reassemble rows split across data and large-object entries; Default: false
    #[serde(default)]
    pub merge_multipart: bool,

    /// Row or vector view of changes; Default: row
    #[serde(default)]
    pub view: ChangeView,

    /// Refuse data entries unless the file declares commit-only and schema document features; Default: true
    #[serde(default = "default_require_features")]
    pub require_features: bool,
}

fn default_require_features() -> bool {
    true
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            merge_multipart: false,
            view: ChangeView::default(),
            require_features: default_require_features(),
        }
    }
}

impl StreamConfig {
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE).max(1)
    }
}
