use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Placeholder id for history entries that produced no filesystem layer.
pub const MISSING_LAYER_ID: &str = "<missing>";

/// The image config blob referenced by the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    pub rootfs: RootFs,

    #[serde(default)]
    pub architecture: String,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RootFs {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub diff_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    /// Resolved after parsing: the diff id of the layer this build step
    /// produced, or `<missing>` for steps that changed no files.
    #[serde(skip)]
    pub id: String,

    #[serde(default)]
    pub created: Option<DateTime<Utc>>,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub created_by: String,

    #[serde(default)]
    pub empty_layer: bool,
}

impl ImageConfig {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let mut config: ImageConfig = serde_json::from_slice(bytes)?;
        config.resolve_layer_ids();
        Ok(config)
    }

    /// Matches history entries to rootfs diff ids: each non-empty build
    /// step consumes the next diff id in order.
    fn resolve_layer_ids(&mut self) {
        let mut layer_idx = 0;
        for entry in &mut self.history {
            if entry.empty_layer {
                entry.id = MISSING_LAYER_ID.to_string();
            } else {
                entry.id = self
                    .rootfs
                    .diff_ids
                    .get(layer_idx)
                    .cloned()
                    .unwrap_or_else(|| MISSING_LAYER_ID.to_string());
                layer_idx += 1;
            }
        }
    }

    /// History entries that actually produced a layer, in layer order.
    pub fn layer_history(&self) -> Vec<&HistoryEntry> {
        self.history.iter().filter(|entry| !entry.empty_layer).collect()
    }
}
