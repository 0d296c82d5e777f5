use serde::Deserialize;

/// One image entry of a docker-save `manifest.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "Config")]
    pub config: String,

    /// Can be `null` for untagged images.
    #[serde(rename = "RepoTags")]
    pub repo_tags: Option<Vec<String>>,

    /// Layer tarball paths inside the archive, lowest layer first.
    #[serde(rename = "Layers", default)]
    pub layers: Vec<String>,
}

impl ManifestEntry {
    pub fn parse_all(bytes: &[u8]) -> Result<Vec<ManifestEntry>, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
