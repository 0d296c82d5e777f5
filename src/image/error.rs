use thiserror::Error;

use crate::filetree::TreeError;

pub type ImageResult<T> = Result<T, ImageError>;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("archive i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive carries no manifest.json")]
    MissingManifest,

    #[error("manifest.json lists no images")]
    EmptyManifest,

    #[error("config blob '{0}' missing from archive")]
    MissingConfig(String),

    #[error("layer '{0}' listed in manifest but missing from archive")]
    MissingLayer(String),

    #[error("layer index {index} out of range ({layers} layers)")]
    LayerOutOfRange { index: usize, layers: usize },

    #[error("malformed json blob: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Tree(#[from] TreeError),
}
