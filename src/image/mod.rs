//! Image archive producer.
//!
//! Turns a docker-save style archive into per-layer `FileTree`s and
//! composes annotated views of the effective filesystem at any layer.

mod archive;
mod config;
mod error;
mod manifest;

pub use archive::ImageArchive;
pub use config::{HistoryEntry, ImageConfig, RootFs, MISSING_LAYER_ID};
pub use error::{ImageError, ImageResult};
pub use manifest::ManifestEntry;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::filetree::{FileTree, PathError};

/// One image layer: its filesystem tree plus presentation metadata.
#[derive(Debug)]
pub struct ImageLayer {
    pub index: usize,
    /// Diff id from the image config, or `<missing>`.
    pub id: String,
    /// The command the builder recorded for this layer.
    pub command: String,
    /// Sum of intrinsic file sizes contributed by this layer.
    pub size: u64,
    pub tree: FileTree,
}

/// A fully parsed image: ordered layers, lowest first.
#[derive(Debug)]
pub struct Image {
    pub repo_tags: Vec<String>,
    pub layers: Vec<ImageLayer>,
}

impl Image {
    pub fn open(path: impl AsRef<Path>) -> ImageResult<Self> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    pub fn read<R: Read>(reader: R) -> ImageResult<Self> {
        Self::from_archive(ImageArchive::from_reader(reader)?)
    }

    pub fn from_archive(archive: ImageArchive) -> ImageResult<Self> {
        let ImageArchive { manifest, config, mut layer_trees } = archive;

        let history: Vec<HistoryEntry> =
            config.layer_history().into_iter().cloned().collect();

        let mut layers = Vec::with_capacity(manifest.layers.len());
        for (index, layer_path) in manifest.layers.iter().enumerate() {
            let tree = layer_trees
                .remove(layer_path)
                .ok_or_else(|| ImageError::MissingLayer(layer_path.clone()))?;
            let (id, command) = match history.get(index) {
                Some(entry) => (entry.id.clone(), entry.created_by.clone()),
                None => (MISSING_LAYER_ID.to_string(), String::new()),
            };
            layers.push(ImageLayer { index, id, command, size: tree.file_size(), tree });
        }

        tracing::debug!(layers = layers.len(), "assembled image");
        Ok(Self { repo_tags: manifest.repo_tags.unwrap_or_default(), layers })
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn trees(&self) -> Vec<&FileTree> {
        self.layers.iter().map(|layer| &layer.tree).collect()
    }

    /// The effective filesystem at `index`, annotated with the changes that
    /// layer introduces relative to everything below it.
    pub fn layer_view(&self, index: usize) -> ImageResult<(FileTree, Vec<PathError>)> {
        if index >= self.layers.len() {
            return Err(ImageError::LayerOutOfRange { index, layers: self.layers.len() });
        }
        if index == 0 {
            let mut base = FileTree::new();
            let failed = base.compare_and_mark(&self.layers[0].tree)?;
            return Ok((base, failed));
        }

        let trees = self.trees();
        let (mut stacked, mut failed) = FileTree::stack_range(&trees, 1, index - 1);
        failed.extend(stacked.compare_and_mark(&self.layers[index].tree)?);
        Ok((stacked, failed))
    }

    /// The effective filesystem after every layer is applied.
    pub fn full_view(&self) -> (FileTree, Vec<PathError>) {
        let trees = self.trees();
        if trees.is_empty() {
            return (FileTree::new(), Vec::new());
        }
        FileTree::stack_range(&trees, 1, trees.len() - 1)
    }
}
