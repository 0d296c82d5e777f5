//! Walks a docker-save archive into per-layer filesystem trees.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

use flate2::read::GzDecoder;

use super::config::ImageConfig;
use super::error::ImageError;
use super::manifest::ManifestEntry;
use crate::filetree::{FileInfo, FileTree, NodeType};

const MANIFEST_PATH: &str = "manifest.json";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Raw contents of a docker-save archive: one tree per layer tarball, keyed
/// by the tarball's entry path, plus the parsed manifest and config blobs.
#[derive(Debug)]
pub struct ImageArchive {
    pub manifest: ManifestEntry,
    pub config: ImageConfig,
    pub layer_trees: HashMap<String, FileTree>,
}

impl ImageArchive {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ImageError> {
        let mut archive = tar::Archive::new(reader);
        let mut layer_trees = HashMap::new();
        let mut json_blobs: HashMap<String, Vec<u8>> = HashMap::new();

        for entry in archive.entries()? {
            let mut entry = entry?;
            let path = entry.path()?.to_string_lossy().into_owned();
            if path.ends_with("layer.tar") {
                tracing::debug!(layer = %path, "parsing layer tree");
                let tree = parse_layer(&mut entry)?;
                layer_trees.insert(path, tree);
            } else if path.ends_with(".json") {
                let mut blob = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut blob)?;
                json_blobs.insert(path, blob);
            }
        }

        let manifest_raw = json_blobs.get(MANIFEST_PATH).ok_or(ImageError::MissingManifest)?;
        let manifest = ManifestEntry::parse_all(manifest_raw)?
            .into_iter()
            .next()
            .ok_or(ImageError::EmptyManifest)?;
        let config_raw = json_blobs
            .get(&manifest.config)
            .ok_or_else(|| ImageError::MissingConfig(manifest.config.clone()))?;
        let config = ImageConfig::from_json(config_raw)?;

        Ok(Self { manifest, config, layer_trees })
    }
}

/// Parses one layer tarball (optionally gzipped) into a tree.
fn parse_layer<R: Read>(reader: R) -> Result<FileTree, ImageError> {
    let mut buffered = BufReader::new(reader);
    let head = buffered.fill_buf()?;
    if head.starts_with(&GZIP_MAGIC) {
        build_layer_tree(tar::Archive::new(GzDecoder::new(buffered)))
    } else {
        build_layer_tree(tar::Archive::new(buffered))
    }
}

fn build_layer_tree<R: Read>(mut archive: tar::Archive<R>) -> Result<FileTree, ImageError> {
    let mut tree = FileTree::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let Some(info) = entry_info(&mut entry)? else { continue };
        let path = info.path.clone();
        if let Err(error) = tree.add(&path, info) {
            tracing::warn!(%path, %error, "skipping unrepresentable archive entry");
        }
    }
    Ok(tree)
}

/// Converts one tar entry into a `FileInfo`, fingerprinting regular file
/// contents. Whiteout basenames are carried through intact so the tree
/// engine can consume them during stacking.
fn entry_info<R: Read>(entry: &mut tar::Entry<'_, R>) -> Result<Option<FileInfo>, ImageError> {
    use tar::EntryType;

    let raw_path = entry.path()?.to_string_lossy().into_owned();
    let trimmed = raw_path.trim_start_matches("./").trim_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }
    let path = format!("/{trimmed}");

    let header = entry.header();
    let type_flag = match header.entry_type() {
        EntryType::Regular | EntryType::GNUSparse | EntryType::Continuous => NodeType::File,
        EntryType::Directory => NodeType::Directory,
        EntryType::Symlink => NodeType::Symlink,
        EntryType::Link => NodeType::Hardlink,
        EntryType::Char => NodeType::CharDevice,
        EntryType::Block => NodeType::BlockDevice,
        EntryType::Fifo => NodeType::Fifo,
        // pax extensions and other bookkeeping entries carry no node
        _ => return Ok(None),
    };

    let mode = header.mode()?;
    let uid = header.uid()? as u32;
    let gid = header.gid()? as u32;
    let link_name =
        entry.link_name()?.map(|target| target.to_string_lossy().into_owned()).unwrap_or_default();

    let (size, fingerprint) = if type_flag == NodeType::File {
        let size = entry.size();
        let mut hasher = blake3::Hasher::new();
        std::io::copy(entry, &mut hasher)?;
        (size, hasher.finalize().to_hex().to_string())
    } else {
        (0, String::new())
    };

    Ok(Some(FileInfo { path, type_flag, link_name, mode, uid, gid, size, fingerprint }))
}
