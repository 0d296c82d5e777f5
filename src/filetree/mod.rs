//! Layered filesystem diff engine.
//!
//! This module provides the in-memory model of an image filesystem:
//! - Per-layer trees built by path insertion (`FileTree::add`)
//! - Layer composition under overlay semantics (`FileTree::stack`,
//!   `FileTree::stack_range`), consuming whiteout markers
//! - Per-node change annotation (`FileTree::compare_and_mark`) with the
//!   `DiffType` merge lattice
//! - Deterministic traversal, size accounting and a rendering surface
//!   for external viewers

mod diff;
mod error;
mod info;
mod node;
mod order;
mod render;
mod tree;

pub use diff::DiffType;
pub use error::{PathAction, PathError, TreeError, TreeResult};
pub use info::{FileInfo, NodeType};
pub use node::{FileNode, NodeId, ViewInfo};
pub use order::SortOrder;
pub use render::{human_size, mode_string, MetadataColumns};
pub use tree::FileTree;

/// Overlay-filesystem marker prefix: `.wh.<name>` deletes `<name>` from the
/// layers below.
pub const WHITEOUT_PREFIX: &str = ".wh.";

/// Reserved opaque-directory marker prefix; entries carrying it are never
/// inserted into a tree.
pub const OPAQUE_WHITEOUT_PREFIX: &str = ".wh..wh..";
