//! Layerbox inspects layered container images.
//!
//! The crate is organized around a layered filesystem diff engine
//! (`filetree`): per-layer trees are built from an image archive
//! (`image`), stacked under overlay semantics, and annotated with
//! per-node change types for rendering.

pub mod config;
pub mod filetree;
pub mod image;
