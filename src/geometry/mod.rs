//! Anchor math, bounding boxes and scale discovery

pub mod anchor;
pub mod scales;
pub mod types;

pub use anchor::{resolve_anchor, Anchor};
pub use scales::{scale_names_of, ScaleNames};
pub use types::{BoundingBox, Point};
