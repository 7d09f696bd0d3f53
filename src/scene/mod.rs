//! Scene query service over an external renderer

pub mod item;
pub mod occupancy;
pub mod query;
pub mod scale;

pub use item::{HasBounds, HasDatum, ItemGeometry, SceneItem};
pub use occupancy::occupancy_grid;
pub use query::{RenderedScene, SceneQuery, SceneRenderer, DEFAULT_DATASET};
pub use scale::{LinearScale, Scale};
