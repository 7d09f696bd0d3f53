//! Chart Annotate - declarative annotations for compiled chart scenes
//!
//! This library resolves enclosures, text labels and connectors declared
//! next to a chart-grammar spec into extra marks of the compiled low-level
//! scene spec. The chart compiler and the scene renderer are supplied by the
//! caller through [`ChartCompiler`] and [`SceneRenderer`].
//!
//! # Example
//!
//! ```rust
//! use chart_annotate::{AnnotationError, Annotator, ChartCompiler, RenderedScene, SceneRenderer};
//! use serde_json::{json, Value};
//!
//! struct Compiler;
//!
//! impl ChartCompiler for Compiler {
//!     fn normalize(&self, spec: &Value) -> Result<Value, AnnotationError> {
//!         Ok(spec.clone())
//!     }
//!
//!     fn compile(&self, _normalized: &Value) -> Result<Value, AnnotationError> {
//!         Ok(json!({"marks": []}))
//!     }
//! }
//!
//! struct Renderer;
//!
//! impl SceneRenderer for Renderer {
//!     fn render(&self, _spec: &Value) -> Result<RenderedScene, AnnotationError> {
//!         Ok(RenderedScene::default())
//!     }
//! }
//!
//! let spec = json!({
//!     "mark": "bar",
//!     "annotations": [{
//!         "target": {"type": "pixel-space", "x": 40, "y": 20},
//!         "text": {"text": "hello"}
//!     }]
//! });
//! let annotated = Annotator::new(Compiler, Renderer).apply_annotations(&spec).unwrap();
//! assert_eq!(annotated["marks"][0]["name"], "annotation_0_text");
//! ```

pub mod annotation;
pub mod config;
pub mod error;
pub mod expr;
pub mod geometry;
pub mod pipeline;
pub mod resolve;
pub mod scene;

#[cfg(test)]
mod testing;

pub use annotation::{RootAnnotation, StyleDefaults};
pub use config::{AnnotateConfig, LayeredPolicy};
pub use error::{AnnotationError, AnnotationKind, ErrorKind, ExprError};
pub use geometry::{resolve_anchor, Anchor, BoundingBox, Point};
pub use pipeline::{AnnotatedScene, AnnotationOutcome, Annotator, ChartCompiler, ResolvedAnnotation};
pub use resolve::{ConnectorData, CurveKind, EnclosureData, TextData, TextPlacement};
pub use scene::{RenderedScene, SceneItem, SceneQuery, SceneRenderer};
