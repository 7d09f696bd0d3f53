//! Placement of enclosures, text labels and connectors
//!
//! Each resolver reads the current low-level spec, asks the scene query
//! service for whatever pixel geometry it needs, and returns the marks to
//! append together with the resolved geometry record that later resolvers
//! of the same annotation consume.

pub mod connector;
pub mod curve;
pub mod enclosure;
pub mod marks;
pub mod text;

pub use connector::{resolve_connector, ConnectorData};
pub use curve::{CurveKind, CurveSettings};
pub use enclosure::{resolve_enclosure, EnclosureData};
pub use marks::{append_marks, MarkBuilder};
pub use text::{resolve_text, TextData, TextPlacement};

use serde_json::Value;

use crate::annotation::{DataPointMarker, Marker};
use crate::config::AnnotateConfig;
use crate::error::{AnnotationError, AnnotationKind};
use crate::geometry::{resolve_anchor, Anchor, Point};
use crate::scene::{ItemGeometry, SceneQuery};

/// Marks to append plus the geometry they were built from
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub marks: Vec<Value>,
    pub data: T,
}

/// Services shared by the resolvers of one annotation
#[derive(Clone, Copy)]
pub struct ResolveContext<'a, 'r> {
    pub query: &'a SceneQuery<'r>,
    pub config: &'a AnnotateConfig,
    /// Restricts data-point markers to marks whose name starts with this
    pub scope: Option<&'a str>,
}

impl<'a, 'r> ResolveContext<'a, 'r> {
    pub fn new(query: &'a SceneQuery<'r>, config: &'a AnnotateConfig) -> Self {
        Self {
            query,
            config,
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: Option<&'a str>) -> Self {
        self.scope = scope;
        self
    }

    /// Items selected by a data-point marker within the current scope
    pub fn items(
        &self,
        spec: &Value,
        marker: &DataPointMarker,
        kind: AnnotationKind,
    ) -> Result<Vec<ItemGeometry>, AnnotationError> {
        self.query.bounding_boxes_for(spec, marker, self.scope, kind)
    }

    /// Pixel points of a marker: the position itself for fixed markers,
    /// `anchor` on each matched item box for data-point markers
    pub fn marker_points(
        &self,
        spec: &Value,
        marker: &Marker,
        anchor: Anchor,
        kind: AnnotationKind,
    ) -> Result<Vec<Point>, AnnotationError> {
        match marker {
            Marker::Fixed(position) => Ok(vec![self.query.resolve_fixed(spec, position)?]),
            Marker::DataPoint(marker) => Ok(self
                .items(spec, marker, kind)?
                .iter()
                .map(|item| resolve_anchor(anchor, &item.bbox()))
                .collect()),
        }
    }
}
