//! Declarative annotation types as they appear in an annotated chart spec

use serde::{Deserialize, Serialize};

use super::style::{ArrowStyle, EnclosureStyle, LineStyle, TextStyle};
use crate::error::{AnnotationError, AnnotationKind};
use crate::geometry::Anchor;

/// Coordinate space of a fixed position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Space {
    /// Converted to pixels through the chart's x/y scales
    DataSpace,
    PixelSpace,
}

/// A point given directly in data or pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedPosition {
    #[serde(rename = "type")]
    pub space: Space,
    pub x: f64,
    pub y: f64,
}

impl FixedPosition {
    pub fn pixel(x: f64, y: f64) -> Self {
        Self {
            space: Space::PixelSpace,
            x,
            y,
        }
    }

    pub fn data(x: f64, y: f64) -> Self {
        Self {
            space: Space::DataSpace,
            x,
            y,
        }
    }
}

/// A selection of rendered data points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DataPointMarker {
    /// Rows for which the expression is truthy
    DataExpr { expr: String },
    /// Rows at the given position(s) of the source dataset
    DataIndex {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        indices: Option<Vec<i64>>,
    },
}

impl DataPointMarker {
    pub fn index(index: i64) -> Self {
        Self::DataIndex {
            index: Some(index),
            indices: None,
        }
    }

    pub fn indices(indices: impl Into<Vec<i64>>) -> Self {
        Self::DataIndex {
            index: None,
            indices: Some(indices.into()),
        }
    }

    pub fn expr(expr: impl Into<String>) -> Self {
        Self::DataExpr { expr: expr.into() }
    }

    /// The requested row positions of a `data-index` marker.
    ///
    /// Exactly one of `index` and `indices` must be set.
    pub fn requested_indices(&self, kind: AnnotationKind) -> Result<Vec<i64>, AnnotationError> {
        match self {
            Self::DataIndex {
                index: Some(i),
                indices: None,
            } => Ok(vec![*i]),
            Self::DataIndex {
                index: None,
                indices: Some(list),
            } => Ok(list.clone()),
            Self::DataIndex { .. } => Err(AnnotationError::invalid(
                kind,
                "data-index marker needs exactly one of `index` or `indices`",
            )),
            Self::DataExpr { .. } => Err(AnnotationError::invalid(
                kind,
                "data-expr marker has no indices",
            )),
        }
    }
}

/// Where an annotation attaches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Marker {
    Fixed(FixedPosition),
    DataPoint(DataPointMarker),
}

impl From<FixedPosition> for Marker {
    fn from(p: FixedPosition) -> Self {
        Marker::Fixed(p)
    }
}

impl From<DataPointMarker> for Marker {
    fn from(m: DataPointMarker) -> Self {
        Marker::DataPoint(m)
    }
}

/// Placement of a text label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextPosition {
    Fixed(FixedPosition),
    Anchor(Anchor),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<f64>,
    pub text: String,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<TextPosition>,
}

/// Extra space around an enclosed box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Padding {
    /// Same padding on every side
    Uniform(f64),
    Sides {
        #[serde(default)]
        top: Option<f64>,
        #[serde(default)]
        bottom: Option<f64>,
        #[serde(default)]
        left: Option<f64>,
        #[serde(default)]
        right: Option<f64>,
    },
}

impl Padding {
    /// Padding as `(left, top, right, bottom)`
    pub fn sides(&self) -> (f64, f64, f64, f64) {
        match *self {
            Padding::Uniform(p) => (p, p, p, p),
            Padding::Sides {
                top,
                bottom,
                left,
                right,
            } => (
                left.unwrap_or(0.0),
                top.unwrap_or(0.0),
                right.unwrap_or(0.0),
                bottom.unwrap_or(0.0),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CornerRadius {
    Uniform(f64),
    #[serde(rename_all = "camelCase")]
    Corners {
        #[serde(default)]
        top_left: Option<f64>,
        #[serde(default)]
        top_right: Option<f64>,
        #[serde(default)]
        bottom_left: Option<f64>,
        #[serde(default)]
        bottom_right: Option<f64>,
    },
}

/// Enclosure outline; only rectangles are drawn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<CornerRadius>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnclosureAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<Padding>,
    #[serde(default)]
    pub style: EnclosureStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<FixedPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveDirection {
    Clockwise,
    Counterclockwise,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAlign {
    Before,
    Center,
    After,
}

impl StepAlign {
    /// Fraction of the segment at which the step happens
    pub fn fraction(self) -> f64 {
        match self {
            StepAlign::Before => 0.0,
            StepAlign::Center => 0.5,
            StepAlign::After => 1.0,
        }
    }
}

/// Curve settings given as an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<CurveDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<StepAlign>,
}

/// Either a bare curve name or a curve object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurveSpec {
    Name(String),
    Object(CurveObject),
}

/// An explicit connector endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectTarget {
    pub target: Marker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Anchor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dx2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dy2: Option<f64>,
    #[serde(rename = "connect_from", default, skip_serializing_if = "Option::is_none")]
    pub connect_from: Option<ConnectTarget>,
    #[serde(rename = "connect_to", default, skip_serializing_if = "Option::is_none")]
    pub connect_to: Option<ConnectTarget>,
    #[serde(default)]
    pub style: LineStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<CurveSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve_direction: Option<CurveDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve_tension: Option<f64>,
    #[serde(default)]
    pub start_arrow: bool,
    #[serde(default)]
    pub end_arrow: bool,
    #[serde(default)]
    pub start_arrow_style: ArrowStyle,
    #[serde(default)]
    pub end_arrow_style: ArrowStyle,
}

/// One user-declared annotation unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Marker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosure: Option<EnclosureAnnotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<ConnectorAnnotation>,
}

impl RootAnnotation {
    /// The root target, required by every sub-annotation
    pub fn require_target(&self, kind: AnnotationKind) -> Result<&Marker, AnnotationError> {
        self.target
            .as_ref()
            .ok_or_else(|| AnnotationError::missing(kind, "target"))
    }

    /// Fill in ids left empty by the author as `annotation_<index>_<kind>`
    pub fn assign_ids(&mut self, index: usize) {
        if let Some(text) = &mut self.text {
            text.id.get_or_insert_with(|| format!("annotation_{}_text", index));
        }
        if let Some(enclosure) = &mut self.enclosure {
            enclosure
                .id
                .get_or_insert_with(|| format!("annotation_{}_enclosure", index));
        }
        if let Some(connector) = &mut self.connector {
            connector
                .id
                .get_or_insert_with(|| format!("annotation_{}_connector", index));
        }
    }
}
