//! Declarative annotation model: targets, sub-annotations and their styles

pub mod style;
pub mod types;

pub use style::{ArrowStyle, EnclosureStyle, LineStyle, StyleDefaults, StyleDefaultsError, TextStyle};
pub use types::{
    ConnectTarget, ConnectorAnnotation, CornerRadius, CurveDirection, CurveObject, CurveSpec,
    DataPointMarker, EnclosureAnnotation, FixedPosition, Marker, Padding, RootAnnotation, Shape,
    Space, StepAlign, TextAnnotation, TextPosition,
};
