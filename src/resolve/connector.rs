//! Connector placement
//!
//! Endpoints are resolved as two point sets:
//!
//! | endpoint | `connectTo` given                         | `connectTo` absent              |
//! |----------|-------------------------------------------|---------------------------------|
//! | far      | `connectTo`                               | text                            |
//! | near     | `connectFrom`, text, enclosure, target    | `connectFrom`, enclosure, target (only with text) |
//!
//! Each column lists sources in order; the first that is present wins. One
//! path is drawn per pair of the cross product near x far.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use svgtypes::{PathParser, PathSegment};

use super::curve::{connector_path, CurveSettings};
use super::enclosure::EnclosureData;
use super::marks::{channel_value, MarkBuilder};
use super::text::TextPlacement;
use super::{ResolveContext, Resolved};
use crate::annotation::{ArrowStyle, ConnectTarget, ConnectorAnnotation, Marker, RootAnnotation};
use crate::error::{AnnotationError, AnnotationKind};
use crate::geometry::{Anchor, Point};

const KIND: AnnotationKind = AnnotationKind::Connector;

/// A drawn connector, read back from its path data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectorData {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Where one endpoint set may come from, in precedence order
#[derive(Clone, Copy, Default)]
struct EndpointSources<'a> {
    explicit: Option<&'a ConnectTarget>,
    text: Option<&'a TextPlacement>,
    enclosure: Option<&'a EnclosureData>,
    root: Option<&'a Marker>,
}

/// Resolve the connector of `annotation`.
///
/// Returns `Ok(None)` when either endpoint set is empty: there is nothing to
/// connect, which is not an error.
pub fn resolve_connector(
    ctx: &ResolveContext<'_, '_>,
    annotation: &RootAnnotation,
    enclosure: Option<&EnclosureData>,
    text: Option<&TextPlacement>,
    spec: &Value,
) -> Result<Option<Resolved<Vec<ConnectorData>>>, AnnotationError> {
    let connector = annotation
        .connector
        .as_ref()
        .ok_or_else(|| AnnotationError::missing(KIND, "connector"))?;
    let id = connector.id.clone().unwrap_or_else(|| KIND.to_string());

    let far_sources = EndpointSources {
        explicit: connector.connect_to.as_ref(),
        text,
        ..Default::default()
    };
    let near_sources = match (&connector.connect_to, text) {
        (Some(_), _) => EndpointSources {
            explicit: connector.connect_from.as_ref(),
            text,
            enclosure,
            root: annotation.target.as_ref(),
        },
        (None, Some(_)) => EndpointSources {
            explicit: connector.connect_from.as_ref(),
            text: None,
            enclosure,
            root: annotation.target.as_ref(),
        },
        (None, None) => EndpointSources::default(),
    };

    let far = resolve_endpoint_set(ctx, spec, &far_sources)?;
    let near = resolve_endpoint_set(ctx, spec, &near_sources)?;
    tracing::debug!(%id, near = near.len(), far = far.len(), "connector endpoints");
    if near.is_empty() || far.is_empty() {
        tracing::warn!(%id, near = near.len(), far = far.len(), "connector has no endpoints, skipped");
        return Ok(None);
    }

    let settings = CurveSettings::for_connector(connector, ctx.config);
    let mut marks = Vec::new();
    let mut data = Vec::with_capacity(near.len() * far.len());
    for (i, from) in near.iter().enumerate() {
        for (j, to) in far.iter().enumerate() {
            let mark_id = format!("{}_{}_{}", id, i, j);
            let from = from.offset(connector.dx.unwrap_or(0.0), connector.dy.unwrap_or(0.0));
            let to = to.offset(connector.dx2.unwrap_or(0.0), connector.dy2.unwrap_or(0.0));
            let path = connector_path(from, to, &settings, ctx.config);

            let mark = path_mark(ctx, connector, &mark_id, &path);
            data.push(connector_data(&mark));
            marks.push(mark);
            marks.extend(arrow_marks(ctx, connector, &mark_id, from, to));
        }
    }

    Ok(Some(Resolved { marks, data }))
}

/// Points of the first available source
fn resolve_endpoint_set(
    ctx: &ResolveContext<'_, '_>,
    spec: &Value,
    sources: &EndpointSources<'_>,
) -> Result<Vec<Point>, AnnotationError> {
    if let Some(explicit) = sources.explicit {
        let anchor = explicit.position.unwrap_or(Anchor::MiddleMiddle);
        return ctx.marker_points(spec, &explicit.target, anchor, KIND);
    }
    if let Some(text) = sources.text {
        return Ok(text.points());
    }
    if let Some(enclosure) = sources.enclosure {
        return Ok(vec![enclosure.bbox().center()]);
    }
    match sources.root {
        Some(root) => ctx.marker_points(spec, root, Anchor::MiddleMiddle, KIND),
        None => Ok(Vec::new()),
    }
}

fn path_mark(ctx: &ResolveContext<'_, '_>, connector: &ConnectorAnnotation, id: &str, path: &str) -> Value {
    let style = connector.style.merged_over(&ctx.config.styles.connector);
    MarkBuilder::new(id, "path")
        .value("path", path)
        .style(|update| style.encode_into(update))
        .value("fill", Value::Null)
        .build()
}

fn arrow_marks(
    ctx: &ResolveContext<'_, '_>,
    connector: &ConnectorAnnotation,
    id: &str,
    from: Point,
    to: Point,
) -> Vec<Value> {
    let heading = (to.y - from.y).atan2(to.x - from.x).to_degrees();
    let mut marks = Vec::new();
    if connector.start_arrow {
        let style = connector.start_arrow_style.merged_over(&ctx.config.styles.arrow);
        marks.push(arrow_mark(&format!("{}_start_arrow", id), from, heading, &style));
    }
    if connector.end_arrow {
        let style = connector.end_arrow_style.merged_over(&ctx.config.styles.arrow);
        marks.push(arrow_mark(&format!("{}_end_arrow", id), to, heading + 180.0, &style));
    }
    marks
}

fn arrow_mark(id: &str, at: Point, heading: f64, style: &ArrowStyle) -> Value {
    MarkBuilder::new(id, "symbol")
        .value("x", at.x)
        .value("y", at.y)
        .value("angle", heading + style.rotation_adjust.unwrap_or(0.0))
        .style(|update| style.encode_into(update))
        .build()
}

/// Read the endpoints back out of a path mark; unparseable paths give a
/// zeroed record
fn connector_data(mark: &Value) -> ConnectorData {
    let id = mark["name"].as_str().unwrap_or_default().to_string();
    let path = channel_value(mark, "path").and_then(Value::as_str).unwrap_or_default();
    match path_endpoints(path) {
        Ok((start, end)) => ConnectorData {
            id,
            x: start.x,
            y: start.y,
            x2: end.x,
            y2: end.y,
        },
        Err(error) => {
            tracing::warn!(%id, %error, "connector geometry replaced by zeroes");
            ConnectorData {
                id,
                ..Default::default()
            }
        }
    }
}

/// First move-to point and the final point of an absolute path
pub fn path_endpoints(path: &str) -> Result<(Point, Point), AnnotationError> {
    let mut start: Option<Point> = None;
    let mut end: Option<Point> = None;

    for segment in PathParser::from(path) {
        let segment = segment.map_err(|e| AnnotationError::geometry(path, e.to_string()))?;
        let current = end.unwrap_or(Point::new(0.0, 0.0));
        end = Some(match segment {
            PathSegment::MoveTo { x, y, .. } => {
                let p = Point::new(x, y);
                start.get_or_insert(p);
                p
            }
            PathSegment::LineTo { x, y, .. }
            | PathSegment::CurveTo { x, y, .. }
            | PathSegment::SmoothCurveTo { x, y, .. }
            | PathSegment::Quadratic { x, y, .. }
            | PathSegment::SmoothQuadratic { x, y, .. }
            | PathSegment::EllipticalArc { x, y, .. } => Point::new(x, y),
            PathSegment::HorizontalLineTo { x, .. } => Point::new(x, current.y),
            PathSegment::VerticalLineTo { y, .. } => Point::new(current.x, y),
            PathSegment::ClosePath { .. } => start.unwrap_or(current),
        });
    }

    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(AnnotationError::geometry(path, "no move-to command")),
    }
}
