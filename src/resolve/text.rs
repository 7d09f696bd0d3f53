//! Text label placement

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enclosure::EnclosureData;
use super::marks::MarkBuilder;
use super::{ResolveContext, Resolved};
use crate::annotation::{Marker, RootAnnotation, TextAnnotation, TextPosition};
use crate::error::{AnnotationError, AnnotationKind};
use crate::geometry::{resolve_anchor, Anchor, Point};

const KIND: AnnotationKind = AnnotationKind::Text;

/// A placed label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub text: String,
}

impl TextData {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// One label, or one label per matched data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextPlacement {
    One(TextData),
    Many(Vec<TextData>),
}

impl TextPlacement {
    pub fn labels(&self) -> &[TextData] {
        match self {
            TextPlacement::One(label) => std::slice::from_ref(label),
            TextPlacement::Many(labels) => labels,
        }
    }

    pub fn points(&self) -> Vec<Point> {
        self.labels().iter().map(TextData::point).collect()
    }
}

/// Resolve the text label of `annotation`.
///
/// Placement precedence: a fixed `position`, then the anchor on the
/// enclosure, then the target. A data-point target yields one label per
/// matched item, except when a connector will be drawn: the label is then
/// parked at the configured deferred point.
pub fn resolve_text(
    ctx: &ResolveContext<'_, '_>,
    annotation: &RootAnnotation,
    enclosure: Option<&EnclosureData>,
    spec: &Value,
) -> Result<Resolved<TextPlacement>, AnnotationError> {
    let text = annotation
        .text
        .as_ref()
        .ok_or_else(|| AnnotationError::missing(KIND, "text"))?;
    let target = annotation.require_target(KIND)?;
    let id = text.id.clone().unwrap_or_else(|| KIND.to_string());
    let anchor = match &text.position {
        Some(TextPosition::Anchor(anchor)) => *anchor,
        _ => Anchor::Auto,
    };

    let placement = match (&text.position, enclosure, target) {
        (Some(TextPosition::Fixed(position)), _, _) => {
            Placed::One(ctx.query.resolve_fixed(spec, position)?)
        }
        (_, Some(enclosure), _) => {
            if anchor.is_one_dimensional() {
                return Err(AnnotationError::invalid(
                    KIND,
                    format!("1D anchor `{}` cannot place text around an enclosure", anchor),
                ));
            }
            tracing::debug!(%id, enclosure = %enclosure.id, %anchor, "text anchored on enclosure");
            Placed::One(resolve_anchor(anchor, &enclosure.bbox()))
        }
        (_, None, Marker::Fixed(position)) => Placed::One(ctx.query.resolve_fixed(spec, position)?),
        (_, None, Marker::DataPoint(_)) if annotation.connector.is_some() => {
            tracing::debug!(%id, "text deferred to connector");
            Placed::One(ctx.config.deferred_text_point)
        }
        (_, None, Marker::DataPoint(marker)) => {
            let items = ctx.items(spec, marker, KIND)?;
            tracing::debug!(%id, matched = items.len(), "one label per matched item");
            Placed::Many(
                items
                    .iter()
                    .map(|item| resolve_anchor(anchor, &item.bbox()))
                    .collect(),
            )
        }
    };

    let dx = text.dx.unwrap_or(0.0);
    let dy = text.dy.unwrap_or(0.0);
    let label = |id: String, p: Point| {
        let p = p.offset(dx, dy);
        TextData {
            id,
            x: p.x,
            y: p.y,
            text: text.text.clone(),
        }
    };

    let data = match placement {
        Placed::One(p) => TextPlacement::One(label(id, p)),
        Placed::Many(points) => TextPlacement::Many(
            points
                .into_iter()
                .enumerate()
                .map(|(i, p)| label(format!("{}_{}", id, i), p))
                .collect(),
        ),
    };

    let marks = data.labels().iter().map(|label| text_mark(ctx, text, label)).collect();
    Ok(Resolved { marks, data })
}

enum Placed {
    One(Point),
    Many(Vec<Point>),
}

fn text_mark(ctx: &ResolveContext<'_, '_>, text: &TextAnnotation, label: &TextData) -> Value {
    let style = text.style.merged_over(&ctx.config.styles.text);
    MarkBuilder::new(label.id.as_str(), "text")
        .value("x", label.x)
        .value("y", label.y)
        .value("text", label.text.as_str())
        .style(|update| style.encode_into(update))
        .build()
}
