//! Enclosure placement: a rectangle around a target or at a fixed position

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::marks::MarkBuilder;
use super::{ResolveContext, Resolved};
use crate::annotation::{CornerRadius, EnclosureAnnotation, Marker, Padding, RootAnnotation};
use crate::error::{AnnotationError, AnnotationKind};
use crate::geometry::BoundingBox;

const KIND: AnnotationKind = AnnotationKind::Enclosure;

/// Resolved enclosure rectangle, after padding and offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnclosureData {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub x2: f64,
    pub y2: f64,
}

impl EnclosureData {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.x2, self.y2)
    }
}

/// Resolve the enclosure of `annotation` against the current `spec`.
///
/// An explicit `position` wins over the target. Data-point targets enclose
/// the union of every matched item and fail when nothing matched.
pub fn resolve_enclosure(
    ctx: &ResolveContext<'_, '_>,
    annotation: &RootAnnotation,
    spec: &Value,
) -> Result<Resolved<EnclosureData>, AnnotationError> {
    let enclosure = annotation
        .enclosure
        .as_ref()
        .ok_or_else(|| AnnotationError::missing(KIND, "enclosure"))?;
    let target = annotation.require_target(KIND)?;
    let id = enclosure.id.clone().unwrap_or_else(|| KIND.to_string());

    let shape_box = |x: f64, y: f64| {
        let (default_w, default_h) = ctx.config.default_shape_size;
        let shape = enclosure.shape.as_ref();
        let width = shape.and_then(|s| s.width).unwrap_or(default_w);
        let height = shape.and_then(|s| s.height).unwrap_or(default_h);
        BoundingBox::from_origin_size(x, y, width, height)
    };

    let base = match (&enclosure.position, target) {
        (Some(position), _) | (None, Marker::Fixed(position)) => {
            let origin = ctx.query.resolve_fixed(spec, position)?;
            tracing::debug!(%id, x = origin.x, y = origin.y, "enclosure at fixed position");
            shape_box(origin.x, origin.y)
        }
        (None, Marker::DataPoint(marker)) => {
            let items = ctx.items(spec, marker, KIND)?;
            let boxes: Vec<BoundingBox> = items.iter().map(|item| item.bbox()).collect();
            let union = BoundingBox::union_all(&boxes)
                .ok_or_else(|| AnnotationError::unresolved(KIND, "no data points matched the target"))?;
            tracing::debug!(%id, matched = boxes.len(), "enclosure around matched items");
            union
        }
    };

    let (left, top, right, bottom) = enclosure.padding.as_ref().map(Padding::sides).unwrap_or_default();
    let rect = base
        .expand(left, top, right, bottom)
        .translate(enclosure.dx.unwrap_or(0.0), enclosure.dy.unwrap_or(0.0));

    let mark = enclosure_mark(ctx, enclosure, &id, &rect);
    Ok(Resolved {
        marks: vec![mark],
        data: EnclosureData {
            id,
            x: rect.x1,
            y: rect.y1,
            x2: rect.x2,
            y2: rect.y2,
        },
    })
}

fn enclosure_mark(
    ctx: &ResolveContext<'_, '_>,
    enclosure: &EnclosureAnnotation,
    id: &str,
    rect: &BoundingBox,
) -> Value {
    let defaults = &ctx.config.styles;
    let style = enclosure.style.merged_over(&defaults.enclosure);
    let mark = MarkBuilder::new(id, "rect")
        .value("x", rect.x1)
        .value("y", rect.y1)
        .value("width", rect.width())
        .value("height", rect.height())
        .style(|update| style.encode_into(update));

    match enclosure.shape.as_ref().and_then(|s| s.corner_radius) {
        Some(CornerRadius::Corners {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }) => mark
            .value("cornerRadiusTopLeft", top_left.unwrap_or(0.0))
            .value("cornerRadiusTopRight", top_right.unwrap_or(0.0))
            .value("cornerRadiusBottomLeft", bottom_left.unwrap_or(0.0))
            .value("cornerRadiusBottomRight", bottom_right.unwrap_or(0.0)),
        Some(CornerRadius::Uniform(radius)) => mark.value("cornerRadius", radius),
        None => mark.value("cornerRadius", defaults.corner_radius),
    }
    .build()
}
