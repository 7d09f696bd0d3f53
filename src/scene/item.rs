//! Read-only view of a rendered scene graph

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::BoundingBox;

/// Anything with a pixel-space extent
pub trait HasBounds {
    /// The item's box, or `None` when it has no drawable geometry
    fn bounding_box(&self) -> Option<BoundingBox>;
}

/// Anything backed by a data row
pub trait HasDatum {
    fn datum(&self) -> Option<&Value>;
}

/// A node of the rendered scene graph.
///
/// Marks carry a `marktype` and hold their items; items carry geometry and
/// the datum they were generated from. Group items hold further marks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marktype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datum: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<SceneItem>,
}

impl SceneItem {
    pub fn is_mark(&self) -> bool {
        self.marktype.is_some()
    }

    /// Depth-first walk over every data-backed item together with the name of
    /// the mark that owns it. Items of group marks are containers and are
    /// descended into but not reported.
    pub fn data_items(&self) -> Vec<(Option<&str>, &SceneItem)> {
        let mut out = Vec::new();
        collect_data_items(self, None, &mut out);
        out
    }
}

fn collect_data_items<'a>(
    node: &'a SceneItem,
    owner: Option<&'a SceneItem>,
    out: &mut Vec<(Option<&'a str>, &'a SceneItem)>,
) {
    if node.is_mark() {
        for child in &node.items {
            collect_data_items(child, Some(node), out);
        }
        return;
    }

    let owner_is_group = owner.and_then(|m| m.marktype.as_deref()) == Some("group");
    if node.datum.is_some() && !owner_is_group {
        out.push((owner.and_then(|m| m.name.as_deref()), node));
    }
    for child in &node.items {
        collect_data_items(child, None, out);
    }
}

impl HasBounds for SceneItem {
    fn bounding_box(&self) -> Option<BoundingBox> {
        if let Some(bounds) = self.bounds.filter(|b| !b.is_empty()) {
            return Some(bounds);
        }
        let (x, y) = (self.x?, self.y?);
        Some(derive_box(x, y, self.width, self.height, self.x2, self.y2))
    }
}

impl HasDatum for SceneItem {
    fn datum(&self) -> Option<&Value> {
        self.datum.as_ref()
    }
}

/// Box from raw item fields, per axis: `width`/`height` first, then the
/// secondary coordinate, else a zero extent
fn derive_box(
    x: f64,
    y: f64,
    width: Option<f64>,
    height: Option<f64>,
    x2: Option<f64>,
    y2: Option<f64>,
) -> BoundingBox {
    let far_x = width.map(|w| x + w).or(x2).unwrap_or(x);
    let far_y = height.map(|h| y + h).or(y2).unwrap_or(y);
    BoundingBox::new(x, y, far_x, far_y)
}

/// Geometry of one scene item matched by a data-point marker
#[derive(Debug, Clone, PartialEq)]
pub struct ItemGeometry {
    /// Name of the mark the item belongs to
    pub mark: Option<String>,
    pub datum: Option<Value>,
    pub bounds: Option<BoundingBox>,
    pub x: f64,
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub x2: Option<f64>,
    pub y2: Option<f64>,
}

impl ItemGeometry {
    pub fn from_item(item: &SceneItem, mark: Option<&str>) -> Self {
        Self {
            mark: mark.map(str::to_string),
            datum: item.datum.clone(),
            bounds: item.bounds,
            x: item.x.unwrap_or(0.0),
            y: item.y.unwrap_or(0.0),
            width: item.width,
            height: item.height,
            x2: item.x2,
            y2: item.y2,
        }
    }

    /// Explicit bounds when the renderer computed them, otherwise derived
    /// from the position fields
    pub fn bbox(&self) -> BoundingBox {
        match self.bounds.filter(|b| !b.is_empty()) {
            Some(bounds) => bounds,
            None => derive_box(self.x, self.y, self.width, self.height, self.x2, self.y2),
        }
    }
}

impl HasBounds for ItemGeometry {
    fn bounding_box(&self) -> Option<BoundingBox> {
        Some(self.bbox())
    }
}

impl HasDatum for ItemGeometry {
    fn datum(&self) -> Option<&Value> {
        self.datum.as_ref()
    }
}
