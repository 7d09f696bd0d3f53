//! Scene query service: renders a low-level spec and reads geometry back

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use super::item::{HasDatum, ItemGeometry, SceneItem};
use super::occupancy::occupancy_grid;
use super::scale::Scale;
use crate::annotation::{DataPointMarker, FixedPosition, Space};
use crate::error::{AnnotationError, AnnotationKind};
use crate::expr::Predicate;
use crate::geometry::{scale_names_of, Point};

/// Dataset consulted when the spec does not name one
pub const DEFAULT_DATASET: &str = "source";

/// Executes a low-level spec and exposes the resulting scene
pub trait SceneRenderer {
    fn render(&self, spec: &Value) -> Result<RenderedScene, AnnotationError>;
}

/// Output of one render: the scene tree, the named datasets and the scales
#[derive(Default)]
pub struct RenderedScene {
    pub root: SceneItem,
    pub datasets: HashMap<String, Vec<Value>>,
    pub scales: HashMap<String, Box<dyn Scale>>,
}

impl RenderedScene {
    pub fn new(root: SceneItem) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    pub fn with_dataset(mut self, name: impl Into<String>, rows: Vec<Value>) -> Self {
        self.datasets.insert(name.into(), rows);
        self
    }

    pub fn with_scale(mut self, name: impl Into<String>, scale: impl Scale + 'static) -> Self {
        self.scales.insert(name.into(), Box::new(scale));
        self
    }

    pub fn scale(&self, name: &str) -> Option<&dyn Scale> {
        self.scales.get(name).map(|s| s.as_ref())
    }

    pub fn dataset(&self, name: &str) -> Option<&[Value]> {
        self.datasets.get(name).map(Vec::as_slice)
    }
}

/// Memoizing front end over a [`SceneRenderer`].
///
/// The last render is reused for as long as the spec serializes to the same
/// string.
pub struct SceneQuery<'r> {
    renderer: &'r dyn SceneRenderer,
    cache: RefCell<Option<(String, Rc<RenderedScene>)>>,
}

impl<'r> SceneQuery<'r> {
    pub fn new(renderer: &'r dyn SceneRenderer) -> Self {
        Self {
            renderer,
            cache: RefCell::new(None),
        }
    }

    /// Render `spec`, or return the cached scene for an identical spec
    pub fn render(&self, spec: &Value) -> Result<Rc<RenderedScene>, AnnotationError> {
        let key = serde_json::to_string(spec).map_err(|e| AnnotationError::render(e.to_string()))?;
        if let Some((cached_key, scene)) = self.cache.borrow().as_ref() {
            if *cached_key == key {
                tracing::trace!("reusing cached render");
                return Ok(Rc::clone(scene));
            }
        }

        tracing::debug!(spec_bytes = key.len(), "rendering scene");
        let scene = Rc::new(self.renderer.render(spec)?);
        *self.cache.borrow_mut() = Some((key, Rc::clone(&scene)));
        Ok(scene)
    }

    /// A function mapping data values to pixels along the named scale
    pub fn scale_lookup(
        &self,
        spec: &Value,
        name: &str,
    ) -> Result<impl Fn(f64) -> f64, AnnotationError> {
        let scene = self.render(spec)?;
        if scene.scale(name).is_none() {
            return Err(AnnotationError::unresolved(
                AnnotationKind::Scene,
                format!("scale `{}` not found in rendered scene", name),
            ));
        }
        let name = name.to_string();
        Ok(move |value| scene.scale(&name).map_or(f64::NAN, |s| s.apply(value)))
    }

    /// Pixel coordinates of a fixed position, converting data space through
    /// the scales bound to the first mark
    pub fn resolve_fixed(&self, spec: &Value, position: &FixedPosition) -> Result<Point, AnnotationError> {
        match position.space {
            Space::PixelSpace => Ok(Point::new(position.x, position.y)),
            Space::DataSpace => {
                let names = scale_names_of(spec)?;
                let x = self.scale_lookup(spec, &names.x)?;
                let y = self.scale_lookup(spec, &names.y)?;
                Ok(Point::new(x(position.x), y(position.y)))
            }
        }
    }

    /// Geometry of every rendered item backing a row selected by `marker`.
    ///
    /// Items are reported in row order. With `scope` set only items of marks
    /// whose name starts with it are considered. Expression failures are
    /// logged and produce no matches.
    pub fn bounding_boxes_for(
        &self,
        spec: &Value,
        marker: &DataPointMarker,
        scope: Option<&str>,
        kind: AnnotationKind,
    ) -> Result<Vec<ItemGeometry>, AnnotationError> {
        let scene = self.render(spec)?;
        let items: Vec<(Option<&str>, &SceneItem)> = scene
            .root
            .data_items()
            .into_iter()
            .filter(|(mark, _)| match scope {
                Some(prefix) => mark.is_some_and(|m| m.starts_with(prefix)),
                None => true,
            })
            .collect();

        let dataset_name = spec
            .pointer("/data/0/name")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_DATASET);
        let dataset = scene.dataset(dataset_name);

        let geometry = |(mark, item): &(Option<&str>, &SceneItem)| ItemGeometry::from_item(item, *mark);

        let matched: Vec<ItemGeometry> = match (marker, dataset) {
            (DataPointMarker::DataExpr { expr }, Some(rows)) => {
                let selected = filter_rows(expr, rows.iter());
                match_rows(&selected, &items).map(geometry).collect()
            }
            (DataPointMarker::DataExpr { expr }, None) => {
                tracing::debug!(dataset = dataset_name, "dataset missing, evaluating against item data");
                let datums = items.iter().filter_map(|(_, item)| item.datum());
                let selected = filter_rows(expr, datums);
                items
                    .iter()
                    .filter(|(_, item)| {
                        item.datum()
                            .is_some_and(|d| selected.iter().any(|row| std::ptr::eq(*row, d)))
                    })
                    .map(geometry)
                    .collect()
            }
            (DataPointMarker::DataIndex { .. }, Some(rows)) => {
                let selected: Vec<&Value> = marker
                    .requested_indices(kind)?
                    .into_iter()
                    .filter_map(|i| usize::try_from(i).ok().and_then(|i| rows.get(i)))
                    .collect();
                match_rows(&selected, &items).map(geometry).collect()
            }
            (DataPointMarker::DataIndex { .. }, None) => {
                tracing::debug!(dataset = dataset_name, "dataset missing, indexing items directly");
                marker
                    .requested_indices(kind)?
                    .into_iter()
                    .filter_map(|i| usize::try_from(i).ok().and_then(|i| items.get(i)))
                    .map(geometry)
                    .collect()
            }
        };

        tracing::debug!(%kind, matched = matched.len(), "resolved data-point marker");
        Ok(matched)
    }

    /// Coarse occupancy grid of the rendered scene, `height` rows of `width` cells
    pub fn occupancy_matrix(
        &self,
        spec: &Value,
        width: usize,
        height: usize,
    ) -> Result<Vec<Vec<bool>>, AnnotationError> {
        let scene = self.render(spec)?;
        Ok(occupancy_grid(&scene.root, width, height))
    }
}

/// Rows for which the data-expr is truthy; empty on any failure
fn filter_rows<'v>(expr: &str, rows: impl Iterator<Item = &'v Value>) -> Vec<&'v Value> {
    let predicate = match Predicate::compile(expr) {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(expr, report = %err.format(expr), "cannot parse data-expr");
            return Vec::new();
        }
    };
    let mut selected = Vec::new();
    for row in rows {
        match predicate.matches(row) {
            Ok(true) => selected.push(row),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(expr, error = %err, "cannot evaluate data-expr");
                return Vec::new();
            }
        }
    }
    selected
}

/// For each selected row in order, every item whose datum carries the row
fn match_rows<'i, 'a>(
    rows: &'i [&'i Value],
    items: &'i [(Option<&'a str>, &'a SceneItem)],
) -> impl Iterator<Item = &'i (Option<&'a str>, &'a SceneItem)> + 'i {
    rows.iter().flat_map(move |row| {
        items
            .iter()
            .filter(move |(_, item)| item.datum().is_some_and(|d| datum_matches(row, d)))
    })
}

/// A row matches a datum when every field of the row is present on the datum
/// with an equal value
fn datum_matches(row: &Value, datum: &Value) -> bool {
    match row {
        Value::Object(fields) => fields
            .iter()
            .all(|(key, value)| datum.get(key).is_some_and(|d| values_equal(value, d))),
        other => values_equal(other, datum),
    }
}

/// Structural equality that treats `1` and `1.0` as the same number
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::scale::LinearScale;
    use serde_json::json;
    use std::cell::Cell;

    struct CountingRenderer {
        renders: Cell<usize>,
    }

    impl SceneRenderer for CountingRenderer {
        fn render(&self, _spec: &Value) -> Result<RenderedScene, AnnotationError> {
            self.renders.set(self.renders.get() + 1);
            let root: SceneItem = serde_json::from_value(json!({
                "marktype": "group",
                "items": [{"items": [
                    {"marktype": "rect", "name": "marks", "items": [
                        {"x": 0, "y": 50, "width": 10, "height": 50, "datum": {"a": "A", "b": 28}},
                        {"x": 20, "y": 20, "width": 10, "height": 80, "datum": {"a": "B", "b": 55}},
                        {"x": 40, "y": 30, "width": 10, "height": 70, "datum": {"a": "C", "b": 43}}
                    ]}
                ]}]
            }))
            .unwrap();
            Ok(RenderedScene::new(root)
                .with_dataset(
                    "source_0",
                    vec![
                        json!({"a": "A", "b": 28}),
                        json!({"a": "B", "b": 55}),
                        json!({"a": "C", "b": 43}),
                    ],
                )
                .with_scale("x", LinearScale::new((0.0, 100.0), (0.0, 200.0)))
                .with_scale("y", LinearScale::new((0.0, 100.0), (100.0, 0.0))))
        }
    }

    fn spec() -> Value {
        json!({
            "data": [{"name": "source_0"}],
            "marks": [{"name": "marks", "encode": {"update": {"x": {"scale": "x"}, "y": {"scale": "y"}}}}]
        })
    }

    fn renderer() -> CountingRenderer {
        CountingRenderer {
            renders: Cell::new(0),
        }
    }

    #[test]
    fn test_render_is_memoized_per_spec() {
        let r = renderer();
        let query = SceneQuery::new(&r);
        let s = spec();
        query.render(&s).unwrap();
        query.render(&s).unwrap();
        assert_eq!(r.renders.get(), 1);

        let mut changed = s.clone();
        changed["marks"].as_array_mut().unwrap().push(json!({"type": "text"}));
        query.render(&changed).unwrap();
        assert_eq!(r.renders.get(), 2);
    }

    #[test]
    fn test_data_space_goes_through_first_mark_scales() {
        let r = renderer();
        let query = SceneQuery::new(&r);
        let p = query.resolve_fixed(&spec(), &FixedPosition::data(50.0, 25.0)).unwrap();
        assert_eq!(p, Point::new(100.0, 75.0));
    }

    #[test]
    fn test_data_index_silently_drops_out_of_range() {
        let r = renderer();
        let query = SceneQuery::new(&r);
        let found = query
            .bounding_boxes_for(
                &spec(),
                &DataPointMarker::indices(vec![2, 7, -1, 0]),
                None,
                AnnotationKind::Enclosure,
            )
            .unwrap();
        let xs: Vec<f64> = found.iter().map(|g| g.x).collect();
        assert_eq!(xs, vec![40.0, 0.0]);
    }

    #[test]
    fn test_data_expr_matches_rows_by_value() {
        let r = renderer();
        let query = SceneQuery::new(&r);
        let found = query
            .bounding_boxes_for(&spec(), &DataPointMarker::expr("datum.b > 40"), None, AnnotationKind::Text)
            .unwrap();
        let xs: Vec<f64> = found.iter().map(|g| g.x).collect();
        assert_eq!(xs, vec![20.0, 40.0]);
        assert_eq!(found[0].mark.as_deref(), Some("marks"));
    }

    #[test]
    fn test_broken_expression_matches_nothing() {
        let r = renderer();
        let query = SceneQuery::new(&r);
        let found = query
            .bounding_boxes_for(&spec(), &DataPointMarker::expr("datum.b >"), None, AnnotationKind::Text)
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_scope_restricts_to_mark_prefix() {
        let r = renderer();
        let query = SceneQuery::new(&r);
        let found = query
            .bounding_boxes_for(
                &spec(),
                &DataPointMarker::index(0),
                Some("layer_1"),
                AnnotationKind::Text,
            )
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_scale_is_target_resolution_error() {
        let r = renderer();
        let query = SceneQuery::new(&r);
        let err = query.scale_lookup(&spec(), "color").err().unwrap();
        assert_eq!(err.error_kind(), crate::error::ErrorKind::TargetResolution);
    }

    #[test]
    fn test_integer_and_float_numbers_match() {
        assert!(datum_matches(&json!({"b": 28}), &json!({"b": 28.0, "extra": true})));
        assert!(!datum_matches(&json!({"b": 28, "c": 1}), &json!({"b": 28})));
    }
}
