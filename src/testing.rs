//! Scene fixtures for unit tests

use serde_json::{json, Value};

use crate::error::AnnotationError;
use crate::scene::{LinearScale, RenderedScene, SceneItem, SceneRenderer};

/// Renders a three-bar chart no matter which spec it is given.
///
/// Bars `A`, `B`, `C` have boxes `(0,50)-(10,100)`, `(20,20)-(30,100)` and
/// `(40,30)-(50,100)`. Scale `x` maps `0..100` to `0..200`, scale `y` maps
/// `0..100` to `100..0`.
pub(crate) struct BarChart;

impl SceneRenderer for BarChart {
    fn render(&self, _spec: &Value) -> Result<RenderedScene, AnnotationError> {
        let root: SceneItem = serde_json::from_value(json!({
            "marktype": "group",
            "items": [{"items": [
                {"marktype": "rect", "name": "marks", "items": [
                    {"x": 0, "y": 50, "width": 10, "height": 50,
                     "bounds": {"x1": 0, "y1": 50, "x2": 10, "y2": 100},
                     "datum": {"a": "A", "b": 28}},
                    {"x": 20, "y": 20, "width": 10, "height": 80,
                     "bounds": {"x1": 20, "y1": 20, "x2": 30, "y2": 100},
                     "datum": {"a": "B", "b": 55}},
                    {"x": 40, "y": 30, "width": 10, "height": 70,
                     "bounds": {"x1": 40, "y1": 30, "x2": 50, "y2": 100},
                     "datum": {"a": "C", "b": 43}}
                ]}
            ]}]
        }))
        .map_err(|e| AnnotationError::render(e.to_string()))?;

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

/// Low-level spec matching [`BarChart`]
pub(crate) fn bar_spec() -> Value {
    json!({
        "data": [{"name": "source_0"}],
        "marks": [{
            "name": "marks",
            "type": "rect",
            "encode": {"update": {"x": {"scale": "x", "field": "a"}, "y": {"scale": "y", "field": "b"}}}
        }]
    })
}
