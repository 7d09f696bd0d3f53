//! End-to-end tests: normalize, compile and annotate with fake collaborators

use std::cell::Cell;

use chart_annotate::scene::LinearScale;
use chart_annotate::{
    AnnotateConfig, AnnotationError, Annotator, ChartCompiler, ErrorKind, LayeredPolicy, RenderedScene,
    SceneItem, SceneRenderer, TextPlacement,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Drops `annotations` like a real normalizer drops unknown keys, and always
/// compiles to the same low-level spec
struct FakeCompiler {
    compiled: Value,
    fail: bool,
}

impl FakeCompiler {
    fn new(mark_names: &[&str]) -> Self {
        let marks: Vec<Value> = mark_names
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "type": "rect",
                    "from": {"data": "source_0"},
                    "encode": {"update": {"x": {"scale": "x", "field": "a"}, "y": {"scale": "y", "field": "b"}}}
                })
            })
            .collect();
        Self {
            compiled: json!({"data": [{"name": "source_0"}], "marks": marks}),
            fail: false,
        }
    }
}

impl ChartCompiler for FakeCompiler {
    fn normalize(&self, spec: &Value) -> Result<Value, AnnotationError> {
        let mut normalized = spec.clone();
        if let Some(o) = normalized.as_object_mut() {
            o.remove("annotations");
        }
        if let Some(layers) = normalized.get_mut("layer").and_then(Value::as_array_mut) {
            for layer in layers.iter_mut().filter_map(Value::as_object_mut) {
                layer.remove("annotations");
            }
        }
        Ok(normalized)
    }

    fn compile(&self, normalized: &Value) -> Result<Value, AnnotationError> {
        if self.fail {
            return Err(AnnotationError::render("compiler exploded"));
        }
        assert!(normalized.get("annotations").is_none(), "annotations reached the compiler");
        Ok(self.compiled.clone())
    }
}

/// Renders fixed data marks plus every value-encoded rect of the spec
struct FakeRenderer {
    data_marks: Value,
    renders: Cell<usize>,
}

impl FakeRenderer {
    /// Bars for rows `A`, `B`, `C` under `bars`, and optionally dots for the
    /// same rows under `dots`
    fn new(bars: &str, dots: Option<&str>) -> Self {
        let mut marks = vec![json!({"marktype": "rect", "name": bars, "items": [
            {"x": 0, "y": 50, "width": 10, "height": 50,
             "bounds": {"x1": 0, "y1": 50, "x2": 10, "y2": 100}, "datum": {"a": "A", "b": 28}},
            {"x": 20, "y": 20, "width": 10, "height": 80,
             "bounds": {"x1": 20, "y1": 20, "x2": 30, "y2": 100}, "datum": {"a": "B", "b": 55}},
            {"x": 40, "y": 30, "width": 10, "height": 70,
             "bounds": {"x1": 40, "y1": 30, "x2": 50, "y2": 100}, "datum": {"a": "C", "b": 43}}
        ]})];
        if let Some(dots) = dots {
            marks.push(json!({"marktype": "symbol", "name": dots, "items": [
                {"bounds": {"x1": 3, "y1": 42, "x2": 7, "y2": 46}, "datum": {"a": "A", "b": 28}},
                {"bounds": {"x1": 23, "y1": 43, "x2": 27, "y2": 47}, "datum": {"a": "B", "b": 55}}
            ]}));
        }
        Self {
            data_marks: Value::Array(marks),
            renders: Cell::new(0),
        }
    }
}

impl SceneRenderer for FakeRenderer {
    fn render(&self, spec: &Value) -> Result<RenderedScene, AnnotationError> {
        self.renders.set(self.renders.get() + 1);
        let mut marks = self.data_marks.as_array().cloned().unwrap_or_default();
        for mark in spec["marks"].as_array().into_iter().flatten() {
            if mark["type"] != "rect" {
                continue;
            }
            let value = |channel: &str| {
                mark.pointer(&format!("/encode/update/{}/value", channel))
                    .and_then(Value::as_f64)
            };
            if let (Some(x), Some(y)) = (value("x"), value("y")) {
                let (width, height) = (value("width").unwrap_or(0.0), value("height").unwrap_or(0.0));
                marks.push(json!({"marktype": "rect", "name": mark["name"], "items": [
                    {"x": x, "y": y, "width": width, "height": height,
                     "bounds": {"x1": x, "y1": y, "x2": x + width, "y2": y + height}}
                ]}));
            }
        }
        let root: SceneItem = serde_json::from_value(json!({
            "marktype": "group",
            "items": [{"items": marks}]
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

fn unit_annotator() -> Annotator<FakeCompiler, FakeRenderer> {
    Annotator::new(FakeCompiler::new(&["marks"]), FakeRenderer::new("marks", None))
}

fn names(spec: &Value) -> Vec<&str> {
    spec["marks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect()
}

#[test]
fn test_unit_spec_enclosure_text_and_connector() {
    init_tracing();
    let spec = json!({
        "mark": "bar",
        "encoding": {"x": {"field": "a"}, "y": {"field": "b"}},
        "annotations": [{
            "target": {"type": "data-expr", "expr": "datum.b > 40"},
            "enclosure": {"padding": 5},
            "text": {"text": "above 40", "position": "upperLeft"},
            "connector": {"endArrow": true}
        }]
    });

    let scene = unit_annotator().annotate(&spec).unwrap();
    assert_eq!(
        names(&scene.spec),
        vec![
            "marks",
            "annotation_0_enclosure",
            "annotation_0_text",
            "annotation_0_connector_0_0",
            "annotation_0_connector_0_0_end_arrow",
        ]
    );

    let resolved = scene.outcomes[0].result.as_ref().unwrap();
    let enclosure = resolved.enclosure.as_ref().unwrap();
    assert_eq!(
        (enclosure.x, enclosure.y, enclosure.x2, enclosure.y2),
        (15.0, 15.0, 55.0, 105.0)
    );

    let label = &resolved.text.as_ref().unwrap().labels()[0];
    assert_eq!((label.x, label.y), (15.0, 15.0));

    // enclosure center to the label, through a basis curve
    let connector = &resolved.connector.as_ref().unwrap()[0];
    assert_eq!(
        (connector.x, connector.y, connector.x2, connector.y2),
        (35.0, 60.0, 15.0, 15.0)
    );

    let arrow = &scene.spec["marks"][4];
    assert_eq!(arrow["type"], "symbol");
    assert_eq!(arrow["encode"]["update"]["x"]["value"], json!(15.0));
    assert_eq!(arrow["encode"]["update"]["shape"]["value"], "triangle-right");
}

#[test]
fn test_connect_to_fans_out_over_matches() {
    let spec = json!({
        "mark": "bar",
        "annotations": [{
            "target": {"type": "data-index", "indices": [0, 1, 2]},
            "connector": {
                "curve": "linear",
                "connect_to": {"target": {"type": "data-index", "indices": [0, 2]}, "position": "upperMiddle"}
            }
        }]
    });

    let scene = unit_annotator().annotate(&spec).unwrap();
    let connectors = scene.outcomes[0].result.as_ref().unwrap().connector.clone().unwrap();
    let ids: Vec<&str> = connectors.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "annotation_0_connector_0_0",
            "annotation_0_connector_0_1",
            "annotation_0_connector_1_0",
            "annotation_0_connector_1_1",
            "annotation_0_connector_2_0",
            "annotation_0_connector_2_1",
        ]
    );
    // bar B center to bar C top
    let c = &connectors[3];
    assert_eq!((c.x, c.y, c.x2, c.y2), (25.0, 60.0, 45.0, 30.0));
}

#[test]
fn test_connector_without_endpoints_is_silently_skipped() {
    let spec = json!({
        "mark": "bar",
        "annotations": [{
            "target": {"type": "data-index", "index": 0},
            "connector": {"connect_to": {"target": {"type": "data-index", "index": 7}}}
        }]
    });

    let scene = unit_annotator().annotate(&spec).unwrap();
    assert_eq!(names(&scene.spec), vec!["marks"]);
    assert_eq!(scene.outcomes[0].result.as_ref().unwrap().connector, None);
    assert_eq!(scene.failures().count(), 0);
}

#[test]
fn test_failures_are_isolated_per_annotation() {
    init_tracing();
    let spec = json!({
        "mark": "bar",
        "annotations": [
            {"enclosure": {}},
            {"target": {"type": "data-expr", "expr": "datum.b >"}, "enclosure": {}},
            {"target": {"type": "data-space", "x": 50, "y": 50}, "text": {"text": "mid"}},
            {
                "target": {"type": "pixel-space", "x": 0, "y": 0},
                "enclosure": {},
                "text": {"text": "x", "position": "start"}
            }
        ]
    });

    let scene = unit_annotator().annotate(&spec).unwrap();
    let kinds: Vec<(usize, ErrorKind)> = scene.failures().map(|(i, e)| (i, e.error_kind())).collect();
    assert_eq!(
        kinds,
        vec![
            (0, ErrorKind::Config),
            (1, ErrorKind::TargetResolution),
            (3, ErrorKind::Config),
        ]
    );

    // the enclosure of the last annotation was appended before its text failed
    assert_eq!(
        names(&scene.spec),
        vec!["marks", "annotation_2_text", "annotation_3_enclosure"]
    );
    let label = &scene.spec["marks"][1]["encode"]["update"];
    assert_eq!((label["x"]["value"].clone(), label["y"]["value"].clone()), (json!(100.0), json!(50.0)));
}

#[test]
fn test_compile_failure_fails_the_call() {
    let mut compiler = FakeCompiler::new(&["marks"]);
    compiler.fail = true;
    let annotator = Annotator::new(compiler, FakeRenderer::new("marks", None));
    let err = annotator.apply_annotations(&json!({"mark": "bar"})).unwrap_err();
    assert_eq!(err.error_kind(), ErrorKind::Render);
}

#[test]
fn test_normalize_round_trips_layer_annotations() {
    let annotator = Annotator::new(FakeCompiler::new(&["marks"]), FakeRenderer::new("marks", None));
    let spec = json!({
        "layer": [
            {"mark": "bar", "annotations": [{"text": {"text": "a"}}]},
            {"name": "dots", "mark": "point", "annotations": [{"text": {"text": "b"}}]}
        ],
        "annotations": [{"text": {"text": "top"}}]
    });

    let normalized = annotator.normalize_annotated_spec(&spec).unwrap();
    assert_eq!(normalized["layer"][0]["name"], "layer_0");
    assert_eq!(normalized["layer"][0]["annotations"][0]["text"]["text"], "a");
    assert_eq!(normalized["layer"][1]["annotations"][0]["text"]["text"], "b");
    assert_eq!(normalized["annotations"][0]["text"]["text"], "top");

    let compiled = annotator.compile_annotated_spec(&normalized).unwrap();
    assert_eq!(names(&compiled), vec!["marks"]);
}

fn layered_spec() -> Value {
    json!({
        "layer": [
            {"mark": "bar"},
            {"name": "dots", "mark": "point", "annotations": [
                {"target": {"type": "data-index", "index": 0}, "text": {"text": "first"}}
            ]}
        ],
        "annotations": [
            {"target": {"type": "data-index", "index": 1}, "text": {"text": "B", "position": "upperMiddle"}}
        ]
    })
}

#[test]
fn test_layer_annotations_only_see_their_layer() {
    let annotator = Annotator::new(
        FakeCompiler::new(&["layer_0_marks", "dots_marks"]),
        FakeRenderer::new("layer_0_marks", Some("dots_marks")),
    );
    let scene = annotator.annotate(&layered_spec()).unwrap();

    // top-level: bar B and dot B
    let top = scene.outcomes[0].result.as_ref().unwrap().text.clone().unwrap();
    assert_eq!(top.points().len(), 2);
    assert_eq!(scene.outcomes[0].layer, None);

    let dots = &scene.outcomes[1];
    assert_eq!(dots.layer.as_deref(), Some("dots"));
    let TextPlacement::Many(labels) = dots.result.as_ref().unwrap().text.clone().unwrap() else {
        panic!("expected one label per match");
    };
    assert_eq!(labels.len(), 1);
    assert_eq!((labels[0].id.as_str(), labels[0].x, labels[0].y), ("annotation_1_text_0", 5.0, 44.0));
}

#[test]
fn test_composite_policy_matches_every_layer() {
    let annotator = Annotator::with_config(
        FakeCompiler::new(&["layer_0_marks", "dots_marks"]),
        FakeRenderer::new("layer_0_marks", Some("dots_marks")),
        AnnotateConfig::default().with_layered_policy(LayeredPolicy::Composite),
    );
    let scene = annotator.annotate(&layered_spec()).unwrap();
    let labels = scene.outcomes[1].result.as_ref().unwrap().text.clone().unwrap();
    let points: Vec<(f64, f64)> = labels.points().iter().map(|p| (p.x, p.y)).collect();
    assert_eq!(points, vec![(5.0, 75.0), (5.0, 44.0)]);
}

#[test]
fn test_occupancy_includes_annotation_marks() {
    let spec = json!({
        "mark": "bar",
        "annotations": [
            {"target": {"type": "pixel-space", "x": 60, "y": 5}, "enclosure": {}},
            {"target": {"type": "pixel-space", "x": 80, "y": 5}, "enclosure": {}}
        ]
    });
    let annotator = unit_annotator();
    let annotated = annotator.apply_annotations(&spec).unwrap();
    assert!(annotator.compute_occupancy_matrix(&annotated).unwrap()[10][65]);

    let base = annotator
        .compile_annotated_spec(&annotator.normalize_annotated_spec(&spec).unwrap())
        .unwrap();
    let grid = annotator.compute_occupancy_matrix(&base).unwrap();
    assert!(!grid[10][65]);
    assert!(grid[60][5]);
}

#[test]
fn test_renders_are_reused_while_spec_is_unchanged() {
    let annotator = unit_annotator();
    let spec = json!({
        "mark": "bar",
        "annotations": [
            {"target": {"type": "data-index", "index": 0}, "text": {"text": "a"}},
            {"target": {"type": "data-index", "index": 1}, "text": {"text": "b"}},
            {"target": {"type": "data-index", "index": 2}, "enclosure": {}}
        ]
    });
    annotator.apply_annotations(&spec).unwrap();
    // the base spec, then once after each appended label
    assert_eq!(annotator.renderer().renders.get(), 3);
}
