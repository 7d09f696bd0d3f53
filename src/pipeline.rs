//! The annotation pipeline: normalize, compile, then apply every annotation
//!
//! Annotations live under an `annotations` key the chart compiler does not
//! know about. They are lifted off the spec before the compiler sees it and
//! reattached afterwards; layers get a synthetic `layer_<i>` name first so
//! per-layer lists can find their layer again.

use serde_json::Value;

use crate::annotation::RootAnnotation;
use crate::config::{AnnotateConfig, LayeredPolicy};
use crate::error::{AnnotationError, AnnotationKind};
use crate::resolve::{
    append_marks, resolve_connector, resolve_enclosure, resolve_text, ConnectorData, EnclosureData,
    ResolveContext, TextPlacement,
};
use crate::scene::{SceneQuery, SceneRenderer};

const ANNOTATIONS: &str = "annotations";

/// The external chart-grammar compiler
pub trait ChartCompiler {
    /// Expand shorthand into the unit / layer form
    fn normalize(&self, spec: &Value) -> Result<Value, AnnotationError>;

    /// Lower a normalized spec to the renderer's low-level spec
    fn compile(&self, normalized: &Value) -> Result<Value, AnnotationError>;
}

/// Geometry resolved for one annotation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedAnnotation {
    pub enclosure: Option<EnclosureData>,
    pub text: Option<TextPlacement>,
    /// `None` also when the connector had nothing to connect
    pub connector: Option<Vec<ConnectorData>>,
}

/// What happened to one annotation
#[derive(Debug)]
pub struct AnnotationOutcome {
    /// Position in application order, across all layers
    pub index: usize,
    /// Layer the annotation was declared on
    pub layer: Option<String>,
    pub result: Result<ResolvedAnnotation, AnnotationError>,
}

/// A low-level spec with annotation marks appended, plus per-annotation results
#[derive(Debug)]
pub struct AnnotatedScene {
    pub spec: Value,
    pub outcomes: Vec<AnnotationOutcome>,
}

impl AnnotatedScene {
    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = (usize, &AnnotationError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.index, e)))
    }
}

/// Drives a chart compiler and renderer to produce annotated low-level specs
pub struct Annotator<C, R> {
    compiler: C,
    renderer: R,
    config: AnnotateConfig,
}

impl<C: ChartCompiler, R: SceneRenderer> Annotator<C, R> {
    pub fn new(compiler: C, renderer: R) -> Self {
        Self::with_config(compiler, renderer, AnnotateConfig::default())
    }

    pub fn with_config(compiler: C, renderer: R, config: AnnotateConfig) -> Self {
        Self {
            compiler,
            renderer,
            config,
        }
    }

    pub fn config(&self) -> &AnnotateConfig {
        &self.config
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Normalize a chart spec while keeping its annotation lists.
    ///
    /// Unnamed layers are named `layer_<i>`. Specs that are neither layered
    /// nor a unit (`mark` or `encoding`) are rejected.
    pub fn normalize_annotated_spec(&self, spec: &Value) -> Result<Value, AnnotationError> {
        let mut input = spec.clone();
        let top_level = take_annotations(&mut input);

        if let Some(layers) = input.get_mut("layer").and_then(Value::as_array_mut) {
            let mut per_layer = Vec::new();
            for (i, layer) in layers.iter_mut().enumerate() {
                let Some(layer) = layer.as_object_mut() else {
                    continue;
                };
                let name = layer
                    .entry("name")
                    .or_insert_with(|| Value::String(format!("layer_{}", i)))
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                if let Some(annotations) = layer.remove(ANNOTATIONS) {
                    per_layer.push((name, annotations));
                }
            }

            let mut normalized = self.compiler.normalize(&input)?;
            for (name, annotations) in per_layer {
                let layer = normalized
                    .get_mut("layer")
                    .and_then(Value::as_array_mut)
                    .and_then(|layers| {
                        layers
                            .iter_mut()
                            .find(|l| l.get("name").and_then(Value::as_str) == Some(name.as_str()))
                    })
                    .and_then(Value::as_object_mut);
                match layer {
                    Some(layer) => {
                        layer.insert(ANNOTATIONS.to_string(), annotations);
                    }
                    None => {
                        tracing::warn!(layer = %name, "layer lost in normalization, annotations dropped")
                    }
                }
            }
            put_annotations(&mut normalized, top_level)?;
            Ok(normalized)
        } else if input.get("mark").is_some() || input.get("encoding").is_some() {
            let mut normalized = self.compiler.normalize(&input)?;
            put_annotations(&mut normalized, top_level)?;
            Ok(normalized)
        } else {
            Err(AnnotationError::invalid(
                AnnotationKind::Scene,
                "only layered specs and unit specs (with `mark` or `encoding`) can be annotated",
            ))
        }
    }

    /// Compile a normalized annotated spec to the base low-level spec,
    /// without any annotation marks
    pub fn compile_annotated_spec(&self, normalized: &Value) -> Result<Value, AnnotationError> {
        let mut stripped = normalized.clone();
        take_annotations(&mut stripped);
        if let Some(layers) = stripped.get_mut("layer").and_then(Value::as_array_mut) {
            for layer in layers {
                take_annotations(layer);
            }
        }
        self.compiler.compile(&stripped)
    }

    /// Run the whole pipeline and return the annotated low-level spec
    pub fn apply_annotations(&self, spec: &Value) -> Result<Value, AnnotationError> {
        Ok(self.annotate(spec)?.spec)
    }

    /// Run the whole pipeline, reporting the outcome of every annotation.
    ///
    /// Only normalization and compilation errors fail the call. A failing
    /// annotation is logged and skipped; marks it appended before failing
    /// stay in place.
    pub fn annotate(&self, spec: &Value) -> Result<AnnotatedScene, AnnotationError> {
        let normalized = self.normalize_annotated_spec(spec)?;
        let mut low_level = self.compile_annotated_spec(&normalized)?;

        let query = SceneQuery::new(&self.renderer);
        let base = ResolveContext::new(&query, &self.config);
        let mut outcomes = Vec::new();

        let mut batches: Vec<(Option<String>, Option<&Value>)> =
            vec![(None, normalized.get(ANNOTATIONS))];
        if let Some(layers) = normalized.get("layer").and_then(Value::as_array) {
            for layer in layers {
                let name = layer.get("name").and_then(Value::as_str).map(str::to_string);
                batches.push((name, layer.get(ANNOTATIONS)));
            }
        }

        for (layer, annotations) in batches {
            let Some(annotations) = annotations.and_then(Value::as_array) else {
                continue;
            };
            let scope = match (self.config.layered_policy, &layer) {
                (LayeredPolicy::LayerScoped, Some(name)) => Some(name.as_str()),
                _ => None,
            };
            let ctx = base.with_scope(scope);

            for raw in annotations {
                let index = outcomes.len();
                let result = parse_annotation(raw)
                    .and_then(|mut annotation| {
                        annotation.assign_ids(index);
                        apply_annotation(&ctx, &annotation, &mut low_level)
                    })
                    .inspect_err(|error| {
                        tracing::warn!(
                            kind = %error.annotation_kind().unwrap_or(AnnotationKind::Scene),
                            index,
                            layer = layer.as_deref().unwrap_or("-"),
                            %error,
                            "annotation skipped"
                        )
                    });
                outcomes.push(AnnotationOutcome {
                    index,
                    layer: layer.clone(),
                    result,
                });
            }
        }

        tracing::debug!(
            applied = outcomes.iter().filter(|o| o.result.is_ok()).count(),
            total = outcomes.len(),
            "annotations applied"
        );
        Ok(AnnotatedScene {
            spec: low_level,
            outcomes,
        })
    }

    /// Occupancy grid of a low-level spec at the configured size
    pub fn compute_occupancy_matrix(&self, spec: &Value) -> Result<Vec<Vec<bool>>, AnnotationError> {
        let (width, height) = self.config.occupancy_size;
        SceneQuery::new(&self.renderer).occupancy_matrix(spec, width, height)
    }
}

/// Enclosure, then text, then connector; each step sees the marks of the
/// previous ones
fn apply_annotation(
    ctx: &ResolveContext<'_, '_>,
    annotation: &RootAnnotation,
    spec: &mut Value,
) -> Result<ResolvedAnnotation, AnnotationError> {
    let mut resolved = ResolvedAnnotation::default();

    if annotation.enclosure.is_some() {
        let enclosure = resolve_enclosure(ctx, annotation, spec)?;
        append_marks(spec, enclosure.marks)?;
        resolved.enclosure = Some(enclosure.data);
    }

    if annotation.text.is_some() {
        let text = resolve_text(ctx, annotation, resolved.enclosure.as_ref(), spec)?;
        append_marks(spec, text.marks)?;
        resolved.text = Some(text.data);
    }

    if annotation.connector.is_some() {
        let connector = resolve_connector(
            ctx,
            annotation,
            resolved.enclosure.as_ref(),
            resolved.text.as_ref(),
            spec,
        )?;
        if let Some(connector) = connector {
            append_marks(spec, connector.marks)?;
            resolved.connector = Some(connector.data);
        }
    }

    Ok(resolved)
}

fn parse_annotation(raw: &Value) -> Result<RootAnnotation, AnnotationError> {
    serde_json::from_value(raw.clone()).map_err(|e| {
        AnnotationError::invalid(AnnotationKind::Scene, format!("malformed annotation: {}", e))
    })
}

fn take_annotations(spec: &mut Value) -> Option<Value> {
    spec.as_object_mut().and_then(|o| o.remove(ANNOTATIONS))
}

fn put_annotations(spec: &mut Value, annotations: Option<Value>) -> Result<(), AnnotationError> {
    let Some(annotations) = annotations else {
        return Ok(());
    };
    let object = spec.as_object_mut().ok_or_else(|| {
        AnnotationError::invalid(AnnotationKind::Scene, "normalized spec is not an object")
    })?;
    object.insert(ANNOTATIONS.to_string(), annotations);
    Ok(())
}
