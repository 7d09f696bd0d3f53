//! Discovery of the scales bound to the x/y channels of a low-level spec

use serde_json::Value;

use crate::error::{AnnotationError, AnnotationKind};

/// Names of the scales backing the horizontal and vertical position channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleNames {
    pub x: String,
    pub y: String,
}

/// Inspect the first mark's `encode.update` block for scale-backed `x`/`y`.
///
/// Only direct scale references on the first mark are recognized; a mark that
/// positions itself with literal values has no data space to convert into.
pub fn scale_names_of(spec: &Value) -> Result<ScaleNames, AnnotationError> {
    let mark = spec
        .get("marks")
        .and_then(Value::as_array)
        .and_then(|marks| marks.first())
        .ok_or_else(|| AnnotationError::invalid(AnnotationKind::Scene, "no mark found in spec"))?;

    let update = mark.pointer("/encode/update");
    let (Some(x), Some(y)) = (
        update.and_then(|u| u.get("x")),
        update.and_then(|u| u.get("y")),
    ) else {
        return Err(AnnotationError::invalid(
            AnnotationKind::Scene,
            "no x or y encoding found in mark encode update",
        ));
    };

    let scale_of = |channel: &Value| channel.get("scale").and_then(Value::as_str).map(str::to_string);
    match (scale_of(x), scale_of(y)) {
        (Some(x), Some(y)) => Ok(ScaleNames { x, y }),
        _ => Err(AnnotationError::invalid(
            AnnotationKind::Scene,
            "x or y encoding is not backed by a named scale",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_scale_names_from_first_mark() {
        let spec = json!({
            "marks": [
                {"encode": {"update": {"x": {"scale": "x", "field": "a"}, "y": {"scale": "yscale", "field": "b"}}}},
                {"encode": {"update": {"x": {"scale": "other"}, "y": {"scale": "other"}}}}
            ]
        });
        let names = scale_names_of(&spec).unwrap();
        assert_eq!(names.x, "x");
        assert_eq!(names.y, "yscale");
    }

    #[test]
    fn test_no_marks_is_config_error() {
        let err = scale_names_of(&json!({"marks": []})).unwrap_err();
        assert_eq!(err.error_kind(), ErrorKind::Config);
    }

    #[test]
    fn test_missing_channel_is_config_error() {
        let spec = json!({"marks": [{"encode": {"update": {"x": {"scale": "x"}}}}]});
        assert_eq!(scale_names_of(&spec).unwrap_err().error_kind(), ErrorKind::Config);
    }

    #[test]
    fn test_literal_channel_is_rejected() {
        let spec = json!({"marks": [{"encode": {"update": {"x": {"value": 3}, "y": {"scale": "y"}}}}]});
        let err = scale_names_of(&spec).unwrap_err();
        assert!(err.to_string().contains("not backed by a named scale"));
    }
}
