//! Low-level marks emitted by the resolvers

use serde_json::{json, Map, Value};

use crate::error::{AnnotationError, AnnotationKind};

/// Build a mark whose channels are all constant `{value: ..}` encodings
#[derive(Debug, Clone)]
pub struct MarkBuilder {
    name: String,
    mark_type: &'static str,
    update: Map<String, Value>,
}

impl MarkBuilder {
    pub fn new(name: impl Into<String>, mark_type: &'static str) -> Self {
        Self {
            name: name.into(),
            mark_type,
            update: Map::new(),
        }
    }

    /// Set one channel
    pub fn value(mut self, channel: &str, value: impl Into<Value>) -> Self {
        let value: Value = value.into();
        self.update.insert(channel.to_string(), json!({ "value": value }));
        self
    }

    /// Let a style record write its channels
    pub fn style(mut self, encode: impl FnOnce(&mut Map<String, Value>)) -> Self {
        encode(&mut self.update);
        self
    }

    pub fn build(self) -> Value {
        json!({
            "name": self.name,
            "type": self.mark_type,
            "encode": { "update": self.update },
        })
    }
}

/// Constant value of a channel of a built mark
pub fn channel_value<'m>(mark: &'m Value, channel: &str) -> Option<&'m Value> {
    mark.pointer(&format!("/encode/update/{}/value", channel))
}

/// Append `marks` to the top-level mark list of a low-level spec
pub fn append_marks(spec: &mut Value, marks: impl IntoIterator<Item = Value>) -> Result<(), AnnotationError> {
    let root = spec
        .as_object_mut()
        .ok_or_else(|| AnnotationError::invalid(AnnotationKind::Scene, "low-level spec is not an object"))?;
    let list = root
        .entry("marks")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| AnnotationError::invalid(AnnotationKind::Scene, "`marks` is not an array"))?;
    list.extend(marks);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_shape() {
        let mark = MarkBuilder::new("note", "text")
            .value("x", 3.5)
            .value("text", "hello")
            .style(|update| {
                update.insert("fill".to_string(), json!({"value": "red"}));
            })
            .build();
        assert_eq!(
            mark,
            json!({
                "name": "note",
                "type": "text",
                "encode": {"update": {
                    "x": {"value": 3.5},
                    "text": {"value": "hello"},
                    "fill": {"value": "red"},
                }},
            })
        );
        assert_eq!(channel_value(&mark, "x"), Some(&json!(3.5)));
        assert_eq!(channel_value(&mark, "y"), None);
    }

    #[test]
    fn test_append_creates_and_extends_mark_list() {
        let mut spec = json!({"width": 200});
        append_marks(&mut spec, vec![json!({"name": "a"})]).unwrap();
        append_marks(&mut spec, vec![json!({"name": "b"}), json!({"name": "c"})]).unwrap();
        let names: Vec<&str> = spec["marks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_append_rejects_malformed_spec() {
        let mut spec = json!({"marks": {}});
        assert!(append_marks(&mut spec, vec![json!({})]).is_err());
        let mut spec = json!([]);
        assert!(append_marks(&mut spec, vec![json!({})]).is_err());
    }
}
