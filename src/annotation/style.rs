//! Style records and the built-in default style tables
//!
//! Every style property an author leaves out is filled from [`StyleDefaults`],
//! which is a TOML document that can be replaced from a string or a file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Errors that can occur when loading style defaults
#[derive(Error, Debug)]
pub enum StyleDefaultsError {
    #[error("Failed to read style defaults file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse style defaults TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Declares a style record whose fields are all optional.
///
/// Each field names its JSON key; `as <expr>` overrides the encode channel
/// it is written to (`None` keeps it out of the mark encoding).
macro_rules! style_record {
    (@channel $key:literal) => { Some($key) };
    (@channel $key:literal, $channel:expr) => { $channel };
    (
        $(#[$meta:meta])*
        $name:ident {
            $($field:ident: $ty:ty => $key:literal $(as $channel:expr)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            $(
                #[serde(rename = $key, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )*
        }

        impl $name {
            /// Author values first, `defaults` for everything left unset
            pub fn merged_over(&self, defaults: &Self) -> Self {
                Self {
                    $($field: self.$field.clone().or_else(|| defaults.$field.clone()),)*
                }
            }

            /// Write every set property as a `{value: ..}` channel
            pub fn encode_into(&self, update: &mut Map<String, Value>) {
                $(
                    let channel: Option<&'static str> = style_record!(@channel $key $(, $channel)?);
                    if let (Some(value), Some(channel)) = (&self.$field, channel) {
                        update.insert(channel.to_string(), json!({ "value": value }));
                    }
                )*
            }
        }
    };
}

style_record! {
    /// Stroke properties shared by connector paths and enclosure outlines
    LineStyle {
        opacity: f64 => "opacity",
        stroke: String => "stroke",
        stroke_width: f64 => "strokeWidth",
        stroke_dash: Vec<f64> => "strokeDash",
        stroke_dash_offset: f64 => "strokeDashOffset",
        stroke_join: String => "strokeJoin",
        stroke_miter_limit: f64 => "strokeMiterLimit",
        blend: String => "blend",
        cursor: String => "cursor",
        tooltip: Value => "tooltip",
        z_index: f64 => "zIndex",
        stroke_cap: String => "strokeCap",
    }
}

style_record! {
    TextStyle {
        opacity: f64 => "opacity",
        cursor: String => "cursor",
        tooltip: Value => "tooltip",
        z_index: f64 => "zIndex",
        align: String => "align",
        angle: f64 => "angle",
        baseline: String => "baseline",
        dir: String => "dir",
        ellipsis: String => "ellipsis",
        font: String => "font",
        font_size: f64 => "fontSize",
        font_style: String => "fontStyle",
        font_weight: String => "fontWeight",
        line_break: String => "lineBreak",
        line_height: f64 => "lineHeight",
        limit: f64 => "limit",
        radius: f64 => "radius",
        theta: f64 => "theta",
        color: String => "color" as Some("fill"),
        href: String => "href",
    }
}

style_record! {
    /// Arrowhead symbol style; `rotationAdjust` turns the symbol, it is not a channel
    ArrowStyle {
        fill: String => "fill",
        size: f64 => "size",
        shape: String => "shape",
        rotation_adjust: f64 => "rotationAdjust" as None,
        opacity: f64 => "opacity",
        stroke: String => "stroke",
        stroke_width: f64 => "strokeWidth",
    }
}

/// Enclosure fill plus a nested outline style
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnclosureStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub stroke: LineStyle,
}

impl EnclosureStyle {
    pub fn merged_over(&self, defaults: &Self) -> Self {
        Self {
            opacity: self.opacity.or(defaults.opacity),
            fill: self.fill.clone().or_else(|| defaults.fill.clone()),
            fill_opacity: self.fill_opacity.or(defaults.fill_opacity),
            href: self.href.clone().or_else(|| defaults.href.clone()),
            stroke: self.stroke.merged_over(&defaults.stroke),
        }
    }

    /// The outline's own opacity is not a channel; the enclosure opacity wins
    pub fn encode_into(&self, update: &mut Map<String, Value>) {
        let outline = LineStyle {
            opacity: None,
            ..self.stroke.clone()
        };
        outline.encode_into(update);
        if let Some(opacity) = self.opacity {
            update.insert("opacity".to_string(), json!({ "value": opacity }));
        }
        if let Some(fill) = &self.fill {
            update.insert("fill".to_string(), json!({ "value": fill }));
        }
        if let Some(fill_opacity) = self.fill_opacity {
            update.insert("fillOpacity".to_string(), json!({ "value": fill_opacity }));
        }
        if let Some(href) = &self.href {
            update.insert("href".to_string(), json!({ "value": href }));
        }
    }
}

/// Default style tables for every annotation kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDefaults {
    pub enclosure: EnclosureStyle,
    /// Uniform corner radius of enclosures that declare none
    #[serde(rename = "cornerRadius")]
    pub corner_radius: f64,
    pub text: TextStyle,
    pub connector: LineStyle,
    pub arrow: ArrowStyle,
}

/// Built-in defaults
const DEFAULT_STYLES: &str = r##"
cornerRadius = 0

[enclosure]
opacity = 0.8
fill = "lightblue"
fillOpacity = 0.8
href = ""

[enclosure.stroke]
stroke = "blue"
strokeWidth = 1
strokeCap = "butt"
strokeDash = []
strokeDashOffset = 0
strokeJoin = "miter"
strokeMiterLimit = 10
blend = "normal"
cursor = "default"
tooltip = ""
zIndex = 0

[text]
align = "center"
angle = 0
baseline = "middle"
dir = "ltr"
ellipsis = "..."
font = "Helvetica Neue"
fontSize = 12
fontWeight = "normal"
fontStyle = "normal"
lineBreak = "\n"
lineHeight = 1.2
limit = 0
radius = 0
theta = 0

[connector]
opacity = 1
stroke = "black"
strokeWidth = 1
strokeDash = [10, 5]
strokeDashOffset = 0
strokeJoin = "round"
strokeMiterLimit = 10
cursor = "default"
zIndex = 0
strokeCap = "round"

[arrow]
fill = "black"
size = 150
shape = "triangle-right"
opacity = 1
rotationAdjust = 0
"##;

impl StyleDefaults {
    /// Load style defaults from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, StyleDefaultsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load style defaults from a TOML string.
    ///
    /// Tables and keys left out of `content` fall back to the built-in
    /// defaults.
    pub fn from_str(content: &str) -> Result<Self, StyleDefaultsError> {
        let parsed: StyleDefaults = toml::from_str(content)?;
        Ok(parsed.merged_over(&Self::builtin()))
    }

    /// The built-in tables without any overrides
    pub fn builtin() -> Self {
        // Constant document, checked by test_builtin_tables_parse
        toml::from_str(DEFAULT_STYLES).unwrap_or_default()
    }

    fn merged_over(&self, defaults: &Self) -> Self {
        Self {
            enclosure: self.enclosure.merged_over(&defaults.enclosure),
            corner_radius: self.corner_radius,
            text: self.text.merged_over(&defaults.text),
            connector: self.connector.merged_over(&defaults.connector),
            arrow: self.arrow.merged_over(&defaults.arrow),
        }
    }
}
