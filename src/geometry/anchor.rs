//! Anchor tokens and their resolution against a bounding box

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{BoundingBox, Point};

/// A named relative position inside a bounding box.
///
/// Covers both the one-dimensional tokens (`start`, `middle`, `end`) and the
/// two-dimensional grid (`upperLeft` .. `lowerRight`). Unknown tokens parse
/// to [`Anchor::Auto`], which resolves to the box center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Anchor {
    #[default]
    Auto,
    Start,
    Middle,
    End,
    UpperLeft,
    UpperMiddle,
    UpperRight,
    MiddleLeft,
    MiddleMiddle,
    MiddleRight,
    LowerLeft,
    LowerMiddle,
    LowerRight,
}

impl Anchor {
    /// Parse a token, mapping anything unrecognized to `Auto`
    pub fn parse(token: &str) -> Self {
        match token {
            "start" => Anchor::Start,
            "middle" => Anchor::Middle,
            "end" => Anchor::End,
            "upperLeft" => Anchor::UpperLeft,
            "upperMiddle" => Anchor::UpperMiddle,
            "upperRight" => Anchor::UpperRight,
            "middleLeft" => Anchor::MiddleLeft,
            "middleMiddle" => Anchor::MiddleMiddle,
            "middleRight" => Anchor::MiddleRight,
            "lowerLeft" => Anchor::LowerLeft,
            "lowerMiddle" => Anchor::LowerMiddle,
            "lowerRight" => Anchor::LowerRight,
            _ => Anchor::Auto,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::Auto => "auto",
            Anchor::Start => "start",
            Anchor::Middle => "middle",
            Anchor::End => "end",
            Anchor::UpperLeft => "upperLeft",
            Anchor::UpperMiddle => "upperMiddle",
            Anchor::UpperRight => "upperRight",
            Anchor::MiddleLeft => "middleLeft",
            Anchor::MiddleMiddle => "middleMiddle",
            Anchor::MiddleRight => "middleRight",
            Anchor::LowerLeft => "lowerLeft",
            Anchor::LowerMiddle => "lowerMiddle",
            Anchor::LowerRight => "lowerRight",
        }
    }

    /// `start`, `middle` and `end` only make sense along a single axis
    pub fn is_one_dimensional(&self) -> bool {
        matches!(self, Anchor::Start | Anchor::Middle | Anchor::End)
    }
}

impl From<String> for Anchor {
    fn from(token: String) -> Self {
        Anchor::parse(&token)
    }
}

impl From<Anchor> for String {
    fn from(anchor: Anchor) -> Self {
        anchor.as_str().to_string()
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an anchor token onto a corner, edge midpoint or center of `bounds`.
///
/// Total: every token (including `Auto`) yields a point.
pub fn resolve_anchor(anchor: Anchor, bounds: &BoundingBox) -> Point {
    let BoundingBox { x1, y1, x2, y2 } = *bounds;
    let cx = (x1 + x2) / 2.0;
    let cy = (y1 + y2) / 2.0;
    match anchor {
        Anchor::Start | Anchor::UpperLeft => Point::new(x1, y1),
        Anchor::End | Anchor::LowerRight => Point::new(x2, y2),
        Anchor::UpperRight => Point::new(x2, y1),
        Anchor::LowerLeft => Point::new(x1, y2),
        Anchor::MiddleLeft => Point::new(x1, cy),
        Anchor::MiddleRight => Point::new(x2, cy),
        Anchor::UpperMiddle => Point::new(cx, y1),
        Anchor::LowerMiddle => Point::new(cx, y2),
        Anchor::Middle | Anchor::MiddleMiddle | Anchor::Auto => Point::new(cx, cy),
    }
}
