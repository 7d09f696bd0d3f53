//! Configuration for annotation resolution

use crate::annotation::StyleDefaults;
use crate::geometry::Point;
use crate::resolve::curve::CurveKind;

/// How per-layer annotations of a layered spec match data points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayeredPolicy {
    /// Data-point markers only see marks whose name starts with the layer name
    #[default]
    LayerScoped,
    /// Data-point markers see every mark of the composite scene
    Composite,
}

/// Configuration options for annotation resolution
#[derive(Debug, Clone)]
pub struct AnnotateConfig {
    /// Occupancy grid size (columns, rows)
    pub occupancy_size: (usize, usize),

    /// Enclosure size around a single point when the shape gives none
    pub default_shape_size: (f64, f64),

    /// Where a label waiting for its connector is parked
    pub deferred_text_point: Point,

    /// Perpendicular offset of the curve control point, as a fraction of the
    /// endpoint distance before tension is applied
    pub curve_bend: f64,

    /// Curve tension when the connector gives none
    pub default_tension: f64,

    /// Curve used when a connector names none or an unknown one
    pub default_curve: CurveKind,

    pub layered_policy: LayeredPolicy,

    /// Style tables filling every unset style property
    pub styles: StyleDefaults,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            occupancy_size: (100, 100),
            default_shape_size: (10.0, 10.0),
            deferred_text_point: Point::new(10.0, 10.0),
            curve_bend: 0.2,
            default_tension: 0.5,
            default_curve: CurveKind::Basis,
            layered_policy: LayeredPolicy::default(),
            styles: StyleDefaults::builtin(),
        }
    }
}

impl AnnotateConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the occupancy grid size
    pub fn with_occupancy_size(mut self, width: usize, height: usize) -> Self {
        self.occupancy_size = (width, height);
        self
    }

    /// Set the default enclosure size
    pub fn with_shape_size(mut self, width: f64, height: f64) -> Self {
        self.default_shape_size = (width, height);
        self
    }

    /// Set the parking point of deferred labels
    pub fn with_deferred_text_point(mut self, x: f64, y: f64) -> Self {
        self.deferred_text_point = Point::new(x, y);
        self
    }

    /// Set the curve bend factor
    pub fn with_curve_bend(mut self, bend: f64) -> Self {
        self.curve_bend = bend;
        self
    }

    /// Set the default curve tension
    pub fn with_default_tension(mut self, tension: f64) -> Self {
        self.default_tension = tension;
        self
    }

    /// Set the fallback curve
    pub fn with_default_curve(mut self, curve: CurveKind) -> Self {
        self.default_curve = curve;
        self
    }

    pub fn with_layered_policy(mut self, policy: LayeredPolicy) -> Self {
        self.layered_policy = policy;
        self
    }

    /// Replace the style tables
    pub fn with_styles(mut self, styles: StyleDefaults) -> Self {
        self.styles = styles;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnnotateConfig::default();
        assert_eq!(config.occupancy_size, (100, 100));
        assert_eq!(config.default_shape_size, (10.0, 10.0));
        assert_eq!(config.deferred_text_point, Point::new(10.0, 10.0));
        assert_eq!(config.default_curve, CurveKind::Basis);
        assert_eq!(config.layered_policy, LayeredPolicy::LayerScoped);
        assert_eq!(config.styles.arrow.size, Some(150.0));
    }

    #[test]
    fn test_builder_methods() {
        let config = AnnotateConfig::new()
            .with_shape_size(20.0, 5.0)
            .with_default_tension(1.0)
            .with_default_curve(CurveKind::Linear)
            .with_layered_policy(LayeredPolicy::Composite);
        assert_eq!(config.default_shape_size, (20.0, 5.0));
        assert_eq!(config.default_tension, 1.0);
        assert_eq!(config.default_curve, CurveKind::Linear);
        assert_eq!(config.layered_policy, LayeredPolicy::Composite);
    }
}
