//! Connector path geometry
//!
//! A connector is drawn through two points (straight kinds) or three points
//! (every other kind, with a control point bent off the segment midpoint).
//! The points are fed to one of the d3-shape style interpolators below, which
//! emit compact SVG path data such as `M0,0L5,1C10,2,20,4,30,4`.

use std::fmt;

use crate::annotation::{ConnectorAnnotation, CurveDirection, CurveSpec};
use crate::config::AnnotateConfig;
use crate::expr::eval::format_number;
use crate::geometry::Point;

const EPSILON: f64 = 1e-12;

/// Default catmull-rom parameterization (centripetal)
const DEFAULT_ALPHA: f64 = 0.5;

/// Named curve interpolators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    Linear,
    Basis,
    Cardinal,
    CatmullRom,
    Monotone,
    Natural,
    Step,
    StepBefore,
    StepAfter,
}

impl CurveKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(CurveKind::Linear),
            "basis" => Some(CurveKind::Basis),
            "cardinal" => Some(CurveKind::Cardinal),
            "catmull-rom" => Some(CurveKind::CatmullRom),
            "monotone" => Some(CurveKind::Monotone),
            "natural" => Some(CurveKind::Natural),
            "step" => Some(CurveKind::Step),
            "step-before" => Some(CurveKind::StepBefore),
            "step-after" => Some(CurveKind::StepAfter),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CurveKind::Linear => "linear",
            CurveKind::Basis => "basis",
            CurveKind::Cardinal => "cardinal",
            CurveKind::CatmullRom => "catmull-rom",
            CurveKind::Monotone => "monotone",
            CurveKind::Natural => "natural",
            CurveKind::Step => "step",
            CurveKind::StepBefore => "step-before",
            CurveKind::StepAfter => "step-after",
        }
    }

    /// Straight kinds are drawn through the two endpoints only
    pub fn is_straight(self) -> bool {
        matches!(
            self,
            CurveKind::Linear | CurveKind::Step | CurveKind::StepBefore | CurveKind::StepAfter
        )
    }

    fn default_step_fraction(self) -> f64 {
        match self {
            CurveKind::StepBefore => 0.0,
            CurveKind::StepAfter => 1.0,
            _ => 0.5,
        }
    }
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved curve parameters of one connector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSettings {
    pub kind: CurveKind,
    pub direction: CurveDirection,
    /// Scales the control point bend; also the cardinal tension
    pub tension: f64,
    /// Catmull-rom parameterization
    pub alpha: f64,
    /// Where along each segment a step curve turns, 0 (before) to 1 (after)
    pub step_fraction: f64,
}

impl CurveSettings {
    /// Resolve the curve of a connector.
    ///
    /// Settings inside a curve object win over the connector's own
    /// `curveDirection` / `curveTension`; an absent or unknown curve name
    /// falls back to the configured default kind.
    pub fn for_connector(connector: &ConnectorAnnotation, config: &AnnotateConfig) -> Self {
        let (name, object) = match &connector.curve {
            None => (None, None),
            Some(CurveSpec::Name(name)) => (Some(name.as_str()), None),
            Some(CurveSpec::Object(object)) => (Some(object.kind.as_str()), Some(object)),
        };

        let kind = match name {
            None => config.default_curve,
            Some(name) => CurveKind::parse(name).unwrap_or_else(|| {
                tracing::warn!(curve = name, fallback = %config.default_curve, "unknown curve type");
                config.default_curve
            }),
        };

        let direction = object
            .and_then(|o| o.direction)
            .or(connector.curve_direction)
            .unwrap_or(CurveDirection::Auto);
        let tension = object
            .and_then(|o| o.tension)
            .or(connector.curve_tension)
            .unwrap_or(config.default_tension);
        let alpha = object.and_then(|o| o.alpha).unwrap_or(DEFAULT_ALPHA);
        let step_fraction = match object.and_then(|o| o.align) {
            Some(align) if kind.is_straight() && kind != CurveKind::Linear => align.fraction(),
            _ => kind.default_step_fraction(),
        };

        Self {
            kind,
            direction,
            tension,
            alpha,
            step_fraction,
        }
    }
}

/// Sign applied to the perpendicular bend.
///
/// `auto` bends clockwise when the segment runs down-right or up-left.
fn direction_sign(direction: CurveDirection, dx: f64, dy: f64) -> f64 {
    match direction {
        CurveDirection::Clockwise => -1.0,
        CurveDirection::Counterclockwise => 1.0,
        CurveDirection::Auto => {
            if dx * dy > 0.0 {
                -1.0
            } else {
                1.0
            }
        }
    }
}

/// The points a connector path is interpolated through
pub fn control_points(from: Point, to: Point, settings: &CurveSettings, bend: f64) -> Vec<Point> {
    if settings.kind.is_straight() {
        return vec![from, to];
    }
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let factor = bend * settings.tension * direction_sign(settings.direction, dx, dy);
    let control = Point::new(
        (from.x + to.x) / 2.0 - dy * factor,
        (from.y + to.y) / 2.0 + dx * factor,
    );
    vec![from, control, to]
}

/// SVG path data of a connector from `from` to `to`
pub fn connector_path(from: Point, to: Point, settings: &CurveSettings, config: &AnnotateConfig) -> String {
    let points = control_points(from, to, settings, config.curve_bend);
    interpolate(&points, settings)
}

/// Run `points` through the interpolator named by `settings.kind`
pub fn interpolate(points: &[Point], settings: &CurveSettings) -> String {
    let mut path = PathData::default();
    match settings.kind {
        CurveKind::Linear => linear(&mut path, points),
        CurveKind::Basis => basis(&mut path, points),
        // catmull-rom degenerates to a tensionless cardinal spline
        CurveKind::CatmullRom if settings.alpha == 0.0 => cardinal(&mut path, points, 0.0),
        CurveKind::Cardinal => cardinal(&mut path, points, settings.tension),
        CurveKind::CatmullRom => catmull_rom(&mut path, points, settings.alpha),
        CurveKind::Monotone => monotone_x(&mut path, points),
        CurveKind::Natural => natural(&mut path, points),
        CurveKind::Step | CurveKind::StepBefore | CurveKind::StepAfter => {
            step(&mut path, points, settings.step_fraction)
        }
    }
    path.0
}

/// Accumulates path commands with JavaScript number formatting
#[derive(Debug, Default)]
struct PathData(String);

impl PathData {
    fn pair(&mut self, cmd: char, x: f64, y: f64) {
        self.0.push(cmd);
        self.0.push_str(&format_number(x));
        self.0.push(',');
        self.0.push_str(&format_number(y));
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.pair('M', x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.pair('L', x, y);
    }

    fn cubic_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) {
        self.pair('C', x1, y1);
        for v in [x2, y2, x, y] {
            self.0.push(',');
            self.0.push_str(&format_number(v));
        }
    }
}

fn linear(path: &mut PathData, points: &[Point]) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    path.move_to(first.x, first.y);
    for p in rest {
        path.line_to(p.x, p.y);
    }
}

fn basis(path: &mut PathData, points: &[Point]) {
    fn segment(path: &mut PathData, p0: Point, p1: Point, p: Point) {
        path.cubic_to(
            (2.0 * p0.x + p1.x) / 3.0,
            (2.0 * p0.y + p1.y) / 3.0,
            (p0.x + 2.0 * p1.x) / 3.0,
            (p0.y + 2.0 * p1.y) / 3.0,
            (p0.x + 4.0 * p1.x + p.x) / 6.0,
            (p0.y + 4.0 * p1.y + p.y) / 6.0,
        );
    }

    match points {
        [] => {}
        [only] => path.move_to(only.x, only.y),
        [first, second] => {
            path.move_to(first.x, first.y);
            path.line_to(second.x, second.y);
        }
        [first, second, ..] => {
            path.move_to(first.x, first.y);
            path.line_to((5.0 * first.x + second.x) / 6.0, (5.0 * first.y + second.y) / 6.0);
            for w in points.windows(3) {
                segment(path, w[0], w[1], w[2]);
            }
            let n = points.len();
            let (p0, p1) = (points[n - 2], points[n - 1]);
            segment(path, p0, p1, p1);
            path.line_to(p1.x, p1.y);
        }
    }
}

fn cardinal(path: &mut PathData, points: &[Point], tension: f64) {
    let k = (1.0 - tension) / 6.0;
    let segment = |path: &mut PathData, p0: Point, p1: Point, p2: Point, p: Point| {
        path.cubic_to(
            p1.x + k * (p2.x - p0.x),
            p1.y + k * (p2.y - p0.y),
            p2.x + k * (p1.x - p.x),
            p2.y + k * (p1.y - p.y),
            p2.x,
            p2.y,
        );
    };

    match points {
        [] => {}
        [only] => path.move_to(only.x, only.y),
        [first, second] => {
            path.move_to(first.x, first.y);
            path.line_to(second.x, second.y);
        }
        _ => {
            let first = points[0];
            path.move_to(first.x, first.y);
            // The first segment mirrors its missing predecessor onto the
            // second point, the last one its missing successor onto itself.
            segment(path, points[1], first, points[1], points[2]);
            for w in points.windows(4) {
                segment(path, w[0], w[1], w[2], w[3]);
            }
            let n = points.len();
            segment(path, points[n - 3], points[n - 2], points[n - 1], points[n - 2]);
        }
    }
}

#[derive(Debug)]
struct CatmullRom<'p> {
    path: &'p mut PathData,
    alpha: f64,
    state: u8,
    p0: Point,
    p1: Point,
    p2: Point,
    l01_a: f64,
    l12_a: f64,
    l23_a: f64,
    l01_2a: f64,
    l12_2a: f64,
    l23_2a: f64,
}

impl<'p> CatmullRom<'p> {
    fn new(path: &'p mut PathData, alpha: f64) -> Self {
        let nan = Point::new(f64::NAN, f64::NAN);
        Self {
            path,
            alpha,
            state: 0,
            p0: nan,
            p1: nan,
            p2: nan,
            l01_a: 0.0,
            l12_a: 0.0,
            l23_a: 0.0,
            l01_2a: 0.0,
            l12_2a: 0.0,
            l23_2a: 0.0,
        }
    }

    fn segment(&mut self, p: Point) {
        let mut c1 = self.p1;
        let mut c2 = self.p2;

        if self.l01_a > EPSILON {
            let a = 2.0 * self.l01_2a + 3.0 * self.l01_a * self.l12_a + self.l12_2a;
            let n = 3.0 * self.l01_a * (self.l01_a + self.l12_a);
            c1.x = (c1.x * a - self.p0.x * self.l12_2a + self.p2.x * self.l01_2a) / n;
            c1.y = (c1.y * a - self.p0.y * self.l12_2a + self.p2.y * self.l01_2a) / n;
        }

        if self.l23_a > EPSILON {
            let b = 2.0 * self.l23_2a + 3.0 * self.l23_a * self.l12_a + self.l12_2a;
            let m = 3.0 * self.l23_a * (self.l23_a + self.l12_a);
            c2.x = (c2.x * b + self.p1.x * self.l23_2a - p.x * self.l12_2a) / m;
            c2.y = (c2.y * b + self.p1.y * self.l23_2a - p.y * self.l12_2a) / m;
        }

        self.path.cubic_to(c1.x, c1.y, c2.x, c2.y, self.p2.x, self.p2.y);
    }

    fn point(&mut self, p: Point) {
        if self.state != 0 {
            let dx = self.p2.x - p.x;
            let dy = self.p2.y - p.y;
            self.l23_2a = (dx * dx + dy * dy).powf(self.alpha);
            self.l23_a = self.l23_2a.sqrt();
        }

        match self.state {
            0 => {
                self.state = 1;
                self.path.move_to(p.x, p.y);
            }
            1 => self.state = 2,
            2 => {
                self.state = 3;
                self.segment(p);
            }
            _ => self.segment(p),
        }

        self.l01_a = self.l12_a;
        self.l12_a = self.l23_a;
        self.l01_2a = self.l12_2a;
        self.l12_2a = self.l23_2a;
        self.p0 = self.p1;
        self.p1 = self.p2;
        self.p2 = p;
    }

    fn end(&mut self) {
        match self.state {
            2 => self.path.line_to(self.p2.x, self.p2.y),
            3 => self.point(self.p2),
            _ => {}
        }
    }
}

fn catmull_rom(path: &mut PathData, points: &[Point], alpha: f64) {
    let mut curve = CatmullRom::new(path, alpha);
    for p in points {
        curve.point(*p);
    }
    curve.end();
}

fn monotone_x(path: &mut PathData, points: &[Point]) {
    fn sign(v: f64) -> f64 {
        if v < 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    // Tangent at p1 from its neighbours, limited so the curve stays monotone
    fn slope3(p0: Point, p1: Point, p2: Point) -> f64 {
        let h0 = p1.x - p0.x;
        let h1 = p2.x - p1.x;
        let s0 = (p1.y - p0.y) / if h0 != 0.0 { h0 } else if h1 < 0.0 { -0.0 } else { 0.0 };
        let s1 = (p2.y - p1.y) / if h1 != 0.0 { h1 } else if h0 < 0.0 { -0.0 } else { 0.0 };
        let p = (s0 * h1 + s1 * h0) / (h0 + h1);
        let v = (sign(s0) + sign(s1)) * s0.abs().min(s1.abs()).min(0.5 * p.abs());
        if v.is_finite() {
            v
        } else {
            0.0
        }
    }

    fn slope2(p0: Point, p1: Point, t: f64) -> f64 {
        let h = p1.x - p0.x;
        if h != 0.0 {
            (3.0 * (p1.y - p0.y) / h - t) / 2.0
        } else {
            t
        }
    }

    fn hermite(path: &mut PathData, p0: Point, p1: Point, t0: f64, t1: f64) {
        let dx = (p1.x - p0.x) / 3.0;
        path.cubic_to(p0.x + dx, p0.y + dx * t0, p1.x - dx, p1.y - dx * t1, p1.x, p1.y);
    }

    let mut deduped: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if deduped.last() != Some(p) {
            deduped.push(*p);
        }
    }

    match deduped.as_slice() {
        [] => {}
        [only] => path.move_to(only.x, only.y),
        [first, second] => {
            path.move_to(first.x, first.y);
            path.line_to(second.x, second.y);
        }
        pts => {
            path.move_to(pts[0].x, pts[0].y);
            let mut t0 = f64::NAN;
            for (i, w) in pts.windows(3).enumerate() {
                let t1 = slope3(w[0], w[1], w[2]);
                let start = if i == 0 { slope2(w[0], w[1], t1) } else { t0 };
                hermite(path, w[0], w[1], start, t1);
                t0 = t1;
            }
            let n = pts.len();
            let (p0, p1) = (pts[n - 2], pts[n - 1]);
            hermite(path, p0, p1, t0, slope2(p0, p1, t0));
        }
    }
}

fn natural(path: &mut PathData, points: &[Point]) {
    // First and second control points of each segment, per axis
    fn control_points(coords: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let n = coords.len() - 1;
        let mut a = vec![0.0; n];
        let mut b = vec![0.0; n];
        let mut r = vec![0.0; n];
        b[0] = 2.0;
        r[0] = coords[0] + 2.0 * coords[1];
        for i in 1..n - 1 {
            a[i] = 1.0;
            b[i] = 4.0;
            r[i] = 4.0 * coords[i] + 2.0 * coords[i + 1];
        }
        a[n - 1] = 2.0;
        b[n - 1] = 7.0;
        r[n - 1] = 8.0 * coords[n - 1] + coords[n];
        for i in 1..n {
            let m = a[i] / b[i - 1];
            b[i] -= m;
            r[i] -= m * r[i - 1];
        }
        a[n - 1] = r[n - 1] / b[n - 1];
        for i in (0..n - 1).rev() {
            a[i] = (r[i] - a[i + 1]) / b[i];
        }
        b[n - 1] = (coords[n] + a[n - 1]) / 2.0;
        for i in 0..n - 1 {
            b[i] = 2.0 * coords[i + 1] - a[i + 1];
        }
        (a, b)
    }

    match points {
        [] => {}
        [only] => path.move_to(only.x, only.y),
        [first, second] => {
            path.move_to(first.x, first.y);
            path.line_to(second.x, second.y);
        }
        _ => {
            let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
            let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
            let (x1, x2) = control_points(&xs);
            let (y1, y2) = control_points(&ys);
            path.move_to(xs[0], ys[0]);
            for i in 0..xs.len() - 1 {
                path.cubic_to(x1[i], y1[i], x2[i], y2[i], xs[i + 1], ys[i + 1]);
            }
        }
    }
}

fn step(path: &mut PathData, points: &[Point], t: f64) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    path.move_to(first.x, first.y);
    let mut prev = *first;
    for p in rest {
        if t <= 0.0 {
            path.line_to(prev.x, p.y);
            path.line_to(p.x, p.y);
        } else {
            let x = prev.x * (1.0 - t) + p.x * t;
            path.line_to(x, prev.y);
            path.line_to(x, p.y);
        }
        prev = *p;
    }
    if 0.0 < t && t < 1.0 && !rest.is_empty() {
        path.line_to(prev.x, prev.y);
    }
}
