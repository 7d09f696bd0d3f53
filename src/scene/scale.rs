//! Scale functions exposed by a rendered scene

/// Maps a data-domain value to a pixel coordinate along one axis
pub trait Scale {
    fn apply(&self, value: f64) -> f64;
}

impl<F> Scale for F
where
    F: Fn(f64) -> f64,
{
    fn apply(&self, value: f64) -> f64 {
        self(value)
    }
}

/// Continuous linear mapping of `domain` onto `range`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }
}

impl Scale for LinearScale {
    fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            // Collapsed domain maps to the range midpoint
            return (r0 + r1) / 2.0;
        }
        r0 + (value - d0) / (d1 - d0) * (r1 - r0)
    }
}
