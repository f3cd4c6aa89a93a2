/// A CSS-style cubic Bézier timing curve anchored at (0,0) and (1,1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicBezier {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl CubicBezier {
    const NEWTON_ITERATIONS: usize = 8;
    const EPSILON: f32 = 1e-6;

    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    fn sample(p1: f32, p2: f32, t: f32) -> f32 {
        // Bernstein form with p0 = 0 and p3 = 1
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        let a = 1.0 - c - b;
        ((a * t + b) * t + c) * t
    }

    fn slope(p1: f32, p2: f32, t: f32) -> f32 {
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        let a = 1.0 - c - b;
        (3.0 * a * t + 2.0 * b) * t + c
    }

    /// Finds the curve parameter whose x equals `x`.
    fn solve_t(&self, x: f32) -> f32 {
        let mut t = x;
        for _ in 0..Self::NEWTON_ITERATIONS {
            let err = Self::sample(self.x1, self.x2, t) - x;
            if err.abs() < Self::EPSILON {
                return t;
            }
            let d = Self::slope(self.x1, self.x2, t);
            if d.abs() < Self::EPSILON {
                break;
            }
            t -= err / d;
        }

        // Newton did not converge, fall back to bisection
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        t = x;
        while hi - lo > Self::EPSILON {
            let value = Self::sample(self.x1, self.x2, t);
            if (value - x).abs() < Self::EPSILON {
                break;
            }
            if value < x {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) * 0.5;
        }
        t
    }

    pub fn apply(&self, x: f32) -> f32 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        Self::sample(self.y1, self.y2, self.solve_t(x))
    }
}

/// Maps normalised time to animation progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Ease {
    Linear,
    CubicBezier(CubicBezier),
}

impl Ease {
    /// Rushes towards the target and then settles: `M0,0 C0.4,1 0.6,0.9 1,1`.
    pub const FAST_THEN_SLOW: Ease = Ease::CubicBezier(CubicBezier::new(0.4, 1.0, 0.6, 0.9));

    pub fn apply(&self, t: f32) -> f32 {
        match self {
            Ease::Linear => t.clamp(0.0, 1.0),
            Ease::CubicBezier(curve) => curve.apply(t),
        }
    }
}

impl Default for Ease {
    fn default() -> Self {
        Ease::Linear
    }
}
