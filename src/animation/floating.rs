use cgmath::Vector3;
use instant::Duration;

/// Idle bobbing around a fixed origin.
///
/// Each axis follows `amplitude * sin(frequency * t)` with its own frequency
/// so the motion never looks perfectly synchronised.
#[derive(Clone, Debug, PartialEq)]
pub struct Floating {
    origin: Vector3<f32>,
    amplitude: f32,
    frequencies: Vector3<f32>,
    elapsed: f64,
}

impl Floating {
    pub fn new(origin: Vector3<f32>, amplitude: f32, frequencies: Vector3<f32>) -> Self {
        Self {
            origin,
            amplitude,
            frequencies,
            elapsed: 0.0,
        }
    }

    pub fn origin(&self) -> Vector3<f32> {
        self.origin
    }

    /// Seconds since the floating started.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn offset_at(&self, t: f64) -> Vector3<f32> {
        let wave = |frequency: f32| (self.amplitude as f64 * (frequency as f64 * t).sin()) as f32;
        Vector3::new(
            wave(self.frequencies.x),
            wave(self.frequencies.y),
            wave(self.frequencies.z),
        )
    }

    pub fn position_at(&self, t: f64) -> Vector3<f32> {
        self.origin + self.offset_at(t)
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position_at(self.elapsed)
    }

    pub fn advance(&mut self, dt: Duration) -> Vector3<f32> {
        self.elapsed += dt.as_secs_f64();
        self.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floating() -> Floating {
        Floating::new(
            Vector3::new(-8.5, -2.0, -1.0),
            0.2,
            Vector3::new(0.3, 0.4, 0.3),
        )
    }

    #[test]
    fn starts_at_origin() {
        assert_eq!(floating().position(), Vector3::new(-8.5, -2.0, -1.0));
    }

    #[test]
    fn follows_independent_sines() {
        let mut f = floating();
        for _ in 0..120 {
            f.advance(Duration::from_millis(16));
        }
        let t = f.elapsed();
        let expected = Vector3::new(
            -8.5 + (0.2 * (0.3 * t).sin()) as f32,
            -2.0 + (0.2 * (0.4 * t).sin()) as f32,
            -1.0 + (0.2 * (0.3 * t).sin()) as f32,
        );
        let position = f.position();
        assert!((position.x - expected.x).abs() < 1e-6);
        assert!((position.y - expected.y).abs() < 1e-6);
        assert!((position.z - expected.z).abs() < 1e-6);
        // x and z share a frequency, y does not
        let offset = f.offset_at(t);
        assert_eq!(offset.x, offset.z);
        assert_ne!(offset.x, offset.y);
    }

    #[test]
    fn stays_within_amplitude() {
        let f = floating();
        for step in 0..1000 {
            let offset = f.offset_at(step as f64 * 0.37);
            assert!(offset.x.abs() <= 0.2 + 1e-6);
            assert!(offset.y.abs() <= 0.2 + 1e-6);
            assert!(offset.z.abs() <= 0.2 + 1e-6);
        }
    }
}
