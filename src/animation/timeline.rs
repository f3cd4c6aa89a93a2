use cgmath::Vector3;
use instant::Duration;

use crate::{animation::easing::Ease, data_structures::instance::Transform};

/// The transform property a tween drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Track {
    Position,
    Rotation,
    Scale,
}

impl Track {
    fn read(&self, transform: &Transform) -> Vector3<f32> {
        match self {
            Track::Position => transform.position,
            Track::Rotation => transform.rotation,
            Track::Scale => transform.scale,
        }
    }

    fn write(&self, transform: &mut Transform, value: Vector3<f32>) {
        match self {
            Track::Position => transform.position = value,
            Track::Rotation => transform.rotation = value,
            Track::Scale => transform.scale = value,
        }
    }
}

#[derive(Clone, Debug)]
struct Tween {
    track: Track,
    to: Vector3<f32>,
    /// Seconds after timeline start.
    start: f32,
    duration: f32,
    ease: Ease,
    /// Captured the first time the tween is reached.
    from: Option<Vector3<f32>>,
}

impl Tween {
    fn end(&self) -> f32 {
        self.start + self.duration
    }

    fn apply(&mut self, elapsed: f32, target: &mut Transform) {
        if elapsed < self.start {
            return;
        }
        let track = self.track;
        let from = *self.from.get_or_insert_with(|| track.read(target));
        let ratio = if self.duration > 0.0 {
            ((elapsed - self.start) / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let value = if ratio >= 1.0 {
            self.to
        } else {
            from + (self.to - from) * self.ease.apply(ratio)
        };
        track.write(target, value);
    }
}

/// What happened during a call to [`Timeline::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Tweens were applied and some are still running.
    Running,
    /// The last tween reached its end during this call. Reported once.
    Completed,
    /// The timeline finished earlier; nothing was applied.
    Idle,
}

/// A one-shot set of concurrent property tweens.
///
/// Tweens are placed at an absolute offset on the timeline. Start values are
/// read from the target when a tween is first reached so the timeline
/// animates from wherever the object is at that moment.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    tweens: Vec<Tween>,
    elapsed: f32,
    completed: bool,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tween of `track` towards `to`, starting `at` seconds into the timeline.
    pub fn to(mut self, track: Track, to: Vector3<f32>, duration: f32, ease: Ease, at: f32) -> Self {
        self.tweens.push(Tween {
            track,
            to,
            start: at.max(0.0),
            duration: duration.max(0.0),
            ease,
            from: None,
        });
        self
    }

    /// Total length in seconds.
    pub fn duration(&self) -> f32 {
        self.tweens.iter().map(Tween::end).fold(0.0, f32::max)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn advance(&mut self, dt: Duration, target: &mut Transform) -> Progress {
        if self.completed {
            return Progress::Idle;
        }
        self.elapsed += dt.as_secs_f32();
        let elapsed = self.elapsed;
        self.tweens
            .iter_mut()
            .for_each(|tween| tween.apply(elapsed, target));

        if elapsed >= self.duration() {
            self.completed = true;
            Progress::Completed
        } else {
            Progress::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Transform {
        Transform::new(
            Vector3::new(7.0, -5.0, 0.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
        )
    }

    #[test]
    fn tracks_run_concurrently_and_land_exactly() {
        let mut transform = target();
        let mut timeline = Timeline::new()
            .to(Track::Position, Vector3::new(-8.5, -2.0, -1.0), 4.0, Ease::FAST_THEN_SLOW, 0.0)
            .to(Track::Scale, Vector3::new(0.3, 0.3, 0.3), 4.0, Ease::FAST_THEN_SLOW, 0.0);
        assert_eq!(timeline.duration(), 4.0);

        assert_eq!(
            timeline.advance(Duration::from_secs(2), &mut transform),
            Progress::Running
        );
        assert!(transform.position.x < 7.0 && transform.position.x > -8.5);
        assert!(transform.scale.x < 1.0 && transform.scale.x > 0.3);

        assert_eq!(
            timeline.advance(Duration::from_secs(2), &mut transform),
            Progress::Completed
        );
        assert_eq!(transform.position, Vector3::new(-8.5, -2.0, -1.0));
        assert_eq!(transform.scale, Vector3::new(0.3, 0.3, 0.3));
    }

    #[test]
    fn completion_is_reported_once() {
        let mut transform = target();
        let mut timeline =
            Timeline::new().to(Track::Rotation, Vector3::new(1.0, 2.0, 3.0), 1.0, Ease::Linear, 0.0);

        let completions = (0..20)
            .map(|_| timeline.advance(Duration::from_millis(250), &mut transform))
            .filter(|p| *p == Progress::Completed)
            .count();
        assert_eq!(completions, 1);
        assert!(timeline.is_complete());
        assert_eq!(
            timeline.advance(Duration::from_secs(1), &mut transform),
            Progress::Idle
        );
    }

    #[test]
    fn start_value_is_captured_on_first_advance() {
        let mut transform = target();
        let mut timeline =
            Timeline::new().to(Track::Position, Vector3::new(0.0, 0.0, 0.0), 2.0, Ease::Linear, 0.0);
        // moved before the timeline ever ran
        transform.position = Vector3::new(4.0, 0.0, 0.0);

        timeline.advance(Duration::from_secs(1), &mut transform);
        assert!((transform.position.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn delayed_tween_leaves_target_alone_until_reached() {
        let mut transform = target();
        let mut timeline =
            Timeline::new().to(Track::Scale, Vector3::new(2.0, 2.0, 2.0), 1.0, Ease::Linear, 1.0);

        timeline.advance(Duration::from_millis(500), &mut transform);
        assert_eq!(transform.scale, Vector3::new(1.0, 1.0, 1.0));
        timeline.advance(Duration::from_millis(1000), &mut transform);
        assert!((transform.scale.x - 1.5).abs() < 1e-6);
    }
}
