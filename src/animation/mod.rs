//! Tweening for scene object transforms.
//!
//! - `easing` maps normalised time to progress (linear, cubic Bézier)
//! - `timeline` runs concurrent property tweens with a one-shot completion
//! - `floating` computes the idle sinusoidal bobbing around a fixed origin

pub mod easing;
pub mod floating;
pub mod timeline;

pub use easing::{CubicBezier, Ease};
pub use floating::Floating;
pub use timeline::{Progress, Timeline, Track};
