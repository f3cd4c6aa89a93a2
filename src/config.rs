//! Visual defaults of the hero stage.

use cgmath::Vector3;

use crate::{
    animation::Ease,
    data_structures::{
        instance::{Transform, degrees},
        material::Material,
    },
    pointer::Overlay,
};

/// Everything the stage needs to know to play the intro, float and follow
/// the pointer. [`StageConfig::default`] is the look shipped on the page.
#[derive(Clone, Debug)]
pub struct StageConfig {
    /// Resolved under `assets/`.
    pub asset: String,
    pub model_material: Material,
    pub glow_material: Material,
    /// Multiplier applied to the model scale when the glow is cloned.
    pub glow_scale: f32,
    pub intro_start: Transform,
    pub intro_target: Transform,
    /// Seconds.
    pub intro_duration: f32,
    pub intro_ease: Ease,
    pub floating_amplitude: f32,
    /// Angular frequency per axis in radians per second.
    pub floating_frequencies: Vector3<f32>,
    pub pointer_sensitivity: f32,
    /// Fraction of the remaining distance covered per frame.
    pub pointer_convergence: f32,
    pub overlays: Vec<Overlay>,
    pub clear_colour: wgpu::Color,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            asset: "model3.glb".to_string(),
            model_material: Material::standard(),
            glow_material: Material::glow(),
            glow_scale: 1.1,
            intro_start: Transform::new(
                Vector3::new(7.0, -5.0, 0.0),
                degrees(250.0, 0.0, 19.0),
                Vector3::new(1.0, 1.0, 1.0),
            ),
            intro_target: Transform::new(
                Vector3::new(-8.5, -2.0, -1.0),
                degrees(190.0, -55.0, -20.0),
                Vector3::new(0.3, 0.3, 0.3),
            ),
            intro_duration: 4.0,
            intro_ease: Ease::FAST_THEN_SLOW,
            floating_amplitude: 0.2,
            floating_frequencies: Vector3::new(0.3, 0.4, 0.3),
            pointer_sensitivity: 0.002,
            pointer_convergence: 0.05,
            overlays: vec![
                Overlay::new("glow-left", 0.01),
                Overlay::new("glow-right", 0.01),
                Overlay::new("hero-text", 0.005),
            ],
            clear_colour: wgpu::Color::TRANSPARENT,
        }
    }
}
