//! Pointer tracking, pointer-follow smoothing and page overlays.
//!
//! The pointer is stored as the cursor's offset from the viewport center in
//! logical pixels. The model eases towards a target derived from it every
//! frame, while overlay elements are translated directly.

use cgmath::Vector2;

/// Cursor offset from the viewport center.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
}

impl PointerState {
    /// Records a cursor position. Both arguments use the same unit.
    pub fn on_move(&mut self, cursor: (f64, f64), viewport: (f64, f64)) {
        self.x = (cursor.0 - viewport.0 / 2.0) as f32;
        self.y = (cursor.1 - viewport.1 / 2.0) as f32;
    }
}

/// Exponential smoothing of the model offset towards the pointer target.
#[derive(Clone, Debug, PartialEq)]
pub struct PointerFollow {
    offset: Vector2<f32>,
    sensitivity: f32,
    convergence: f32,
}

impl PointerFollow {
    pub fn new(sensitivity: f32, convergence: f32) -> Self {
        Self {
            offset: Vector2::new(0.0, 0.0),
            sensitivity,
            convergence,
        }
    }

    pub fn offset(&self) -> Vector2<f32> {
        self.offset
    }

    /// Screen y grows downwards, world y upwards.
    pub fn target(&self, pointer: &PointerState) -> Vector2<f32> {
        Vector2::new(
            pointer.x * self.sensitivity,
            -pointer.y * self.sensitivity,
        )
    }

    /// Moves a fixed fraction of the remaining distance towards the target.
    pub fn step(&mut self, pointer: &PointerState) -> Vector2<f32> {
        let target = self.target(pointer);
        self.offset += (target - self.offset) * self.convergence;
        self.offset
    }
}

/// A page element that shifts with the pointer.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub element_id: String,
    pub sensitivity: f32,
}

impl Overlay {
    pub fn new(element_id: impl Into<String>, sensitivity: f32) -> Self {
        Self {
            element_id: element_id.into(),
            sensitivity,
        }
    }

    /// Translation in pixels.
    pub fn translation(&self, pointer: &PointerState) -> (f32, f32) {
        (pointer.x * self.sensitivity, pointer.y * self.sensitivity)
    }

    pub fn css_transform(&self, pointer: &PointerState) -> String {
        let (x, y) = self.translation(pointer);
        format!("translate({:.3}px, {:.3}px)", x, y)
    }
}

/// Something that can receive CSS transforms for named elements.
pub trait OverlayTarget {
    /// Returns `false` when no element with `element_id` exists.
    fn set_transform(&mut self, element_id: &str, css: &str) -> bool;
}

/// Used where there is no page, e.g. in a native window.
#[derive(Debug, Default)]
pub struct NoOverlays;

impl OverlayTarget for NoOverlays {
    fn set_transform(&mut self, _: &str, _: &str) -> bool {
        false
    }
}

#[cfg(target_arch = "wasm32")]
pub use dom::DomOverlays;

#[cfg(target_arch = "wasm32")]
mod dom {
    use wasm_bindgen::JsCast;

    use super::OverlayTarget;

    /// Writes `style.transform` of elements looked up by id.
    #[derive(Debug)]
    pub struct DomOverlays {
        document: Option<web_sys::Document>,
    }

    impl DomOverlays {
        pub fn new() -> Self {
            let document = web_sys::window().and_then(|window| window.document());
            Self { document }
        }
    }

    impl Default for DomOverlays {
        fn default() -> Self {
            Self::new()
        }
    }

    impl OverlayTarget for DomOverlays {
        fn set_transform(&mut self, element_id: &str, css: &str) -> bool {
            let element = self
                .document
                .as_ref()
                .and_then(|document| document.get_element_by_id(element_id))
                .and_then(|element| element.dyn_into::<web_sys::HtmlElement>().ok());
            match element {
                Some(element) => {
                    if let Err(e) = element.style().set_property("transform", css) {
                        log::debug!("Could not set transform of #{}: {:?}", element_id, e);
                        return false;
                    }
                    true
                }
                None => false,
            }
        }
    }
}

/// Applies every overlay's translation. Returns how many elements were found.
pub fn apply_overlays(
    overlays: &[Overlay],
    pointer: &PointerState,
    target: &mut dyn OverlayTarget,
) -> usize {
    overlays
        .iter()
        .filter(|overlay| target.set_transform(&overlay.element_id, &overlay.css_transform(pointer)))
        .count()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Page {
        present: Vec<&'static str>,
        styles: HashMap<String, String>,
    }

    impl OverlayTarget for Page {
        fn set_transform(&mut self, element_id: &str, css: &str) -> bool {
            if !self.present.iter().any(|id| *id == element_id) {
                return false;
            }
            self.styles.insert(element_id.to_string(), css.to_string());
            true
        }
    }

    #[test]
    fn pointer_is_relative_to_viewport_center() {
        let mut pointer = PointerState::default();
        pointer.on_move((100.0, 700.0), (800.0, 600.0));
        assert_eq!(pointer, PointerState { x: -300.0, y: 400.0 });
    }

    #[test]
    fn one_step_covers_five_percent() {
        let pointer = PointerState { x: 250.0, y: -120.0 };
        let mut follow = PointerFollow::new(0.002, 0.05);
        let samples = [(0.0f32, 0.0f32), (1.0, -3.0), (-0.7, 0.25)];
        for (x, y) in samples {
            follow.offset = Vector2::new(x, y);
            let before = follow.offset();
            let target = Vector2::new(250.0 * 0.002, 120.0 * 0.002);

            let after = follow.step(&pointer);

            let expected = before + (target - before) * 0.05;
            assert!((after.x - expected.x).abs() < 1e-6);
            assert!((after.y - expected.y).abs() < 1e-6);
        }
    }

    #[test]
    fn follow_converges_on_target() {
        let pointer = PointerState { x: 100.0, y: 50.0 };
        let mut follow = PointerFollow::new(0.002, 0.05);
        for _ in 0..500 {
            follow.step(&pointer);
        }
        assert!((follow.offset().x - 0.2).abs() < 1e-4);
        assert!((follow.offset().y + 0.1).abs() < 1e-4);
    }

    #[test]
    fn missing_overlays_are_skipped() {
        let overlays = [
            Overlay::new("glow-left", 0.01),
            Overlay::new("glow-right", 0.01),
            Overlay::new("hero-text", 0.005),
        ];
        let mut page = Page {
            present: vec!["glow-left", "hero-text"],
            ..Default::default()
        };
        let pointer = PointerState { x: 200.0, y: -100.0 };

        let applied = apply_overlays(&overlays, &pointer, &mut page);

        assert_eq!(applied, 2);
        assert_eq!(page.styles["glow-left"], "translate(2.000px, -1.000px)");
        assert_eq!(page.styles["hero-text"], "translate(1.000px, -0.500px)");
        assert!(!page.styles.contains_key("glow-right"));
        assert_eq!(apply_overlays(&overlays, &pointer, &mut NoOverlays), 0);
    }
}
