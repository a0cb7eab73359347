//! Mapping between the on-screen rectangle an image is rendered into and
//! the image's own pixel grid.
//!
//! The displayed size and the natural size usually differ (the preview is
//! scaled to fit the panel), so every pointer interaction goes through a
//! [`DisplayTransform`] before coordinates are sent anywhere.

use egui::{Pos2, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeometryError {
    /// The widget has a zero rendered width or height (not laid out yet).
    /// Mapping through it would divide by zero.
    #[error("display surface has zero {0}; cannot map pointer coordinates")]
    DegenerateSurface(&'static str),
}

/// A point in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePoint {
    pub x: i32,
    pub y: i32,
}

/// A rectangle in source-image pixel space. Width and height may be
/// negative while a drag is in progress (the sign encodes the drag
/// direction relative to the anchor); call [`SelectionRect::normalized`]
/// before using the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl SelectionRect {
    pub fn from_drag(anchor: ImagePoint, current: ImagePoint) -> Self {
        Self {
            x: anchor.x,
            y: anchor.y,
            width: current.x - anchor.x,
            height: current.y - anchor.y,
        }
    }

    /// Flips the origin so that width and height are non-negative.
    pub fn normalized(self) -> Self {
        let x = if self.width < 0 { self.x + self.width } else { self.x };
        let y = if self.height < 0 { self.y + self.height } else { self.y };
        Self {
            x,
            y,
            width: self.width.abs(),
            height: self.height.abs(),
        }
    }
}

/// Scale factors between a rendered widget rect and the natural pixel
/// dimensions of what it displays. Built fresh for every interaction:
/// layout can change between events, and for a video feed the natural
/// size can change between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayTransform {
    origin: Pos2,
    /// natural px per rendered point
    scale_x: f32,
    scale_y: f32,
}

impl DisplayTransform {
    pub fn new(rendered: Rect, natural: [usize; 2]) -> Result<Self, GeometryError> {
        if rendered.width() <= 0.0 {
            return Err(GeometryError::DegenerateSurface("width"));
        }
        if rendered.height() <= 0.0 {
            return Err(GeometryError::DegenerateSurface("height"));
        }
        // a zero natural size would make the inverse mapping divide by zero
        if natural[0] == 0 {
            return Err(GeometryError::DegenerateSurface("natural width"));
        }
        if natural[1] == 0 {
            return Err(GeometryError::DegenerateSurface("natural height"));
        }
        Ok(Self {
            origin: rendered.min,
            scale_x: natural[0] as f32 / rendered.width(),
            scale_y: natural[1] as f32 / rendered.height(),
        })
    }

    pub fn scale(&self) -> (f32, f32) {
        (self.scale_x, self.scale_y)
    }

    /// Viewport position of a pointer event -> nearest source pixel.
    pub fn to_image(&self, pos: Pos2) -> ImagePoint {
        ImagePoint {
            x: ((pos.x - self.origin.x) * self.scale_x).round() as i32,
            y: ((pos.y - self.origin.y) * self.scale_y).round() as i32,
        }
    }

    /// Image-space rectangle -> screen rect, for painting the selection
    /// outline over the scaled preview. Normalizes first.
    pub fn to_screen_rect(&self, rect: SelectionRect) -> Rect {
        let n = rect.normalized();
        let min = egui::pos2(
            self.origin.x + n.x as f32 / self.scale_x,
            self.origin.y + n.y as f32 / self.scale_y,
        );
        let size = egui::vec2(n.width as f32 / self.scale_x, n.height as f32 / self.scale_y);
        Rect::from_min_size(min, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn rendered(w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(100.0, 50.0), egui::vec2(w, h))
    }

    #[test]
    fn maps_pointer_to_source_pixels() {
        // 800x600 image shown at 400x300: every rendered point is two pixels.
        let tf = DisplayTransform::new(rendered(400.0, 300.0), [800, 600]).unwrap();
        let p = tf.to_image(pos2(100.0 + 10.0, 50.0 + 20.0));
        assert_eq!(p, ImagePoint { x: 20, y: 40 });
    }

    #[test]
    fn scale_is_linear_in_natural_size() {
        let tf1 = DisplayTransform::new(rendered(400.0, 300.0), [800, 600]).unwrap();
        let tf2 = DisplayTransform::new(rendered(400.0, 300.0), [1600, 600]).unwrap();
        assert_eq!(tf2.scale().0, tf1.scale().0 * 2.0, "doubling natural width doubles x scale");
        assert_eq!(tf2.scale().1, tf1.scale().1, "y scale unaffected");
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert_eq!(
            DisplayTransform::new(rendered(0.0, 300.0), [800, 600]),
            Err(GeometryError::DegenerateSurface("width"))
        );
        assert_eq!(
            DisplayTransform::new(rendered(400.0, 0.0), [800, 600]),
            Err(GeometryError::DegenerateSurface("height"))
        );
    }

    #[test]
    fn zero_natural_size_is_rejected() {
        assert_eq!(
            DisplayTransform::new(rendered(400.0, 300.0), [0, 600]),
            Err(GeometryError::DegenerateSurface("natural width"))
        );
        assert_eq!(
            DisplayTransform::new(rendered(400.0, 300.0), [800, 0]),
            Err(GeometryError::DegenerateSurface("natural height"))
        );
    }

    #[test]
    fn normalizes_negative_extents() {
        let rect = SelectionRect::from_drag(ImagePoint { x: 10, y: 10 }, ImagePoint { x: 2, y: 2 });
        assert_eq!(rect, SelectionRect { x: 10, y: 10, width: -8, height: -8 });
        assert_eq!(
            rect.normalized(),
            SelectionRect { x: 2, y: 2, width: 8, height: 8 }
        );
    }

    #[test]
    fn normalize_keeps_positive_rect_unchanged() {
        let rect = SelectionRect { x: 3, y: 4, width: 20, height: 30 };
        assert_eq!(rect.normalized(), rect);
    }

    #[test]
    fn overlay_rect_is_deterministic() {
        let tf = DisplayTransform::new(rendered(400.0, 300.0), [800, 600]).unwrap();
        let sel = SelectionRect { x: 40, y: 60, width: -20, height: 10 };
        assert_eq!(tf.to_screen_rect(sel), tf.to_screen_rect(sel));
        // normalized and raw selections paint the same outline
        assert_eq!(tf.to_screen_rect(sel), tf.to_screen_rect(sel.normalized()));
    }
}
