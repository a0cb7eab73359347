//! Rubber-band selection over an image surface.

use crate::geometry::{ImagePoint, SelectionRect};

/// Committed selections must be at least this many source pixels on each
/// axis; anything smaller is discarded without a request.
pub const MIN_SELECTION_PX: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    /// Drag in progress; extents may be negative.
    Dragging(SelectionRect),
    /// Normalized, at least `MIN_SELECTION_PX` on both axes.
    Committed(SelectionRect),
    /// Last drag ended below the minimum size.
    Discarded,
}

/// Tracks the single selection rectangle defined by a press/move/release
/// gesture. Single-pointer, so there is never more than one drag at a
/// time, and loading new media resets everything.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    state: SelectionState,
}

impl SelectionTracker {
    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Gesture start: the anchor becomes the rectangle origin.
    pub fn begin(&mut self, anchor: ImagePoint) {
        self.state = SelectionState::Dragging(SelectionRect::from_drag(anchor, anchor));
    }

    /// Gesture move: extents follow the pointer, sign included.
    pub fn update(&mut self, current: ImagePoint) {
        if let SelectionState::Dragging(rect) = self.state {
            let anchor = ImagePoint { x: rect.x, y: rect.y };
            self.state = SelectionState::Dragging(SelectionRect::from_drag(anchor, current));
        }
    }

    /// Gesture end. Returns the normalized rectangle when it satisfies the
    /// minimum size, otherwise moves to `Discarded`. A finished gesture
    /// never stays in `Dragging`, even when rejected.
    pub fn finish(&mut self) -> Option<SelectionRect> {
        let SelectionState::Dragging(rect) = self.state else {
            return None;
        };
        let normalized = rect.normalized();
        if normalized.width >= MIN_SELECTION_PX && normalized.height >= MIN_SELECTION_PX {
            self.state = SelectionState::Committed(normalized);
            Some(normalized)
        } else {
            self.state = SelectionState::Discarded;
            None
        }
    }

    /// Clears any in-progress or committed selection (new media loaded).
    pub fn reset(&mut self) {
        self.state = SelectionState::Idle;
    }

    /// Normalized bounds to draw, if a rectangle currently exists.
    pub fn visible_rect(&self) -> Option<SelectionRect> {
        match self.state {
            SelectionState::Dragging(rect) => Some(rect.normalized()),
            SelectionState::Committed(rect) => Some(rect),
            SelectionState::Idle | SelectionState::Discarded => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: i32, y: i32) -> ImagePoint {
        ImagePoint { x, y }
    }

    #[test]
    fn drag_in_any_direction_commits_normalized() {
        let mut tracker = SelectionTracker::default();
        tracker.begin(point(100, 100));
        tracker.update(point(50, 150));
        let committed = tracker.finish().expect("50x50 drag should commit");
        assert_eq!(committed, SelectionRect { x: 50, y: 100, width: 50, height: 50 });
        assert_eq!(tracker.state(), SelectionState::Committed(committed));
    }

    #[test]
    fn too_small_drag_is_discarded() {
        let mut tracker = SelectionTracker::default();
        tracker.begin(point(0, 0));
        tracker.update(point(5, 30)); // 5 px wide: below minimum on one axis
        assert_eq!(tracker.finish(), None);
        assert_eq!(tracker.state(), SelectionState::Discarded, "never stuck in Dragging");
    }

    #[test]
    fn boundary_size_commits() {
        let mut tracker = SelectionTracker::default();
        tracker.begin(point(0, 0));
        tracker.update(point(MIN_SELECTION_PX, MIN_SELECTION_PX));
        assert!(tracker.finish().is_some());
    }

    #[test]
    fn finish_without_drag_is_a_no_op() {
        let mut tracker = SelectionTracker::default();
        assert_eq!(tracker.finish(), None);
        assert_eq!(tracker.state(), SelectionState::Idle);
    }

    #[test]
    fn reset_clears_committed_selection() {
        let mut tracker = SelectionTracker::default();
        tracker.begin(point(0, 0));
        tracker.update(point(40, 40));
        tracker.finish();
        tracker.reset();
        assert_eq!(tracker.state(), SelectionState::Idle);
        assert_eq!(tracker.visible_rect(), None, "no residual rectangle to draw");
    }

    #[test]
    fn visible_rect_is_normalized_while_dragging() {
        let mut tracker = SelectionTracker::default();
        tracker.begin(point(10, 10));
        tracker.update(point(2, 2));
        assert_eq!(
            tracker.visible_rect(),
            Some(SelectionRect { x: 2, y: 2, width: 8, height: 8 })
        );
    }
}
