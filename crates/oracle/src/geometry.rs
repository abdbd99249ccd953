use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixels. `y` grows downward, so "up" is a decreasing `y`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub const fn left(&self) -> i32 {
        self.x
    }

    pub const fn right(&self) -> i32 {
        self.x + self.w
    }

    pub const fn top(&self) -> i32 {
        self.y
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub const fn center_x(&self) -> i32 {
        self.x + self.w / 2
    }

    /// Overlap with positive area. Rects that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.w <= 0 || self.h <= 0 || other.w <= 0 || other.h <= 0 {
            return false;
        }
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    pub fn in_view(&self, viewport: &Rect) -> bool {
        viewport.intersects(self)
    }

    /// Converts a world box into viewport-relative coordinates, clipping the
    /// horizontal span to the viewport. Vertical coordinates are kept as-is
    /// because the camera only scrolls sideways.
    pub fn adjust_to_viewport(&self, viewport: &Rect) -> Rect {
        let (x, w) = if self.x < viewport.x {
            (0, self.right() - viewport.x)
        } else {
            let x = self.x - viewport.x;
            (x, self.w.min(viewport.right() - x))
        };
        Rect::new(x, self.y, w, self.h)
    }
}

fn spans_overlap(a_start: i32, a_end: i32, b_start: i32, b_end: i32) -> bool {
    (a_start < b_end && a_start > b_start)
        || (a_end < b_end && a_end > b_start)
        || (a_start <= b_start && a_end >= b_end)
}

fn spans_touch(a_start: i32, a_end: i32, b_start: i32, b_end: i32) -> bool {
    (a_end >= b_start && a_start < b_start)
        || (a_start <= b_end && a_end > b_start)
        || (a_start >= b_start && a_end <= b_end)
}

/// `a` rests its top edge against the bottom edge of `b`.
pub fn top_touch(a: &Rect, b: &Rect) -> bool {
    a.top() == b.bottom() && spans_overlap(a.left(), a.right(), b.left(), b.right())
}

/// `a` rests its bottom edge on the top edge of `b`.
pub fn bottom_touch(a: &Rect, b: &Rect) -> bool {
    a.bottom() == b.top() && spans_overlap(a.left(), a.right(), b.left(), b.right())
}

/// `a` presses its left edge against the right side of `b`.
pub fn left_touch(a: &Rect, b: &Rect) -> bool {
    let horizontal = b.left() < a.left() && a.left() <= b.right() && a.right() > b.right();
    horizontal && spans_touch(a.top(), a.bottom(), b.top(), b.bottom())
}

/// `a` presses its right edge against the left side of `b`.
pub fn right_touch(a: &Rect, b: &Rect) -> bool {
    let horizontal = a.left() < b.left() && a.right() >= b.left() && b.right() > a.right();
    horizontal && spans_touch(a.top(), a.bottom(), b.top(), b.bottom())
}

pub fn boxes_equal(a: &Rect, b: &Rect, tolerance: i32) -> bool {
    (a.x - b.x).abs() <= tolerance
        && (a.y - b.y).abs() <= tolerance
        && (a.w - b.w).abs() <= tolerance
        && (a.h - b.h).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_touch_requires_shared_edge_and_overlap() {
        let player = Rect::new(100, 160, 30, 40);
        let ground = Rect::new(80, 200, 100, 40);
        assert!(bottom_touch(&player, &ground));
        assert!(top_touch(&ground, &player));

        let hovering = Rect::new(100, 159, 30, 40);
        assert!(!bottom_touch(&hovering, &ground));

        let beside = Rect::new(180, 160, 30, 40);
        assert!(!bottom_touch(&beside, &ground), "corner contact is not a touch");
    }

    #[test]
    fn bottom_touch_accepts_partial_and_full_overlap() {
        let ground = Rect::new(100, 200, 40, 40);
        for player in [
            Rect::new(90, 160, 30, 40),
            Rect::new(120, 160, 30, 40),
            Rect::new(100, 160, 40, 40),
            Rect::new(90, 160, 60, 40),
        ] {
            assert!(bottom_touch(&player, &ground), "player={player:?}");
        }
    }

    #[test]
    fn top_touch_mirrors_bottom_touch() {
        let block = Rect::new(200, 100, 32, 32);
        let player = Rect::new(210, 132, 24, 32);
        assert!(top_touch(&player, &block));
        assert!(bottom_touch(&block, &player));
        assert!(!top_touch(&block, &player));
    }

    #[test]
    fn right_touch_detects_contact_from_the_left() {
        let player = Rect::new(70, 160, 30, 40);
        let pipe = Rect::new(100, 140, 60, 100);
        assert!(right_touch(&player, &pipe));
        assert!(left_touch(&pipe, &player));
        assert!(!left_touch(&player, &pipe));
    }

    #[test]
    fn right_touch_requires_vertical_overlap() {
        let player = Rect::new(70, 40, 30, 40);
        let pipe = Rect::new(100, 140, 60, 100);
        assert!(!right_touch(&player, &pipe));
    }

    #[test]
    fn left_touch_detects_contact_from_the_right() {
        let wall = Rect::new(0, 100, 50, 100);
        let player = Rect::new(50, 150, 30, 40);
        assert!(left_touch(&player, &wall));
        assert!(!right_touch(&player, &wall));
    }

    #[test]
    fn boxes_equal_honors_tolerance() {
        let a = Rect::new(10, 20, 30, 40);
        assert!(boxes_equal(&a, &a, 0));
        assert!(!boxes_equal(&a, &Rect::new(11, 20, 30, 40), 0));
        assert!(boxes_equal(&a, &Rect::new(11, 19, 31, 39), 1));
        assert!(!boxes_equal(&a, &Rect::new(12, 20, 30, 40), 1));
    }

    #[test]
    fn in_view_ignores_edge_adjacent_boxes() {
        let viewport = Rect::new(100, 0, 800, 600);
        assert!(Rect::new(150, 10, 10, 10).in_view(&viewport));
        assert!(Rect::new(95, 10, 10, 10).in_view(&viewport));
        assert!(!Rect::new(90, 10, 10, 10).in_view(&viewport));
        assert!(!Rect::new(900, 10, 10, 10).in_view(&viewport));
    }

    #[test]
    fn adjust_to_viewport_clips_left_overhang() {
        let viewport = Rect::new(100, 0, 800, 600);
        assert_eq!(
            Rect::new(90, 50, 30, 40).adjust_to_viewport(&viewport),
            Rect::new(0, 50, 20, 40)
        );
        assert_eq!(
            Rect::new(300, 50, 30, 40).adjust_to_viewport(&viewport),
            Rect::new(200, 50, 30, 40)
        );
    }
}
