use tracing::trace;

use crate::frame::{Element, Frame};
use crate::geometry::{bottom_touch, left_touch, right_touch, top_touch, Rect};
use crate::overlay::{Color, Overlay};

const COLLISION_THICKNESS: u32 = 5;

/// Which entity classes a collision query considers.
#[derive(Debug, Clone, Copy)]
pub enum Classes<'a> {
    All,
    Only(&'a [String]),
}

impl<'a> Classes<'a> {
    fn candidates<'f>(self, frame: &'f Frame) -> Box<dyn Iterator<Item = &'f Element> + 'f>
    where
        'a: 'f,
    {
        match self {
            Classes::All => Box::new(frame.all_elements()),
            Classes::Only(names) => Box::new(
                names
                    .iter()
                    .flat_map(move |name| frame.elements(name).iter()),
            ),
        }
    }
}

fn find_touch<'f>(
    frame: &'f Frame,
    subject: &Element,
    classes: Classes<'f>,
    touches: fn(&Rect, &Rect) -> bool,
) -> Option<&'f Element> {
    classes
        .candidates(frame)
        .filter(|candidate| candidate.id != subject.id)
        .find(|candidate| touches(&subject.rect, &candidate.rect))
}

fn report(
    overlay: &dyn Overlay,
    frame: &Frame,
    subject: &Element,
    other: &Element,
    color: Color,
    side: &'static str,
) {
    trace!(side, subject = %subject, other = %other, "collision");
    overlay.highlight(
        &[
            subject.rect.adjust_to_viewport(&frame.viewport),
            other.rect.adjust_to_viewport(&frame.viewport),
        ],
        color,
        COLLISION_THICKNESS,
    );
}

pub fn has_right_collision(
    frame: &Frame,
    subject: &Element,
    classes: Classes<'_>,
    overlay: &dyn Overlay,
) -> bool {
    match find_touch(frame, subject, classes, right_touch) {
        Some(other) => {
            report(overlay, frame, subject, other, Color::GREEN, "right");
            true
        }
        None => false,
    }
}

/// The left edge of the world counts as a collision on its own.
pub fn has_left_collision(
    frame: &Frame,
    subject: &Element,
    classes: Classes<'_>,
    overlay: &dyn Overlay,
) -> bool {
    if subject.rect.left() == 0 {
        trace!(subject = %subject, "world_left_edge");
        return true;
    }
    match find_touch(frame, subject, classes, left_touch) {
        Some(other) => {
            report(overlay, frame, subject, other, Color::RED, "left");
            true
        }
        None => false,
    }
}

pub fn has_bottom_collision(
    frame: &Frame,
    subject: &Element,
    classes: Classes<'_>,
    overlay: &dyn Overlay,
) -> bool {
    match find_touch(frame, subject, classes, bottom_touch) {
        Some(other) => {
            report(overlay, frame, subject, other, Color::RED, "bottom");
            true
        }
        None => false,
    }
}

pub fn has_top_collision(
    frame: &Frame,
    subject: &Element,
    classes: Classes<'_>,
    overlay: &dyn Overlay,
) -> bool {
    match find_touch(frame, subject, classes, top_touch) {
        Some(other) => {
            report(overlay, frame, subject, other, Color::RED, "top");
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::KeySet;
    use crate::overlay::{NoopOverlay, OverlayLog};

    fn frame(elements: Vec<Element>) -> Frame {
        elements.into_iter().fold(
            Frame::new(KeySet::empty(), Rect::new(0, 0, 800, 600)),
            Frame::with_element,
        )
    }

    #[test]
    fn right_collision_ignores_the_subject_itself() {
        let player = Element::new("player", Rect::new(100, 160, 30, 40), 1);
        let frame = frame(vec![player.clone()]);
        assert!(!has_right_collision(&frame, &player, Classes::All, &NoopOverlay));
    }

    #[test]
    fn identical_box_with_other_identity_still_counts() {
        let player = Element::new("player", Rect::new(100, 160, 30, 40), 1);
        let wall = Element::new("collider", Rect::new(130, 100, 20, 200), 2);
        let mut twin = player.clone();
        twin.id = crate::frame::ElementId(3);
        let frame = frame(vec![player.clone(), wall]);
        assert!(has_right_collision(&frame, &player, Classes::All, &NoopOverlay));
        assert!(has_right_collision(&frame, &twin, Classes::All, &NoopOverlay));
    }

    #[test]
    fn left_collision_at_world_edge_without_candidates() {
        let player = Element::new("player", Rect::new(0, 160, 30, 40), 1);
        let frame = frame(vec![player.clone()]);
        assert!(has_left_collision(&frame, &player, Classes::All, &NoopOverlay));
    }

    #[test]
    fn bottom_collision_respects_class_filter() {
        let player = Element::new("player", Rect::new(100, 160, 30, 40), 1);
        let coin = Element::new("coin", Rect::new(100, 200, 30, 30), 2);
        let frame = frame(vec![player.clone(), coin]);
        let solids = vec!["brick".to_string(), "pipe".to_string()];
        assert!(!has_bottom_collision(&frame, &player, Classes::Only(&solids), &NoopOverlay));
        assert!(has_bottom_collision(&frame, &player, Classes::All, &NoopOverlay));
    }

    #[test]
    fn top_collision_highlights_viewport_adjusted_boxes() {
        let viewport = Rect::new(100, 0, 800, 600);
        let player = Element::new("player", Rect::new(210, 132, 24, 32), 1);
        let block = Element::new("box", Rect::new(200, 100, 32, 32), 2);
        let frame = Frame::new(KeySet::empty(), viewport)
            .with_element(player.clone())
            .with_element(block);
        let overlay = OverlayLog::default();
        assert!(has_top_collision(&frame, &player, Classes::All, &overlay));
        let requests = overlay.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].boxes,
            vec![Rect::new(110, 132, 24, 32), Rect::new(100, 100, 32, 32)]
        );
    }
}
