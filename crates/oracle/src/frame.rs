use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Action,
    Enter,
}

const KEY_COUNT: usize = 7;

impl Key {
    pub const ALL: [Key; KEY_COUNT] = [
        Key::Left,
        Key::Right,
        Key::Up,
        Key::Down,
        Key::Jump,
        Key::Action,
        Key::Enter,
    ];

    const fn index(self) -> usize {
        match self {
            Key::Left => 0,
            Key::Right => 1,
            Key::Up => 2,
            Key::Down => 3,
            Key::Jump => 4,
            Key::Action => 5,
            Key::Enter => 6,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Key::Left => "left",
            Key::Right => "right",
            Key::Up => "up",
            Key::Down => "down",
            Key::Jump => "jump",
            Key::Action => "action",
            Key::Enter => "enter",
        }
    }
}

/// Keys held during one tick. `Copy`, so capturing a frame snapshots the live
/// input state instead of aliasing it.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Key>", into = "Vec<Key>")]
pub struct KeySet {
    down: [bool; KEY_COUNT],
}

impl KeySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: Key) -> Self {
        self.insert(key);
        self
    }

    pub fn contains(&self, key: Key) -> bool {
        self.down[key.index()]
    }

    /// Returns `true` when the key was not already held.
    pub fn insert(&mut self, key: Key) -> bool {
        let was_down = self.down[key.index()];
        self.down[key.index()] = true;
        !was_down
    }

    /// Returns `true` when the key was held.
    pub fn remove(&mut self, key: Key) -> bool {
        let was_down = self.down[key.index()];
        self.down[key.index()] = false;
        was_down
    }

    pub fn is_empty(&self) -> bool {
        !self.down.iter().any(|down| *down)
    }

    pub fn iter(&self) -> impl Iterator<Item = Key> + '_ {
        Key::ALL.into_iter().filter(|key| self.contains(*key))
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.iter().map(Key::name).collect::<Vec<_>>();
        write!(f, "Keys({})", names.join(","))
    }
}

impl From<Vec<Key>> for KeySet {
    fn from(keys: Vec<Key>) -> Self {
        keys.into_iter().fold(KeySet::empty(), KeySet::with)
    }
}

impl From<KeySet> for Vec<Key> {
    fn from(keys: KeySet) -> Self {
        keys.iter().collect()
    }
}

impl FromIterator<Key> for KeySet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        iter.into_iter().fold(KeySet::empty(), KeySet::with)
    }
}

/// Identity token assigned by the telemetry provider. Stable for as long as
/// the entity stays visible.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(rename = "box")]
    pub rect: Rect,
    pub id: ElementId,
}

impl Element {
    pub fn new(name: impl Into<String>, rect: Rect, id: u64) -> Self {
        Self {
            name: name.into(),
            rect,
            id: ElementId(id),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Rect { x, y, w, h } = self.rect;
        write!(f, "{}{}({x}, {y}, {w}, {h})", self.name, self.id)
    }
}

/// One tick of telemetry: held keys, visible elements grouped by class and
/// the camera viewport, all in world coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub keys: KeySet,
    pub boxes: BTreeMap<String, Vec<Element>>,
    pub viewport: Rect,
}

impl Frame {
    pub fn new(keys: KeySet, viewport: Rect) -> Self {
        Self {
            keys,
            boxes: BTreeMap::new(),
            viewport,
        }
    }

    /// Appends an element under its class name.
    pub fn with_element(mut self, element: Element) -> Self {
        self.push_element(element);
        self
    }

    pub fn push_element(&mut self, element: Element) {
        self.boxes
            .entry(element.name.clone())
            .or_default()
            .push(element);
    }

    pub fn elements(&self, class: &str) -> &[Element] {
        self.boxes.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First element of the class; used for singleton entities such as the player.
    pub fn first(&self, class: &str) -> Option<&Element> {
        self.elements(class).first()
    }

    pub fn find(&self, class: &str, id: ElementId) -> Option<&Element> {
        self.elements(class).iter().find(|element| element.id == id)
    }

    pub fn all_elements(&self) -> impl Iterator<Item = &Element> {
        self.boxes.values().flatten()
    }
}

/// Append-only history of captured frames for one verification session.
#[derive(Debug, Clone, Default)]
pub struct BehaviorLog {
    frames: Vec<Frame>,
}

impl BehaviorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame `offset` ticks back from the end: `back(1)` is the latest frame,
    /// `back(2)` the one before it. `back(0)` is always `None`.
    pub fn back(&self, offset: usize) -> Option<&Frame> {
        if offset == 0 || offset > self.frames.len() {
            return None;
        }
        self.frames.get(self.frames.len() - offset)
    }

    pub fn latest(&self) -> Option<&Frame> {
        self.back(1)
    }

    pub fn previous(&self) -> Option<&Frame> {
        self.back(2)
    }

    /// The last `count` frames, oldest first.
    pub fn tail(&self, count: usize) -> &[Frame] {
        let start = self.frames.len().saturating_sub(count);
        &self.frames[start..]
    }

    /// Absolute index of the frame `offset` ticks back.
    pub fn index_of_back(&self, offset: usize) -> Option<usize> {
        if offset == 0 || offset > self.frames.len() {
            return None;
        }
        Some(self.frames.len() - offset)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl FromIterator<Frame> for BehaviorLog {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_player(x: i32) -> Frame {
        Frame::new(KeySet::empty(), Rect::new(0, 0, 800, 600))
            .with_element(Element::new("player", Rect::new(x, 200, 30, 40), 1))
    }

    #[test]
    fn key_set_insert_and_remove_report_transitions() {
        let mut keys = KeySet::empty();
        assert!(keys.insert(Key::Right));
        assert!(!keys.insert(Key::Right));
        assert!(keys.contains(Key::Right));
        assert!(!keys.contains(Key::Left));
        assert!(keys.remove(Key::Right));
        assert!(!keys.remove(Key::Right));
        assert!(keys.is_empty());
    }

    #[test]
    fn key_set_snapshot_is_independent_of_live_state() {
        let mut live = KeySet::empty().with(Key::Jump);
        let snapshot = live;
        live.remove(Key::Jump);
        assert!(snapshot.contains(Key::Jump));
        assert!(!live.contains(Key::Jump));
    }

    #[test]
    fn key_set_serializes_as_key_list() {
        let keys = KeySet::empty().with(Key::Jump).with(Key::Right);
        let text = serde_json::to_string(&keys).expect("encode");
        assert_eq!(text, r#"["right","jump"]"#);
        let decoded: KeySet = serde_json::from_str(&text).expect("decode");
        assert_eq!(decoded, keys);
        assert_eq!(keys.to_string(), "Keys(right,jump)");
    }

    #[test]
    fn frame_decodes_box_field() {
        let raw = r#"{
            "keys": ["left"],
            "boxes": {"player": [{"name": "player", "box": {"x": 1, "y": 2, "w": 3, "h": 4}, "id": 9}]},
            "viewport": {"x": 0, "y": 0, "w": 800, "h": 600}
        }"#;
        let frame: Frame = serde_json::from_str(raw).expect("frame");
        let player = frame.first("player").expect("player");
        assert_eq!(player.rect, Rect::new(1, 2, 3, 4));
        assert_eq!(player.id, ElementId(9));
        assert!(frame.keys.contains(Key::Left));
    }

    #[test]
    fn frame_lookup_by_class_and_id() {
        let frame = Frame::default()
            .with_element(Element::new("box", Rect::new(0, 0, 16, 16), 4))
            .with_element(Element::new("box", Rect::new(16, 0, 16, 16), 5));
        assert_eq!(frame.elements("box").len(), 2);
        assert!(frame.elements("brick").is_empty());
        assert_eq!(
            frame.find("box", ElementId(5)).map(|element| element.rect.x),
            Some(16)
        );
        assert!(frame.find("box", ElementId(6)).is_none());
        assert_eq!(frame.all_elements().count(), 2);
    }

    #[test]
    fn behavior_log_indexes_from_the_end() {
        let log: BehaviorLog = (0..4).map(|i| frame_with_player(i * 10)).collect();
        let x_at = |offset| log.back(offset).and_then(|f| f.first("player")).map(|e| e.rect.x);
        assert_eq!(x_at(1), Some(30));
        assert_eq!(x_at(2), Some(20));
        assert_eq!(x_at(4), Some(0));
        assert_eq!(x_at(5), None);
        assert!(log.back(0).is_none());
        assert_eq!(log.index_of_back(1), Some(3));
        assert_eq!(log.tail(2).len(), 2);
        assert_eq!(log.tail(10).len(), 4);
    }
}
