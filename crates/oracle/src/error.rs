use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::frame::{Element, ElementId};
use crate::geometry::Rect;

/// The expectation a violation was raised against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    BlockStay,
    BlockReturn,
    MoveRight,
    MoveLeft,
    Jump,
    Ascent,
    Fall,
    Hover,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::BlockStay => "block_stay",
            Self::BlockReturn => "block_return",
            Self::MoveRight => "move_right",
            Self::MoveLeft => "move_left",
            Self::Jump => "jump",
            Self::Ascent => "ascent",
            Self::Fall => "fall",
            Self::Hover => "hover",
        };
        f.write_str(code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    pub name: String,
    pub id: ElementId,
    pub rect: Rect,
}

impl From<&Element> for EntityRef {
    fn from(element: &Element) -> Self {
        Self {
            name: element.name.clone(),
            id: element.id,
            rect: element.rect,
        }
    }
}

/// Observed motion contradicted an expected rule. `frame` is the absolute
/// index of the latest frame in the behavior log when the check ran.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{expectation} violated at frame {frame}: {message}")]
pub struct InvariantViolation {
    pub expectation: Expectation,
    pub frame: usize,
    pub message: String,
    pub entities: Vec<EntityRef>,
}

impl InvariantViolation {
    pub fn new(expectation: Expectation, frame: usize, message: impl Into<String>) -> Self {
        Self {
            expectation,
            frame,
            message: message.into(),
            entities: Vec::new(),
        }
    }

    pub fn with_entity(mut self, element: &Element) -> Self {
        self.entities.push(EntityRef::from(element));
        self
    }
}
