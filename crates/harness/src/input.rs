use std::sync::mpsc::{self, Receiver, Sender};

use oracle::{Key, KeySet};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(Key),
    Released(Key),
}

/// Pending input for the tick loop. Producers hold an [`InputSender`] and may
/// live on other threads; the session drains the queue once per tick.
pub struct InputQueue {
    sender: Sender<InputEvent>,
    receiver: Receiver<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> InputSender {
        InputSender {
            sender: self.sender.clone(),
        }
    }

    /// Applies every pending event to `keys` in arrival order and returns how
    /// many were applied.
    pub fn drain_into(&self, keys: &mut KeySet) -> usize {
        let mut applied = 0;
        for event in self.receiver.try_iter() {
            let changed = match event {
                InputEvent::Pressed(key) => keys.insert(key),
                InputEvent::Released(key) => keys.remove(key),
            };
            trace!(?event, changed, "input_event");
            applied += 1;
        }
        applied
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct InputSender {
    sender: Sender<InputEvent>,
}

impl InputSender {
    /// Returns `false` once the queue is gone.
    pub fn send(&self, event: InputEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn press(&self, key: Key) -> bool {
        self.send(InputEvent::Pressed(key))
    }

    pub fn release(&self, key: Key) -> bool {
        self.send(InputEvent::Released(key))
    }
}
