//! Handler registry.
//!
//! Each notification kind owns an ordered list of handlers, invoked in
//! registration order. Dispatch clones the list before invoking anything, so a
//! handler may register more handlers or abort the engine.

use std::cell::RefCell;
use std::rc::Rc;

/// Handler for outbound frames.
pub type MessageHandler = Rc<RefCell<dyn FnMut(&[u8])>>;

/// Handler for text inserted into the document: `(offset, text)`.
pub type InsertHandler = Rc<RefCell<dyn FnMut(usize, &str)>>;

/// Handler for text removed from the document: `(offset, count)`.
pub type RemoveHandler = Rc<RefCell<dyn FnMut(usize, usize)>>;

/// Notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Message,
    Insert,
    Remove,
}

/// Registered handlers of one engine.
#[derive(Default)]
pub struct Handlers {
    message: Vec<MessageHandler>,
    insert: Vec<InsertHandler>,
    remove: Vec<RemoveHandler>,
}

impl Handlers {
    pub fn add_message(&mut self, handler: MessageHandler) {
        self.message.push(handler);
    }

    pub fn add_insert(&mut self, handler: InsertHandler) {
        self.insert.push(handler);
    }

    pub fn add_remove(&mut self, handler: RemoveHandler) {
        self.remove.push(handler);
    }

    /// Snapshot of the outbound handlers.
    pub fn message_handlers(&self) -> Vec<MessageHandler> {
        self.message.clone()
    }

    /// Snapshot of the insert handlers.
    pub fn insert_handlers(&self) -> Vec<InsertHandler> {
        self.insert.clone()
    }

    /// Snapshot of the remove handlers.
    pub fn remove_handlers(&self) -> Vec<RemoveHandler> {
        self.remove.clone()
    }

    /// Number of handlers registered for `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Message => self.message.len(),
            EventKind::Insert => self.insert.len(),
            EventKind::Remove => self.remove.len(),
        }
    }

    /// Drop every handler.
    pub fn clear(&mut self) {
        self.message.clear();
        self.insert.clear();
        self.remove.clear();
    }
}
