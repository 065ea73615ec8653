//! Peer discovery capability.
//!
//! Some transport kinds can enumerate reachable devices (USB, BLE). A TCP
//! peer is addressed explicitly, so the default methods here describe a
//! transport that is usable but never discovers anything.

use std::fmt;

/// Receives discovery events.
pub trait Observer<T>: Send {
    /// A peer was found.
    fn next(&mut self, descriptor: T);

    /// No further events will be delivered.
    fn complete(&mut self);
}

/// Handle to an active discovery stream.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// A subscription whose stream has already completed.
    pub fn completed() -> Self {
        Self { cancel: None }
    }

    /// A subscription that runs `cancel` when unsubscribed.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Whether events may still be delivered.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Stop receiving events. No-op on a completed subscription.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Discovery contract shared by transport kinds.
///
/// Called on the type, e.g. `TcpTransport::is_supported()`, with no open
/// connection.
pub trait Discovery {
    /// What a discovered peer looks like.
    type Descriptor: Send + 'static;

    /// Whether this transport kind can be used on the current host.
    fn is_supported() -> bool {
        true
    }

    /// Currently known peers.
    fn list() -> Vec<Self::Descriptor> {
        Vec::new()
    }

    /// Stream discovery events to `observer`.
    ///
    /// The default completes the observer immediately.
    fn listen(mut observer: Box<dyn Observer<Self::Descriptor>>) -> Subscription {
        observer.complete();
        Subscription::completed()
    }
}

/// Discovery for transports that are addressed explicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiscovery;

impl Discovery for NoDiscovery {
    type Descriptor = crate::address::PeerAddress;
}
