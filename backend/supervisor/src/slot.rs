//! Single-resolution terminal slot.

use std::sync::Mutex;

use tokio::sync::oneshot;

/// Accepts exactly one terminal value. Later resolutions are ignored.
///
/// Completion, timeout and cancellation race to resolve the same slot;
/// whichever arrives first is the one the waiter observes.
#[derive(Debug)]
pub struct TerminalSlot<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> TerminalSlot<T> {
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Returns `true` if this call claimed the slot.
    pub fn resolve(&self, value: T) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                // A dropped receiver still counts as resolved.
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_resolution_wins() {
        let (slot, rx) = TerminalSlot::new();
        assert!(slot.resolve("timeout"));
        assert!(!slot.resolve("completed"));
        assert_eq!(rx.await.unwrap(), "timeout");
    }

    #[test]
    fn test_resolve_without_receiver() {
        let (slot, rx) = TerminalSlot::<u8>::new();
        drop(rx);
        assert!(slot.resolve(1));
        assert!(!slot.resolve(2));
    }
}
