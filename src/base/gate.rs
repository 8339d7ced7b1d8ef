//! One-shot gate the main task waits on until the runtime connection closes.

use tokio::sync::watch;

/// A latch that opens once and stays open.
///
/// Cloning shares the same latch.
#[derive(Debug, Clone)]
pub struct CloseGate {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl Default for CloseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl CloseGate {
    /// Create a closed (not yet released) gate.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: std::sync::Arc::new(tx) }
    }

    /// Open the gate. Returns `true` only for the call that opened it.
    pub fn release(&self) -> bool {
        self.tx.send_if_modified(|released| {
            if *released {
                false
            } else {
                *released = true;
                true
            }
        })
    }

    /// Whether the gate has been opened.
    pub fn is_released(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the gate is opened. Returns immediately if it already is.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so `wait_for` cannot fail here.
        let _ = rx.wait_for(|released| *released).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_release_once() {
        let gate = CloseGate::new();
        assert!(!gate.is_released());
        assert!(gate.release());
        assert!(!gate.release());
        assert!(gate.is_released());
    }

    #[tokio::test]
    async fn test_wait_after_release() {
        let gate = CloseGate::new();
        gate.release();
        tokio::time::timeout(Duration::from_millis(100), gate.wait())
            .await
            .expect("released gate should not block");
    }

    #[tokio::test]
    async fn test_wait_blocks_until_release() {
        let gate = CloseGate::new();
        let waiter = gate.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        gate.release();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
