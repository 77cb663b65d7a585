//! A bounded, timeout-dropping channel carrying byte buffers from a watcher
//! thread to its consumer without ever blocking the watcher indefinitely.
//! Built on `crossbeam-channel` rather than hand-rolled `Mutex`/`Condvar`
//! plumbing — the pack reaches for it for exactly this shape of channel.

pub use crossbeam_channel::{RecvTimeoutError, SendTimeoutError};

/// The producer half. Cloneable: several watcher threads may share one
/// consumer.
pub type BoundedSender = crossbeam_channel::Sender<Vec<u8>>;

/// The consumer half.
pub type BoundedReceiver = crossbeam_channel::Receiver<Vec<u8>>;

/// Creates a bounded channel of the given capacity.
pub fn bounded(capacity: usize) -> (BoundedSender, BoundedReceiver) {
    crossbeam_channel::bounded(capacity.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn send_and_receive_roundtrip() {
        let (tx, rx) = bounded(4);
        tx.send_timeout(vec![1, 2, 3], Duration::from_millis(100))
            .unwrap();
        assert_eq!(rx.recv().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn send_times_out_when_full_and_unconsumed() {
        let (tx, _rx) = bounded(1);
        tx.send_timeout(vec![1], Duration::from_millis(50)).unwrap();
        let err = tx
            .send_timeout(vec![2], Duration::from_millis(50))
            .unwrap_err();
        assert!(matches!(err, SendTimeoutError::Timeout(v) if v == vec![2]));
    }

    #[test]
    fn recv_timeout_errors_on_empty_queue() {
        let (_tx, rx) = bounded(1);
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(20)),
            Err(RecvTimeoutError::Timeout)
        ));
    }
}
