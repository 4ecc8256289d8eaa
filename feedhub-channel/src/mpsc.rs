//! Bounded MPSC queue built on `crossbeam-channel`.

use crate::ChannelError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use std::time::Duration;

/// Creates a bounded channel pair.
///
/// # Arguments
/// * `capacity` - Maximum number of queued items
#[must_use]
pub fn channel<T: Send>(capacity: usize) -> (MpscSender<T>, MpscReceiver<T>) {
    let (sender, receiver) = bounded(capacity);
    (
        MpscSender { inner: sender },
        MpscReceiver { inner: receiver },
    )
}

/// Producer half. Cheap to clone.
pub struct MpscSender<T> {
    inner: Sender<T>,
}

impl<T> Clone for MpscSender<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> MpscSender<T> {
    /// Queues an item without blocking.
    ///
    /// # Errors
    /// Hands the item back if the queue is full or the receiver is gone.
    #[inline]
    pub fn try_send(&self, item: T) -> Result<(), ChannelError<T>> {
        self.inner.try_send(item).map_err(|e| match e {
            TrySendError::Full(item) => ChannelError::Full(item),
            TrySendError::Disconnected(item) => ChannelError::Disconnected(item),
        })
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Queue capacity.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.inner.capacity()
    }
}

/// Consumer half.
pub struct MpscReceiver<T> {
    inner: Receiver<T>,
}

impl<T> MpscReceiver<T> {
    /// Takes the next item if one is queued.
    #[inline]
    pub fn try_recv(&self) -> Option<T> {
        self.inner.try_recv().ok()
    }

    /// Waits up to `timeout` for the next item.
    ///
    /// # Returns
    /// `None` on timeout or once every sender is gone and the queue is empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.inner.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Blocking iterator that ends when every sender is gone.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.inner.iter()
    }

    /// Takes everything currently queued.
    pub fn drain(&self) -> impl Iterator<Item = T> + '_ {
        self.inner.try_iter()
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
