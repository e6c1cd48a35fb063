//! # Set-once Latches
//!
//! A latch is a boolean that starts `false` and can only ever become `true`.
//! It is the typed replacement for process-wide completion flags: [`latch`]
//! hands out exactly one [`LatchSetter`] and any number of [`Latch`] readers.
//!
//! - The setter is **not** `Clone` and [`LatchSetter::set`] consumes it, so a
//!   flag has a single writer and can never be cleared.
//! - Readers can poll ([`Latch::is_set`]) or park until the flag flips
//!   ([`Latch::wait`]) without busy-polling.
//! - [`LatchSetter::set_on_drop`] converts the setter into a guard that sets the
//!   latch when it goes out of scope, whatever the reason.
//!
//! ```rust
//! use kitchen_dispatch::framework::latch;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (setter, reader) = latch();
//! assert!(!reader.is_set());
//!
//! let waiter = tokio::spawn({
//!     let reader = reader.clone();
//!     async move { reader.wait().await }
//! });
//!
//! setter.set();
//! waiter.await.unwrap();
//! assert!(reader.is_set());
//! # }
//! ```

use crate::framework::FrameworkError;
use std::future::Future;
use tokio::sync::watch;

/// Creates a new unset latch, returning its single setter and a reader.
pub fn latch() -> (LatchSetter, Latch) {
    let (tx, rx) = watch::channel(false);
    (LatchSetter { tx }, Latch { rx })
}

/// The single write handle of a latch.
#[derive(Debug)]
pub struct LatchSetter {
    tx: watch::Sender<bool>,
}

impl LatchSetter {
    /// Flips the latch to `true` and wakes every waiter.
    pub fn set(self) {
        self.tx.send_replace(true);
    }

    /// Returns another reader for this latch.
    pub fn reader(&self) -> Latch {
        Latch {
            rx: self.tx.subscribe(),
        }
    }

    /// Converts the setter into a guard that sets the latch when dropped.
    pub fn set_on_drop(self) -> LatchGuard {
        LatchGuard { setter: Some(self) }
    }
}

/// Sets its latch when dropped. Returned by [`LatchSetter::set_on_drop`].
#[derive(Debug)]
pub struct LatchGuard {
    setter: Option<LatchSetter>,
}

impl Drop for LatchGuard {
    fn drop(&mut self) {
        if let Some(setter) = self.setter.take() {
            setter.set();
        }
    }
}

/// A cloneable read handle of a latch.
#[derive(Debug, Clone)]
pub struct Latch {
    rx: watch::Receiver<bool>,
}

impl Latch {
    /// Returns whether the latch has been set.
    pub fn is_set(&self) -> bool {
        *self.rx.borrow()
    }

    /// Parks until the latch is set.
    ///
    /// If the setter was dropped without setting, the latch can never flip and
    /// this future never resolves.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        let abandoned = rx.wait_for(|set| *set).await.is_err();
        if abandoned {
            std::future::pending::<()>().await;
        }
    }

    /// Runs `fut` to completion unless this latch is set first.
    ///
    /// The latch is checked before `fut` is polled, so an already-set latch
    /// always wins. `what` names the wait in the returned error.
    pub async fn interruptible<F>(&self, what: &'static str, fut: F) -> Result<F::Output, FrameworkError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.wait() => Err(FrameworkError::Interrupted(what)),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_latch_starts_unset_and_stays_set() {
        let (setter, reader) = latch();
        let other = setter.reader();
        assert!(!reader.is_set());
        assert!(!other.is_set());

        setter.set();
        assert!(reader.is_set());
        assert!(other.is_set());

        // Setter is gone; the value must survive it.
        reader.wait().await;
        assert!(reader.is_set());
    }

    #[tokio::test]
    async fn test_guard_sets_on_drop() {
        let (setter, reader) = latch();
        {
            let _guard = setter.set_on_drop();
            assert!(!reader.is_set());
        }
        assert!(reader.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_setter_never_wakes_waiters() {
        let (setter, reader) = latch();
        drop(setter);
        let waited = tokio::time::timeout(Duration::from_secs(60), reader.wait()).await;
        assert!(waited.is_err());
        assert!(!reader.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interruptible_prefers_set_latch() {
        let (setter, reader) = latch();
        setter.set();
        let result = reader.interruptible("ready", async { 7 }).await;
        assert_eq!(result, Err(FrameworkError::Interrupted("ready")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interruptible_passes_through_output() {
        let (_setter, reader) = latch();
        let result = reader
            .interruptible("sleep", async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                42
            })
            .await;
        assert_eq!(result, Ok(42));
    }
}
