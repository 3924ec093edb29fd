use std::sync::{Mutex, PoisonError};

use crate::{driver::BoardDriver, policy::AllowAllPolicy};

/// A [`BoardDriver`] that can be shared between threads.
///
/// Each driver carries its own lock, so contention stays within one board:
/// a long [`with_driver`](Self::with_driver) call on one board never delays
/// access to another. A physical access and the cache update that mirrors it
/// are never observed half done. Compose-then-write operations such as
/// [`bit_on`](BoardDriver::bit_on) are atomic when issued from one closure.
///
/// Keep closures short. Everything else waiting on the same board waits for
/// the whole closure, including any polling loop inside it.
pub struct SharedDriver<IO, AP = AllowAllPolicy> {
    inner: Mutex<BoardDriver<IO, AP>>,
}

impl<IO, AP> SharedDriver<IO, AP> {
    pub fn new(driver: BoardDriver<IO, AP>) -> Self {
        Self {
            inner: Mutex::new(driver),
        }
    }

    /// Runs `f` with exclusive access to the driver.
    ///
    /// A panic inside an earlier closure does not poison the driver: every
    /// access leaves the cache consistent with the bus before it returns.
    /// Calling `with_driver` again from inside `f` deadlocks.
    pub fn with_driver<R>(&self, f: impl FnOnce(&mut BoardDriver<IO, AP>) -> R) -> R {
        let mut driver = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut driver)
    }

    pub fn into_inner(self) -> BoardDriver<IO, AP> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<IO, AP> From<BoardDriver<IO, AP>> for SharedDriver<IO, AP> {
    fn from(driver: BoardDriver<IO, AP>) -> Self {
        Self::new(driver)
    }
}

impl<IO, AP> core::fmt::Debug for SharedDriver<IO, AP> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedDriver").finish_non_exhaustive()
    }
}
