use std::cell::RefCell;
use std::fmt;
use std::future::Future;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::error::Result;

/// Formats a byte slice as a quoted string of `\x..` escapes.
pub struct DisplayAsHexBytes<'a>(pub &'a [u8]);

impl fmt::Display for DisplayAsHexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b\"")?;
        for byte in self.0 {
            if matches!(byte, b' '..=b'~') && *byte != b'"' && *byte != b'\\' {
                write!(f, "{}", *byte as char)?;
            } else {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        write!(f, "\"")?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////
// SharedLazy
////////////////////////////////////////////////////////////////////////////////

type SharedResult<T> = Shared<LocalBoxFuture<'static, Result<T>>>;

/// An asynchronously initialized value with single-flight semantics.
///
/// The first call to [`get_or_try_init`] starts the initializing future and
/// stores it. Every other call, concurrent or later, awaits a clone of that
/// same future, so the initializer runs at most once while it is in flight
/// or after it succeeded.
///
/// A failed attempt is not kept: all tasks which awaited it get the same
/// error, after which the cell is empty again and the next call starts a new
/// attempt.
///
/// Intended for the single threaded fiber runtime: the stored future is
/// `!Send` and the cell must not be shared between threads.
///
/// [`get_or_try_init`]: Self::get_or_try_init
pub struct SharedLazy<T> {
    slot: RefCell<Option<SharedResult<T>>>,
}

impl<T> Default for SharedLazy<T> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }
}

impl<T: Clone> fmt::Debug for SharedLazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.borrow() {
            None => "empty",
            Some(fut) if fut.peek().is_some() => "ready",
            Some(_) => "pending",
        };
        f.debug_struct("SharedLazy").field("state", &state).finish()
    }
}

impl<T> SharedLazy<T>
where
    T: Clone + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value if it was successfully initialized already.
    pub fn get(&self) -> Option<T> {
        let slot = self.slot.borrow();
        match slot.as_ref()?.peek()? {
            Ok(v) => Some(v.clone()),
            Err(_) => None,
        }
    }

    /// Returns `true` if an initialization attempt is currently in flight.
    pub fn is_pending(&self) -> bool {
        matches!(&*self.slot.borrow(), Some(fut) if fut.peek().is_none())
    }

    /// Awaits the value, starting the initializer `init` if no attempt is in
    /// flight and no value is stored yet.
    ///
    /// The attempt is joined when this method is called, not when the
    /// returned future is first polled: all futures obtained before an
    /// attempt settles observe its outcome.
    pub fn get_or_try_init<F, Fut>(&self, init: F) -> impl Future<Output = Result<T>> + '_
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + 'static,
    {
        let fut = {
            let mut slot = self.slot.borrow_mut();
            match &*slot {
                Some(fut) => fut.clone(),
                None => {
                    let fut = init().boxed_local().shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        async move {
            // The slot must not stay borrowed across this `.await`, other
            // tasks access it while this one is suspended.
            let res = fut.clone().await;
            if let Err(e) = &res {
                let mut slot = self.slot.borrow_mut();
                if matches!(&*slot, Some(stored) if stored.ptr_eq(&fut)) {
                    log::warn!("lazy initialization failed, next access will retry: {e}");
                    *slot = None;
                }
            }
            res
        }
    }
}
