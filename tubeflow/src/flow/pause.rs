//! Counted pause handles.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

type Hook = Box<dyn Fn() + Send + Sync>;

struct PauserInner {
    outstanding: Mutex<usize>,
    on_pause: Hook,
    on_resume: Hook,
}

/// Hands out [`Pause`] handles and tracks how many are outstanding.
///
/// `on_pause` runs when the first handle is taken, `on_resume` when the last
/// one is released. Taking a second handle while paused, or releasing one of
/// several, does not run either hook.
#[derive(Clone)]
pub struct Pauser {
    inner: Arc<PauserInner>,
}

impl Pauser {
    /// Creates a pauser with its transition hooks.
    pub fn new<P, R>(on_pause: P, on_resume: R) -> Self
    where
        P: Fn() + Send + Sync + 'static,
        R: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(PauserInner {
                outstanding: Mutex::new(0),
                on_pause: Box::new(on_pause),
                on_resume: Box::new(on_resume),
            }),
        }
    }

    /// Takes a pause handle.
    pub fn pause(&self) -> Pause {
        let first = {
            let mut outstanding = self.inner.outstanding.lock();
            *outstanding += 1;
            *outstanding == 1
        };
        if first {
            (self.inner.on_pause)();
        }
        Pause {
            pauser: Some(Arc::clone(&self.inner)),
        }
    }

    /// Returns true while any handle is outstanding.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.inner.outstanding.lock() > 0
    }

    /// Returns the number of outstanding handles.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        *self.inner.outstanding.lock()
    }
}

impl fmt::Debug for Pauser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pauser")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// A held pause on a fount.
///
/// The flow resumes when the handle is released, either through
/// [`Pause::unpause`] or by dropping it. A handle can only be released once.
#[must_use = "dropping a Pause resumes the flow immediately"]
pub struct Pause {
    pauser: Option<Arc<PauserInner>>,
}

impl Pause {
    /// A pause that controls nothing, for founts that cannot pause.
    pub fn noop() -> Self {
        Self { pauser: None }
    }

    /// Releases the pause.
    pub fn unpause(self) {
        drop(self);
    }
}

impl Drop for Pause {
    fn drop(&mut self) {
        let Some(inner) = self.pauser.take() else {
            return;
        };
        let last = {
            let mut outstanding = inner.outstanding.lock();
            *outstanding = outstanding.saturating_sub(1);
            *outstanding == 0
        };
        if last {
            (inner.on_resume)();
        }
    }
}

impl fmt::Debug for Pause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pause")
            .field("active", &self.pauser.is_some())
            .finish()
    }
}
