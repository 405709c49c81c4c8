use std::{
    marker::PhantomData,
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::error::{Error, Result};

const UNOWNED: usize = 0;

static NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static TOKEN: usize = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
}

/// Identity of the calling thread. Never `0`, unique for the life of the process.
pub fn thread_token() -> usize {
    TOKEN.with(|token| *token)
}

/// Reentrant exclusive lock that never blocks on acquisition.
///
/// A thread that already owns the monitor may acquire it again; it stays
/// owned until every acquisition has been matched by a release.
#[derive(Debug, Default)]
pub struct Monitor {
    owner: AtomicUsize,
    // only read or written by the owning thread
    depth: AtomicUsize,
}

impl Monitor {
    pub fn new() -> Self {
        Self {
            owner: AtomicUsize::new(UNOWNED),
            depth: AtomicUsize::new(0),
        }
    }

    pub fn try_acquire(&self) -> bool {
        let me = thread_token();
        // only this thread can have stored `me`, so Relaxed is enough to see it
        if self.owner.load(Ordering::Relaxed) == me {
            self.depth.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(thread = me, depth = self.depth(), "monitor re-entered");
            return true;
        }
        if self
            .owner
            .compare_exchange(UNOWNED, me, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.depth.store(1, Ordering::Relaxed);
            tracing::debug!(thread = me, "monitor acquired");
            true
        } else {
            tracing::debug!(thread = me, "monitor busy");
            false
        }
    }

    pub fn release(&self) -> Result<()> {
        let me = thread_token();
        if self.owner.load(Ordering::Relaxed) != me {
            return Err(Error::NotOwner { caller: me });
        }
        if self.depth.fetch_sub(1, Ordering::Relaxed) == 1 {
            self.owner.store(UNOWNED, Ordering::Release);
            tracing::debug!(thread = me, "monitor released");
        }
        Ok(())
    }

    /// Scoped `try_acquire`: the returned guard releases once when dropped.
    pub fn try_lock(&self) -> Option<MonitorGuard<'_>> {
        self.try_acquire().then(|| MonitorGuard {
            monitor: self,
            _not_send: PhantomData,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.owner.load(Ordering::Acquire) != UNOWNED
    }

    /// Acquisition count held by the calling thread.
    pub fn depth(&self) -> usize {
        if self.owner.load(Ordering::Relaxed) == thread_token() {
            self.depth.load(Ordering::Relaxed)
        } else {
            0
        }
    }
}

pub struct MonitorGuard<'a> {
    monitor: &'a Monitor,
    // ownership is tied to the thread that acquired
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for MonitorGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.monitor.release() {
            tracing::error!(%err, "monitor guard could not release");
        }
    }
}
