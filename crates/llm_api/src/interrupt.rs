//! SIGINT adapter for [`CancelToken`].
//!
//! The handler only touches the token's flag and wake pipe. Everything else
//! happens in the waiting engine.

use std::io;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

use libc::c_int;

use crate::cancel::CancelToken;

static ACTIVE: AtomicPtr<CancelToken> = AtomicPtr::new(ptr::null_mut());

extern "C" fn on_sigint(_signal: c_int) {
    let token = ACTIVE.load(Ordering::SeqCst);
    if !token.is_null() {
        // SAFETY: the guard holding this pointer keeps the token alive and
        // clears the pointer before releasing it.
        unsafe { (*token).notify() };
    }
}

/// Routes SIGINT to a token until dropped, then restores the previous
/// disposition. At most one guard exists per process.
pub struct SigintGuard {
    token: Arc<CancelToken>,
    previous: libc::sigaction,
}

impl SigintGuard {
    pub fn install(token: &Arc<CancelToken>) -> io::Result<Self> {
        let raw = Arc::as_ptr(token).cast_mut();
        if ACTIVE
            .compare_exchange(ptr::null_mut(), raw, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "an interrupt guard is already installed",
            ));
        }

        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = on_sigint as extern "C" fn(c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        let mut previous = MaybeUninit::<libc::sigaction>::uninit();
        let installed = unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            libc::sigaction(libc::SIGINT, &action, previous.as_mut_ptr())
        };
        if installed != 0 {
            let err = io::Error::last_os_error();
            ACTIVE.store(ptr::null_mut(), Ordering::SeqCst);
            return Err(err);
        }

        Ok(Self {
            token: Arc::clone(token),
            // SAFETY: sigaction succeeded and filled in the previous action.
            previous: unsafe { previous.assume_init() },
        })
    }

    pub fn token(&self) -> &Arc<CancelToken> {
        &self.token
    }
}

impl std::fmt::Debug for SigintGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigintGuard")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl Drop for SigintGuard {
    fn drop(&mut self) {
        unsafe {
            libc::sigaction(libc::SIGINT, &self.previous, ptr::null_mut());
        }
        ACTIVE.store(ptr::null_mut(), Ordering::SeqCst);
    }
}
