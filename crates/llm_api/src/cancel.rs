//! Wakeable cancellation flag.
//!
//! The flag is the source of truth. The self-pipe exists only so a waiter can
//! block on a descriptor instead of polling the flag.

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd};
use std::sync::atomic::{AtomicBool, Ordering};

use libc::c_int;

#[derive(Debug)]
pub struct CancelToken {
    cancelled: AtomicBool,
    wake_read: OwnedFd,
    wake_write: OwnedFd,
}

impl CancelToken {
    pub fn new() -> io::Result<Self> {
        let mut fds: [c_int; 2] = [-1; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: pipe succeeded and both descriptors are owned from here on.
        let (wake_read, wake_write) =
            unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        for fd in [wake_read.as_raw_fd(), wake_write.as_raw_fd()] {
            set_nonblocking_cloexec(fd)?;
        }

        Ok(Self {
            cancelled: AtomicBool::new(false),
            wake_read,
            wake_write,
        })
    }

    /// Marks the token cancelled and wakes any waiter.
    pub fn cancel(&self) {
        self.notify();
    }

    /// Clears the flag and drains stale wake bytes.
    pub fn reset(&self) {
        let mut buf = [0u8; 64];
        loop {
            let read = unsafe {
                libc::read(
                    self.wake_read.as_raw_fd(),
                    buf.as_mut_ptr().cast(),
                    buf.len(),
                )
            };
            if read <= 0 {
                break;
            }
        }
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Read end of the wake pipe; readable after [`CancelToken::cancel`].
    pub fn wake_fd(&self) -> BorrowedFd<'_> {
        self.wake_read.as_fd()
    }

    /// Async-signal-safe: one atomic store and one non-blocking `write`.
    pub(crate) fn notify(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let byte = 1u8;
        unsafe {
            libc::write(
                self.wake_write.as_raw_fd(),
                (&byte as *const u8).cast(),
                1,
            );
        }
    }
}

fn set_nonblocking_cloexec(fd: c_int) -> io::Result<()> {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
        let fd_flags = libc::fcntl(fd, libc::F_GETFD);
        if fd_flags < 0 || libc::fcntl(fd, libc::F_SETFD, fd_flags | libc::FD_CLOEXEC) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
