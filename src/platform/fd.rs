//! Thin libc wrappers shared by the pump and the session side.

use std::io;

use libc::{self, c_int};

/// Rows/columns used when the real terminal reports no size.
pub const FALLBACK_ROWS: u16 = 24;
pub const FALLBACK_COLS: u16 = 80;

pub(crate) fn wait_writable(fd: c_int) -> io::Result<()> {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        let result = unsafe { libc::poll(&mut fds, 1, -1) };
        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if result == 0 {
            continue;
        }
        if (fds.revents & libc::POLLOUT) != 0 {
            return Ok(());
        }

        return Err(io::Error::other(format!(
            "poll(POLLOUT) returned revents=0x{:x}",
            fds.revents
        )));
    }
}

/// Writes every byte, retrying on EINTR and waiting out EAGAIN.
pub(crate) fn write_all_fd_with<FWrite, FWait>(
    fd: c_int,
    bytes: &[u8],
    mut write_once: FWrite,
    mut wait_writable: FWait,
) -> io::Result<()>
where
    FWrite: FnMut(c_int, &[u8]) -> io::Result<usize>,
    FWait: FnMut(c_int) -> io::Result<()>,
{
    let mut written = 0;
    while written < bytes.len() {
        match write_once(fd, &bytes[written..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "write returned 0",
                ));
            }
            Ok(count) => {
                if count > bytes.len() - written {
                    return Err(io::Error::other("write returned more bytes than requested"));
                }
                written += count;
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => wait_writable(fd)?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

pub(crate) fn write_all_fd(fd: c_int, bytes: &[u8]) -> io::Result<()> {
    write_all_fd_with(fd, bytes, write_once, wait_writable)
}

fn write_once(fd: c_int, buf: &[u8]) -> io::Result<usize> {
    let result = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(result as usize)
    }
}

/// Single `read(2)`; `Ok(0)` is end of file.
pub(crate) fn read_fd(fd: c_int, buf: &mut [u8]) -> io::Result<usize> {
    let result = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if result < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(result as usize)
    }
}

pub(crate) fn poll_readable(fd: c_int, timeout_ms: i32) -> bool {
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let result = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    result > 0 && (fds.revents & libc::POLLIN) != 0
}

/// Readiness of the two relay sources after one `poll`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PairReadiness {
    pub input: bool,
    pub master: bool,
    pub master_hangup: bool,
}

/// Polls `input` and `master` for reading. `Ok(None)` on timeout.
pub(crate) fn poll_pair(
    input: c_int,
    master: c_int,
    timeout_ms: i32,
) -> io::Result<Option<PairReadiness>> {
    let mut fds = [
        libc::pollfd {
            fd: input,
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: master,
            events: libc::POLLIN,
            revents: 0,
        },
    ];
    let result = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }
    if result == 0 {
        return Ok(None);
    }
    Ok(Some(PairReadiness {
        input: (fds[0].revents & libc::POLLIN) != 0,
        master: (fds[1].revents & libc::POLLIN) != 0,
        master_hangup: (fds[1].revents & (libc::POLLHUP | libc::POLLERR)) != 0,
    }))
}

pub(crate) fn read_winsize(fd: c_int) -> Option<libc::winsize> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some(size)
    } else {
        None
    }
}

pub(crate) fn fallback_winsize() -> libc::winsize {
    libc::winsize {
        ws_row: FALLBACK_ROWS,
        ws_col: FALLBACK_COLS,
        ws_xpixel: 0,
        ws_ypixel: 0,
    }
}

pub(crate) fn write_winsize(fd: c_int, size: &libc::winsize) -> io::Result<()> {
    let result = unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, size) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Copies the window size of `source` onto `target`; false when `source` has none.
pub(crate) fn copy_winsize(source: c_int, target: c_int) -> bool {
    match read_winsize(source) {
        Some(size) => write_winsize(target, &size).is_ok(),
        None => false,
    }
}

pub(crate) fn get_termios(fd: c_int) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

pub(crate) fn set_termios(fd: c_int, termios: &libc::termios) -> io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn enable_raw_mode(fd: c_int, original: &libc::termios) -> io::Result<()> {
    let mut raw = *original;
    unsafe {
        libc::cfmakeraw(&mut raw);
    }
    set_termios(fd, &raw)
}

pub fn is_tty(fd: c_int) -> bool {
    unsafe { libc::isatty(fd) == 1 }
}

pub(crate) fn dup_fd(fd: c_int) -> io::Result<c_int> {
    let duplicate = unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) };
    if duplicate < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(duplicate)
}
