//! Pseudo-terminal relay: the pump keeps the real terminal, the session
//! becomes the interactive shell on the pty slave.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd};
use std::sync::Arc;

use libc::{self, c_int};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::EnvConfig;
use crate::platform::fd::{
    dup_fd, enable_raw_mode, fallback_winsize, get_termios, is_tty, poll_pair, poll_readable,
    read_fd, read_winsize, set_termios, write_all_fd,
};
use crate::platform::signals::SignalForwarder;
use crate::scrollback::{ScrollbackHandle, ScrollbackRing};

const RELAY_BUFFER_BYTES: usize = 4096;
const CHILD_CHECK_INTERVAL_MS: i32 = 100;
/// Exit status offset for a session killed by a signal.
pub const SIGNAL_EXIT_BASE: i32 = 128;
pub const FAILURE_EXIT_STATUS: i32 = 1;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay setup failed while {operation}: {source}")]
    Setup {
        operation: &'static str,
        #[source]
        source: io::Error,
    },
}

impl RelayError {
    fn setup(operation: &'static str, source: io::Error) -> Self {
        Self::Setup { operation, source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NotATerminal,
}

/// What the session process got back from [`activate`].
#[derive(Debug)]
pub enum RelayOutcome {
    Relayed(ScrollbackHandle),
    Skipped(SkipReason),
}

impl RelayOutcome {
    /// Scrollback access for the session; inactive when skipped.
    pub fn scrollback(&self) -> ScrollbackHandle {
        match self {
            Self::Relayed(handle) => handle.clone(),
            Self::Skipped(_) => ScrollbackHandle::inactive(),
        }
    }
}

/// Splits the process into pump and session.
///
/// Only the session process returns. It must call this before anything opens
/// the controlling terminal (job control in particular), because the pty slave
/// becomes the controlling terminal here.
pub fn activate(config: &EnvConfig) -> Result<RelayOutcome, RelayError> {
    if !config.scrollback_enabled {
        info!("scrollback relay disabled by configuration");
        return Ok(RelayOutcome::Skipped(SkipReason::Disabled));
    }
    if !is_tty(libc::STDIN_FILENO) || !is_tty(libc::STDOUT_FILENO) {
        info!("standard streams are not terminals; relay skipped");
        return Ok(RelayOutcome::Skipped(SkipReason::NotATerminal));
    }

    let original =
        get_termios(libc::STDIN_FILENO).map_err(|err| RelayError::setup("reading termios", err))?;
    let mut term = original;
    let mut size = read_winsize(libc::STDOUT_FILENO).unwrap_or_else(fallback_winsize);

    let (master, slave) = open_pty(&mut term, &mut size)?;
    let ring = Arc::new(
        ScrollbackRing::new(config.scrollback_bytes, config.scrollback_lines)
            .map_err(|err| RelayError::setup("mapping scrollback", err))?,
    );

    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(RelayError::setup("forking", io::Error::last_os_error()));
    }
    if pid > 0 {
        run_pump(pid, master, slave, &ring, Some(original));
    }

    become_session(master, slave)?;
    debug!(
        capacity = config.scrollback_bytes,
        "session attached to relay pty"
    );
    Ok(RelayOutcome::Relayed(ScrollbackHandle::active(ring)))
}

fn open_pty(
    term: &mut libc::termios,
    size: &mut libc::winsize,
) -> Result<(OwnedFd, OwnedFd), RelayError> {
    let mut master: c_int = -1;
    let mut slave: c_int = -1;
    let result = unsafe {
        libc::openpty(
            &mut master,
            &mut slave,
            std::ptr::null_mut(),
            term,
            size,
        )
    };
    if result != 0 {
        return Err(RelayError::setup("opening pty", io::Error::last_os_error()));
    }
    // SAFETY: openpty succeeded, so both descriptors are open and owned here.
    Ok(unsafe { (OwnedFd::from_raw_fd(master), OwnedFd::from_raw_fd(slave)) })
}

fn become_session(master: OwnedFd, slave: OwnedFd) -> Result<(), RelayError> {
    drop(master);

    if unsafe { libc::setsid() } < 0 {
        return Err(RelayError::setup("creating session", io::Error::last_os_error()));
    }
    for target in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if unsafe { libc::dup2(slave.as_raw_fd(), target) } < 0 {
            return Err(RelayError::setup("redirecting stdio", io::Error::last_os_error()));
        }
    }
    if slave.as_raw_fd() > libc::STDERR_FILENO {
        drop(slave);
    } else {
        let _ = slave.into_raw_fd();
    }

    if unsafe { libc::ioctl(libc::STDIN_FILENO, libc::TIOCSCTTY as _, 0) } < 0 {
        return Err(RelayError::setup(
            "acquiring controlling terminal",
            io::Error::last_os_error(),
        ));
    }
    Ok(())
}

fn run_pump(
    child: libc::pid_t,
    master: OwnedFd,
    slave: OwnedFd,
    ring: &ScrollbackRing,
    original: Option<libc::termios>,
) -> ! {
    drop(slave);

    let input = dup_fd(libc::STDIN_FILENO);
    let output = dup_fd(libc::STDOUT_FILENO);
    let (input, output) = match (input, output) {
        (Ok(input), Ok(output)) => (input, output),
        (Err(err), _) | (_, Err(err)) => {
            error!(%err, "pump could not duplicate terminal descriptors");
            finish(child, PumpExit::Failed(err), libc::STDIN_FILENO, original)
        }
    };

    if let Some(original) = original.as_ref() {
        if let Err(err) = enable_raw_mode(input, original) {
            warn!(%err, "pump could not switch the terminal to raw mode");
        }
    }

    let mut forwarder = match SignalForwarder::start(child, output, master.as_raw_fd()) {
        Ok(forwarder) => forwarder,
        Err(err) => {
            error!(%err, "pump could not install signal forwarding");
            finish(child, PumpExit::Failed(err), input, original)
        }
    };

    let pump = Pump {
        child,
        input,
        output,
        master: master.as_raw_fd(),
        ring,
    };
    let exit = pump.relay();
    // `process::exit` skips destructors.
    forwarder.stop();
    finish(child, exit, input, original)
}

fn finish(
    child: libc::pid_t,
    exit: PumpExit,
    terminal: c_int,
    original: Option<libc::termios>,
) -> ! {
    let code = settle(child, exit);
    if let Some(original) = original.as_ref() {
        restore_terminal(terminal, original);
    }
    info!(code, "pump exiting");
    std::process::exit(code)
}

/// Puts the saved attributes back on the real terminal.
///
/// Returns false when the terminal refused them; the pump exits either way.
fn restore_terminal(terminal: c_int, original: &libc::termios) -> bool {
    match set_termios(terminal, original) {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, "pump could not restore terminal attributes");
            false
        }
    }
}

/// Turns a loop result into the pump's exit status, reaping the child.
pub(crate) fn settle(child: libc::pid_t, exit: PumpExit) -> i32 {
    match exit {
        PumpExit::Exited(status) => exit_code(status),
        PumpExit::InputClosed | PumpExit::SessionClosed => match wait_blocking(child) {
            Ok(status) => exit_code(status),
            Err(_) => FAILURE_EXIT_STATUS,
        },
        PumpExit::Failed(err) => {
            error!(%err, "relay failed; terminating session");
            unsafe {
                libc::kill(child, libc::SIGTERM);
            }
            let _ = wait_blocking(child);
            FAILURE_EXIT_STATUS
        }
    }
}

/// Maps a `waitpid` status to a shell-style exit code.
pub fn exit_code(status: c_int) -> i32 {
    if libc::WIFEXITED(status) {
        libc::WEXITSTATUS(status)
    } else if libc::WIFSIGNALED(status) {
        SIGNAL_EXIT_BASE + libc::WTERMSIG(status)
    } else {
        FAILURE_EXIT_STATUS
    }
}

fn wait_blocking(child: libc::pid_t) -> io::Result<c_int> {
    let mut status = 0;
    loop {
        if unsafe { libc::waitpid(child, &mut status, 0) } >= 0 {
            return Ok(status);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

fn reap_nonblocking(child: libc::pid_t) -> io::Result<Option<c_int>> {
    let mut status = 0;
    let pid = unsafe { libc::waitpid(child, &mut status, libc::WNOHANG) };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((pid > 0).then_some(status))
}

#[derive(Debug)]
pub(crate) enum PumpExit {
    Exited(c_int),
    InputClosed,
    SessionClosed,
    Failed(io::Error),
}

/// Relay loop state. Descriptors are borrowed, not owned.
pub(crate) struct Pump<'a> {
    pub child: libc::pid_t,
    pub input: c_int,
    pub output: c_int,
    pub master: c_int,
    pub ring: &'a ScrollbackRing,
}

impl Pump<'_> {
    pub(crate) fn relay(&self) -> PumpExit {
        let mut buf = [0u8; RELAY_BUFFER_BYTES];
        loop {
            match reap_nonblocking(self.child) {
                Ok(Some(status)) => {
                    self.drain_master(&mut buf);
                    return PumpExit::Exited(status);
                }
                Ok(None) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return PumpExit::Failed(err),
            }

            let ready = match poll_pair(self.input, self.master, CHILD_CHECK_INTERVAL_MS) {
                Ok(Some(ready)) => ready,
                Ok(None) => continue,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return PumpExit::Failed(err),
            };

            if ready.input {
                match read_fd(self.input, &mut buf) {
                    Ok(0) => return PumpExit::InputClosed,
                    Ok(count) => {
                        if let Err(err) = write_all_fd(self.master, &buf[..count]) {
                            return PumpExit::Failed(err);
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(err) => return PumpExit::Failed(err),
                }
            }

            if ready.master {
                match read_fd(self.master, &mut buf) {
                    Ok(0) => return PumpExit::SessionClosed,
                    Ok(count) => {
                        if let Err(err) = self.emit(&buf[..count]) {
                            return PumpExit::Failed(err);
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    // Linux reports EIO once the last slave descriptor closes.
                    Err(err) if err.raw_os_error() == Some(libc::EIO) => {
                        return PumpExit::SessionClosed
                    }
                    Err(err) => return PumpExit::Failed(err),
                }
            } else if ready.master_hangup {
                return PumpExit::SessionClosed;
            }
        }
    }

    fn emit(&self, bytes: &[u8]) -> io::Result<()> {
        write_all_fd(self.output, bytes)?;
        if let Err(err) = self.ring.append(bytes) {
            warn!(%err, "scrollback append failed");
        }
        Ok(())
    }

    fn drain_master(&self, buf: &mut [u8]) {
        while poll_readable(self.master, 0) {
            match read_fd(self.master, buf) {
                Ok(0) => break,
                Ok(count) => {
                    if self.emit(&buf[..count]).is_err() {
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => break,
            }
        }
    }
}
