//! Pump-side signal forwarding to the session process.

use std::io;
use std::thread::{self, JoinHandle};

use libc::{self, c_int};
use signal_hook::iterator::{Handle, Signals};
use tracing::debug;

use crate::platform::fd::copy_winsize;

/// Signals the pump relays verbatim to the session.
pub const FORWARDED_SIGNALS: [c_int; 7] = [
    libc::SIGHUP,
    libc::SIGTERM,
    libc::SIGINT,
    libc::SIGQUIT,
    libc::SIGUSR1,
    libc::SIGUSR2,
    libc::SIGWINCH,
];

/// Background thread that re-sends every forwarded signal to `child`.
///
/// SIGWINCH first copies the real terminal size onto the pty master.
pub struct SignalForwarder {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalForwarder {
    pub fn start(child: libc::pid_t, real_terminal: c_int, pty_master: c_int) -> io::Result<Self> {
        let mut signals = Signals::new(FORWARDED_SIGNALS)?;
        let handle = signals.handle();

        let thread = thread::Builder::new()
            .name("yosh-signal-forward".to_string())
            .spawn(move || {
                for signal in signals.forever() {
                    if signal == libc::SIGWINCH {
                        copy_winsize(real_terminal, pty_master);
                    }
                    debug!(signal, child, "forwarding signal");
                    unsafe {
                        libc::kill(child, signal);
                    }
                }
            })?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    pub fn stop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SignalForwarder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{SignalForwarder, FORWARDED_SIGNALS};
    use crate::platform::fd::{read_winsize, test_pty::open_pty};

    #[test]
    fn forwarded_set_excludes_uncatchable_signals() {
        assert!(!FORWARDED_SIGNALS.contains(&libc::SIGKILL));
        assert!(!FORWARDED_SIGNALS.contains(&libc::SIGSTOP));
        assert!(FORWARDED_SIGNALS.contains(&libc::SIGWINCH));
    }

    #[test]
    fn sigwinch_copies_size_and_reaches_child() {
        let real = open_pty(Some(libc::winsize {
            ws_row: 40,
            ws_col: 132,
            ws_xpixel: 0,
            ws_ypixel: 0,
        }));
        let relay = open_pty(None);

        let child = unsafe { libc::fork() };
        assert!(child >= 0, "fork failed");
        if child == 0 {
            // Default SIGWINCH disposition is ignore; a pause loop keeps the
            // child alive until the parent reaps it with SIGKILL.
            loop {
                unsafe {
                    libc::pause();
                }
            }
        }

        let mut forwarder =
            SignalForwarder::start(child, real.master, relay.master).expect("forwarder starts");
        unsafe {
            libc::raise(libc::SIGWINCH);
        }

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut copied = None;
        while Instant::now() < deadline {
            copied = read_winsize(relay.slave);
            if copied.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        forwarder.stop();

        unsafe {
            libc::kill(child, libc::SIGKILL);
            let mut status = 0;
            libc::waitpid(child, &mut status, 0);
        }

        let copied = copied.expect("relay pty should receive the real size");
        assert_eq!((copied.ws_row, copied.ws_col), (40, 132));
    }
}
