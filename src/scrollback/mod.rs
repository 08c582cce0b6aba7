//! Bounded scrollback capture shared between the pump and the session.
//!
//! Appends overwrite the oldest bytes once the ring is full. Reads copy the
//! linear view under the lock and do all line scanning and escape stripping
//! after releasing it.

pub mod excerpt;
mod region;

use std::io;
use std::sync::Arc;

use tracing::warn;

pub use excerpt::{line_count, render_excerpt, strip_escapes, tail_lines};
pub use region::{RegionGuard, SharedRegion};

/// Point-in-time counters, mostly useful for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingStats {
    pub capacity: usize,
    pub cursor: usize,
    pub used: usize,
    pub max_lines: usize,
}

/// Byte ring living in a [`SharedRegion`].
#[derive(Debug)]
pub struct ScrollbackRing {
    region: SharedRegion,
}

impl ScrollbackRing {
    pub fn new(capacity: usize, max_lines: usize) -> io::Result<Self> {
        Ok(Self {
            region: SharedRegion::create(capacity, max_lines)?,
        })
    }

    /// Copies `data` in at the cursor, wrapping at capacity.
    pub fn append(&self, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let mut guard = self.region.lock()?;
        let capacity = guard.capacity();
        let skip = data.len().saturating_sub(capacity);
        let kept = &data[skip..];
        let start = (guard.cursor() + skip) % capacity;

        let first = kept.len().min(capacity - start);
        {
            let buffer = guard.data_mut();
            buffer[start..start + first].copy_from_slice(&kept[..first]);
            buffer[..kept.len() - first].copy_from_slice(&kept[first..]);
        }

        guard.set_cursor(start + kept.len());
        let used = guard.used().saturating_add(data.len());
        guard.set_used(used);
        Ok(())
    }

    /// Oldest-to-newest copy of the retained bytes.
    pub fn snapshot(&self) -> io::Result<Vec<u8>> {
        let guard = self.region.lock()?;
        let capacity = guard.capacity();
        let used = guard.used();
        let start = (guard.cursor() + capacity - used) % capacity;
        let data = guard.data();

        let mut linear = Vec::with_capacity(used);
        let first = used.min(capacity - start);
        linear.extend_from_slice(&data[start..start + first]);
        linear.extend_from_slice(&data[..used - first]);
        Ok(linear)
    }

    /// Last `max_lines` lines with escapes removed; `0` uses the line hint.
    pub fn read_lines(&self, max_lines: usize) -> io::Result<String> {
        let max_lines = if max_lines == 0 {
            self.stats()?.max_lines
        } else {
            max_lines
        };
        let raw = self.snapshot()?;
        Ok(render_excerpt(&raw, max_lines))
    }

    pub fn clear(&self) -> io::Result<()> {
        let mut guard = self.region.lock()?;
        guard.set_cursor(0);
        guard.set_used(0);
        Ok(())
    }

    pub fn stats(&self) -> io::Result<RingStats> {
        let guard = self.region.lock()?;
        Ok(RingStats {
            capacity: guard.capacity(),
            cursor: guard.cursor(),
            used: guard.used(),
            max_lines: guard.max_lines(),
        })
    }
}

/// Session-side access to the ring; inactive when the relay never started.
#[derive(Debug, Clone, Default)]
pub struct ScrollbackHandle {
    ring: Option<Arc<ScrollbackRing>>,
}

impl ScrollbackHandle {
    #[must_use]
    pub fn inactive() -> Self {
        Self { ring: None }
    }

    #[must_use]
    pub fn active(ring: Arc<ScrollbackRing>) -> Self {
        Self { ring: Some(ring) }
    }

    pub fn is_active(&self) -> bool {
        self.ring.is_some()
    }

    /// Empty when inactive or when the ring holds nothing.
    pub fn excerpt(&self, max_lines: usize) -> String {
        let Some(ring) = self.ring.as_ref() else {
            return String::new();
        };
        match ring.read_lines(max_lines) {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, "scrollback read failed");
                String::new()
            }
        }
    }

    pub fn clear(&self) {
        if let Some(ring) = self.ring.as_ref() {
            if let Err(error) = ring.clear() {
                warn!(%error, "scrollback clear failed");
            }
        }
    }

    pub fn ring(&self) -> Option<&Arc<ScrollbackRing>> {
        self.ring.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{line_count, ScrollbackHandle, ScrollbackRing};

    fn ring(capacity: usize) -> ScrollbackRing {
        ScrollbackRing::new(capacity, 1000).expect("ring should map")
    }

    #[test]
    fn append_before_wrap_keeps_everything() {
        let ring = ring(32);
        ring.append(b"hello ").expect("append");
        ring.append(b"world\n").expect("append");

        assert_eq!(ring.snapshot().expect("snapshot"), b"hello world\n");
        let stats = ring.stats().expect("stats");
        assert_eq!(stats.used, 12);
        assert_eq!(stats.cursor, 12);
    }

    #[test]
    fn wrap_evicts_oldest_bytes_only() {
        let ring = ring(8);
        ring.append(b"abcdef").expect("append");
        ring.append(b"ghij").expect("append");

        assert_eq!(ring.snapshot().expect("snapshot"), b"cdefghij");
        let stats = ring.stats().expect("stats");
        assert_eq!(stats.used, 8);
        assert_eq!(stats.cursor, 2);
    }

    #[test]
    fn oversized_append_keeps_its_own_suffix() {
        let ring = ring(4);
        ring.append(b"xy").expect("append");
        ring.append(b"0123456789").expect("append");

        assert_eq!(ring.snapshot().expect("snapshot"), b"6789");
        assert_eq!(ring.stats().expect("stats").cursor, 0);
    }

    #[test]
    fn any_append_sequence_retains_the_newest_suffix() {
        let capacity = 37;
        let ring = ring(capacity);
        let mut everything = Vec::new();
        let mut seed: u32 = 7;

        for round in 0..200 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let len = (seed % 23) as usize;
            let chunk: Vec<u8> = (0..len)
                .map(|i| b'a' + ((round + i) % 26) as u8)
                .collect();
            ring.append(&chunk).expect("append");
            everything.extend_from_slice(&chunk);

            let stats = ring.stats().expect("stats");
            assert!(stats.used <= stats.capacity);
            assert!(stats.cursor < stats.capacity);

            let keep = everything.len().min(capacity);
            let expected = &everything[everything.len() - keep..];
            assert_eq!(ring.snapshot().expect("snapshot"), expected);
        }
    }

    #[test]
    fn read_lines_never_exceeds_request_after_wraps() {
        let ring = ring(64);
        for idx in 0..50 {
            let line = format!("\x1b[3{}mline {idx}\x1b[0m\r\n", idx % 8);
            ring.append(line.as_bytes()).expect("append");

            for max in 1..6 {
                let text = ring.read_lines(max).expect("read");
                assert!(line_count(&text) <= max, "{max}: {text:?}");
                assert!(!text.contains('\x1b'));
            }
        }

        let last = ring.read_lines(1).expect("read");
        assert_eq!(last, "line 49\r\n");
    }

    #[test]
    fn clear_resets_cursor_and_used() {
        let ring = ring(16);
        ring.append(b"some output\n").expect("append");
        ring.clear().expect("clear");

        let stats = ring.stats().expect("stats");
        assert_eq!((stats.cursor, stats.used), (0, 0));
        assert_eq!(ring.read_lines(10).expect("read"), "");

        ring.append(b"fresh\n").expect("append");
        assert_eq!(ring.read_lines(10).expect("read"), "fresh\n");
    }

    #[test]
    fn zero_line_request_uses_hint() {
        let ring = ScrollbackRing::new(128, 2).expect("ring should map");
        ring.append(b"a\nb\nc\nd\n").expect("append");
        assert_eq!(ring.read_lines(0).expect("read"), "c\nd\n");
    }

    #[test]
    fn appends_from_forked_child_are_visible_to_parent() {
        let ring = ring(64);
        ring.append(b"parent\n").expect("append");

        let pid = unsafe { libc::fork() };
        assert!(pid >= 0, "fork failed");
        if pid == 0 {
            let code = match ring.append(b"child\n") {
                Ok(()) => 0,
                Err(_) => 1,
            };
            unsafe { libc::_exit(code) }
        }

        let mut status = 0;
        assert_eq!(unsafe { libc::waitpid(pid, &mut status, 0) }, pid);
        assert!(libc::WIFEXITED(status));
        assert_eq!(libc::WEXITSTATUS(status), 0);
        assert_eq!(ring.read_lines(10).expect("read"), "parent\nchild\n");
    }

    #[test]
    fn inactive_handle_reads_empty() {
        let handle = ScrollbackHandle::inactive();
        assert!(!handle.is_active());
        assert_eq!(handle.excerpt(50), "");
        handle.clear();
    }

    #[test]
    fn active_handle_reads_and_clears_ring() {
        let ring = Arc::new(ring(64));
        ring.append(b"$ ls\nfile.txt\n").expect("append");
        let handle = ScrollbackHandle::active(Arc::clone(&ring));

        assert_eq!(handle.excerpt(1), "file.txt\n");
        handle.clear();
        assert_eq!(handle.excerpt(10), "");
    }
}
