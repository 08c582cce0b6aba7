//! Anonymous shared mapping holding the ring header and its data bytes.
//!
//! Invariant: this is the only module that dereferences the mapping. Callers
//! see the header fields and the data slice only through a [`RegionGuard`],
//! which holds the process-shared mutex for its whole lifetime.

use std::io;
use std::mem::{size_of, MaybeUninit};
use std::ptr::{self, NonNull};

#[repr(C)]
struct RegionHeader {
    lock: libc::pthread_mutex_t,
    capacity: usize,
    cursor: usize,
    used: usize,
    max_lines: usize,
}

/// Fixed-capacity byte region shared by every process forked after creation.
#[derive(Debug)]
pub struct SharedRegion {
    header: NonNull<RegionHeader>,
    map_len: usize,
}

// SAFETY: every access to the mapped header and data goes through the
// process-shared mutex taken by `SharedRegion::lock`.
unsafe impl Send for SharedRegion {}
// SAFETY: see above; `&SharedRegion` only exposes locked access.
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Maps `capacity` data bytes plus the header and initializes the lock.
    pub fn create(capacity: usize, max_lines: usize) -> io::Result<Self> {
        if capacity == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "scrollback capacity must be greater than zero",
            ));
        }
        let map_len = size_of::<RegionHeader>()
            .checked_add(capacity)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "capacity overflow"))?;

        // SAFETY: anonymous mapping with no fd; the result is checked below.
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        let header = NonNull::new(raw.cast::<RegionHeader>())
            .ok_or_else(|| io::Error::other("mmap returned a null mapping"))?;

        let region = Self { header, map_len };
        // SAFETY: the mapping is fresh, page aligned and large enough for the
        // header; nothing else can observe it before this returns.
        unsafe { region.init_header(capacity, max_lines)? };
        Ok(region)
    }

    unsafe fn init_header(&self, capacity: usize, max_lines: usize) -> io::Result<()> {
        let header = self.header.as_ptr();
        let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
        check(libc::pthread_mutexattr_init(attr.as_mut_ptr()))?;
        let shared = check(libc::pthread_mutexattr_setpshared(
            attr.as_mut_ptr(),
            libc::PTHREAD_PROCESS_SHARED,
        ));
        let init = shared.and_then(|()| {
            check(libc::pthread_mutex_init(
                ptr::addr_of_mut!((*header).lock),
                attr.as_ptr(),
            ))
        });
        libc::pthread_mutexattr_destroy(attr.as_mut_ptr());
        init?;

        ptr::addr_of_mut!((*header).capacity).write(capacity);
        ptr::addr_of_mut!((*header).cursor).write(0);
        ptr::addr_of_mut!((*header).used).write(0);
        ptr::addr_of_mut!((*header).max_lines).write(max_lines);
        Ok(())
    }

    /// Blocks until the cross-process lock is held.
    pub fn lock(&self) -> io::Result<RegionGuard<'_>> {
        // SAFETY: the mutex was initialized in `create` and lives as long as
        // the mapping.
        check(unsafe { libc::pthread_mutex_lock(ptr::addr_of_mut!((*self.header.as_ptr()).lock)) })?;
        Ok(RegionGuard { region: self })
    }

    fn data_ptr(&self) -> *mut u8 {
        // SAFETY: the data bytes start right after the header inside the
        // same mapping.
        unsafe { self.header.as_ptr().cast::<u8>().add(size_of::<RegionHeader>()) }
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        // The mutex is left initialized: the other process may still hold
        // its own mapping of the same pages.
        // SAFETY: `header`/`map_len` describe the mapping created in `create`.
        unsafe {
            libc::munmap(self.header.as_ptr().cast(), self.map_len);
        }
    }
}

/// Exclusive view of the header and data while the lock is held.
pub struct RegionGuard<'a> {
    region: &'a SharedRegion,
}

impl RegionGuard<'_> {
    fn header(&self) -> &RegionHeader {
        // SAFETY: the lock is held, so no other process mutates the header.
        unsafe { self.region.header.as_ref() }
    }

    fn header_mut(&mut self) -> &mut RegionHeader {
        // SAFETY: the lock is held and `&mut self` prevents aliasing guards.
        unsafe { &mut *self.region.header.as_ptr() }
    }

    pub fn capacity(&self) -> usize {
        self.header().capacity
    }

    pub fn cursor(&self) -> usize {
        self.header().cursor
    }

    pub fn used(&self) -> usize {
        self.header().used
    }

    pub fn max_lines(&self) -> usize {
        self.header().max_lines
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        let capacity = self.capacity();
        self.header_mut().cursor = cursor % capacity;
    }

    pub fn set_used(&mut self, used: usize) {
        let capacity = self.capacity();
        self.header_mut().used = used.min(capacity);
    }

    pub fn data(&self) -> &[u8] {
        // SAFETY: `capacity` bytes follow the header; the lock is held.
        unsafe { std::slice::from_raw_parts(self.region.data_ptr(), self.capacity()) }
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        let capacity = self.capacity();
        // SAFETY: as in `data`, and `&mut self` guarantees exclusivity here.
        unsafe { std::slice::from_raw_parts_mut(self.region.data_ptr(), capacity) }
    }
}

impl Drop for RegionGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: this guard was created by a successful lock.
        unsafe {
            libc::pthread_mutex_unlock(ptr::addr_of_mut!((*self.region.header.as_ptr()).lock));
        }
    }
}

fn check(code: libc::c_int) -> io::Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(code))
    }
}
