//! `select(2)` integration.
//!
//! A host that already multiplexes its own descriptors can let the console
//! share its loop in one of two ways:
//!
//! * call [`Console::select`] in place of `select(2)`: it dispatches any
//!   buffered lines, adds the console's descriptor to `readfds`, waits, runs
//!   at most one newly readable line, and returns the count of the host's own
//!   ready descriptors;
//! * or drive the wait itself: [`Console::register_fds`] before waiting and
//!   [`Console::poll_dispatch`] afterwards.
//!
//! ```text
//!   host loop ──► register_fds ──► select(2) ──► poll_dispatch ──► interpret_line
//!        ▲                                                             │
//!        └─────────────────────── is_done()? ◄────────────────────────┘
//! ```

use std::io;
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;
use std::ptr;
use std::time::Duration;

use crate::console::Console;
use crate::error::{ConsoleError, Result};

// ── FdSet ─────────────────────────────────────────────────────────────────────

/// Safe wrapper around `libc::fd_set`.
pub struct FdSet(libc::fd_set);

impl FdSet {
    /// An empty set.
    pub fn new() -> Self {
        let mut raw = MaybeUninit::<libc::fd_set>::uninit();
        unsafe {
            libc::FD_ZERO(raw.as_mut_ptr());
            FdSet(raw.assume_init())
        }
    }

    /// Add `fd`.  Descriptors outside `0..FD_SETSIZE` are ignored.
    pub fn insert(&mut self, fd: RawFd) {
        if Self::in_range(fd) {
            unsafe { libc::FD_SET(fd, &mut self.0) }
        }
    }

    pub fn remove(&mut self, fd: RawFd) {
        if Self::in_range(fd) {
            unsafe { libc::FD_CLR(fd, &mut self.0) }
        }
    }

    pub fn contains(&self, fd: RawFd) -> bool {
        Self::in_range(fd) && unsafe { libc::FD_ISSET(fd, &self.0) }
    }

    pub fn clear(&mut self) {
        unsafe { libc::FD_ZERO(&mut self.0) }
    }

    pub fn as_mut_ptr(&mut self) -> *mut libc::fd_set {
        &mut self.0
    }

    fn in_range(fd: RawFd) -> bool {
        fd >= 0 && (fd as usize) < libc::FD_SETSIZE as usize
    }
}

impl Default for FdSet {
    fn default() -> Self {
        Self::new()
    }
}

fn timeval(d: Duration) -> libc::timeval {
    libc::timeval {
        tv_sec: d.as_secs() as libc::time_t,
        tv_usec: d.subsec_micros() as libc::suseconds_t,
    }
}

/// Empty every set, as `select(2)` does when nothing became ready.
fn nothing_ready(
    readfds: &mut FdSet,
    writefds: Option<&mut FdSet>,
    exceptfds: Option<&mut FdSet>,
) -> i32 {
    readfds.clear();
    for set in [writefds, exceptfds].into_iter().flatten() {
        set.clear();
    }
    0
}

// ── Console integration ───────────────────────────────────────────────────────

impl Console {
    /// Prepare for the host's wait.
    ///
    /// Adds the active input descriptor to `readfds` and raises `nfds` past
    /// it.  Returns `true` instead when the console can make progress without
    /// waiting (a line is already buffered, or its source never blocks); the
    /// host should then call [`Console::poll_dispatch`] straight away.
    /// Nothing is registered while the console is blocked or done.
    pub fn register_fds(&mut self, readfds: &mut FdSet, nfds: &mut i32) -> bool {
        if self.block || self.is_done() {
            return false;
        }
        if self.input.is_ready() {
            return true;
        }
        let Some(fd) = self.input.top_fd() else { return true };

        if self.input.is_interactive() && self.prompt_pending {
            self.output.report_partial(&self.prompt);
            self.prompt_pending = false;
        }
        readfds.insert(fd);
        if fd >= *nfds {
            *nfds = fd + 1;
        }
        self.fd_max = self.fd_max.max(fd);
        false
    }

    /// Handle readiness after the host's wait.
    ///
    /// When the console's descriptor is in `readfds` (or no wait was needed)
    /// one read is made and at most one complete line is dispatched.  Returns
    /// how many descriptors of `readfds` belonged to the console (0 or 1).
    pub fn poll_dispatch(&mut self, readfds: &FdSet) -> Result<i32> {
        if self.block || self.is_done() {
            return Ok(0);
        }
        let fd = self.input.top_fd();
        let consumed = fd.is_some_and(|fd| readfds.contains(fd));
        let ready = consumed || fd.is_none() || self.input.is_ready();
        if !ready {
            return Ok(0);
        }
        if !self.input.is_ready() {
            self.input.fill()?;
        }
        self.dispatch_ready_line()?;
        Ok(consumed as i32)
    }

    /// Drop-in replacement for `select(2)` that also services the console.
    ///
    /// Buffered lines are dispatched first.  If the console is done, or still
    /// has input that needs no waiting, this returns 0 without calling
    /// `select(2)`, and like a timed-out `select(2)` it leaves every set
    /// empty.  Otherwise the console's descriptor joins `readfds` for the
    /// wait, and the return value counts only the host's ready descriptors
    /// (the console's own bit is cleared).
    pub fn select(
        &mut self,
        mut nfds: i32,
        readfds: &mut FdSet,
        writefds: Option<&mut FdSet>,
        exceptfds: Option<&mut FdSet>,
        timeout: Option<Duration>,
    ) -> Result<i32> {
        while !self.block && !self.is_done() && self.input.has_line() {
            self.dispatch_ready_line()?;
        }
        if self.is_done() {
            return Ok(nothing_ready(readfds, writefds, exceptfds));
        }

        if self.register_fds(readfds, &mut nfds) {
            self.poll_dispatch(readfds)?;
            return Ok(nothing_ready(readfds, writefds, exceptfds));
        }
        if nfds == 0 {
            return Ok(nothing_ready(readfds, writefds, exceptfds));
        }

        let ours = if self.block { None } else { self.input.top_fd() };
        let mut tv = timeout.map(timeval);
        let tvp = tv.as_mut().map_or(ptr::null_mut(), |t| t as *mut libc::timeval);
        let mut wp_set = writefds;
        let mut ep_set = exceptfds;
        let wp = wp_set.as_deref_mut().map_or(ptr::null_mut(), |s| s.as_mut_ptr());
        let ep = ep_set.as_deref_mut().map_or(ptr::null_mut(), |s| s.as_mut_ptr());

        let n = unsafe { libc::select(nfds, readfds.as_mut_ptr(), wp, ep, tvp) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(nothing_ready(readfds, wp_set, ep_set));
            }
            return Err(err.into());
        }

        let mut n = n;
        if let Some(fd) = ours {
            if readfds.contains(fd) {
                self.poll_dispatch(readfds)?;
                readfds.remove(fd);
                n -= 1;
            }
        }
        Ok(n)
    }

    /// Dispatch one line that is available without reading.  Marks the
    /// console done when the root input has ended.
    fn dispatch_ready_line(&mut self) -> Result<bool> {
        match self.input.take_ready_line() {
            Ok(Some(line)) => {
                self.echo_line(&line);
                self.interpret_line(&line);
                self.prompt_pending = true;
                Ok(true)
            }
            Ok(None) => {
                if self.input.at_end() {
                    self.at_eof = true;
                }
                Ok(false)
            }
            Err(e @ ConsoleError::LineTooLong { .. }) => {
                self.reject_input(e);
                self.prompt_pending = true;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
