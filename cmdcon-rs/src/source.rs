//! Nested input sources.
//!
//! The console reads commands from a stack of buffered frames.  The bottom
//! (root) frame is the terminal or the initial script; `source <file>` pushes
//! a new frame on top.  Each frame owns its own buffer, so a nested file never
//! disturbs the read position of the file that sourced it.  When a nested
//! frame runs dry it is popped and reading resumes in its parent; the root is
//! never popped.
//!
//! Lines are capped at [`MAX_LINE`] bytes.  A frame that goes past the cap
//! is closed and the overflow is reported as an error.  Bytes that are not
//! valid UTF-8 are replaced with U+FFFD.
//!
//! ```text
//!   ┌───────────────┐
//!   │ inner.cmd     │  ← active (top)
//!   ├───────────────┤
//!   │ outer.cmd     │  paused after its `source inner.cmd` line
//!   ├───────────────┤
//!   │ stdin (root)  │
//!   └───────────────┘
//! ```

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use crate::error::{ConsoleError, Result};

/// Bytes requested from a source per read.
const READ_CHUNK: usize = 8192;

/// Longest accepted line, excluding its terminator.
pub const MAX_LINE: usize = READ_CHUNK;

/// Default ceiling on the number of stacked frames.
pub const DEFAULT_MAX_DEPTH: usize = 64;

// ── InputSource ───────────────────────────────────────────────────────────────

/// A readable stream the console can take command lines from.
pub trait InputSource: Read {
    /// Descriptor to wait on in `select(2)`.  `None` means reads never block.
    fn raw_fd(&self) -> Option<RawFd> {
        None
    }

    /// Whether a person is typing into this source (a prompt is shown).
    fn is_interactive(&self) -> bool {
        false
    }
}

impl InputSource for File {
    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }
}

impl<T: AsRef<[u8]>> InputSource for Cursor<T> {}

/// Standard input, read straight from descriptor 0.
///
/// `std::io::Stdin` keeps its own buffer, which would hide pending lines
/// from `select(2)`; this reader issues one `read(2)` per call instead.
#[derive(Debug, Default)]
pub struct StdinSource;

impl Read for StdinSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(libc::STDIN_FILENO, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(n as usize)
        }
    }
}

impl InputSource for StdinSource {
    fn raw_fd(&self) -> Option<RawFd> {
        Some(libc::STDIN_FILENO)
    }

    fn is_interactive(&self) -> bool {
        unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
    }
}

// ── Frame ─────────────────────────────────────────────────────────────────────

struct Frame {
    src: Box<dyn InputSource>,
    label: String,
    buf: Vec<u8>,
    /// Leading bytes of `buf` already searched for a newline.
    scan: usize,
    eof: bool,
}

impl Frame {
    fn new(src: Box<dyn InputSource>, label: String) -> Self {
        Self { src, label, buf: Vec::new(), scan: 0, eof: false }
    }

    fn newline(&self) -> Option<usize> {
        self.buf[self.scan..].iter().position(|&b| b == b'\n').map(|p| p + self.scan)
    }

    fn has_line(&self) -> bool {
        self.newline().is_some()
    }

    /// More than [`MAX_LINE`] bytes are buffered without a line ending.
    fn overflowed(&self) -> bool {
        self.buf.len() > MAX_LINE && !self.has_line()
    }

    fn exhausted(&self) -> bool {
        self.eof && self.buf.is_empty()
    }

    /// One read from the underlying source.  Returns the byte count; 0 marks
    /// end-of-stream.
    fn fill(&mut self) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.src.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(0);
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Give up on this frame: drop what is buffered and stop reading.
    fn abandon(&mut self) -> ConsoleError {
        self.buf.clear();
        self.scan = 0;
        self.eof = true;
        ConsoleError::LineTooLong { label: self.label.clone(), max: MAX_LINE }
    }

    /// Take the next buffered line without reading.  An unterminated final
    /// line is returned once the stream has ended.  A line longer than
    /// [`MAX_LINE`] abandons the frame.
    fn take_line(&mut self) -> Result<Option<String>> {
        let raw: Vec<u8> = match self.newline() {
            Some(pos) if pos > MAX_LINE => return Err(self.abandon()),
            Some(pos) => {
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop();
                self.scan = 0;
                line
            }
            None if self.buf.len() > MAX_LINE => return Err(self.abandon()),
            None if self.eof && !self.buf.is_empty() => {
                self.scan = 0;
                std::mem::take(&mut self.buf)
            }
            None => {
                self.scan = self.buf.len();
                return Ok(None);
            }
        };
        let mut line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                log::debug!("invalid UTF-8 in a line from {}; replaced", self.label);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Read until a whole line is buffered or the stream ends.
    fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.take_line()? {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(None);
            }
            self.fill()?;
        }
    }
}

// ── InputStack ────────────────────────────────────────────────────────────────

/// Stack of buffered input frames; the last one is active.
pub struct InputStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl InputStack {
    pub fn new(max_depth: usize) -> Self {
        Self { frames: Vec::new(), max_depth: max_depth.max(1) }
    }

    /// Place `src` on top of the stack.  The first frame pushed becomes the
    /// root.
    pub fn push(&mut self, src: Box<dyn InputSource>, label: impl Into<String>) -> Result<()> {
        if self.frames.len() >= self.max_depth {
            return Err(ConsoleError::NestingTooDeep { max: self.max_depth });
        }
        let label = label.into();
        log::debug!("push input frame {label} (depth {})", self.frames.len() + 1);
        self.frames.push(Frame::new(src, label));
        Ok(())
    }

    /// Open `path` and push it.  On failure the stack is unchanged.
    pub fn push_file(&mut self, path: &Path) -> Result<()> {
        if self.frames.len() >= self.max_depth {
            return Err(ConsoleError::NestingTooDeep { max: self.max_depth });
        }
        let file = File::open(path)
            .map_err(|source| ConsoleError::Open { path: path.to_owned(), source })?;
        self.push(Box::new(file), path.display().to_string())
    }

    /// Close the top frame.  Refuses to remove the root and returns `false`.
    pub fn pop(&mut self) -> bool {
        if self.frames.len() <= 1 {
            return false;
        }
        if let Some(frame) = self.frames.pop() {
            log::debug!("pop input frame {} (depth {})", frame.label, self.frames.len());
        }
        true
    }

    /// Close every nested frame, keeping the root.
    pub fn pop_to_root(&mut self) {
        while self.pop() {}
    }

    /// Next line from the active frame, reading (and possibly blocking) as
    /// needed.  Exhausted nested frames are popped transparently; `None`
    /// means the root has ended.
    ///
    /// A frame that produces an over-long line is closed (the root is left
    /// exhausted) and [`ConsoleError::LineTooLong`] is returned; the next
    /// call continues in the parent.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            let Some(top) = self.frames.last_mut() else { return Ok(None) };
            match top.read_line() {
                Ok(Some(line)) => return Ok(Some(line)),
                Ok(None) => {}
                Err(e) => return Err(self.close_failed(e)),
            }
            if !self.pop() {
                return Ok(None);
            }
        }
    }

    /// Next line that can be produced without reading.  Pops exhausted nested
    /// frames along the way.
    pub fn take_ready_line(&mut self) -> Result<Option<String>> {
        loop {
            let Some(top) = self.frames.last_mut() else { return Ok(None) };
            match top.take_line() {
                Ok(Some(line)) => return Ok(Some(line)),
                Ok(None) => {}
                Err(e) => return Err(self.close_failed(e)),
            }
            if !(top.exhausted() && self.pop()) {
                return Ok(None);
            }
        }
    }

    fn close_failed(&mut self, err: ConsoleError) -> ConsoleError {
        if matches!(err, ConsoleError::LineTooLong { .. }) {
            log::warn!("{err}");
            self.pop();
        }
        err
    }

    /// One read into the active frame's buffer.
    pub fn fill(&mut self) -> io::Result<usize> {
        match self.frames.last_mut() {
            Some(top) => top.fill(),
            None => Ok(0),
        }
    }

    /// A whole line is buffered in the active frame.
    pub fn has_line(&self) -> bool {
        self.frames.last().is_some_and(Frame::has_line)
    }

    /// The active frame can make progress without waiting: it has a buffered
    /// line, has reached end-of-stream, or holds an over-long line.
    pub fn is_ready(&self) -> bool {
        self.frames.last().is_some_and(|f| f.has_line() || f.eof || f.overflowed())
    }

    /// The root frame is the only one left and it is exhausted.
    pub fn at_end(&self) -> bool {
        match self.frames.as_slice() {
            [] => true,
            [root] => root.exhausted(),
            _ => false,
        }
    }

    pub fn top_fd(&self) -> Option<RawFd> {
        self.frames.last().and_then(|f| f.src.raw_fd())
    }

    pub fn is_interactive(&self) -> bool {
        self.frames.last().is_some_and(|f| f.src.is_interactive())
    }

    /// Label of the active frame (file path or `stdin`).
    pub fn label(&self) -> Option<&str> {
        self.frames.last().map(|f| f.label.as_str())
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Default for InputStack {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
