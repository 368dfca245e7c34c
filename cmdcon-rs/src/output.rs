//! Output and diagnostic channels.
//!
//! Command results and echoed input go to the output writer; failures go to
//! the diagnostic writer.  Once `log <file>` is active every line written to
//! either channel is also appended to the log file.

use std::cell::RefCell;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

/// Where console text goes.
pub struct Output {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    log_file: Option<File>,
}

impl Output {
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self { out, err, log_file: None }
    }

    /// Standard output and standard error.
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Write one line of normal output.
    pub fn report(&mut self, line: &str) {
        emit(&mut *self.out, "output", format_args!("{line}\n"));
        self.copy_to_log(line);
    }

    /// Write text without a trailing newline (prompts).
    pub fn report_partial(&mut self, text: &str) {
        emit(&mut *self.out, "output", format_args!("{text}"));
    }

    /// Write one line to the diagnostic channel.
    pub fn diagnostic(&mut self, line: &str) {
        emit(&mut *self.err, "diagnostic", format_args!("{line}\n"));
        self.copy_to_log(line);
    }

    /// Start copying output to `path`.  The file is opened for appending and
    /// created if missing; a previously open log is closed.
    pub fn start_log(&mut self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.log_file = Some(file);
        Ok(())
    }

    /// Stop copying output.  Returns `true` if a log was open.
    pub fn stop_log(&mut self) -> bool {
        self.log_file.take().is_some()
    }

    pub fn is_logging(&self) -> bool {
        self.log_file.is_some()
    }

    fn copy_to_log(&mut self, line: &str) {
        if let Some(f) = self.log_file.as_mut() {
            if let Err(e) = writeln!(f, "{line}") {
                log::warn!("log file write failed: {e}");
            }
        }
    }
}

/// Write and flush; a failing channel is logged and otherwise ignored.
fn emit(w: &mut dyn Write, channel: &str, args: fmt::Arguments<'_>) {
    if let Err(e) = w.write_fmt(args).and_then(|()| w.flush()) {
        log::warn!("{channel} write failed: {e}");
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::stdio()
    }
}

// ── SharedBuf ─────────────────────────────────────────────────────────────────

/// In-memory writer whose contents stay readable through cloned handles.
///
/// Hosts use it to capture console output, e.g.
/// `Output::new(Box::new(out.clone()), Box::new(err.clone()))`.
#[derive(Clone, Default)]
pub struct SharedBuf {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }

    /// Written text split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    pub fn clear(&self) {
        self.buf.borrow_mut().clear();
    }
}

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn captured() -> (Output, SharedBuf, SharedBuf) {
        let (out, err) = (SharedBuf::new(), SharedBuf::new());
        (Output::new(Box::new(out.clone()), Box::new(err.clone())), out, err)
    }

    #[test]
    fn report_and_diagnostic_are_separate() {
        let (mut o, out, err) = captured();
        o.report("result");
        o.diagnostic("Unknown command bogus");
        assert_eq!(out.lines(), ["result"]);
        assert_eq!(err.lines(), ["Unknown command bogus"]);
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failing_channel_still_reaches_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.log");
        let mut o = Output::new(Box::new(Broken), Box::new(Broken));
        o.start_log(&path).unwrap();
        o.report("kept");
        o.report_partial("prompt> ");
        o.diagnostic("also kept");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "kept\nalso kept\n");
    }

    #[test]
    fn log_copies_both_channels_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let (mut o, _, _) = captured();
        o.report("before log");
        o.start_log(&path).unwrap();
        assert!(o.is_logging());
        o.report("out line");
        o.diagnostic("err line");
        assert!(o.stop_log());
        o.report("after log");

        let logged = std::fs::read_to_string(&path).unwrap();
        assert_eq!(logged, "earlier\nout line\nerr line\n");
    }

    #[test]
    fn partial_report_has_no_newline_and_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.log");
        let (mut o, out, _) = captured();
        o.start_log(&path).unwrap();
        o.report_partial("cmd> ");
        assert_eq!(out.contents(), "cmd> ");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
