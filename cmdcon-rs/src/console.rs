//! The console engine.
//!
//! [`Console`] owns the command and parameter registries, the input stack
//! and the output channels, and implements dispatch with error accounting:
//!
//! 1. a blank line is a successful no-op;
//! 2. `argv[0]` is looked up exactly (case-sensitive);
//! 3. an unknown name or a handler returning `false` records one error;
//! 4. reaching the error limit sets the quit flag.
//!
//! Once the quit flag is set no further line is dispatched.  The registered
//! quit helpers run once, in registration order, after the dispatch that set
//! the flag returns (or from [`Console::finish`]).

use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use crate::builtins;
use crate::command::{Command, CommandRegistry, Handler};
use crate::error::{ConsoleError, Result};
use crate::output::Output;
use crate::param::{param_cell, OnChange, ParamCell, ParamRegistry};
use crate::source::{InputSource, InputStack, StdinSource, DEFAULT_MAX_DEPTH};
use crate::tokenize::tokenize;

/// Default number of quit helpers a console accepts.
pub const DEFAULT_MAX_QUIT_HELPERS: usize = 10;

// ── ConsoleConfig ─────────────────────────────────────────────────────────────

/// Start-up settings for a [`Console`].
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Shown before each interactive read and in front of echoed lines.
    pub prompt: String,
    /// Recorded errors that force the console to quit.
    pub error_limit: i64,
    /// Echo lines read from scripts.
    pub echo: bool,
    /// Capacity of the quit-helper list.
    pub max_quit_helpers: usize,
    /// Ceiling on nested `source` frames.
    pub max_depth: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: "cmd> ".to_owned(),
            error_limit: 5,
            echo: false,
            max_quit_helpers: DEFAULT_MAX_QUIT_HELPERS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

// ── Console ───────────────────────────────────────────────────────────────────

/// An interactive command console.
pub struct Console {
    pub(crate) commands: CommandRegistry,
    pub(crate) params: ParamRegistry,
    pub(crate) input: InputStack,
    pub(crate) output: Output,

    quit: bool,
    shut_down: bool,
    /// Set once the root input frame has ended.
    pub(crate) at_eof: bool,
    /// Nesting of `dispatch` calls (`time` re-enters it).
    nesting: usize,

    err_cnt: i64,
    err_limit: ParamCell,
    echo: ParamCell,
    simulation: ParamCell,

    pub(crate) prompt: String,
    /// A prompt should be shown before the next interactive wait.
    pub(crate) prompt_pending: bool,
    pub(crate) block: bool,
    pub(crate) block_timing: bool,
    /// Highest descriptor handed to the host's wait set so far.
    pub(crate) fd_max: i32,

    quit_helpers: Vec<Handler>,
    max_quit_helpers: usize,
    max_depth: usize,

    first_time: Instant,
    last_time: Instant,
}

impl Console {
    /// Create a console writing to standard output and standard error, with
    /// the built-in commands and parameters registered.
    pub fn new(config: ConsoleConfig) -> Self {
        Self::with_output(config, Output::stdio())
    }

    /// Create a console writing to `output`.
    pub fn with_output(config: ConsoleConfig, output: Output) -> Self {
        let now = Instant::now();
        let mut console = Self {
            commands: CommandRegistry::new(),
            params: ParamRegistry::new(),
            input: InputStack::new(config.max_depth),
            output,
            quit: false,
            shut_down: false,
            at_eof: false,
            nesting: 0,
            err_cnt: 0,
            err_limit: param_cell(config.error_limit),
            echo: param_cell(config.echo as i64),
            simulation: param_cell(0),
            prompt: config.prompt,
            prompt_pending: true,
            block: false,
            block_timing: false,
            fd_max: 0,
            quit_helpers: Vec::new(),
            max_quit_helpers: config.max_quit_helpers,
            max_depth: config.max_depth,
            first_time: now,
            last_time: now,
        };
        builtins::install(&mut console);
        console
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Register a command implemented by a closure or function.
    pub fn add_cmd<F>(&mut self, name: &str, f: F, doc: &str) -> Result<()>
    where
        F: Fn(&mut Console, &[String]) -> bool + 'static,
    {
        self.add_command(name, f, doc)
    }

    /// Register any [`Command`] implementation.
    pub fn add_command(&mut self, name: &str, cmd: impl Command + 'static, doc: &str) -> Result<()> {
        self.commands.register(name, cmd, doc).inspect_err(|e| log::warn!("{e}"))
    }

    /// Register an integer parameter backed by `cell`.
    pub fn add_param(
        &mut self,
        name: &str,
        cell: ParamCell,
        on_change: Option<OnChange>,
        doc: &str,
    ) -> Result<()> {
        self.params.register(name, cell, on_change, doc).inspect_err(|e| log::warn!("{e}"))
    }

    /// Add a helper to run at shutdown.  Helpers receive an empty argument
    /// list.  Past the configured capacity the helper is dropped and
    /// [`ConsoleError::LimitExceeded`] is returned.
    pub fn add_quit_helper(&mut self, helper: impl Command + 'static) -> Result<()> {
        if self.quit_helpers.len() >= self.max_quit_helpers {
            let err = ConsoleError::LimitExceeded { limit: self.max_quit_helpers };
            self.output.diagnostic("Exceeded limit on quit helpers");
            log::warn!("{err}");
            return Err(err);
        }
        self.quit_helpers.push(Rc::new(helper));
        Ok(())
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn params(&self) -> &ParamRegistry {
        &self.params
    }

    // ── State ─────────────────────────────────────────────────────────────────

    pub fn set_echo(&mut self, on: bool) {
        self.echo.set(on as i64);
    }

    pub fn echo(&self) -> bool {
        self.echo.get() != 0
    }

    /// Whether the host should run in simulation mode (`option simulation 1`).
    pub fn simulation(&self) -> bool {
        self.simulation.get() != 0
    }

    pub(crate) fn builtin_cells(&self) -> (ParamCell, ParamCell, ParamCell) {
        (Rc::clone(&self.echo), Rc::clone(&self.err_limit), Rc::clone(&self.simulation))
    }

    pub fn error_count(&self) -> i64 {
        self.err_cnt
    }

    pub fn error_limit(&self) -> i64 {
        self.err_limit.get()
    }

    pub fn reset_errors(&mut self) {
        self.err_cnt = 0;
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }

    /// Quit was requested or the root input has ended.
    pub fn is_done(&self) -> bool {
        self.quit || self.at_eof
    }

    /// Set the quit flag.  Nested input frames are closed; quit helpers run
    /// when the current dispatch returns.
    pub fn request_quit(&mut self) {
        if !self.quit {
            log::debug!("quit requested");
        }
        self.quit = true;
        self.input.pop_to_root();
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Hold the console: no input is read until [`Console::unblock`].
    pub fn block(&mut self) {
        self.block = true;
    }

    /// Release a [`Console::block`].  A `time` report deferred by the block is
    /// printed now.
    pub fn unblock(&mut self) {
        self.block = false;
        if self.block_timing {
            self.block_timing = false;
            let delta = self.delta_time();
            self.output.report(&format!("Delta time = {delta:.3}"));
        }
        self.prompt_pending = true;
    }

    pub fn is_blocked(&self) -> bool {
        self.block
    }

    /// Highest descriptor the console has asked the host to wait on.
    pub fn fd_max(&self) -> i32 {
        self.fd_max
    }

    pub fn output_mut(&mut self) -> &mut Output {
        &mut self.output
    }

    pub fn report(&mut self, line: &str) {
        self.output.report(line);
    }

    pub fn diagnostic(&mut self, line: &str) {
        self.output.diagnostic(line);
    }

    /// Seconds since the previous call (or since creation).
    pub fn delta_time(&mut self) -> f64 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_time);
        self.last_time = now;
        delta.as_secs_f64()
    }

    /// Seconds between creation and the last [`Console::delta_time`] call.
    pub fn elapsed_time(&self) -> f64 {
        self.last_time.duration_since(self.first_time).as_secs_f64()
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    /// Push an input source.  The first source pushed becomes the root.
    pub fn push_source(&mut self, src: Box<dyn InputSource>, label: &str) -> Result<()> {
        self.input.push(src, label)
    }

    /// Push standard input.
    pub fn push_stdin(&mut self) -> Result<()> {
        self.input.push(Box::new(StdinSource), "stdin")
    }

    /// Push a script file.  The stack is unchanged if it cannot be opened.
    pub fn push_file(&mut self, path: &Path) -> Result<()> {
        self.input.push_file(path)
    }

    pub fn input(&self) -> &InputStack {
        &self.input
    }

    /// Read the next line, blocking if necessary.  `None` at the end of the
    /// root input, or once an over-long line has made the console quit.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            if self.input.is_interactive() && !self.input.has_line() {
                self.output.report_partial(&self.prompt);
            }
            match self.input.next_line() {
                Ok(Some(line)) => {
                    self.echo_line(&line);
                    return Ok(Some(line));
                }
                Ok(None) => {
                    self.at_eof = true;
                    return Ok(None);
                }
                Err(e @ ConsoleError::LineTooLong { .. }) => {
                    self.reject_input(e);
                    if self.quit {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Report input the stack refused and count it as one error.
    pub(crate) fn reject_input(&mut self, err: ConsoleError) {
        self.output.diagnostic(&err.to_string());
        self.record_error();
    }

    /// Write `line` as if it had been typed, when echo is on.  Lines typed at
    /// a terminal are already visible and are not repeated.
    pub(crate) fn echo_line(&mut self, line: &str) {
        if self.echo() && !self.input.is_interactive() {
            self.output.report(&format!("{}{line}", self.prompt));
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    /// Count one error.  Reaching the limit sets the quit flag.
    pub fn record_error(&mut self) {
        self.err_cnt += 1;
        if self.err_cnt >= self.err_limit.get() && !self.quit {
            let err = ConsoleError::ErrorLimitReached { limit: self.err_limit.get() };
            log::warn!("{err}");
            self.output.diagnostic("Error limit exceeded.  Stopping command execution");
            self.request_quit();
        }
    }

    /// Look up and run `argv` without touching the error count.  Unknown
    /// commands are reported and yield `false`.
    pub(crate) fn invoke(&mut self, argv: &[String]) -> bool {
        let Some(name) = argv.first() else { return true };
        match self.commands.lookup(name) {
            Some(handler) => {
                log::debug!("dispatch {argv:?}");
                let ok = handler.execute(self, argv);
                if !ok {
                    log::debug!("{}", ConsoleError::HandlerFailure(name.clone()));
                }
                ok
            }
            None => {
                let err = ConsoleError::UnknownCommand(name.clone());
                self.output.diagnostic(&err.to_string());
                false
            }
        }
    }

    /// Run an already tokenized command line.  A failure records one error.
    pub fn dispatch(&mut self, argv: &[String]) -> bool {
        if self.quit {
            return false;
        }
        if argv.is_empty() {
            return true;
        }

        self.nesting += 1;
        let ok = self.invoke(argv);
        if !ok {
            self.record_error();
        }
        self.nesting -= 1;

        if self.nesting == 0 && self.quit {
            self.shutdown();
        }
        ok
    }

    /// Tokenize and run one line.  After quit every line fails without being
    /// counted.
    pub fn interpret_line(&mut self, line: &str) -> bool {
        if self.quit {
            return false;
        }
        let argv = tokenize(line);
        self.dispatch(&argv)
    }

    /// Run every quit helper once, in registration order.
    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        let helpers = std::mem::take(&mut self.quit_helpers);
        for (i, helper) in helpers.iter().enumerate() {
            if !helper.execute(self, &[]) {
                log::warn!("quit helper {i} reported failure");
            }
        }
        self.input.pop_to_root();
    }

    /// Quit if that has not happened yet.  Returns `true` when no error was
    /// ever recorded.
    pub fn finish(&mut self) -> bool {
        self.quit = true;
        self.shutdown();
        self.err_cnt == 0
    }

    // ── Loops ─────────────────────────────────────────────────────────────────

    /// Run commands until the input ends or quit is requested, then
    /// [`finish`](Console::finish).
    ///
    /// With `path` the file is pushed first (as the root if nothing else has
    /// been pushed).  Without it an already pushed root is used, or standard
    /// input if there is none.
    pub fn run_batch(&mut self, path: Option<&Path>) -> Result<bool> {
        match path {
            Some(p) => self.push_file(p)?,
            None if self.input.is_empty() => self.push_stdin()?,
            None => {}
        }
        while !self.quit {
            match self.read_line()? {
                Some(line) => {
                    self.interpret_line(&line);
                }
                None => break,
            }
        }
        Ok(self.finish())
    }

    /// Run the commands of `path` to its end on a private input stack, leaving
    /// the console's own input untouched.  Returns `true` when the script ran
    /// without recording an error.
    pub fn run_script(&mut self, path: &Path) -> Result<bool> {
        let mut script = InputStack::new(self.max_depth);
        script.push_file(path)?;
        let saved = std::mem::replace(&mut self.input, script);
        let errors_before = self.err_cnt;

        let result = loop {
            if self.quit {
                break Ok(());
            }
            match self.input.next_line() {
                Ok(Some(line)) => {
                    self.echo_line(&line);
                    self.interpret_line(&line);
                }
                Ok(None) => break Ok(()),
                Err(e @ ConsoleError::LineTooLong { .. }) => self.reject_input(e),
                Err(e) => break Err(e),
            }
        };

        self.input = saved;
        result.map(|()| self.err_cnt == errors_before)
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(ConsoleConfig::default())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;

    use super::*;
    use crate::output::SharedBuf;

    fn console() -> (Console, SharedBuf, SharedBuf) {
        let (out, err) = (SharedBuf::new(), SharedBuf::new());
        let output = Output::new(Box::new(out.clone()), Box::new(err.clone()));
        (Console::with_output(ConsoleConfig::default(), output), out, err)
    }

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn blank_lines_succeed_without_errors() {
        let (mut con, _, _) = console();
        for line in ["", "   ", "\t\t", " \r\n"] {
            assert!(con.interpret_line(line));
        }
        assert_eq!(con.error_count(), 0);
    }

    #[test]
    fn unknown_command_counts_one_error() {
        let (mut con, _, err) = console();
        assert!(!con.interpret_line("bogus"));
        assert_eq!(con.error_count(), 1);
        assert_eq!(err.lines(), ["Unknown command bogus"]);
    }

    #[test]
    fn handler_receives_full_argv() {
        let (mut con, _, _) = console();
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let seen2 = Rc::clone(&seen);
        con.add_cmd("add", move |_, argv| {
            seen2.borrow_mut().extend_from_slice(argv);
            true
        }, " a b | Add")
        .unwrap();
        assert!(con.interpret_line("  add   1 2 "));
        assert_eq!(*seen.borrow(), ["add", "1", "2"]);
    }

    #[test]
    fn failing_handler_counts_one_error() {
        let (mut con, _, _) = console();
        con.add_cmd("fail", |_, _| false, "").unwrap();
        assert!(!con.interpret_line("fail"));
        assert_eq!(con.error_count(), 1);
    }

    #[test]
    fn error_limit_sets_quit_and_stops_counting() {
        let (mut con, _, err) = console();
        con.params.set("error", 3).unwrap();
        for _ in 0..3 {
            con.interpret_line("bogus");
        }
        assert!(con.is_quit());
        assert_eq!(con.error_count(), 3);
        assert!(err.contents().contains("Error limit exceeded"));

        assert!(!con.interpret_line("help"));
        assert!(!con.interpret_line("bogus"));
        assert_eq!(con.error_count(), 3);
    }

    #[test]
    fn quit_helpers_run_once_in_order() {
        let (mut con, _, _) = console();
        let order: Rc<RefCell<Vec<u8>>> = Rc::default();
        for id in 1..=3u8 {
            let order = Rc::clone(&order);
            con.add_quit_helper(move |_: &mut Console, argv: &[String]| {
                assert!(argv.is_empty());
                order.borrow_mut().push(id);
                true
            })
            .unwrap();
        }
        assert!(con.interpret_line("quit"));
        assert!(con.is_quit());
        assert_eq!(*order.borrow(), [1, 2, 3]);

        assert!(con.finish());
        assert_eq!(*order.borrow(), [1, 2, 3]);
    }

    #[test]
    fn quit_helpers_run_when_error_limit_hit() {
        let (mut con, _, _) = console();
        let ran = Rc::new(std::cell::Cell::new(0));
        let ran2 = Rc::clone(&ran);
        con.add_quit_helper(move |_: &mut Console, _: &[String]| {
            ran2.set(ran2.get() + 1);
            true
        })
        .unwrap();
        con.params.set("error", 1).unwrap();
        con.interpret_line("nope");
        assert_eq!(ran.get(), 1);
    }

    #[test]
    fn quit_helper_capacity_is_enforced() {
        let out = SharedBuf::new();
        let err = SharedBuf::new();
        let config = ConsoleConfig { max_quit_helpers: 2, ..ConsoleConfig::default() };
        let mut con = Console::with_output(
            config,
            Output::new(Box::new(out.clone()), Box::new(err.clone())),
        );
        let noop = |_: &mut Console, _: &[String]| true;
        con.add_quit_helper(noop).unwrap();
        con.add_quit_helper(noop).unwrap();
        assert!(matches!(
            con.add_quit_helper(noop),
            Err(ConsoleError::LimitExceeded { limit: 2 })
        ));
        assert_eq!(err.lines(), ["Exceeded limit on quit helpers"]);
    }

    #[test]
    fn duplicate_command_is_rejected() {
        let (mut con, _, _) = console();
        assert!(con.add_cmd("help", |_, _| true, "").is_err());
        // The built-in is still in place.
        con.interpret_line("help");
        assert_eq!(con.error_count(), 0);
    }

    #[test]
    fn finish_reports_whether_errors_occurred() {
        let (mut con, _, _) = console();
        assert!(con.interpret_line("# all good"));
        assert!(con.finish());

        let (mut con, _, _) = console();
        con.interpret_line("bogus");
        assert!(!con.finish());
    }

    #[test]
    fn run_batch_over_memory_root() {
        let (mut con, out, _) = console();
        con.push_source(Box::new(Cursor::new(b"option echo 1\n# hi\n".to_vec())), "mem")
            .unwrap();
        assert!(con.run_batch(None).unwrap());
        assert_eq!(out.lines(), ["cmd> # hi"]);
    }

    #[test]
    fn run_batch_stops_at_quit() {
        let (mut con, _, _) = console();
        con.push_source(Box::new(Cursor::new(b"quit\nbogus\n".to_vec())), "mem").unwrap();
        assert!(con.run_batch(None).unwrap());
        assert_eq!(con.error_count(), 0);
    }

    #[test]
    fn dispatch_with_empty_argv_is_noop() {
        let (mut con, _, _) = console();
        assert!(con.dispatch(&argv(&[])));
        assert_eq!(con.error_count(), 0);
    }

    #[test]
    fn block_defers_time_report() {
        let (mut con, out, _) = console();
        con.add_cmd("hold", |c, _| {
            c.block();
            true
        }, "")
        .unwrap();
        assert!(con.interpret_line("time hold"));
        assert!(con.is_blocked());
        assert!(out.lines().is_empty());
        con.unblock();
        let lines = out.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Delta time = "));
    }

    #[test]
    fn simulation_is_exposed_through_accessor() {
        let (mut con, _, _) = console();
        assert!(!con.simulation());
        assert!(con.interpret_line("option simulation 1"));
        assert!(con.simulation());
    }
}
