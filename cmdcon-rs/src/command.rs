//! Command registry.
//!
//! Commands are kept in a [`BTreeMap`] keyed by name, so lookup is
//! logarithmic and [`CommandRegistry::list`] always yields names in ascending
//! order regardless of registration order.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::console::Console;
use crate::error::{ConsoleError, Result};

// ── Command ───────────────────────────────────────────────────────────────────

/// Anything the console can run for a command line.
///
/// `argv[0]` is the command name; the remaining entries are its argument
/// tokens.  Returning `false` records one error against the console.
pub trait Command {
    fn execute(&self, console: &mut Console, argv: &[String]) -> bool;
}

impl<F> Command for F
where
    F: Fn(&mut Console, &[String]) -> bool,
{
    fn execute(&self, console: &mut Console, argv: &[String]) -> bool {
        self(console, argv)
    }
}

/// Shared handle to a registered command.
///
/// Handlers are reference counted so the console can hold one while the
/// handler itself borrows the console mutably.
pub type Handler = Rc<dyn Command>;

// ── CommandRegistry ───────────────────────────────────────────────────────────

struct Binding {
    handler: Handler,
    doc: String,
}

/// Ordered name → handler table.
#[derive(Default)]
pub struct CommandRegistry {
    cmds: BTreeMap<String, Binding>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command.  A name that is empty or already registered is
    /// rejected and the existing binding is left untouched.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl Command + 'static,
        doc: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConsoleError::empty_name("command"));
        }
        if self.cmds.contains_key(&name) {
            return Err(ConsoleError::duplicate("command", name));
        }
        self.cmds.insert(name, Binding { handler: Rc::new(handler), doc: doc.into() });
        Ok(())
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<Handler> {
        self.cmds.get(name).map(|b| Rc::clone(&b.handler))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cmds.contains_key(name)
    }

    /// `(name, documentation)` pairs in ascending name order.
    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cmds.iter().map(|(n, b)| (n.as_str(), b.doc.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
