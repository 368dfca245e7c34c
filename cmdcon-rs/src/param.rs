//! Integer parameter registry.
//!
//! Each parameter is a named [`ParamCell`] shared between the host and the
//! console: the host keeps a clone and reads it whenever it likes, while the
//! `option` command writes through the registry.  An optional change
//! callback receives the previous value after every successful write.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{ConsoleError, Result};

/// Shared integer slot backing a parameter.
pub type ParamCell = Rc<Cell<i64>>;

/// Create a new parameter cell holding `value`.
pub fn param_cell(value: i64) -> ParamCell {
    Rc::new(Cell::new(value))
}

/// Called with the previous value after a parameter is written.
pub type OnChange = Box<dyn Fn(i64)>;

struct Binding {
    cell: ParamCell,
    on_change: Option<OnChange>,
    doc: String,
}

/// Ordered name → integer parameter table.
#[derive(Default)]
pub struct ParamRegistry {
    params: BTreeMap<String, Binding>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter.  Duplicates and empty names are rejected.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        cell: ParamCell,
        on_change: Option<OnChange>,
        doc: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConsoleError::empty_name("parameter"));
        }
        if self.params.contains_key(&name) {
            return Err(ConsoleError::duplicate("parameter", name));
        }
        self.params.insert(name, Binding { cell, on_change, doc: doc.into() });
        Ok(())
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> Result<i64> {
        self.params
            .get(name)
            .map(|b| b.cell.get())
            .ok_or_else(|| ConsoleError::NotFound(name.to_owned()))
    }

    /// Write `value` to `name`, run its change callback, and return the
    /// previous value.
    pub fn set(&self, name: &str, value: i64) -> Result<i64> {
        let binding = self
            .params
            .get(name)
            .ok_or_else(|| ConsoleError::NotFound(name.to_owned()))?;
        let old = binding.cell.replace(value);
        if let Some(f) = &binding.on_change {
            f(old);
        }
        Ok(old)
    }

    /// `(name, value, documentation)` in ascending name order.
    pub fn list(&self) -> impl Iterator<Item = (&str, i64, &str)> {
        self.params
            .iter()
            .map(|(n, b)| (n.as_str(), b.cell.get(), b.doc.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
