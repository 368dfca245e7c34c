//! Embeddable line-oriented command console.
//!
//! A host registers commands and integer parameters on a [`Console`], then
//! feeds it lines interactively, from a script, or from its own `select(2)`
//! loop.  Scripts can `source` other scripts; each nested file is read from
//! its own buffered frame and the parent resumes where it left off.
//!
//! # Quick start
//!
//! ```rust
//! use std::io::Cursor;
//! use cmdcon::{Console, ConsoleConfig, Output, SharedBuf};
//!
//! let out = SharedBuf::new();
//! let output = Output::new(Box::new(out.clone()), Box::new(SharedBuf::new()));
//! let mut console = Console::with_output(ConsoleConfig::default(), output);
//! console
//!     .add_cmd("hello", |c, argv| {
//!         c.report(&format!("hello {}", argv[1..].join(" ")));
//!         true
//!     }, " name         | Greet")
//!     .unwrap();
//!
//! console
//!     .push_source(Box::new(Cursor::new(b"hello world\n".to_vec())), "script")
//!     .unwrap();
//! assert!(console.run_batch(None).unwrap());
//! assert_eq!(out.lines(), ["hello world"]);
//! ```

mod builtins;
pub mod cli;
pub mod command;
pub mod console;
pub mod error;
pub mod output;
pub mod param;
pub mod select;
pub mod source;
pub mod tokenize;

// Re-exports for convenience.
pub use command::{Command, CommandRegistry};
pub use console::{Console, ConsoleConfig};
pub use error::{ConsoleError, Result};
pub use output::{Output, SharedBuf};
pub use param::{param_cell, ParamCell, ParamRegistry};
pub use select::FdSet;
pub use source::{InputSource, InputStack, StdinSource};
pub use tokenize::tokenize;
