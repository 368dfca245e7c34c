//! Command-line argument parsing for the `cmdcon` host.
//!
//! Usage:
//!   cmdcon [-f<file>] [-l<logfile>] [-e<limit>] [-vnd]

use std::path::PathBuf;

use crate::tokenize::parse_int;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Script to run in batch mode (`-f<file>`); interactive when absent.
    pub batch: Option<PathBuf>,
    /// Start copying output to this file (`-l<file>`).
    pub log: Option<PathBuf>,
    /// Error limit override (`-e<n>`).
    pub error_limit: Option<i64>,
    /// Echo script lines (`-v`).
    pub echo: bool,
    /// Skip the startup rc file (`-n`).
    pub no_rc: bool,
    /// Debug logging to stderr (`-d`).
    pub debug: bool,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(&raw[1..])
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();
        if !arg.starts_with('-') || arg == "-" {
            return Err(format!("unexpected argument: {arg}"));
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'v' => args.echo = true,
                'n' => args.no_rc = true,
                'd' => args.debug = true,

                // Value flags: the rest of this arg, or the next arg.
                flag @ ('f' | 'l' | 'e') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{flag} requires an argument"));
                    };
                    match flag {
                        'f' => args.batch = Some(PathBuf::from(value)),
                        'l' => args.log = Some(PathBuf::from(value)),
                        _ => {
                            let n = parse_int(&value)
                                .filter(|&n| n > 0)
                                .ok_or_else(|| format!("invalid error limit: {value}"))?;
                            args.error_limit = Some(n);
                        }
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    Ok(args)
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the startup rc file: `~/.cmdconrc`, then `./.cmdconrc`.
/// Returns the first path that exists, or `None`.
pub fn find_user_config() -> Option<PathBuf> {
    let home = std::env::var("HOME").unwrap_or_default();
    [format!("{home}/.cmdconrc"), "./.cmdconrc".to_owned()]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
