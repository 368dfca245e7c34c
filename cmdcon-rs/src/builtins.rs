//! Built-in commands and parameters.
//!
//! | Command | Action |
//! |---------|--------|
//! | `help` | list commands and parameters |
//! | `option [name val]...` | display or set parameters |
//! | `quit` | stop the console |
//! | `source file` | read commands from `file` |
//! | `log file` | copy output to `file` (appended) |
//! | `time [cmd arg...]` | report elapsed time / time a command |
//! | `# ...` | comment |

use std::path::Path;

use crate::console::Console;
use crate::tokenize::parse_int;

/// Register the built-in commands and the `echo`, `error` and `simulation`
/// parameters on a freshly created console.
pub(crate) fn install(con: &mut Console) {
    let cmds: [(&str, fn(&mut Console, &[String]) -> bool, &str); 7] = [
        ("help",   do_help,    "                | Show documentation"),
        ("option", do_option,  " [name val]     | Display or set options"),
        ("quit",   do_quit,    "                | Exit program"),
        ("source", do_source,  " file           | Read commands from source file"),
        ("log",    do_log,     " file           | Copy output to file"),
        ("time",   do_time,    " cmd arg ...    | Time command execution"),
        ("#",      do_comment, " ...            | Display comment"),
    ];
    for (name, f, doc) in cmds {
        let registered = con.add_cmd(name, f, doc);
        debug_assert!(registered.is_ok(), "builtin command {name}: {registered:?}");
    }

    let (echo, error, simulation) = con.builtin_cells();
    let params = [
        ("echo", echo, "Do/don't echo commands"),
        ("error", error, "Number of errors until exit"),
        ("simulation", simulation, "Start/Stop simulation mode"),
    ];
    for (name, cell, doc) in params {
        let registered = con.add_param(name, cell, None, doc);
        debug_assert!(registered.is_ok(), "builtin parameter {name}: {registered:?}");
    }
}

fn list_params(con: &mut Console) {
    let lines: Vec<String> = con
        .params()
        .list()
        .map(|(name, value, doc)| format!("\t{name}\t{value}\t{doc}"))
        .collect();
    for line in lines {
        con.report(&line);
    }
}

fn do_help(con: &mut Console, _argv: &[String]) -> bool {
    let cmds: Vec<String> = con
        .commands()
        .list()
        .map(|(name, doc)| format!("\t{name}\t{doc}"))
        .collect();
    con.report("Commands:");
    for line in cmds {
        con.report(&line);
    }
    con.report("Options:");
    list_params(con);
    true
}

fn do_option(con: &mut Console, argv: &[String]) -> bool {
    if argv.len() <= 1 {
        con.report("Options:");
        list_params(con);
        return true;
    }

    for pair in argv[1..].chunks(2) {
        let name = &pair[0];
        let Some(raw) = pair.get(1) else {
            con.diagnostic(&format!("No value given for parameter {name}"));
            return false;
        };
        let Some(value) = parse_int(raw) else {
            con.diagnostic(&crate::error::ConsoleError::InvalidValue(raw.clone()).to_string());
            return false;
        };
        if let Err(e) = con.params().set(name, value) {
            con.diagnostic(&e.to_string());
            return false;
        }
    }
    true
}

fn do_quit(con: &mut Console, _argv: &[String]) -> bool {
    con.request_quit();
    true
}

fn do_source(con: &mut Console, argv: &[String]) -> bool {
    let Some(file) = argv.get(1) else {
        con.diagnostic("No source file given");
        return false;
    };
    match con.push_file(Path::new(file)) {
        Ok(()) => true,
        Err(e) => {
            con.diagnostic(&e.to_string());
            false
        }
    }
}

fn do_log(con: &mut Console, argv: &[String]) -> bool {
    let Some(file) = argv.get(1) else {
        con.diagnostic("No log file given");
        return false;
    };
    match con.output_mut().start_log(Path::new(file)) {
        Ok(()) => true,
        Err(e) => {
            con.diagnostic(&format!("Couldn't open log file '{file}': {e}"));
            false
        }
    }
}

fn do_time(con: &mut Console, argv: &[String]) -> bool {
    let delta = con.delta_time();
    if argv.len() <= 1 {
        let elapsed = con.elapsed_time();
        con.report(&format!("Elapsed time = {elapsed:.3}, Delta time = {delta:.3}"));
        return true;
    }

    let ok = con.invoke(&argv[1..]);
    if con.is_blocked() {
        // Reported by Console::unblock.
        con.block_timing = true;
    } else {
        let delta = con.delta_time();
        con.report(&format!("Delta time = {delta:.3}"));
    }
    ok
}

fn do_comment(con: &mut Console, argv: &[String]) -> bool {
    if !con.echo() {
        con.report(&argv.join(" "));
    }
    true
}

// ── Tests ─────────────────────────────────────────────────────────────────────
