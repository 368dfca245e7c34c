use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use proptest::prelude::*;
use cmdcon::{param_cell, tokenize, Console, ConsoleConfig, Output, SharedBuf};

fn console() -> (Console, SharedBuf, SharedBuf) {
    let (out, err) = (SharedBuf::new(), SharedBuf::new());
    let output = Output::new(Box::new(out.clone()), Box::new(err.clone()));
    (Console::with_output(ConsoleConfig::default(), output), out, err)
}

/// The help / quit / bogus walk-through: help lists `help` before `quit`,
/// quit runs the helpers in order, an unknown command is one error.
#[test]
fn help_quit_bogus_scenario() {
    let (mut con, out, _) = console();
    assert!(con.interpret_line("help\n"));
    let lines = out.lines();
    let help = lines.iter().position(|l| l.starts_with("\thelp\t")).unwrap();
    let quit = lines.iter().position(|l| l.starts_with("\tquit\t")).unwrap();
    assert!(help < quit);

    let (mut con, _, err) = console();
    assert!(!con.interpret_line("bogus\n"));
    assert_eq!(con.error_count(), 1);
    assert_eq!(err.lines(), ["Unknown command bogus"]);

    let (mut con, _, _) = console();
    let calls: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    for tag in ["first", "second"] {
        let calls = Rc::clone(&calls);
        con.add_quit_helper(move |_: &mut Console, _: &[String]| {
            calls.borrow_mut().push(tag);
            true
        })
        .unwrap();
    }
    assert!(con.interpret_line("quit\n"));
    assert!(con.is_quit());
    assert_eq!(*calls.borrow(), ["first", "second"]);
}

proptest! {
    /// Whitespace-only lines succeed and record nothing.
    #[test]
    fn whitespace_lines_are_noops(s in "[ \t\r\n]*") {
        let (mut con, _, _) = console();
        prop_assert!(con.interpret_line(&s));
        prop_assert_eq!(con.error_count(), 0);
    }
}

proptest! {
    /// Tokens never contain whitespace and rejoin to the squeezed line.
    #[test]
    fn tokens_have_no_whitespace(s in "[a-z# \t]*") {
        let toks = tokenize(&s);
        for t in &toks {
            prop_assert!(!t.is_empty());
            prop_assert!(!t.chars().any(char::is_whitespace));
        }
        let squeezed: Vec<&str> = s.split_whitespace().collect();
        prop_assert_eq!(toks, squeezed);
    }
}

proptest! {
    /// Any unregistered name is one error.
    #[test]
    fn unknown_commands_count_exactly_one(name in "[a-z]{1,12}") {
        let (mut con, _, _) = console();
        prop_assume!(!con.commands().contains(&name));
        prop_assert!(!con.interpret_line(&name));
        prop_assert_eq!(con.error_count(), 1);
    }
}

proptest! {
    /// After `limit` failures quit is set and nothing more is counted.
    #[test]
    fn error_limit_stops_counting(limit in 1i64..8, extra in 0usize..5) {
        let (mut con, _, _) = console();
        con.interpret_line(&format!("option error {limit}"));
        for _ in 0..limit {
            con.interpret_line("bogus");
        }
        prop_assert!(con.is_quit());
        prop_assert_eq!(con.error_count(), limit);
        for _ in 0..extra {
            prop_assert!(!con.interpret_line("bogus"));
        }
        prop_assert_eq!(con.error_count(), limit);
    }
}

proptest! {
    /// Both registries list in strictly ascending order whatever the
    /// insertion order.
    #[test]
    fn registries_list_sorted(names in proptest::collection::vec("[a-z]{1,6}", 0..12)) {
        let (mut con, _, _) = console();
        for n in &names {
            let _ = con.add_cmd(n, |_, _| true, "");
            let _ = con.add_param(n, param_cell(0), None, "");
        }
        let cmds: Vec<&str> = con.commands().list().map(|(n, _)| n).collect();
        prop_assert!(cmds.windows(2).all(|w| w[0] < w[1]));
        let params: Vec<&str> = con.params().list().map(|(n, _, _)| n).collect();
        prop_assert!(params.windows(2).all(|w| w[0] < w[1]));
    }
}

proptest! {
    /// `option name V` then `option` shows `name = V`.
    #[test]
    fn option_round_trip(v in any::<i32>()) {
        let (mut con, out, _) = console();
        con.add_param("knob", param_cell(0), None, "A knob").unwrap();
        let line = format!("option knob {v}");
        prop_assert!(con.interpret_line(&line));
        out.clear();
        prop_assert!(con.interpret_line("option"));
        let expected = format!("\tknob\t{v}\tA knob");
        prop_assert!(out.lines().contains(&expected));
    }
}

proptest! {
    /// A nested source of K lines runs exactly K commands before the parent
    /// continues with the line after `source`.
    #[test]
    fn nested_source_resumes_parent(k in 0usize..20, before in 0usize..4, after in 1usize..4) {
        let dir = tempfile::tempdir().unwrap();
        let inner_path = dir.path().join("inner.cmd");
        let inner: String = (0..k).map(|i| format!("rec b{i}\n")).collect();
        std::fs::write(&inner_path, inner).unwrap();

        let mut outer = String::new();
        for i in 0..before {
            outer.push_str(&format!("rec a{i}\n"));
        }
        outer.push_str(&format!("source {}\n", inner_path.display()));
        for i in before..before + after {
            outer.push_str(&format!("rec a{i}\n"));
        }

        let (mut con, _, _) = console();
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let seen2 = Rc::clone(&seen);
        con.add_cmd("rec", move |_, argv| {
            seen2.borrow_mut().push(argv[1].clone());
            true
        }, "").unwrap();
        con.push_source(Box::new(Cursor::new(outer.into_bytes())), "outer").unwrap();
        prop_assert!(con.run_batch(None).unwrap());

        let mut expected: Vec<String> = (0..before).map(|i| format!("a{i}")).collect();
        expected.extend((0..k).map(|i| format!("b{i}")));
        expected.extend((before..before + after).map(|i| format!("a{i}")));
        prop_assert_eq!(&*seen.borrow(), &expected);
    }
}
