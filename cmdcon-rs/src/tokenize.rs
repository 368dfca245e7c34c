//! Command-line tokenizer.
//!
//! A line is split into maximal runs of non-whitespace characters.  There is
//! no quoting and no escaping: `# a   b` yields `["#", "a", "b"]`, so runs of
//! spaces inside a comment collapse to one.  A NUL character ends the line.

/// Split `line` into whitespace-delimited tokens.
///
/// An empty or all-whitespace line yields no tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();

    for ch in line.chars() {
        match ch {
            '\0' => break,
            c if c.is_whitespace() => {
                if !cur.is_empty() {
                    args.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        args.push(cur);
    }
    args
}

/// Parse an integer the way `strtol(s, _, 0)` would: optional sign, then
/// `0x`/`0X` hex, a leading `0` for octal, or decimal.  The whole token must
/// be consumed.
pub fn parse_int(s: &str) -> Option<i64> {
    let (neg, body) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if body.is_empty() {
        return None;
    }

    let (radix, digits) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (16, hex)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..])
    } else {
        (10, body)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = u64::from_str_radix(digits, radix).ok()?;

    if neg {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
