//! Generic identifier encoding used by SQL Server's `for xml`.
//!
//! Column and alias names become XML element and attribute names. Characters that are
//! not legal at their position in an XML name are written as `_xHHHH_` (UTF-16 code
//! units, four hex digits). An underscore that begins a literal `_x` is itself encoded
//! so decoding is unambiguous.

use std::sync::LazyLock;

use regex::Regex;

static ESCAPE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_x([0-9A-Fa-f]{4})_").unwrap());

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

fn push_escaped(out: &mut String, c: char) {
    let mut units = [0u16; 2];
    for unit in c.encode_utf16(&mut units) {
        out.push_str(&format!("_x{:04X}_", unit));
    }
}

/// Encode an identifier so it is a valid XML name.
pub fn encode_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        let literal_escape_prefix = c == '_' && chars.get(i + 1) == Some(&'x');
        let valid = if i == 0 {
            is_name_start_char(c)
        } else {
            is_name_char(c)
        };
        if valid && !literal_escape_prefix {
            out.push(c);
        } else {
            push_escaped(&mut out, c);
        }
    }
    out
}

/// Reverse [`encode_name`]. Unpaired surrogates decode to U+FFFD.
pub fn decode_name(name: &str) -> String {
    if !name.contains("_x") {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len());
    let mut pending: Vec<u16> = Vec::new();
    let mut last = 0;

    for caps in ESCAPE_PATTERN.captures_iter(name) {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        if whole.0 > last {
            flush_units(&mut out, &mut pending);
            out.push_str(&name[last..whole.0]);
        }
        if let Ok(unit) = u16::from_str_radix(&caps[1], 16) {
            pending.push(unit);
        }
        last = whole.1;
    }
    flush_units(&mut out, &mut pending);
    out.push_str(&name[last..]);
    out
}

fn flush_units(out: &mut String, pending: &mut Vec<u16>) {
    if pending.is_empty() {
        return;
    }
    out.extend(
        char::decode_utf16(pending.drain(..)).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}
