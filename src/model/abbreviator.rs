//! Short, unique abbreviations for table names.
//!
//! Suggestions for a name are tried in order and the first one not yet claimed wins
//! (claims compare case-insensitively):
//!
//! 1. initials of the humanized words (`OrderLine` -> `OL`);
//! 2. the first two letters (`Organization` -> `Or`);
//! 3. the first letter followed by each later consonant (`Og`, `On`, ...);
//! 4. the initials followed by a counter (`O2`, `O3`, ...).
//!
//! Names are processed in sorted order so the result only depends on the set of names.

use std::collections::HashSet;

/// Split a name into words at separators, case changes and letter/digit boundaries.
fn humanize(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_alphabetic() != c.is_alphabetic())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(|n| n.is_lowercase()));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn is_consonant(c: char) -> bool {
    c.is_alphabetic() && !matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

fn suggestions(name: &str) -> Vec<String> {
    let words = humanize(name);
    let initials: String = words
        .iter()
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect();
    let initials = if initials.is_empty() {
        "X".to_string()
    } else {
        initials
    };

    let letters: Vec<char> = words.iter().flat_map(|w| w.chars()).collect();
    let mut result = vec![initials.clone()];

    if let Some(&first) = letters.first() {
        let first: String = first.to_uppercase().collect();
        if let Some(&second) = letters.get(1) {
            result.push(format!("{}{}", first, second.to_lowercase()));
        }
        let mut seen = HashSet::new();
        for &c in letters.iter().skip(1) {
            if is_consonant(c) && seen.insert(c.to_ascii_lowercase()) {
                result.push(format!("{}{}", first, c.to_lowercase()));
            }
        }
    }
    result
}

/// Abbreviate a batch of names; the result is aligned with the input.
pub fn abbreviate(names: &[&str]) -> Vec<String> {
    let mut order: Vec<usize> = (0..names.len()).collect();
    order.sort_by(|a, b| names[*a].cmp(names[*b]).then(a.cmp(b)));

    let mut claimed: HashSet<String> = HashSet::new();
    let mut result = vec![String::new(); names.len()];

    for i in order {
        let candidates = suggestions(names[i]);
        let chosen = candidates
            .iter()
            .find(|c| !claimed.contains(&c.to_lowercase()))
            .cloned()
            .unwrap_or_else(|| {
                let base = &candidates[0];
                (2..)
                    .map(|n| format!("{}{}", base, n))
                    .find(|c| !claimed.contains(&c.to_lowercase()))
                    .unwrap_or_else(|| base.clone())
            });
        claimed.insert(chosen.to_lowercase());
        result[i] = chosen;
    }
    result
}
