//! Leading-literal extraction for regex predicates
//!
//! A regex is index-resolvable only when every string it matches shares a
//! non-empty literal prefix. The extraction here is conservative: it stops at
//! the first construct it does not fully understand, so the prefix it returns
//! is always a true prefix of every match.

/// Characters that carry regex meaning when unescaped
const META: &[char] = &[
    '.', '[', ']', '(', ')', '|', '*', '+', '?', '{', '}', '$', '^', '\\',
];

/// Returns the longest literal prefix shared by every match of `pattern`.
///
/// `None` means the pattern has no usable prefix: it starts with a
/// metacharacter, a class, a group or inline flags, or it has a top-level
/// alternation.
pub fn literal_prefix(pattern: &str) -> Option<String> {
    if has_top_level_alternation(pattern) {
        return None;
    }

    let mut chars = pattern.chars().peekable();
    if chars.peek() == Some(&'^') {
        chars.next();
    }

    let mut prefix = String::new();
    while let Some(c) = chars.next() {
        let literal = match c {
            '\\' => match chars.next() {
                Some(escaped) if META.contains(&escaped) || escaped == '-' || escaped == '/' => {
                    escaped
                }
                // \d, \w, \s, \b ...
                _ => break,
            },
            c if META.contains(&c) => break,
            c => c,
        };

        match chars.peek() {
            // literal may be absent
            Some('*') | Some('?') | Some('{') => break,
            // literal occurs at least once
            Some('+') => {
                prefix.push(literal);
                break;
            }
            _ => prefix.push(literal),
        }
    }

    if prefix.is_empty() {
        None
    } else {
        Some(prefix)
    }
}

/// Returns true if `pattern` has an unescaped `|` outside any group or class
fn has_top_level_alternation(pattern: &str) -> bool {
    let mut depth = 0usize;
    let mut in_class = false;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => depth = depth.saturating_sub(1),
            '|' if !in_class && depth == 0 => return true,
            _ => {}
        }
    }
    false
}
