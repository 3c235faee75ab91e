//! Glob matching for `KEYS`, `SCAN ... MATCH` and friends.
//!
//! Supports `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and `\` escapes, on raw bytes.

/// Returns `true` if `text` matches `pattern`.
///
/// Runs in `O(pattern * text)`: on a mismatch only the most recent `*` is
/// retried, one text byte further along.
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Pattern index just past the last `*`, and the text index it resumes at.
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if pattern.get(p) == Some(&b'*') {
            p += 1;
            star = Some((p, t));
            continue;
        }
        if let Some(next) = step(pattern, p, text[t]) {
            p = next;
            t += 1;
            continue;
        }
        match star {
            Some((after_star, resume)) => {
                p = after_star;
                t = resume + 1;
                star = Some((after_star, t));
            }
            None => return false,
        }
    }

    while pattern.get(p) == Some(&b'*') {
        p += 1;
    }
    p == pattern.len()
}

/// Match the single-byte token at `pattern[p]` against `ch`.
///
/// Returns the index of the following token, or `None` on a mismatch or at
/// the end of the pattern.
fn step(pattern: &[u8], p: usize, ch: u8) -> Option<usize> {
    match pattern.get(p)? {
        b'?' => Some(p + 1),
        b'\\' if p + 1 < pattern.len() => (pattern[p + 1] == ch).then_some(p + 2),
        b'[' => {
            let body = &pattern[p + 1..];
            match body.iter().skip(1).position(|&b| b == b']') {
                None => (ch == b'[').then_some(p + 1),
                Some(end) => {
                    let end = end + 1;
                    class_match(&body[..end], ch).then_some(p + 1 + end + 1)
                }
            }
        }
        &literal => (literal == ch).then_some(p + 1),
    }
}

fn class_match(class: &[u8], ch: u8) -> bool {
    let (negate, class) = match class.first() {
        Some(b'^') => (true, &class[1..]),
        _ => (false, class),
    };
    let mut i = 0;
    let mut found = false;
    while i < class.len() {
        if class[i] == b'\\' && i + 1 < class.len() {
            found |= class[i + 1] == ch;
            i += 2;
        } else if i + 2 < class.len() && class[i + 1] == b'-' {
            let (lo, hi) = if class[i] <= class[i + 2] {
                (class[i], class[i + 2])
            } else {
                (class[i + 2], class[i])
            };
            found |= (lo..=hi).contains(&ch);
            i += 3;
        } else {
            found |= class[i] == ch;
            i += 1;
        }
    }
    found != negate
}
