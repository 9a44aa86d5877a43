//! Glob matching with the `KEYS` pattern syntax.
//!
//! Supported tokens: `*` (any run of characters), `?` (any single character), `[abc]`,
//! `[a-z]` and `[^a]` classes, and `\` to escape the next character.

/// Returns whether `text` matches `pattern` in full.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let mut pi = 0;
    let mut ti = 0;
    let mut star: Option<(usize, usize)> = None;

    while ti < text.len() {
        if pi < pattern.len() && pattern[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
            continue;
        }

        if pi < pattern.len() {
            if let Some(next) = match_one(&pattern, pi, text[ti]) {
                pi = next;
                ti += 1;
                continue;
            }
        }

        // Backtrack: let the last star swallow one more character.
        match star {
            Some((star_pi, star_ti)) => {
                pi = star_pi + 1;
                ti = star_ti + 1;
                star = Some((star_pi, star_ti + 1));
            }
            None => return false,
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }

    pi == pattern.len()
}

/// Matches one non-star token at `pi` against `c`, returning the index after the token.
fn match_one(pattern: &[char], pi: usize, c: char) -> Option<usize> {
    match pattern[pi] {
        '?' => Some(pi + 1),
        '\\' if pi + 1 < pattern.len() => (pattern[pi + 1] == c).then_some(pi + 2),
        '[' => match_class(pattern, pi + 1, c),
        literal => (literal == c).then_some(pi + 1),
    }
}

fn match_class(pattern: &[char], mut i: usize, c: char) -> Option<usize> {
    let negated = pattern.get(i) == Some(&'^');
    if negated {
        i += 1;
    }

    let mut matched = false;
    loop {
        match pattern.get(i) {
            // Unterminated class
            None => return None,
            Some(']') => break,
            Some('\\') if i + 1 < pattern.len() => {
                matched |= pattern[i + 1] == c;
                i += 2;
            }
            Some(&low) if pattern.get(i + 1) == Some(&'-')
                && pattern.get(i + 2).is_some_and(|high| *high != ']') =>
            {
                let high = pattern[i + 2];
                let (low, high) = if low <= high { (low, high) } else { (high, low) };
                matched |= (low..=high).contains(&c);
                i += 3;
            }
            Some(&member) => {
                matched |= member == c;
                i += 1;
            }
        }
    }

    (matched != negated).then_some(i + 1)
}
