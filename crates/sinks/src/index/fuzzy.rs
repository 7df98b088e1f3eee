//! Edit distance helpers for fuzzy matching

/// Levenshtein distance over chars
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Allowed edits for a term of this length: 0 up to 2 chars, 1 up to 5, else 2
pub fn auto_fuzziness(term: &str) -> usize {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// Case-insensitive fuzzy match of `query` against the whole value or any of its words
pub(crate) fn fuzzy_matches(value: &str, query: &str) -> bool {
    let query = query.to_lowercase();
    let value = value.to_lowercase();
    let max = auto_fuzziness(&query);

    if levenshtein(&value, &query) <= max {
        return true;
    }
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .any(|token| levenshtein(token, &query) <= max)
}
