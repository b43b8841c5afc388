// src/matching/name.rs
use once_cell::sync::Lazy;
use regex::Regex;

const NAME_SUFFIXES: [&str; 14] = [
    "jr", "sr", "ii", "iii", "iv", "v", "md", "phd", "esq", "dds", "dvm", "cpa", "rn", "ret",
];

static NON_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s'\-]").expect("static name regex"));

/// Canonical lowercase "first middle last suffix" form.
///
/// Handles both "First Last" and "Last, First" inputs; a comma followed only
/// by generational/professional suffixes ("John Smith, Jr.") is not treated
/// as a reordering comma.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace('.', " ");
    let parts: Vec<&str> = lowered
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let ordered: Vec<&str> = match parts.split_first() {
        None => return String::new(),
        Some((_, rest)) if rest.is_empty() || rest.iter().all(|p| is_suffix_phrase(p)) => parts.clone(),
        Some((last, rest)) => {
            let mut reordered = Vec::with_capacity(parts.len());
            if let Some((given, trailing)) = rest.split_first() {
                reordered.push(*given);
                reordered.push(*last);
                reordered.extend(trailing.iter().copied());
            }
            reordered
        }
    };

    let cleaned = NON_NAME_CHARS.replace_all(&ordered.join(" "), " ").into_owned();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_suffix_phrase(part: &str) -> bool {
    let mut tokens = part.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|t| NAME_SUFFIXES.contains(&t))
}
