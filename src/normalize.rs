use unicode_normalization::UnicodeNormalization;

/// Comparison key for a team name as reported by a data provider.
///
/// Lowercases, decomposes accented characters and drops the combining marks,
/// then keeps only ASCII letters, digits and whitespace. Whitespace runs are
/// collapsed to one space and the ends are trimmed. Characters with no ASCII
/// base letter (`ß`, `ø`, emoji) disappear entirely.
pub fn normalize(name: &str) -> String {
    let kept = name
        .nfkd()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
