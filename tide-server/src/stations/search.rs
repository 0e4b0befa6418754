//! Name matching for station lookup and autocomplete.

/// How well a station matched a query. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchRank {
    /// Query equals the station identifier
    Identifier,
    /// Identifier starts with the query
    IdentifierPrefix,
    /// Query equals the name, ignoring case
    ExactName,
    /// Name starts with the query
    NamePrefix,
    /// Some word of the name starts with the query
    WordPrefix,
    /// Query appears somewhere in the name
    Substring,
}

/// Rank a name against a query. Both must already be lowercased.
pub fn rank_name(name: &str, query: &str) -> Option<MatchRank> {
    if query.is_empty() {
        return None;
    }
    if name == query {
        Some(MatchRank::ExactName)
    } else if name.starts_with(query) {
        Some(MatchRank::NamePrefix)
    } else if name
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word.starts_with(query))
    {
        Some(MatchRank::WordPrefix)
    } else if name.contains(query) {
        Some(MatchRank::Substring)
    } else {
        None
    }
}

/// Normalize user input for matching.
pub fn normalize(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
