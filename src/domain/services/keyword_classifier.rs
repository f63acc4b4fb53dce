use crate::domain::entities::KeywordTeamPair;

/// Team used when no rule matches and the flow has no fallback.
pub const DEFAULT_TEAM: &str = "general";

/// Maps a customer message to a team name.
///
/// Rules are checked in stored order and the first rule with a term that
/// occurs anywhere in the lower-cased message wins. Matching is by substring,
/// so "invoice" also matches "invoicing". Rules without a team or without any
/// non-empty term never match. Falls back to `fallback` when it is non-blank,
/// otherwise to [`DEFAULT_TEAM`].
pub fn select_team<'a>(
    message: &str,
    rules: &'a [KeywordTeamPair],
    fallback: Option<&'a str>,
) -> &'a str {
    let message = message.to_lowercase();

    rules
        .iter()
        .filter(|rule| rule.is_routable())
        .find(|rule| rule.terms().any(|term| message.contains(&term)))
        .map(|rule| rule.team.as_str())
        .unwrap_or_else(|| fallback_team(fallback))
}

fn fallback_team(fallback: Option<&str>) -> &str {
    match fallback {
        Some(team) if !team.trim().is_empty() => team,
        _ => DEFAULT_TEAM,
    }
}
