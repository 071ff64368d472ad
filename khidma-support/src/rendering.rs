//! Text rendering utilities for diagnostics.
//!
//! Provides helpers to shorten type names, suggest registered contracts
//! for a missing one, and render the container's registration table.

/// Shortens a fully qualified type name for display.
///
/// ```
/// use khidma_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::clock::SystemClock");
/// assert_eq!(short, "SystemClock");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Clock>");
/// assert_eq!(short, "Arc<dyn Clock>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                current_segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => current_segment.push(ch),
        }
    }

    result.push_str(&current_segment);
    result
}

/// Suggests registered names close to `requested`.
///
/// Substring matches on the full path rank first, then matches on the
/// shortened name, then names sharing a common prefix of 3+ characters.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|&&name| name != requested)
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = shorten_type_name(name).to_lowercase();

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short) || requested_short.contains(&name_short) {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            (common >= 3).then_some((name, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// One line of the registration table.
#[derive(Debug, Clone)]
pub struct RegistrationRow {
    /// Lifetime label, e.g. "Singleton"
    pub lifetime: String,
    /// The contract callers depend on
    pub contract: String,
    /// The type that implements it
    pub implementation: String,
    /// Created at startup instead of on first resolve
    pub eager: bool,
}

/// Renders registrations as an aligned table.
///
/// ```text
/// [Singleton] Clock          <- SystemClock  (eager)
/// [Scoped]    SessionStore   <- MemorySessionStore
/// [Transient] RequestId      <- RequestId
/// ```
pub fn render_registrations(rows: &[RegistrationRow]) -> String {
    let lifetime_width = rows.iter().map(|r| r.lifetime.len()).max().unwrap_or(0);
    let contract_width = rows.iter().map(|r| r.contract.len()).max().unwrap_or(0);

    let mut result = String::new();
    for row in rows {
        let label = format!("[{}]", row.lifetime);
        result.push_str(&format!(
            "{:<lw$} {:<cw$} <- {}",
            label,
            row.contract,
            row.implementation,
            lw = lifetime_width + 2,
            cw = contract_width,
        ));
        if row.eager {
            result.push_str("  (eager)");
        }
        result.push('\n');
    }
    result
}
