/// Domain extraction, URL qualification and group naming helpers
use url::Url;

use crate::constants::GROUP_COLORS;
use crate::tab_data::GroupColor;

/// Display-name overrides for well-known domains
const DOMAIN_NAMES: &[(&str, &str)] = &[
    ("github.com", "GitHub"),
    ("stackoverflow.com", "Stack Overflow"),
    ("youtube.com", "YouTube"),
    ("twitter.com", "Twitter/X"),
    ("x.com", "Twitter/X"),
    ("reddit.com", "Reddit"),
    ("docs.google.com", "Google Docs"),
    ("mail.google.com", "Gmail"),
    ("calendar.google.com", "Google Calendar"),
    ("drive.google.com", "Google Drive"),
    ("notion.so", "Notion"),
    ("linear.app", "Linear"),
    ("slack.com", "Slack"),
    ("discord.com", "Discord"),
    ("figma.com", "Figma"),
    ("vercel.com", "Vercel"),
    ("netlify.com", "Netlify"),
    ("npmjs.com", "npm"),
    ("medium.com", "Medium"),
    ("dev.to", "DEV"),
    ("localhost", "Localhost"),
];

/// Extract the domain from a URL: the hostname with a leading "www." removed
///
/// Examples:
/// - https://www.google.com/search → google.com
/// - https://mail.google.com → mail.google.com
/// - http://localhost:3000 → localhost
pub fn extract_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Only http(s) pages are organized, suspended or deduplicated
pub fn is_qualifying_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Drop the fragment so `page#a` and `page#b` compare equal
pub fn normalize_url(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

/// Human-readable label for a domain used as the fallback group name
///
/// Uses the override table first, then the second-to-last label,
/// capitalized (e.g. "api.zinfandel.io" → "Zinfandel").
pub fn domain_display_name(domain: &str) -> String {
    if let Some((_, name)) = DOMAIN_NAMES.iter().find(|(d, _)| *d == domain) {
        return (*name).to_string();
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return domain.to_string();
    }

    let label = parts[parts.len() - 2];
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => domain.to_string(),
    }
}

/// Deterministic palette colour for a group name
///
/// Same 31-multiplier rolling hash over UTF-16 units the extension has
/// always used, so a group keeps its colour across runs.
pub fn color_for_name(name: &str) -> GroupColor {
    let hash = name
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            (hash << 5).wrapping_sub(hash).wrapping_add(unit as i32)
        });
    let index = hash.unsigned_abs() as usize % GROUP_COLORS.len();
    GROUP_COLORS[index]
}

/// True when the domain contains any excluded-site entry
pub fn is_excluded(domain: &str, excluded_sites: &[String]) -> bool {
    excluded_sites
        .iter()
        .any(|site| domain.contains(site.as_str()))
}
