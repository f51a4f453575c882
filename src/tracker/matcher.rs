use url::Url;

use crate::models::violation::WEBSITE_PREFIX;

/// Finds the blocked app matching the frontmost application name.
///
/// Case-insensitive; either name may contain the other, so "Discord" matches
/// "Discord Canary" and "steam" matches "Steam". The first blocked entry wins.
pub fn match_blocked_app<'a>(frontmost: &str, blocked_apps: &'a [String]) -> Option<&'a str> {
    let frontmost = frontmost.trim().to_lowercase();
    if frontmost.is_empty() {
        return None;
    }

    blocked_apps
        .iter()
        .find(|blocked| {
            let blocked = blocked.trim().to_lowercase();
            !blocked.is_empty() && (frontmost.contains(&blocked) || blocked.contains(&frontmost))
        })
        .map(String::as_str)
}

/// Finds the blocked domain covering `host`, by exact match or as a parent domain.
pub fn match_blocked_domain<'a>(host: &str, blocked_domains: &'a [String]) -> Option<&'a str> {
    let host = normalize_domain(host);
    if host.is_empty() {
        return None;
    }

    blocked_domains
        .iter()
        .find(|domain| {
            let domain = normalize_domain(domain);
            !domain.is_empty() && (host == domain || host.ends_with(&format!(".{domain}")))
        })
        .map(String::as_str)
}

/// Lowercased host of a URL, if it has one.
pub fn extract_host(raw_url: &str) -> Option<String> {
    let parsed = Url::parse(raw_url.trim()).ok()?;
    parsed.host_str().map(|host| host.to_lowercase())
}

pub fn website_label(domain: &str) -> String {
    format!("{WEBSITE_PREFIX}{domain}")
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_lowercase()
}
