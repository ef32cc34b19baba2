//! Hostname comparison for cosignatures.
//!
//! Witnesses name the directory they cosign for in whatever shape their
//! configuration holds: bare host, URL, with or without port. Both sides
//! are reduced to a lower-case host before comparing.

use pkd_types::actor_domain;

/// Reduce a hostname or URL to its bare, lower-case host.
pub fn normalize_hostname(raw: &str) -> String {
    let host = actor_domain(raw.trim());
    // bracketed IPv6 keeps its colons
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((inner, _)) => format!("[{inner}]"),
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name.to_string(),
        _ => host,
    }
}

/// True when both name the same host.
pub fn hostnames_match(configured: &str, cosigned: &str) -> bool {
    let configured = normalize_hostname(configured);
    !configured.is_empty() && configured == normalize_hostname(cosigned)
}
