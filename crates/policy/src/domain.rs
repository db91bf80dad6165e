//! Canonicalization of user-entered websites.
//!
//! Users type short names ("youtube"), bare hosts ("www.bbc.co.uk") or
//! paste whole article URLs. All of them collapse to one lower-cased
//! registrable domain that is used as the allow/block list key.

use url::{Host, Url};

use crate::error::DomainError;

/// Short names that resolve directly to a domain, bypassing URL parsing.
const DOMAIN_ALIASES: &[(&str, &str)] = &[
    ("youtube", "youtube.com"),
    ("x", "x.com"),
    ("twitter", "x.com"),
    ("facebook", "facebook.com"),
    ("instagram", "instagram.com"),
    ("tiktok", "tiktok.com"),
    ("reddit", "reddit.com"),
    ("netflix", "netflix.com"),
    ("twitch", "twitch.tv"),
    ("linkedin", "linkedin.com"),
    ("amazon", "amazon.com"),
    ("pinterest", "pinterest.com"),
    ("snapchat", "snapchat.com"),
    ("wikipedia", "wikipedia.org"),
];

/// Labels this short or shorter are treated as part of a compound public
/// suffix when they end a hostname (`co.uk`, `com.au`).
const SHORT_SUFFIX_LABEL_LEN: usize = 3;

/// Normalize free-text input into a canonical base domain.
///
/// Resolution order:
/// 1. Trimmed, lower-cased input found in the alias table wins outright.
/// 2. Otherwise the input is parsed as a URL (`http://` is assumed when no
///    scheme is given) and its hostname is reduced to the registrable part.
///
/// The reduction is a heuristic, not a public suffix list lookup: when the
/// last two labels are both three characters or shorter, three labels are
/// kept. `www.bbc.co.uk` becomes `bbc.co.uk`, but `www.bbc.com` also stays
/// `www.bbc.com`.
///
/// # Errors
///
/// [`DomainError::Empty`] for blank input, [`DomainError::Invalid`] (with
/// the raw input) when no hostname can be parsed.
pub fn normalize_domain(input: &str) -> Result<String, DomainError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Empty);
    }

    let lowered = trimmed.to_lowercase();
    if let Some(domain) = lookup_alias(&lowered) {
        return Ok(domain.to_string());
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let invalid = || DomainError::Invalid {
        input: input.to_string(),
    };

    let url = Url::parse(&candidate).map_err(|err| {
        tracing::debug!(input = %trimmed, error = %err, "Rejected domain input");
        invalid()
    })?;

    let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(invalid)?;

    // Addresses have no registrable part.
    if matches!(url.host(), Some(Host::Ipv4(_) | Host::Ipv6(_))) {
        return Ok(host.to_string());
    }

    Ok(registrable_domain(host))
}

/// Look up a lower-cased alias.
fn lookup_alias(lowered: &str) -> Option<&'static str> {
    DOMAIN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, domain)| *domain)
}

/// Whether the input already starts with `scheme://`.
fn has_scheme(input: &str) -> bool {
    match input.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Reduce a hostname to its registrable domain.
fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();

    if labels.len() < 2 {
        return host;
    }

    let n = labels.len();
    let compound_suffix = n > 2
        && labels[n - 2].len() <= SHORT_SUFFIX_LABEL_LEN
        && labels[n - 1].len() <= SHORT_SUFFIX_LABEL_LEN;
    let keep = if compound_suffix { 3 } else { 2 };

    labels[n - keep..].join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_lookup() {
        assert_eq!(normalize_domain("youtube").unwrap(), "youtube.com");
        assert_eq!(normalize_domain("  YouTube ").unwrap(), "youtube.com");
        assert_eq!(normalize_domain("x").unwrap(), "x.com");
        assert_eq!(normalize_domain("Twitter").unwrap(), "x.com");
    }

    #[test]
    fn test_bare_hosts() {
        assert_eq!(normalize_domain("YouTube.com").unwrap(), "youtube.com");
        assert_eq!(normalize_domain("www.bbc.co.uk").unwrap(), "bbc.co.uk");
        assert_eq!(normalize_domain("bbc.co.uk").unwrap(), "bbc.co.uk");
        assert_eq!(normalize_domain("news.ycombinator.com").unwrap(), "ycombinator.com");
    }

    #[test]
    fn test_pasted_urls() {
        assert_eq!(
            normalize_domain("https://www.bbc.co.uk/news/world-123?ref=home#top").unwrap(),
            "bbc.co.uk"
        );
        assert_eq!(
            normalize_domain("https://mail.google.com:443/mail/u/0/").unwrap(),
            "google.com"
        );
        assert_eq!(
            normalize_domain("youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "youtube.com"
        );
    }

    #[test]
    fn test_single_label_host() {
        assert_eq!(normalize_domain("localhost").unwrap(), "localhost");
        assert_eq!(normalize_domain("http://Intranet:8080/").unwrap(), "intranet");
    }

    #[test]
    fn test_ip_hosts_are_kept_whole() {
        assert_eq!(normalize_domain("192.168.1.1").unwrap(), "192.168.1.1");
        assert_eq!(
            normalize_domain("http://10.0.0.7:3000/admin").unwrap(),
            "10.0.0.7"
        );
        assert_eq!(normalize_domain("http://[::1]:8080/").unwrap(), "[::1]");

        for input in ["192.168.1.1", "[::1]"] {
            let once = normalize_domain(input).unwrap();
            assert_eq!(normalize_domain(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_trailing_root_dot() {
        assert_eq!(normalize_domain("example.com.").unwrap(), "example.com");
    }

    #[test]
    fn test_short_label_heuristic_is_preserved() {
        // Both trailing labels are short, so three labels are kept.
        assert_eq!(normalize_domain("www.bbc.com").unwrap(), "www.bbc.com");
        assert_eq!(normalize_domain("shop.example.com.au").unwrap(), "example.com.au");
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(
            normalize_domain("not a url"),
            Err(DomainError::Invalid {
                input: "not a url".to_string()
            })
        );
        assert!(matches!(
            normalize_domain("http://"),
            Err(DomainError::Invalid { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_domain(""), Err(DomainError::Empty));
        assert_eq!(normalize_domain("   "), Err(DomainError::Empty));
    }

    #[test]
    fn test_output_is_a_fixed_point() {
        let inputs = [
            "youtube",
            "x",
            "YouTube.com",
            "www.bbc.co.uk",
            "https://mail.google.com/mail",
            "www.bbc.com",
            "localhost",
            "a.b.c.d.example.org",
            "shop.example.com.au",
        ];

        for input in inputs {
            let once = normalize_domain(input).unwrap();
            let twice = normalize_domain(&once).unwrap();
            assert_eq!(once, twice, "not stable for {input}");
        }
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://example.com"));
        assert!(has_scheme("ftp://example.com"));
        assert!(!has_scheme("example.com"));
        assert!(!has_scheme("://example.com"));
        assert!(!has_scheme("example.com/redirect?to=http://other.com"));
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::Invalid {
            input: "not a url".to_string(),
        };
        assert_eq!(err.to_string(), "\"not a url\" is not a valid website or URL");
    }
}
