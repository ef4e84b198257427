//! Browser identity attached to every outgoing request.

use rand::Rng;

use crate::http::HttpRequest;

/// Desktop user agents across Chrome, Firefox, Edge and Safari on
/// Windows, macOS and Linux.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Headers a browser navigation would send. `Accept-Encoding` is left to
/// the transport so it can negotiate and decode compression itself.
const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7"),
    ("connection", "keep-alive"),
    ("dnt", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
];

/// Pick a user agent uniformly at random.
pub fn random_user_agent() -> &'static str {
    let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
    USER_AGENTS[idx]
}

/// Stamp a fresh identity onto the request.
///
/// The user agent is always replaced. The browser header set only fills
/// headers the adapter did not set, so an adapter asking for JSON keeps
/// its `Accept`.
pub fn apply(request: &mut HttpRequest) {
    request
        .headers
        .insert("user-agent".to_string(), random_user_agent().to_string());
    for (name, value) in BROWSER_HEADERS {
        request
            .headers
            .entry((*name).to_string())
            .or_insert_with(|| (*value).to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_is_large_enough() {
        assert!(USER_AGENTS.len() >= 10);
        assert!(USER_AGENTS.iter().any(|ua| ua.contains("Firefox")));
        assert!(USER_AGENTS.iter().any(|ua| ua.contains("Edg/")));
        assert!(USER_AGENTS.iter().any(|ua| ua.contains("Macintosh")));
        assert!(USER_AGENTS.iter().any(|ua| ua.contains("Linux")));
    }

    #[test]
    fn user_agents_vary() {
        let picks: Vec<_> = (0..50).map(|_| random_user_agent()).collect();
        let first = picks[0];
        assert!(
            !picks.iter().all(|ua| *ua == first),
            "Expected variation in user agents"
        );
    }

    #[test]
    fn apply_sets_identity_headers() {
        let mut req = HttpRequest::get("https://example.com");
        apply(&mut req);
        assert!(USER_AGENTS.contains(&req.header("user-agent").unwrap()));
        assert!(req.header("accept").unwrap().starts_with("text/html"));
        assert_eq!(req.header("connection"), Some("keep-alive"));
        assert!(req.header("accept-language").is_some());
    }

    #[test]
    fn apply_keeps_adapter_accept_but_replaces_user_agent() {
        let mut req = HttpRequest::get("https://example.com")
            .with_header("Accept", "application/json")
            .with_header("User-Agent", "custom/1.0");
        apply(&mut req);
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_ne!(req.header("user-agent"), Some("custom/1.0"));
    }
}
