//! Three-layer challenge detection (§4.3), tuned to minimize false
//! positives: a single unmistakable signature is enough, but weaker signals
//! need to agree with each other before they're trusted.

use scraper::{Html, Selector};

use crate::config::BrowserPoolConfig;

/// High-confidence, unambiguous signatures. Any one alone is sufficient.
const HIGH_CONFIDENCE_SIGNATURES: &[&str] = &[
    "/cdn-cgi/challenge-platform/",
    "id=\"challenge-form\"",
    "<title>Just a moment...</title>",
];

#[must_use]
pub fn detect_challenge(url: &str, html: &str, config: &BrowserPoolConfig) -> bool {
    layer_a(url, html) || layer_b(html) || layer_c(html) || matches_configured_hints(url, html, config)
}

fn layer_a(url: &str, html: &str) -> bool {
    HIGH_CONFIDENCE_SIGNATURES
        .iter()
        .any(|sig| url.contains(sig) || html.contains(sig))
}

fn layer_b(html: &str) -> bool {
    let has_challenge_text = html.contains("Checking your browser") || html.contains("cf-chl");
    let has_ray_id = html.contains("Ray ID:") || html.contains("cf-ray");
    let has_challenge_dom = html.contains("id=\"cf-challenge") || html.contains("class=\"cf-chl");

    [has_challenge_text, has_ray_id, has_challenge_dom]
        .into_iter()
        .filter(|b| *b)
        .count()
        >= 2
}

fn layer_c(html: &str) -> bool {
    html.len() < 5 * 1024
        && html.contains("Just a moment")
        && (html.contains("cloudflare") || html.contains("Cloudflare"))
        && html.contains("Ray ID")
        && body_text(html).len() < 500
}

/// Visible body text, as opposed to the raw markup — a challenge page's
/// actual message is short even though the surrounding script/markup isn't.
fn body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    #[allow(clippy::expect_used)]
    let body_sel = Selector::parse("body").expect("\"body\" is a valid selector");
    document
        .select(&body_sel)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
}

/// Matches any configured extra hint (§6's `ChallengeUrlHints`/`ChallengeDomHints`).
#[must_use]
pub fn matches_configured_hints(url: &str, html: &str, config: &BrowserPoolConfig) -> bool {
    config.challenge_url_hints().iter().any(|hint| url.contains(hint.as_str()))
        || config.challenge_dom_hints().iter().any(|hint| html.contains(hint.as_str()))
}
