//! A doujin-storefront-shaped provider (§1's "doujin storefront").
//!
//! The exact selectors of any real storefront are out of scope (§1); this
//! is a generic, clearly-illustrative scraper built on `scraper`
//! (the teacher's own HTML-parsing stack) that implements the §4.1 contract
//! — id grammar, multi-section fallback, source-url bookkeeping — without
//! claiming to match any specific site's markup.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::model::{Metadata, Person, PersonType, SearchHit};
use crate::network::NetworkClient;
use crate::provider::Provider;

/// Canonical ids look like `RJ123456` or `VJ123456`.
const ID_PATTERN: &str = r"^(?i)([RV]J)(\d{6,8})$";

/// Product pages live under one of these sections; detail fetch tries each
/// in order and returns the first successful parse (§4.1).
const SECTIONS: &[&str] = &["work", "announce"];

pub struct DlsiteLikeProvider {
    base_url: String,
    search_client: Arc<dyn NetworkClient>,
    detail_client: Arc<dyn NetworkClient>,
    id_regex: Regex,
}

impl DlsiteLikeProvider {
    /// Convenience constructor for callers (and tests) that don't need the
    /// search/detail role split — both operations share one client.
    #[must_use]
    pub fn new(base_url: impl Into<String>, client: Arc<dyn NetworkClient>) -> Self {
        Self::with_clients(base_url, Arc::clone(&client), client)
    }

    /// Wires distinct clients for search vs. detail traffic, so a caller
    /// backed by [`crate::network::BrowserNetworkClient`] can put each on
    /// its own browser-context role (§4.3's `SplitSearchDetail` mode).
    #[must_use]
    pub fn with_clients(
        base_url: impl Into<String>,
        search_client: Arc<dyn NetworkClient>,
        detail_client: Arc<dyn NetworkClient>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            search_client,
            detail_client,
            #[allow(clippy::expect_used)]
            id_regex: Regex::new(ID_PATTERN).expect("ID_PATTERN is a fixed, valid regex"),
        }
    }

    fn section_url(&self, id: &str, section: &str) -> String {
        format!("{}/{section}/=/product_id/{id}.html", self.base_url)
    }

    fn parse_detail(&self, html: &str, requested_url: &str) -> Result<Option<Metadata>, ProviderError> {
        let document = Html::parse_document(html);

        let missing_selector = |s: &str| {
            Selector::parse(s).map_err(|e| ProviderError::Parse(format!("bad selector {s}: {e:?}")))
        };

        let title_sel = missing_selector("h1.work_name, h1#work_name")?;
        let Some(title_el) = document.select(&title_sel).next() else {
            // No title element: treat as "not a product page" per §4.1, not an error.
            return Ok(None);
        };
        let title = title_el.text().collect::<String>().trim().to_string();

        let description_sel = missing_selector("div.work_parts_container, div#description")?;
        let description = document
            .select(&description_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty());

        let genre_sel = missing_selector("a.genre_tag, div.main_genre a")?;
        let genres: Vec<String> = document
            .select(&genre_sel)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let studio_sel = missing_selector("span.maker_name a")?;
        let studios: Vec<String> = document
            .select(&studio_sel)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let author_sel = missing_selector("span.author a")?;
        let people: Vec<Person> = document
            .select(&author_sel)
            .map(|el| Person {
                name: el.text().collect::<String>().trim().to_string(),
                kind: PersonType::Writer,
                role: None,
            })
            .filter(|p| !p.name.is_empty())
            .collect();

        let img_sel = missing_selector("img.work_thumb, picture img")?;
        let mut thumbnails: Vec<String> = Vec::new();
        for el in document.select(&img_sel) {
            if let Some(src) = el.value().attr("src").or_else(|| el.value().attr("data-src")) {
                thumbnails.push(absolutize(&self.base_url, src));
            }
        }
        let primary = thumbnails.first().cloned();

        let mut metadata = Metadata {
            id: String::new(),
            title: Some(title),
            description,
            genres,
            studios,
            people,
            primary,
            thumbnails,
            ..Default::default()
        };
        metadata.record_source_url(requested_url);
        metadata.normalize();
        Ok(Some(metadata))
    }
}

fn absolutize(base: &str, maybe_relative: &str) -> String {
    if crate::model::is_absolute_url(maybe_relative) {
        maybe_relative.to_string()
    } else {
        format!("{}{}", base.trim_end_matches('/'), maybe_relative)
    }
}

#[async_trait]
impl Provider for DlsiteLikeProvider {
    fn name(&self) -> &str {
        "dlsite"
    }

    fn try_parse_id(&self, input: &str) -> Option<String> {
        let candidate = input.rsplit('/').next().unwrap_or(input);
        let candidate = candidate.trim_end_matches(".html");
        self.id_regex
            .captures(candidate)
            .map(|c| format!("{}{}", c[1].to_uppercase(), &c[2]))
    }

    fn build_detail_url(&self, id: &str) -> String {
        self.section_url(id, SECTIONS[0])
    }

    async fn search(
        &self,
        keyword: &str,
        max_results: usize,
        ct: &CancellationToken,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        let search_url = format!("{}/fsr/=/keyword/{}", self.base_url, urlencoding_encode(keyword));
        let html = self.search_client.get_html(&search_url, ct).await?;
        let document = Html::parse_document(&html);

        let row_sel = Selector::parse("li.search_result_img_box_inner, div.search_result_item")
            .map_err(|e| ProviderError::Parse(format!("bad selector: {e:?}")))?;
        let link_sel = Selector::parse("a").map_err(|e| ProviderError::Parse(format!("bad selector: {e:?}")))?;
        let img_sel = Selector::parse("img").map_err(|e| ProviderError::Parse(format!("bad selector: {e:?}")))?;

        let mut hits = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for row in document.select(&row_sel) {
            if hits.len() >= max_results {
                break;
            }
            let Some(link) = row.select(&link_sel).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let detail_url = absolutize(&self.base_url, href);
            if !seen.insert(detail_url.clone()) {
                continue;
            }
            let title = link.value().attr("title").map(str::to_string).unwrap_or_else(|| {
                link.text().collect::<String>().trim().to_string()
            });
            let cover_url = row
                .select(&img_sel)
                .next()
                .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
                .map(|src| absolutize(&self.base_url, src));

            hits.push(SearchHit {
                detail_url,
                title,
                cover_url,
            });
        }

        Ok(hits)
    }

    async fn fetch_detail(&self, detail_url: &str, ct: &CancellationToken) -> Result<Option<Metadata>, ProviderError> {
        let id = self.try_parse_id(detail_url);

        let candidate_urls: Vec<String> = match &id {
            Some(id) => SECTIONS.iter().map(|s| self.section_url(id, s)).collect(),
            None => vec![detail_url.to_string()],
        };

        for url in candidate_urls {
            let html = self.detail_client.get_html(&url, ct).await?;
            if let Some(mut metadata) = self.parse_detail(&html, detail_url)? {
                if let Some(id) = &id {
                    metadata.id = id.clone();
                }
                return Ok(Some(metadata));
            }
        }

        Ok(None)
    }
}

fn urlencoding_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
