//! Perseus Digital Library lookup (Tier 3, classical corpus).
//!
//! Perseus has no clean JSON search API; a hopper search that returns a
//! substantive page counts as a partial verification pointing at the
//! search URL itself.

use anyhow::{Context, Result};

use super::ProviderHit;

pub async fn search(http: &reqwest::Client, query: &str) -> Result<Option<ProviderHit>> {
    let response = http
        .get("https://www.perseus.tufts.edu/hopper/searchresults")
        .query(&[("q", query), ("target", "text")])
        .send()
        .await
        .context("Perseus request failed")?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "Perseus search error");
        return Ok(None);
    }

    let url = response.url().to_string();
    let body = response.text().await.context("Perseus response unreadable")?;

    // Thin result pages are misses.
    if body.len() < 1000 || body.contains("no results") {
        return Ok(None);
    }

    Ok(Some(ProviderHit {
        title: query.to_string(),
        author: String::new(),
        publisher: Some("Perseus Digital Library".to_string()),
        publication_date: None,
        isbn: None,
        doi: None,
        url,
        snippet: None,
        citation: format!("Perseus Digital Library: {query}"),
        source_type: "ancient_text".to_string(),
    }))
}
