//! Semantic Scholar paper lookup (Tier 2, first in sequence).

use anyhow::{Context, Result};
use serde::Deserialize;

use super::ProviderHit;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paper {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<Author>,
    year: Option<i32>,
    r#abstract: Option<String>,
    url: Option<String>,
    venue: Option<String>,
    #[serde(default)]
    external_ids: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

pub async fn search(
    http: &reqwest::Client,
    api_key: Option<&str>,
    query: &str,
) -> Result<Option<ProviderHit>> {
    let mut request = http
        .get("https://api.semanticscholar.org/graph/v1/paper/search")
        .query(&[
            ("query", query),
            ("limit", "1"),
            ("fields", "title,authors,year,abstract,url,externalIds,venue"),
        ]);
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }

    let response = request.send().await.context("Semantic Scholar request failed")?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "Semantic Scholar API error");
        return Ok(None);
    }

    let parsed: SearchResponse = response
        .json()
        .await
        .context("Semantic Scholar response not JSON")?;

    let Some(paper) = parsed.data.into_iter().next() else {
        return Ok(None);
    };

    let title = paper.title.unwrap_or_else(|| "Unknown Title".to_string());
    let author = if paper.authors.is_empty() {
        "Unknown Author".to_string()
    } else {
        paper
            .authors
            .iter()
            .filter_map(|a| a.name.clone())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let year = paper.year.map(|y| y.to_string()).unwrap_or_default();
    let doi = paper.external_ids["DOI"].as_str().map(str::to_string);
    let url = paper.url.unwrap_or_default();

    let citation = match &paper.venue {
        Some(venue) if !venue.is_empty() => {
            format!("{author}, \"{title}\", {venue} ({year})")
        }
        _ => format!("{author}, \"{title}\" ({year})"),
    };

    Ok(Some(ProviderHit {
        title,
        author,
        publisher: paper.venue,
        publication_date: Some(year),
        isbn: None,
        doi,
        url,
        snippet: paper.r#abstract,
        citation,
        source_type: "paper".to_string(),
    }))
}
