//! Google Books catalog lookup (Tier 1).

use anyhow::{Context, Result};
use serde::Deserialize;

use super::ProviderHit;

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    preview_link: Option<String>,
    info_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

/// Search the book catalog by title+author keywords. `None` when the
/// catalog has no match.
pub async fn search(
    http: &reqwest::Client,
    api_key: &str,
    query: &str,
) -> Result<Option<ProviderHit>> {
    let response = http
        .get("https://www.googleapis.com/books/v1/volumes")
        .query(&[("q", query), ("maxResults", "1"), ("key", api_key)])
        .send()
        .await
        .context("Google Books request failed")?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "Google Books API error");
        return Ok(None);
    }

    let volumes: VolumesResponse = response
        .json()
        .await
        .context("Google Books response not JSON")?;

    let Some(volume) = volumes.items.into_iter().next() else {
        return Ok(None);
    };
    let info = volume.volume_info;

    let title = info.title.unwrap_or_else(|| "Unknown Title".to_string());
    let author = if info.authors.is_empty() {
        "Unknown Author".to_string()
    } else {
        info.authors.join(", ")
    };
    let isbn = info
        .industry_identifiers
        .iter()
        .find(|id| id.kind == "ISBN_13" || id.kind == "ISBN_10")
        .map(|id| id.identifier.clone());
    let url = info.preview_link.or(info.info_link).unwrap_or_default();

    let citation = match (&info.publisher, &info.published_date) {
        (Some(publisher), Some(date)) => format!("{author}, {title} ({publisher}, {date})"),
        _ => format!("{author}, {title}"),
    };

    Ok(Some(ProviderHit {
        title,
        author,
        publisher: info.publisher,
        publication_date: info.published_date,
        isbn,
        doi: None,
        url,
        snippet: info.description,
        citation,
        source_type: "book".to_string(),
    }))
}
