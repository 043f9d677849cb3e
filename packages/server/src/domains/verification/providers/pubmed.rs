//! PubMed paper lookup (Tier 2, third in sequence).
//!
//! Two-step eutils flow: esearch for an id, esummary for metadata.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::ProviderHit;

#[derive(Debug, Deserialize)]
struct EsearchResponse {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

pub async fn search(http: &reqwest::Client, query: &str) -> Result<Option<ProviderHit>> {
    let response = http
        .get("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi")
        .query(&[("db", "pubmed"), ("term", query), ("retmax", "1"), ("retmode", "json")])
        .send()
        .await
        .context("PubMed esearch request failed")?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "PubMed esearch error");
        return Ok(None);
    }

    let parsed: EsearchResponse = response.json().await.context("PubMed esearch not JSON")?;
    let Some(pmid) = parsed.esearchresult.idlist.into_iter().next() else {
        return Ok(None);
    };

    let response = http
        .get("https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi")
        .query(&[("db", "pubmed"), ("id", pmid.as_str()), ("retmode", "json")])
        .send()
        .await
        .context("PubMed esummary request failed")?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "PubMed esummary error");
        return Ok(None);
    }

    let summary: serde_json::Value =
        response.json().await.context("PubMed esummary not JSON")?;
    let record = &summary["result"][&pmid];

    let title = record["title"].as_str().unwrap_or("Unknown Title").to_string();
    let authors: Vec<String> = record["authors"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|a| a["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let author = if authors.is_empty() {
        "Unknown Author".to_string()
    } else {
        authors.join(", ")
    };
    let journal = record["fulljournalname"].as_str().unwrap_or_default().to_string();
    let pub_date = record["pubdate"].as_str().map(str::to_string);
    let doi = record["elocationid"]
        .as_str()
        .and_then(|e| e.strip_prefix("doi: "))
        .map(str::to_string);

    let url = format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/");
    let citation = if journal.is_empty() {
        format!("{author}, \"{title}\"")
    } else {
        format!(
            "{author}, \"{title}\", {journal} ({})",
            pub_date.clone().unwrap_or_default()
        )
    };

    Ok(Some(ProviderHit {
        title,
        author,
        publisher: Some(journal),
        publication_date: pub_date,
        isbn: None,
        doi,
        url,
        snippet: None,
        citation,
        source_type: "paper".to_string(),
    }))
}
