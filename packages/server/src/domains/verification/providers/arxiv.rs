//! arXiv paper lookup (Tier 2, second in sequence).
//!
//! The export API speaks Atom; only the first entry's title, authors, and
//! id link are needed, so the feed is sliced by tag rather than pulling in
//! a full XML parser.

use anyhow::{Context, Result};

use super::ProviderHit;

pub async fn search(http: &reqwest::Client, query: &str) -> Result<Option<ProviderHit>> {
    let response = http
        .get("http://export.arxiv.org/api/query")
        .query(&[
            ("search_query", format!("all:{query}").as_str()),
            ("start", "0"),
            ("max_results", "1"),
        ])
        .send()
        .await
        .context("arXiv request failed")?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "arXiv API error");
        return Ok(None);
    }

    let body = response.text().await.context("arXiv response unreadable")?;

    let Some(entry) = slice_between(&body, "<entry>", "</entry>") else {
        return Ok(None);
    };

    let title = slice_between(entry, "<title>", "</title>")
        .map(normalize_ws)
        .unwrap_or_else(|| "Unknown Title".to_string());
    let url = slice_between(entry, "<id>", "</id>")
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    let published = slice_between(entry, "<published>", "</published>")
        .map(|p| p.chars().take(4).collect::<String>());

    let authors: Vec<String> = entry
        .split("<name>")
        .skip(1)
        .filter_map(|chunk| chunk.split("</name>").next())
        .map(normalize_ws)
        .collect();
    let author = if authors.is_empty() {
        "Unknown Author".to_string()
    } else {
        authors.join(", ")
    };

    let summary = slice_between(entry, "<summary>", "</summary>").map(normalize_ws);

    let year = published.clone().unwrap_or_default();
    let citation = format!("{author}, \"{title}\", arXiv ({year})");

    Ok(Some(ProviderHit {
        title,
        author,
        publisher: Some("arXiv".to_string()),
        publication_date: published,
        isbn: None,
        doi: None,
        url,
        snippet: summary,
        citation,
        source_type: "paper".to_string(),
    }))
}

fn slice_between<'a>(haystack: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = haystack.find(open)? + open.len();
    let end = haystack[start..].find(close)? + start;
    Some(&haystack[start..end])
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_first_tag_pair() {
        let feed = "<feed><entry><title>A\n  B</title></entry></feed>";
        let entry = slice_between(feed, "<entry>", "</entry>").unwrap();
        let title = slice_between(entry, "<title>", "</title>").map(normalize_ws);
        assert_eq!(title.as_deref(), Some("A B"));
    }

    #[test]
    fn missing_tags_yield_none() {
        assert!(slice_between("<feed></feed>", "<entry>", "</entry>").is_none());
    }
}
