//! Christian Classics Ethereal Library lookup (Tier 3, patristic corpus).

use anyhow::{Context, Result};

use super::ProviderHit;

pub async fn search(http: &reqwest::Client, query: &str) -> Result<Option<ProviderHit>> {
    let response = http
        .get("https://www.ccel.org/search")
        .query(&[("qu", query)])
        .send()
        .await
        .context("CCEL request failed")?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "CCEL search error");
        return Ok(None);
    }

    let body = response.text().await.context("CCEL response unreadable")?;
    if body.is_empty() || body.contains("No results found") {
        return Ok(None);
    }

    let Some(path) = first_ccel_link(&body) else {
        return Ok(None);
    };
    let url = format!("https://www.ccel.org{path}");

    Ok(Some(ProviderHit {
        title: query.to_string(),
        author: String::new(),
        publisher: Some("Christian Classics Ethereal Library".to_string()),
        publication_date: None,
        isbn: None,
        doi: None,
        url,
        snippet: None,
        citation: format!("CCEL: {query}"),
        source_type: "ancient_text".to_string(),
    }))
}

/// First `/ccel/...` href in the result markup.
fn first_ccel_link(body: &str) -> Option<&str> {
    let marker = "href=\"/ccel/";
    let start = body.find(marker)? + "href=\"".len();
    let rest = &body[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_result_link() {
        let body = r#"<a href="/about">x</a> <a href="/ccel/athanasius/incarnation">y</a>"#;
        assert_eq!(first_ccel_link(body), Some("/ccel/athanasius/incarnation"));
    }

    #[test]
    fn no_result_links_yield_none() {
        assert_eq!(first_ccel_link("<a href=\"/about\">x</a>"), None);
    }
}
