//! Verification request/outcome types shared by the tier walk and the
//! agents that consume it.

use serde::{Deserialize, Serialize};

/// What kind of source the Source Checker is looking for. Picks the first
/// tier to try; failures fall through to the remaining tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDomain {
    Book,
    Paper,
    AncientText,
    Web,
}

impl SourceDomain {
    pub fn parse(s: &str) -> Self {
        let lowered = s.to_ascii_lowercase();
        if lowered.contains("book") || lowered.contains("historical") {
            Self::Book
        } else if lowered.contains("paper") || lowered.contains("scholarly") || lowered.contains("peer") {
            Self::Paper
        } else if lowered.contains("ancient") || lowered.contains("patristic") || lowered.contains("classical") {
            Self::AncientText
        } else {
            Self::Web
        }
    }
}

/// How a source was verified. Stored lowercase on the source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    LibraryReuse,
    GoogleBooks,
    SemanticScholar,
    Arxiv,
    Pubmed,
    Ccel,
    Perseus,
    Tavily,
    LlmUnverified,
}

impl VerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LibraryReuse => "library_reuse",
            Self::GoogleBooks => "google_books",
            Self::SemanticScholar => "semantic_scholar",
            Self::Arxiv => "arxiv",
            Self::Pubmed => "pubmed",
            Self::Ccel => "ccel",
            Self::Perseus => "perseus",
            Self::Tavily => "tavily",
            Self::LlmUnverified => "llm_unverified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    PartiallyVerified,
    Unverified,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::PartiallyVerified => "partially_verified",
            Self::Unverified => "unverified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    ExactQuote,
    VerifiedParaphrase,
    UnverifiedContent,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactQuote => "exact_quote",
            Self::VerifiedParaphrase => "verified_paraphrase",
            Self::UnverifiedContent => "unverified_content",
        }
    }
}

/// One desired source, as identified by the Source Checker.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    /// The claim being sourced (context for relevance checks).
    pub claim_text: String,
    /// Title/author/keywords to search by.
    pub search_query: String,
    pub domain: SourceDomain,
}

/// Catalog metadata attached to a verified record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMetadata {
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub isbn: Option<String>,
    pub doi: Option<String>,
    /// book | paper | ancient_text | web
    pub source_type: String,
}

/// Result of one tier walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// False only for the Tier-5 fallback.
    pub verified: bool,
    pub tier: u8,
    pub method: VerificationMethod,
    pub status: VerificationStatus,
    pub citation: String,
    /// Empty when no URL could be verified. Never synthesized.
    pub url: String,
    /// Claim-specific quote, when a tier produced one.
    pub quote_text: Option<String>,
    /// Content the tier returned (abstract, snippet, page text). The
    /// Adversarial Checker compares claimed quotes against this.
    pub content_snippet: Option<String>,
    pub content_type: ContentType,
    pub url_verified: bool,
    pub metadata: SourceMetadata,
}

impl VerificationOutcome {
    /// The Tier-5 outcome: generated from model memory, never carries a URL.
    pub fn llm_fallback(search_query: &str) -> Self {
        Self {
            verified: false,
            tier: 5,
            method: VerificationMethod::LlmUnverified,
            status: VerificationStatus::Unverified,
            citation: format!("Source for: {search_query}"),
            url: String::new(),
            quote_text: None,
            content_snippet: None,
            content_type: ContentType::UnverifiedContent,
            url_verified: false,
            metadata: SourceMetadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_domain_parses_descriptions() {
        assert_eq!(SourceDomain::parse("primary historical"), SourceDomain::Book);
        assert_eq!(SourceDomain::parse("scholarly peer-reviewed"), SourceDomain::Paper);
        assert_eq!(SourceDomain::parse("ancient text"), SourceDomain::AncientText);
        assert_eq!(SourceDomain::parse("news article"), SourceDomain::Web);
    }

    #[test]
    fn llm_fallback_never_carries_a_url() {
        let outcome = VerificationOutcome::llm_fallback("Tacitus Annals 15.44");
        assert!(!outcome.verified);
        assert_eq!(outcome.tier, 5);
        assert!(outcome.url.is_empty());
        assert!(!outcome.url_verified);
        assert_eq!(outcome.status, VerificationStatus::Unverified);
    }
}
