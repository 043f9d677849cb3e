//! Six-tier source verification walk.
//!
//! Given a desired source, try each tier in order until one produces a
//! usable record: verified library → book catalog → paper catalogs →
//! ancient-text corpora → generic web search → LLM fallback. A tier that
//! errors is logged and skipped; only the Tier-5 fallback is guaranteed.
//!
//! Hard rule: no tier synthesizes URLs. If nothing reachable was found,
//! the url field stays empty.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use llm_client::{CallConfig, Provider};

use crate::domains::claims::models::{NewVerifiedSource, VerifiedSource};
use crate::kernel::{BaseEmbeddingService, BaseLlm, BaseSearchService, BaseSourceVerifier};

use super::providers::{self, ProviderHit};
use super::types::{
    ContentType, SourceDomain, SourceMetadata, VerificationMethod, VerificationOutcome,
    VerificationRequest, VerificationStatus,
};

/// Library semantic-search threshold (Tier 0).
const LIBRARY_SIMILARITY_THRESHOLD: f64 = 0.85;
/// Library candidates fetched per request.
const LIBRARY_CANDIDATE_LIMIT: i64 = 3;
/// URL reachability check timeout.
const URL_CHECK_TIMEOUT_SECS: u64 = 5;

/// Production verifier. Each external provider is optional; a missing
/// API key skips that tier.
pub struct SourceVerificationService {
    pool: PgPool,
    llm: Arc<dyn BaseLlm>,
    embeddings: Arc<dyn BaseEmbeddingService>,
    web_search: Arc<dyn BaseSearchService>,
    http: reqwest::Client,
    google_books_api_key: Option<String>,
    semantic_scholar_api_key: Option<String>,
}

impl SourceVerificationService {
    pub fn new(
        pool: PgPool,
        llm: Arc<dyn BaseLlm>,
        embeddings: Arc<dyn BaseEmbeddingService>,
        web_search: Arc<dyn BaseSearchService>,
        google_books_api_key: Option<String>,
        semantic_scholar_api_key: Option<String>,
    ) -> Self {
        Self {
            pool,
            llm,
            embeddings,
            web_search,
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("reqwest client builds"),
            google_books_api_key,
            semantic_scholar_api_key,
        }
    }

    /// Lightweight config for relevance checks and quote generation.
    fn helper_config(&self) -> CallConfig {
        CallConfig::new(Provider::OpenAi, "gpt-4o-mini")
            .temperature(0.0)
            .max_tokens(400)
            .timeout_secs(20)
    }

    // =========================================================================
    // Tier 0 - verified source library
    // =========================================================================

    async fn check_library(&self, request: &VerificationRequest) -> Result<Option<VerificationOutcome>> {
        let query_text = format!("{} {}", request.claim_text, request.search_query);
        let embedding = self.embeddings.generate(&query_text).await?;

        let candidates = VerifiedSource::search_by_similarity(
            &embedding,
            LIBRARY_SIMILARITY_THRESHOLD,
            LIBRARY_CANDIDATE_LIMIT,
            &self.pool,
        )
        .await?;

        for (source, similarity) in candidates {
            if !self.is_relevant(request, &source).await? {
                continue;
            }

            debug!(
                source_id = %source.id,
                similarity,
                "library hit accepted for claim"
            );

            // Metadata is reused; the quote must be fresh for this claim.
            let quote = self.fresh_quote(request, &source).await.ok();

            // Metadata and URL come from the library, but the quote is
            // regenerated rather than fetched, so the record is only
            // partially verified.
            return Ok(Some(VerificationOutcome {
                verified: true,
                tier: 0,
                method: VerificationMethod::LibraryReuse,
                status: VerificationStatus::PartiallyVerified,
                citation: format!("{}, {}", source.author, source.title),
                url: source.url.clone(),
                quote_text: quote,
                content_snippet: source.content_snippet.clone(),
                content_type: ContentType::VerifiedParaphrase,
                url_verified: true,
                metadata: SourceMetadata {
                    title: source.title,
                    author: source.author,
                    publisher: source.publisher,
                    publication_date: source.publication_date,
                    isbn: source.isbn,
                    doi: source.doi,
                    source_type: source.source_type,
                },
            }));
        }

        Ok(None)
    }

    /// YES/NO relevance judgment: does this library source address this
    /// specific claim?
    async fn is_relevant(&self, request: &VerificationRequest, source: &VerifiedSource) -> Result<bool> {
        let snippet = source
            .content_snippet
            .as_deref()
            .map(|s| s.chars().take(500).collect::<String>())
            .unwrap_or_else(|| "N/A".to_string());

        let prompt = format!(
            "You are evaluating whether a source from our verified library is relevant to a specific claim.\n\n\
             Claim: {}\n\n\
             Library Source:\n- Author: {}\n- Title: {}\n- Sample Content: {}\n\n\
             Question: Does this source directly address or provide evidence for evaluating this specific claim?\n\n\
             Respond with ONLY \"YES\" or \"NO\".",
            request.claim_text, source.author, source.title, snippet
        );

        let completion = self.llm.complete(&self.helper_config(), &prompt).await?;
        Ok(completion.content.trim().to_ascii_uppercase().contains("YES"))
    }

    /// A claim-specific paraphrase of what the source says. Prior quotes
    /// are never reused across claims.
    async fn fresh_quote(&self, request: &VerificationRequest, source: &VerifiedSource) -> Result<String> {
        let prompt = format!(
            "In one or two sentences, state what {} argues in \"{}\" that bears on this claim:\n\n{}\n\n\
             Paraphrase faithfully; do not invent page numbers or verbatim wording.",
            source.author, source.title, request.claim_text
        );
        let completion = self.llm.complete(&self.helper_config(), &prompt).await?;
        Ok(completion.content.trim().to_string())
    }

    // =========================================================================
    // Tiers 1-3 - external catalogs
    // =========================================================================

    async fn check_books(&self, request: &VerificationRequest) -> Result<Option<VerificationOutcome>> {
        let Some(api_key) = &self.google_books_api_key else {
            return Ok(None);
        };
        let Some(hit) = providers::google_books::search(&self.http, api_key, &request.search_query).await?
        else {
            return Ok(None);
        };

        // Exact quotes only when the catalog returned text; quote-less
        // hits are downgraded in the shaping step.
        let outcome = self
            .outcome_from_hit(
                hit,
                1,
                VerificationMethod::GoogleBooks,
                VerificationStatus::Verified,
                ContentType::ExactQuote,
            )
            .await;
        self.add_to_library(&outcome).await;
        Ok(Some(outcome))
    }

    async fn check_papers(&self, request: &VerificationRequest) -> Result<Option<VerificationOutcome>> {
        // Fixed provider sequence; first usable result wins.
        let hit = match providers::semantic_scholar::search(
            &self.http,
            self.semantic_scholar_api_key.as_deref(),
            &request.search_query,
        )
        .await
        {
            Ok(Some(hit)) => Some((hit, VerificationMethod::SemanticScholar)),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Semantic Scholar tier failed");
                None
            }
        };

        let hit = match hit {
            Some(found) => Some(found),
            None => match providers::arxiv::search(&self.http, &request.search_query).await {
                Ok(Some(hit)) => Some((hit, VerificationMethod::Arxiv)),
                Ok(None) => None,
                Err(e) => {
                    warn!(error = %e, "arXiv tier failed");
                    None
                }
            },
        };

        let hit = match hit {
            Some(found) => Some(found),
            None => match providers::pubmed::search(&self.http, &request.search_query).await {
                Ok(Some(hit)) => Some((hit, VerificationMethod::Pubmed)),
                Ok(None) => None,
                Err(e) => {
                    warn!(error = %e, "PubMed tier failed");
                    None
                }
            },
        };

        let Some((hit, method)) = hit else {
            return Ok(None);
        };

        // Abstract text is verbatim catalog content; hits without one are
        // downgraded in the shaping step.
        let outcome = self
            .outcome_from_hit(
                hit,
                2,
                method,
                VerificationStatus::Verified,
                ContentType::ExactQuote,
            )
            .await;
        self.add_to_library(&outcome).await;
        Ok(Some(outcome))
    }

    async fn check_ancient_texts(
        &self,
        request: &VerificationRequest,
    ) -> Result<Option<VerificationOutcome>> {
        match providers::perseus::search(&self.http, &request.search_query).await {
            Ok(Some(hit)) => {
                let outcome = self
                    .outcome_from_hit(
                        hit,
                        3,
                        VerificationMethod::Perseus,
                        VerificationStatus::PartiallyVerified,
                        ContentType::VerifiedParaphrase,
                    )
                    .await;
                self.add_to_library(&outcome).await;
                return Ok(Some(outcome));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Perseus tier failed"),
        }

        match providers::ccel::search(&self.http, &request.search_query).await {
            Ok(Some(hit)) => {
                let outcome = self
                    .outcome_from_hit(
                        hit,
                        3,
                        VerificationMethod::Ccel,
                        VerificationStatus::Verified,
                        ContentType::ExactQuote,
                    )
                    .await;
                self.add_to_library(&outcome).await;
                Ok(Some(outcome))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(error = %e, "CCEL tier failed");
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Tier 4 - generic web search
    // =========================================================================

    async fn check_web(&self, request: &VerificationRequest) -> Result<Option<VerificationOutcome>> {
        let results = self.web_search.search(&request.search_query, 1).await?;
        let Some(result) = results.into_iter().next() else {
            return Ok(None);
        };

        // Accept only reachable URLs whose page metadata matches the query.
        if !metadata_matches(&request.search_query, &result.title, &result.content) {
            debug!(url = %result.url, "web result rejected: metadata mismatch");
            return Ok(None);
        }
        if !self.verify_url(&result.url).await {
            debug!(url = %result.url, "web result rejected: unreachable");
            return Ok(None);
        }

        let snippet: String = result.content.chars().take(500).collect();
        Ok(Some(VerificationOutcome {
            verified: true,
            tier: 4,
            method: VerificationMethod::Tavily,
            status: VerificationStatus::PartiallyVerified,
            citation: format!("{} ({})", result.title, result.url),
            url: result.url,
            quote_text: (!snippet.is_empty()).then(|| snippet.clone()),
            content_snippet: Some(result.content),
            content_type: ContentType::VerifiedParaphrase,
            url_verified: true,
            metadata: SourceMetadata {
                title: result.title,
                author: String::new(),
                source_type: "web".to_string(),
                ..Default::default()
            },
        }))
    }

    // =========================================================================
    // Shaping and library upkeep
    // =========================================================================

    async fn outcome_from_hit(
        &self,
        hit: ProviderHit,
        tier: u8,
        method: VerificationMethod,
        status: VerificationStatus,
        content_type: ContentType,
    ) -> VerificationOutcome {
        let url_verified = if hit.url.is_empty() {
            false
        } else {
            self.verify_url(&hit.url).await
        };

        shape_outcome(hit, tier, method, status, content_type, url_verified)
    }

    /// Persist a tier 1-3 success into the library for future reuse.
    async fn add_to_library(&self, outcome: &VerificationOutcome) {
        if !outcome.verified || outcome.tier >= 4 || outcome.url.is_empty() {
            return;
        }

        let keywords = format!("{} {}", outcome.metadata.title, outcome.metadata.author);
        let embedding = match self.embeddings.generate(&keywords).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "skipping library insert: embedding failed");
                return;
            }
        };

        let new = NewVerifiedSource {
            source_type: outcome.metadata.source_type.clone(),
            title: outcome.metadata.title.clone(),
            author: outcome.metadata.author.clone(),
            publisher: outcome.metadata.publisher.clone(),
            publication_date: outcome.metadata.publication_date.clone(),
            isbn: outcome.metadata.isbn.clone(),
            doi: outcome.metadata.doi.clone(),
            url: outcome.url.clone(),
            content_snippet: outcome.content_snippet.clone(),
            verification_method: outcome.method.as_str().to_string(),
            verification_status: outcome.status.as_str().to_string(),
        };

        if let Err(e) = VerifiedSource::upsert(&new, &embedding, &self.pool).await {
            warn!(error = %e, title = %new.title, "failed to add source to library");
        }
    }
}

#[async_trait]
impl BaseSourceVerifier for SourceVerificationService {
    async fn verify(&self, request: &VerificationRequest) -> Result<VerificationOutcome> {
        // Tier 0 always runs first.
        match self.check_library(request).await {
            Ok(Some(outcome)) => return Ok(outcome),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "library tier failed"),
        }

        // Domain-matching tier next.
        let domain_result = match request.domain {
            SourceDomain::Book => self.check_books(request).await,
            SourceDomain::Paper => self.check_papers(request).await,
            SourceDomain::AncientText => self.check_ancient_texts(request).await,
            SourceDomain::Web => Ok(None),
        };
        match domain_result {
            Ok(Some(outcome)) => {
                info!(tier = outcome.tier, method = outcome.method.as_str(), "source verified");
                return Ok(outcome);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "catalog tier failed"),
        }

        // Generic web search.
        match self.check_web(request).await {
            Ok(Some(outcome)) => return Ok(outcome),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "web tier failed"),
        }

        // All tiers exhausted: unverified, not an error.
        debug!(query = %request.search_query, "all verification tiers exhausted");
        Ok(VerificationOutcome::llm_fallback(&request.search_query))
    }

    async fn verify_url(&self, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }
        match self
            .http
            .head(url)
            .timeout(std::time::Duration::from_secs(URL_CHECK_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Shape a catalog hit into a verification record.
///
/// Enforces the quote/status pairing: a fully verified record must carry
/// an exact quote, so a hit without returned text is downgraded to a
/// partially verified paraphrase. Unreachable URLs are dropped, never
/// passed along.
fn shape_outcome(
    hit: ProviderHit,
    tier: u8,
    method: VerificationMethod,
    status: VerificationStatus,
    content_type: ContentType,
    url_verified: bool,
) -> VerificationOutcome {
    let url = if url_verified { hit.url.clone() } else { String::new() };

    let (status, content_type) = match &hit.snippet {
        Some(_) => (status, content_type),
        None => {
            let status = match status {
                VerificationStatus::Verified => VerificationStatus::PartiallyVerified,
                other => other,
            };
            (status, ContentType::VerifiedParaphrase)
        }
    };

    VerificationOutcome {
        verified: true,
        tier,
        method,
        status,
        citation: hit.citation,
        url,
        quote_text: hit
            .snippet
            .as_ref()
            .map(|s| s.chars().take(500).collect::<String>()),
        content_snippet: hit.snippet,
        content_type,
        url_verified,
        metadata: SourceMetadata {
            title: hit.title,
            author: hit.author,
            publisher: hit.publisher,
            publication_date: hit.publication_date,
            isbn: hit.isbn,
            doi: hit.doi,
            source_type: hit.source_type,
        },
    }
}

/// Does the page metadata plausibly match the requested citation? At
/// least half of the query's significant words must appear in the
/// returned title or content.
fn metadata_matches(query: &str, title: &str, content: &str) -> bool {
    let haystack = format!("{} {}", title, content).to_ascii_lowercase();
    let significant: Vec<String> = query
        .to_ascii_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 3)
        .map(str::to_string)
        .collect();

    if significant.is_empty() {
        return !title.is_empty();
    }

    let hits = significant.iter().filter(|w| haystack.contains(w.as_str())).count();
    hits * 2 >= significant.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_hit(snippet: Option<&str>) -> ProviderHit {
        ProviderHit {
            title: "Misquoting Jesus".to_string(),
            author: "Bart Ehrman".to_string(),
            publisher: Some("HarperOne".to_string()),
            publication_date: Some("2005".to_string()),
            isbn: Some("9780060859510".to_string()),
            doi: None,
            url: "https://example.org/misquoting".to_string(),
            snippet: snippet.map(str::to_string),
            citation: "Bart Ehrman, Misquoting Jesus (HarperOne, 2005)".to_string(),
            source_type: "book".to_string(),
        }
    }

    /// Every shaped record satisfies the source-integrity invariant: an
    /// exact quote is present, or the status is not fully verified.
    fn integrity_holds(outcome: &VerificationOutcome) -> bool {
        let exact = outcome.content_type == ContentType::ExactQuote
            && outcome.quote_text.as_deref().is_some_and(|q| !q.is_empty());
        exact
            || matches!(
                outcome.status,
                VerificationStatus::PartiallyVerified | VerificationStatus::Unverified
            )
    }

    #[test]
    fn book_hit_without_snippet_is_downgraded() {
        let outcome = shape_outcome(
            book_hit(None),
            1,
            VerificationMethod::GoogleBooks,
            VerificationStatus::Verified,
            ContentType::ExactQuote,
            true,
        );

        assert!(outcome.quote_text.is_none());
        assert_eq!(outcome.status, VerificationStatus::PartiallyVerified);
        assert_eq!(outcome.content_type, ContentType::VerifiedParaphrase);
        assert!(integrity_holds(&outcome));
    }

    #[test]
    fn book_hit_with_snippet_keeps_exact_quote() {
        let outcome = shape_outcome(
            book_hit(Some("The story behind who changed the Bible and why.")),
            1,
            VerificationMethod::GoogleBooks,
            VerificationStatus::Verified,
            ContentType::ExactQuote,
            true,
        );

        assert_eq!(outcome.status, VerificationStatus::Verified);
        assert_eq!(outcome.content_type, ContentType::ExactQuote);
        assert!(outcome.quote_text.as_deref().is_some_and(|q| !q.is_empty()));
        assert!(integrity_holds(&outcome));
    }

    #[test]
    fn paper_hit_without_abstract_is_downgraded() {
        let mut hit = book_hit(None);
        hit.source_type = "paper".to_string();

        let outcome = shape_outcome(
            hit,
            2,
            VerificationMethod::SemanticScholar,
            VerificationStatus::Verified,
            ContentType::ExactQuote,
            true,
        );

        assert_eq!(outcome.status, VerificationStatus::PartiallyVerified);
        assert_eq!(outcome.content_type, ContentType::VerifiedParaphrase);
        assert!(integrity_holds(&outcome));
    }

    #[test]
    fn partially_verified_hits_stay_partially_verified() {
        let outcome = shape_outcome(
            book_hit(None),
            3,
            VerificationMethod::Perseus,
            VerificationStatus::PartiallyVerified,
            ContentType::VerifiedParaphrase,
            true,
        );

        assert_eq!(outcome.status, VerificationStatus::PartiallyVerified);
        assert!(integrity_holds(&outcome));
    }

    #[test]
    fn unreachable_urls_are_dropped() {
        let outcome = shape_outcome(
            book_hit(Some("snippet")),
            1,
            VerificationMethod::GoogleBooks,
            VerificationStatus::Verified,
            ContentType::ExactQuote,
            false,
        );

        assert!(outcome.url.is_empty());
        assert!(!outcome.url_verified);
    }

    #[test]
    fn matching_metadata_is_accepted() {
        assert!(metadata_matches(
            "Ehrman Misquoting Jesus",
            "Misquoting Jesus - Bart Ehrman",
            "The story behind who changed the Bible and why."
        ));
    }

    #[test]
    fn unrelated_metadata_is_rejected() {
        assert!(!metadata_matches(
            "Ehrman Misquoting Jesus manuscripts",
            "Ten pasta recipes",
            "Cook dinner in twenty minutes."
        ));
    }

    #[test]
    fn short_words_are_ignored(){
        assert!(metadata_matches(
            "the of an Tacitus",
            "Tacitus: Annals",
            ""
        ));
    }
}
