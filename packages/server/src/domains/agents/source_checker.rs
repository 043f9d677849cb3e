//! Source Checker - second pipeline stage.
//!
//! Asks the model which sources would settle the claim, then routes each
//! candidate through the six-tier verification walk. URLs come out of
//! verification or stay empty; they are never guessed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domains::claims::models::{AgentPrompt, SourceType};
use crate::domains::verification::{SourceDomain, VerificationRequest};

use super::framework::{
    call_config, parse_output, require_str, to_map, Agent, AgentContext, AgentError, JsonMap,
};

/// Candidate source bounds per claim.
const MIN_CANDIDATES: usize = 3;
const MAX_CANDIDATES: usize = 8;

pub struct SourceChecker;

#[derive(Debug, Deserialize)]
struct SourceQueryPlan {
    source_queries: Vec<SourceQuery>,
}

#[derive(Debug, Deserialize)]
struct SourceQuery {
    /// Title/author/keywords to search catalogs by.
    search_query: String,
    /// "used to establish X" — carried onto the stored source.
    usage_context: String,
    /// book | paper | ancient_text | web
    #[serde(default)]
    domain: String,
    /// primary | scholarly
    #[serde(default)]
    bucket: String,
}

/// A fully verified (or explicitly unverified) source ready for storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckedSource {
    pub source_type: String,
    pub citation: String,
    pub url: String,
    pub quote_text: String,
    pub usage_context: String,
    pub verification_method: String,
    pub verification_status: String,
    pub content_type: String,
    pub url_verified: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SourceCheckerOutput {
    pub sources: Vec<CheckedSource>,
    pub evidence_summary: String,
}

#[async_trait]
impl Agent for SourceChecker {
    fn name(&self) -> &'static str {
        "source_checker"
    }

    async fn execute(
        &self,
        ctx: &AgentContext<'_>,
        config: &AgentPrompt,
        inputs: &JsonMap,
    ) -> Result<JsonMap, AgentError> {
        let claim = require_str(inputs, self.name(), "claim_text")?;
        let claimant = inputs.get("claimant").and_then(|v| v.as_str()).unwrap_or("");
        let claim_type = inputs.get("claim_type").and_then(|v| v.as_str()).unwrap_or("");

        let llm_config = call_config(config, ctx.deps.config.agent_timeout_secs)?;

        // Step 1: identify what to look for.
        let plan_message = format!(
            "Identify sources needed to evaluate this claim:\n\n\
             Claim: {claim}\nClaimant: {claimant}\nClaim Type: {claim_type}\n\n\
             Provide {MIN_CANDIDATES}-{MAX_CANDIDATES} candidate sources in total. Primary sources are \
             original texts, manuscripts, and historical documents; scholarly sources are \
             peer-reviewed academic work, not apologetics. Search queries should be specific \
             (e.g. \"Bart Ehrman Misquoting Jesus\" or \"Gospel of John Greek manuscripts\").\n\n\
             Respond with JSON only:\n\
             {{\n\
               \"source_queries\": [\n\
                 {{\n\
                   \"search_query\": \"Title Author keywords\",\n\
                   \"usage_context\": \"how this source is used\",\n\
                   \"domain\": \"book | paper | ancient_text | web\",\n\
                   \"bucket\": \"primary | scholarly\"\n\
                 }}\n\
               ]\n\
             }}"
        );

        let completion = ctx
            .deps
            .llm
            .complete(&llm_config, &plan_message)
            .await
            .map_err(|e| AgentError::from_llm(self.name(), e))?;
        let plan: SourceQueryPlan = parse_output(self.name(), &completion.content)?;

        if plan.source_queries.is_empty() {
            return Err(AgentError::Parse {
                agent: self.name(),
                message: "no source queries identified".to_string(),
            });
        }
        let queries: Vec<SourceQuery> =
            plan.source_queries.into_iter().take(MAX_CANDIDATES).collect();

        // Step 2: verify each candidate through the tier walk.
        let mut sources = Vec::with_capacity(queries.len());
        for query in &queries {
            let request = VerificationRequest {
                claim_text: claim.to_string(),
                search_query: query.search_query.clone(),
                domain: SourceDomain::parse(&query.domain),
            };

            let outcome = ctx
                .deps
                .verifier
                .verify(&request)
                .await
                .map_err(|e| AgentError::Store {
                    agent: self.name(),
                    message: e.to_string(),
                })?;

            let source_type = if query.bucket.eq_ignore_ascii_case("primary") {
                SourceType::PrimaryHistorical
            } else {
                SourceType::ScholarlyPeerReviewed
            };

            sources.push(CheckedSource {
                source_type: source_type.as_str().to_string(),
                citation: outcome.citation.clone(),
                url: outcome.url.clone(),
                quote_text: outcome.quote_text.clone().unwrap_or_default(),
                usage_context: query.usage_context.clone(),
                verification_method: outcome.method.as_str().to_string(),
                verification_status: outcome.status.as_str().to_string(),
                content_type: outcome.content_type.as_str().to_string(),
                url_verified: outcome.url_verified,
            });
        }

        // Step 3: brief evidence summary over what was found.
        let evidence_summary = self
            .summarize_evidence(ctx, &llm_config, claim, &sources)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "evidence summary failed");
                String::new()
            });

        to_map(
            self.name(),
            &SourceCheckerOutput {
                sources,
                evidence_summary,
            },
        )
    }
}

impl SourceChecker {
    async fn summarize_evidence(
        &self,
        ctx: &AgentContext<'_>,
        llm_config: &llm_client::CallConfig,
        claim: &str,
        sources: &[CheckedSource],
    ) -> Result<String, AgentError> {
        let mut listing = String::new();
        for source in sources {
            let quote: String = source.quote_text.chars().take(200).collect();
            listing.push_str(&format!(
                "- [{}] {}: {}\n",
                source.verification_status,
                source.citation,
                if quote.is_empty() { "N/A" } else { &quote }
            ));
        }

        let message = format!(
            "Based on these sources, summarize in 2-3 sentences what the evidence shows about \
             this claim:\n\nClaim: {claim}\n\n{listing}\nSummary:"
        );

        let completion = ctx
            .deps
            .llm
            .complete(llm_config, &message)
            .await
            .map_err(|e| AgentError::from_llm(self.name(), e))?;
        Ok(completion.content.trim().to_string())
    }
}
