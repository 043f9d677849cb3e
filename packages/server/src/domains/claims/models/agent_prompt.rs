//! Hot-editable agent configuration.
//!
//! One row per agent. Read on every invocation — never cached for the
//! process lifetime — so prompt edits apply to the next call.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AgentPrompt {
    pub id: Uuid,
    /// topic_finder, source_checker, adversarial_checker, writer,
    /// publisher, router, decomposer, composer, autosuggest
    pub agent_name: String,
    /// anthropic | openai
    pub llm_provider: String,
    pub model_name: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentPrompt {
    pub async fn find_by_agent_name(agent_name: &str, pool: &PgPool) -> Result<Option<Self>> {
        let prompt = sqlx::query_as::<_, AgentPrompt>(
            "SELECT * FROM agent_prompts WHERE agent_name = $1",
        )
        .bind(agent_name)
        .fetch_optional(pool)
        .await?;
        Ok(prompt)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let prompts =
            sqlx::query_as::<_, AgentPrompt>("SELECT * FROM agent_prompts ORDER BY agent_name")
                .fetch_all(pool)
                .await?;
        Ok(prompts)
    }

    pub async fn upsert(
        agent_name: &str,
        llm_provider: &str,
        model_name: &str,
        system_prompt: &str,
        temperature: f64,
        max_tokens: i32,
        pool: &PgPool,
    ) -> Result<Self> {
        let prompt = sqlx::query_as::<_, AgentPrompt>(
            r#"
            INSERT INTO agent_prompts (
                id, agent_name, llm_provider, model_name, system_prompt,
                temperature, max_tokens, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            ON CONFLICT (agent_name) DO UPDATE
            SET llm_provider = EXCLUDED.llm_provider,
                model_name = EXCLUDED.model_name,
                system_prompt = EXCLUDED.system_prompt,
                temperature = EXCLUDED.temperature,
                max_tokens = EXCLUDED.max_tokens,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(agent_name)
        .bind(llm_provider)
        .bind(model_name)
        .bind(system_prompt)
        .bind(temperature)
        .bind(max_tokens)
        .fetch_one(pool)
        .await?;
        Ok(prompt)
    }

    pub async fn count(pool: &PgPool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM agent_prompts")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}
