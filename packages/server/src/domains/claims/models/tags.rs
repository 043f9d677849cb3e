use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Rhetorical technique identified in a claim (quote-mining, false
/// dichotomy, ...). Owned by the card.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApologeticsTag {
    pub id: Uuid,
    pub claim_card_id: Uuid,
    pub technique_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Broad navigation category for the audits surface. Owned by the card.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryTag {
    pub id: Uuid,
    pub claim_card_id: Uuid,
    pub category_name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ApologeticsTag {
    pub async fn insert_for_card(
        claim_card_id: Uuid,
        technique_name: &str,
        description: Option<&str>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        let tag = sqlx::query_as::<_, ApologeticsTag>(
            r#"
            INSERT INTO apologetics_tags (id, claim_card_id, technique_name, description, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(claim_card_id)
        .bind(technique_name)
        .bind(description)
        .fetch_one(conn)
        .await?;
        Ok(tag)
    }

    pub async fn find_by_claim_card(claim_card_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        let tags = sqlx::query_as::<_, ApologeticsTag>(
            "SELECT * FROM apologetics_tags WHERE claim_card_id = $1 ORDER BY created_at",
        )
        .bind(claim_card_id)
        .fetch_all(pool)
        .await?;
        Ok(tags)
    }
}

impl CategoryTag {
    pub async fn insert_for_card(
        claim_card_id: Uuid,
        category_name: &str,
        description: Option<&str>,
        conn: &mut PgConnection,
    ) -> Result<Self> {
        let tag = sqlx::query_as::<_, CategoryTag>(
            r#"
            INSERT INTO category_tags (id, claim_card_id, category_name, description, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(claim_card_id)
        .bind(category_name)
        .bind(description)
        .fetch_one(conn)
        .await?;
        Ok(tag)
    }

    pub async fn find_by_claim_card(claim_card_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        let tags = sqlx::query_as::<_, CategoryTag>(
            "SELECT * FROM category_tags WHERE claim_card_id = $1 ORDER BY created_at",
        )
        .bind(claim_card_id)
        .fetch_all(pool)
        .await?;
        Ok(tags)
    }

    /// Distinct category names across all cards, for the audits filter UI.
    pub async fn unique_categories(pool: &PgPool) -> Result<Vec<String>> {
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT category_name FROM category_tags ORDER BY category_name",
        )
        .fetch_all(pool)
        .await?;
        Ok(names.into_iter().map(|(n,)| n).collect())
    }
}
