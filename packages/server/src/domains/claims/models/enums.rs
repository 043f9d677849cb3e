//! Persisted enums for claim cards.
//!
//! Stored as uppercase canonical names so the database value and the
//! programmatic constant can never drift apart.

use serde::{Deserialize, Serialize};

/// Verdict categories for claim analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    True,
    Misleading,
    False,
    Unfalsifiable,
    DependsOnDefinitions,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "TRUE",
            Self::Misleading => "MISLEADING",
            Self::False => "FALSE",
            Self::Unfalsifiable => "UNFALSIFIABLE",
            Self::DependsOnDefinitions => "DEPENDS_ON_DEFINITIONS",
        }
    }

    /// Parse either the canonical constant or the prose form the models
    /// tend to emit ("Depends on Definitions").
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c.to_ascii_uppercase() })
            .collect();
        match normalized.as_str() {
            "TRUE" => Some(Self::True),
            "MISLEADING" => Some(Self::Misleading),
            "FALSE" => Some(Self::False),
            "UNFALSIFIABLE" => Some(Self::Unfalsifiable),
            "DEPENDS_ON_DEFINITIONS" => Some(Self::DependsOnDefinitions),
            _ => None,
        }
    }
}

/// Confidence levels for claim verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Some(Self::High),
            "MEDIUM" => Some(Self::Medium),
            "LOW" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Source buckets on a claim card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    PrimaryHistorical,
    ScholarlyPeerReviewed,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryHistorical => "PRIMARY_HISTORICAL",
            Self::ScholarlyPeerReviewed => "SCHOLARLY_PEER_REVIEWED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "PRIMARY_HISTORICAL" => Some(Self::PrimaryHistorical),
            "SCHOLARLY_PEER_REVIEWED" => Some(Self::ScholarlyPeerReviewed),
            _ => None,
        }
    }
}

/// Routing-oriented claim classification. Drives the router's
/// same-topic-different-type decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimTypeCategory {
    Historical,
    Epistemology,
    Interpretation,
    Theological,
    Textual,
}

impl ClaimTypeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Epistemology => "epistemology",
            Self::Interpretation => "interpretation",
            Self::Theological => "theological",
            Self::Textual => "textual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "historical" => Some(Self::Historical),
            "epistemology" => Some(Self::Epistemology),
            "interpretation" => Some(Self::Interpretation),
            "theological" => Some(Self::Theological),
            "textual" => Some(Self::Textual),
            _ => None,
        }
    }
}

/// Check that a verdict is consistent with the opening stance of the
/// short answer. Negative openers demand False/Misleading; affirmative
/// openers demand True.
pub fn verdict_matches_prose(verdict: Verdict, short_answer: &str) -> bool {
    let prose = short_answer.to_ascii_lowercase();

    let negative_phrases = ["this claim is false", "the claim is false"];
    let affirmative_openers = ["this claim is true", "the claim is true", "yes,"];

    if prose.starts_with("no,") || negative_phrases.iter().any(|p| prose.contains(p)) {
        return matches!(verdict, Verdict::False | Verdict::Misleading);
    }
    if affirmative_openers.iter().any(|p| prose.starts_with(p)) {
        return verdict == Verdict::True;
    }
    // Hedged or descriptive prose constrains nothing.
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_round_trips_through_storage_form() {
        for verdict in [
            Verdict::True,
            Verdict::Misleading,
            Verdict::False,
            Verdict::Unfalsifiable,
            Verdict::DependsOnDefinitions,
        ] {
            assert_eq!(Verdict::parse(verdict.as_str()), Some(verdict));
        }
    }

    #[test]
    fn verdict_parses_prose_form() {
        assert_eq!(
            Verdict::parse("Depends on Definitions"),
            Some(Verdict::DependsOnDefinitions)
        );
        assert_eq!(Verdict::parse("Misleading"), Some(Verdict::Misleading));
        assert_eq!(Verdict::parse("plausible"), None);
    }

    #[test]
    fn source_type_parses_spaced_form() {
        assert_eq!(
            SourceType::parse("primary historical"),
            Some(SourceType::PrimaryHistorical)
        );
        assert_eq!(
            SourceType::parse("scholarly peer-reviewed"),
            Some(SourceType::ScholarlyPeerReviewed)
        );
    }

    #[test]
    fn negative_prose_requires_false_or_misleading() {
        assert!(verdict_matches_prose(
            Verdict::False,
            "This claim is false. Geological strata show no global flood."
        ));
        assert!(verdict_matches_prose(
            Verdict::Misleading,
            "No, this claim is false as stated, though a local flood is plausible."
        ));
        assert!(!verdict_matches_prose(
            Verdict::True,
            "This claim is false on every reading."
        ));
    }

    #[test]
    fn affirmative_prose_requires_true() {
        assert!(verdict_matches_prose(
            Verdict::True,
            "This claim is true: the textual overlap is extensive."
        ));
        assert!(!verdict_matches_prose(
            Verdict::False,
            "This claim is true in its essentials."
        ));
    }

    #[test]
    fn hedged_prose_constrains_nothing() {
        for verdict in [Verdict::Unfalsifiable, Verdict::DependsOnDefinitions] {
            assert!(verdict_matches_prose(
                verdict,
                "The evidence cuts both ways and hinges on definitions."
            ));
        }
    }
}
