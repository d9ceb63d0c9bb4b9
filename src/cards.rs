//! Reading cards and the segmentation response parsers.
//!
//! A reading card is one ordered unit of *original* document text — the
//! generator partitions, it never summarises. Array position is the card's
//! order and must match the left-to-right order of the source material.
//!
//! Two response contracts exist and the caller selects one up front via
//! [`ResponseContract`]; the parser never sniffs the response body to guess
//! which contract it was given. Guessing would let a malformed JSON reply be
//! "rescued" by the delimiter splitter (or vice versa), silently producing
//! cards that no longer honour the preserve-wording guarantee.

use crate::error::OkumaError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One reading card: a title plus a verbatim slice of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    pub content: String,
}

/// Which output contract the generator was instructed to follow.
///
/// Selected by the caller when building the request; [`parse_response`] must
/// be called with the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseContract {
    /// Plain text with sections separated by `=== KART <N> ===` markers.
    /// Titles are synthesised by the parser as `Kart <n>`.
    #[default]
    Delimited,
    /// Strict JSON: `{"cards":[{"title","content"}]}` or
    /// `{"error":"...","cards":[]}`. Titles come from the generator.
    Json,
}

impl ResponseContract {
    fn name(self) -> &'static str {
        match self {
            ResponseContract::Delimited => "delimited",
            ResponseContract::Json => "json",
        }
    }
}

/// Marker pattern between card sections in the delimited contract.
static RE_KART_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"=== KART \d+ ===").unwrap());

#[derive(Debug, Deserialize)]
struct JsonCardsResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    cards: Vec<Card>,
}

/// Parse a raw completion under the selected contract.
///
/// `prior_card_count` is the number of cards already persisted for the target
/// document; synthesised `Kart <n>` titles continue from it so numbering stays
/// monotonic across repeated generations. It does not affect the JSON
/// contract, whose titles come from the generator.
///
/// Zero cards is always [`OkumaError::ContractViolation`], never an empty
/// success.
pub fn parse_response(
    raw: &str,
    contract: ResponseContract,
    prior_card_count: usize,
) -> Result<Vec<Card>, OkumaError> {
    match contract {
        ResponseContract::Delimited => parse_delimited(raw, prior_card_count),
        ResponseContract::Json => parse_json(raw),
    }
}

/// Split on `=== KART <N> ===` markers. Everything before the first marker is
/// generator preamble and is discarded; empty sections are dropped.
fn parse_delimited(raw: &str, prior_card_count: usize) -> Result<Vec<Card>, OkumaError> {
    let violation = |detail: &str| OkumaError::ContractViolation {
        contract: ResponseContract::Delimited.name(),
        detail: detail.to_string(),
    };

    if !RE_KART_MARKER.is_match(raw) {
        return Err(violation("no `=== KART <N> ===` markers in response"));
    }

    let cards: Vec<Card> = RE_KART_MARKER
        .split(raw)
        .skip(1) // preamble before the first marker
        .map(str::trim)
        .filter(|section| !section.is_empty())
        .enumerate()
        .map(|(i, section)| Card {
            title: format!("Kart {}", prior_card_count + i + 1),
            content: section.to_string(),
        })
        .collect();

    if cards.is_empty() {
        return Err(violation("all sections were empty after the marker split"));
    }

    Ok(cards)
}

/// Strict JSON parse. Malformed JSON is a hard failure — no best-effort text
/// splitting as a fallback.
fn parse_json(raw: &str) -> Result<Vec<Card>, OkumaError> {
    let contract = ResponseContract::Json.name();

    let parsed: JsonCardsResponse =
        serde_json::from_str(raw.trim()).map_err(|e| OkumaError::ContractViolation {
            contract,
            detail: format!("malformed JSON: {e}"),
        })?;

    if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
        return Err(OkumaError::ContractViolation {
            contract,
            detail: error,
        });
    }

    if parsed.cards.is_empty() {
        return Err(OkumaError::ContractViolation {
            contract,
            detail: "no cards produced".to_string(),
        });
    }

    Ok(parsed.cards)
}
