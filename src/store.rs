//! Persistence and quota collaborator traits.
//!
//! The pipeline does not own storage or token accounting — the hosting
//! application does (in production, a managed Postgres with a `reading_cards`
//! table and a per-user per-day `token_usage` table). These traits are the
//! full contract the pipeline holds them to:
//!
//! * the store computes the next `card_order` relative to what already exists
//!   for the document — cards may already exist, so the pipeline never assumes
//!   numbering starts at zero;
//! * the quota gate answers yes/no *before* the generative call is issued and
//!   is told the consumed tokens afterwards. Admin/unlimited users are the
//!   gate's business; the pipeline only consumes the decision.

use crate::cards::Card;
use crate::error::OkumaError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A reading card ready for insertion, tagged with its document and an
/// explicit insertion-order value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    pub document_id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub card_order: usize,
}

impl NewCard {
    /// Tag a generated card with document, user, and order.
    pub fn from_card(card: Card, document_id: &str, user_id: &str, card_order: usize) -> Self {
        Self {
            document_id: document_id.to_string(),
            user_id: user_id.to_string(),
            title: card.title,
            content: card.content,
            card_order,
        }
    }
}

/// Storage collaborator for reading cards.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Number of cards already persisted for the document. Also the next
    /// free `card_order` value, since orders are dense and zero-based.
    async fn card_count(&self, document_id: &str) -> Result<usize, OkumaError>;

    /// Insert the records in the given order.
    async fn insert_cards(&self, cards: &[NewCard]) -> Result<(), OkumaError>;
}

/// Daily token-quota collaborator.
#[async_trait]
pub trait QuotaGate: Send + Sync {
    /// Whether the user may issue a generative call right now. Admin and
    /// unlimited users simply always get `true`.
    async fn has_quota(&self, user_id: &str) -> Result<bool, OkumaError>;

    /// Record tokens consumed by a successful call. Called post-hoc; the
    /// implementation is responsible for incrementing atomically.
    async fn record_usage(&self, user_id: &str, tokens: usize) -> Result<(), OkumaError>;
}

/// A gate that never limits anyone. Useful for single-user deployments
/// and tests.
pub struct UnlimitedQuota;

#[async_trait]
impl QuotaGate for UnlimitedQuota {
    async fn has_quota(&self, _user_id: &str) -> Result<bool, OkumaError> {
        Ok(true)
    }

    async fn record_usage(&self, _user_id: &str, _tokens: usize) -> Result<(), OkumaError> {
        Ok(())
    }
}
