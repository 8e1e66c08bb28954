//! Entity roster: characters and creatures that can be dropped on the board.
//!
//! Read-only and queried once when a session opens. The HTTP provider is a
//! thin wrapper around `GET {base}/campaigns/{id}/roster`; response parsing
//! lives in [`parse_roster`] so it can be tested without a server.

#[cfg(test)]
#[path = "roster_test.rs"]
mod roster_test;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::doc::{NewToken, TokenKind, TokenVisual};

const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by roster lookups.
#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    /// The HTTP request to the roster service failed.
    #[error("roster request failed: {0}")]
    Request(String),

    /// The roster service returned a non-success status.
    #[error("roster response error: status {status}")]
    Response { status: u16, body: String },

    #[error("roster parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// TYPES
// =============================================================================

/// A character or creature available as a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub image_reference: Option<String>,
    pub kind: TokenKind,
}

impl RosterEntry {
    /// Token request bound to this entity. Entries without an image get a
    /// palette colour.
    #[must_use]
    pub fn to_new_token(&self, position: Point) -> NewToken {
        NewToken {
            position,
            display_name: self.display_name.clone(),
            visual: self.image_reference.clone().map(TokenVisual::Image),
            radius: None,
            kind: self.kind,
            linked_entity_id: Some(self.id.clone()),
        }
    }
}

/// Look up an entry by entity id.
#[must_use]
pub fn find<'a>(entries: &'a [RosterEntry], entity_id: &str) -> Option<&'a RosterEntry> {
    entries.iter().find(|e| e.id == entity_id)
}

/// Source of roster entries for a campaign.
#[async_trait::async_trait]
pub trait RosterProvider: Send + Sync {
    async fn roster(&self, campaign_id: &str) -> Result<Vec<RosterEntry>, RosterError>;
}

// =============================================================================
// PROVIDERS
// =============================================================================

/// Roster served over HTTP.
pub struct HttpRoster {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRoster {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RosterError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| RosterError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn url(&self, campaign_id: &str) -> String {
        format!("{}/campaigns/{campaign_id}/roster", self.base_url)
    }
}

#[async_trait::async_trait]
impl RosterProvider for HttpRoster {
    async fn roster(&self, campaign_id: &str) -> Result<Vec<RosterEntry>, RosterError> {
        let response = self
            .http
            .get(self.url(campaign_id))
            .send()
            .await
            .map_err(|e| RosterError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| RosterError::Request(e.to_string()))?;

        if status != 200 {
            return Err(RosterError::Response { status, body: text });
        }

        parse_roster(&text)
    }
}

/// Fixed roster, for tests and sessions without a roster service.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    entries: Vec<RosterEntry>,
}

impl StaticRoster {
    #[must_use]
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait::async_trait]
impl RosterProvider for StaticRoster {
    async fn roster(&self, _campaign_id: &str) -> Result<Vec<RosterEntry>, RosterError> {
        Ok(self.entries.clone())
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Deserialize)]
struct WireRoster {
    #[serde(default)]
    characters: Vec<WireEntry>,
    #[serde(default)]
    creatures: Vec<WireEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEntry {
    id: String,
    display_name: String,
    #[serde(default)]
    image_reference: Option<String>,
}

impl WireEntry {
    fn into_entry(self, kind: TokenKind) -> RosterEntry {
        RosterEntry { id: self.id, display_name: self.display_name, image_reference: self.image_reference, kind }
    }
}

/// Parse a roster response body: characters first, then creatures.
///
/// # Errors
///
/// Returns [`RosterError::Parse`] if the body is not a roster document.
pub fn parse_roster(body: &str) -> Result<Vec<RosterEntry>, RosterError> {
    let wire: WireRoster = serde_json::from_str(body).map_err(|e| RosterError::Parse(e.to_string()))?;
    let characters = wire.characters.into_iter().map(|e| e.into_entry(TokenKind::Character));
    let creatures = wire.creatures.into_iter().map(|e| e.into_entry(TokenKind::Creature));
    Ok(characters.chain(creatures).collect())
}
