//! Paginated client for the archive's advanced search API.
//!
//! [`SearchClient::fetch_page`] issues one request; [`SearchPager`] walks the
//! pages of a query, applying the inter-request delay and the stop rules.

mod client;
mod error;
mod pager;

use serde::Deserialize;
use tracing::warn;

pub use client::SearchClient;
pub use error::SearchError;
pub use pager::{PagerEvent, SearchPager};

/// Title used when a search document has none.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// One search document reduced to the fields the pipeline uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultItem {
    /// Archive identifier.
    pub identifier: String,
    /// Item title, or [`UNKNOWN_TITLE`].
    pub title: String,
    /// Declared language values, possibly empty.
    pub languages: Vec<String>,
}

/// One decoded search page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Documents that carried an identifier, in server order.
    pub items: Vec<SearchResultItem>,
    /// `response.numFound`.
    pub total: u64,
    /// Number of raw documents in the page, including dropped ones.
    pub raw_count: usize,
}

impl SearchPage {
    /// Returns whether the server sent no documents at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw_count == 0
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    identifier: Option<String>,
    title: Option<OneOrMany>,
    language: Option<OneOrMany>,
}

/// Fields the search API sends either as a string or as a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

impl SearchPage {
    /// Decodes a search JSON body.
    pub(crate) fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: SearchEnvelope = serde_json::from_slice(body)?;
        let raw_count = envelope.response.docs.len();
        let items = envelope
            .response
            .docs
            .into_iter()
            .filter_map(RawDocument::into_item)
            .collect();
        Ok(Self {
            items,
            total: envelope.response.num_found,
            raw_count,
        })
    }
}

impl RawDocument {
    fn into_item(self) -> Option<SearchResultItem> {
        let Some(identifier) = self.identifier.filter(|id| !id.trim().is_empty()) else {
            warn!("search document without identifier dropped");
            return None;
        };
        let title = self
            .title
            .map(OneOrMany::into_vec)
            .and_then(|titles| titles.into_iter().find(|t| !t.trim().is_empty()))
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let languages = self.language.map(OneOrMany::into_vec).unwrap_or_default();
        Some(SearchResultItem {
            identifier,
            title,
            languages,
        })
    }
}
