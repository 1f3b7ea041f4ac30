//! User-Agent string shared by every request the harvester makes.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/archive-harvester";

/// Default User-Agent for search, metadata and download requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("archive-harvester/{version} (batch-pdf-harvester; +{PROJECT_UA_URL})")
}
