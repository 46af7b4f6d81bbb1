// Document source module
// Where the raw documents for the index come from: the SharePoint lists of one site

#[cfg(test)]
mod tests;

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::GraphAuthenticator;
use crate::config::Config;
use crate::http::{build_agent, endpoint, send_once};
use crate::{QaError, Result};

/// Tag recorded on every document fetched from SharePoint
pub const SHAREPOINT_SOURCE: &str = "SharePoint";

/// Upper bound on `@odata.nextLink` pages followed in one listing
const MAX_PAGES: usize = 1000;

/// A content item as fetched, before embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub id: String,
    pub text: String,
}

impl RawDocument {
    #[inline]
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Produces the documents an index is built from
pub trait DocumentSource {
    /// Tag stored alongside each embedded document
    fn source_tag(&self) -> &str;

    /// Fetch every document, in source order.
    ///
    /// # Errors
    /// `Auth` when credentials are rejected, `Transport` for any other failure.
    fn list_documents(&self) -> Result<Vec<RawDocument>>;
}

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    #[inline]
    fn source_tag(&self) -> &str {
        (**self).source_tag()
    }

    #[inline]
    fn list_documents(&self) -> Result<Vec<RawDocument>> {
        (**self).list_documents()
    }
}

#[derive(Debug, Deserialize)]
struct ListsPage {
    #[serde(default)]
    value: Vec<ListItem>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListItem {
    id: String,
    name: Option<String>,
    display_name: Option<String>,
}

impl ListItem {
    fn into_document(self) -> Option<RawDocument> {
        let text = self
            .name
            .filter(|name| !name.trim().is_empty())
            .or(self.display_name.filter(|name| !name.trim().is_empty()))?;
        Some(RawDocument { id: self.id, text })
    }
}

/// Lists of a SharePoint site, read through Microsoft Graph
#[derive(Clone)]
pub struct SharePointSource {
    authenticator: GraphAuthenticator,
    lists_url: Url,
    agent: ureq::Agent,
}

impl fmt::Debug for SharePointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharePointSource")
            .field("authenticator", &self.authenticator)
            .field("lists_url", &self.lists_url)
            .finish_non_exhaustive()
    }
}

impl SharePointSource {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let graph = config
            .graph_url()
            .map_err(|e| QaError::Config(e.to_string()))?;
        let lists_url = endpoint(
            &graph,
            &format!("v1.0/sites/{}/lists", config.graph.site_id),
        )?;

        Ok(Self {
            authenticator: GraphAuthenticator::new(config)?,
            lists_url,
            agent: build_agent(Duration::from_secs(config.graph.timeout_seconds)),
        })
    }

    #[inline]
    pub fn lists_url(&self) -> &Url {
        &self.lists_url
    }

    /// Parse a `@odata.nextLink`; the bearer token is only ever sent back to the Graph origin
    fn next_page_url(&self, link: &str) -> Result<Url> {
        let url = Url::parse(link)
            .map_err(|e| QaError::Transport(format!("Invalid @odata.nextLink {}: {}", link, e)))?;

        if url.origin() != self.lists_url.origin() {
            return Err(QaError::Transport(format!(
                "Refusing @odata.nextLink {} outside {}",
                link,
                self.lists_url.origin().ascii_serialization()
            )));
        }

        Ok(url)
    }

    fn fetch_page(&self, url: &Url, bearer: &str) -> Result<ListsPage> {
        let response_text = send_once(url, || {
            self.agent
                .get(url.as_str())
                .header("Authorization", bearer)
                .header("Accept", "application/json")
                .call()
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .map_err(|e| match e {
            QaError::Upstream(message) => QaError::Transport(message),
            other => other,
        })?;

        serde_json::from_str(&response_text)
            .map_err(|e| QaError::Transport(format!("Failed to parse SharePoint lists response: {}", e)))
    }
}

impl DocumentSource for SharePointSource {
    #[inline]
    fn source_tag(&self) -> &str {
        SHAREPOINT_SOURCE
    }

    #[inline]
    fn list_documents(&self) -> Result<Vec<RawDocument>> {
        let token = self.authenticator.acquire_token()?;
        let bearer = token.bearer();

        let mut documents = Vec::new();
        let mut next = Some(self.lists_url.clone());
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                warn!("Stopping after {} pages of SharePoint lists", MAX_PAGES);
                break;
            }

            debug!("Fetching SharePoint lists page {} from {}", pages, url);
            let page = self.fetch_page(&url, &bearer)?;

            for item in page.value {
                let id = item.id.clone();
                match item.into_document() {
                    Some(document) => documents.push(document),
                    None => warn!("Skipping SharePoint list {} with no name", id),
                }
            }

            next = page
                .next_link
                .map(|link| self.next_page_url(&link))
                .transpose()?;
        }

        info!(
            "Fetched {} documents from SharePoint in {} page(s)",
            documents.len(),
            pages.min(MAX_PAGES)
        );
        Ok(documents)
    }
}
