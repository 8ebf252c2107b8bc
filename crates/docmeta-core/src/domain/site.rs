//! Site addressing
//!
//! A document library lives under a site that Graph addresses as
//! `/sites/{hostname}:{server-relative-path}`. [`SiteLocator`] splits the
//! configured site URL into those two parts once, so both configuration
//! validation and the Graph adapter agree on what a usable URL is.

use url::Url;

use super::errors::DomainError;

/// Hostname and server-relative path of a site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLocator {
    /// Host part, e.g. `contoso.sharepoint.com`
    pub host: String,
    /// Server-relative path without a trailing slash, e.g. `/sites/copilot`
    pub path: String,
}

impl SiteLocator {
    /// Parses an absolute `http(s)` site URL.
    pub fn parse(site_url: &str) -> Result<Self, DomainError> {
        let url = Url::parse(site_url.trim())
            .map_err(|e| DomainError::InvalidSiteUrl(format!("{site_url}: {e}")))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(DomainError::InvalidSiteUrl(format!(
                "{site_url}: unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DomainError::InvalidSiteUrl(format!("{site_url}: missing host")))?
            .to_string();

        let path = url.path().trim_end_matches('/').to_string();

        Ok(Self { host, path })
    }

    /// Graph relative address of the site: `sites/{host}:{path}`
    pub fn graph_address(&self) -> String {
        if self.path.is_empty() {
            format!("sites/{}", self.host)
        } else {
            format!("sites/{}:{}", self.host, self.path)
        }
    }
}
