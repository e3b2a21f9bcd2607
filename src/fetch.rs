use std::{io::Read, time::Duration};

use tracing::debug;

use crate::error::{Error, Result};

/// Default time limit on an archive download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieves a remote archive into a local buffer.
///
/// The production implementation is [`HttpFetcher`]; tests substitute
/// their own fetchers to serve canned archives or simulate transport
/// failures. Fetching never touches the permanent store, whatever the
/// outcome.
pub trait ArchiveFetcher: Send + Sync {
    /// Download `url` fully into memory.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Plain unauthenticated HTTP(S) GET fetcher.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    /// A fetcher whose requests give up after `timeout`. A timed-out
    /// download is reported like any other fetch failure.
    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "downloading index archive");
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| Error::Fetch(format!("GET {url}: {e}")))?;

        let mut buf = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut buf)
            .map_err(|e| Error::Fetch(format!("reading {url}: {e}")))?;

        debug!(url, bytes = buf.len(), "archive downloaded");
        Ok(buf)
    }
}
