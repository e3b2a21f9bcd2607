use serde::{Deserialize, Serialize};

/// Fixed filename of the downloadable index archive within a record's
/// base URL.
pub const ARCHIVE_NAME: &str = "whoosh-index.zip";

/// A named search index as the metadata store knows it.
///
/// The service only ever reads these; the records themselves are owned
/// by a [`RecordStore`](crate::record_store::RecordStore) or whatever
/// store the host application provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: u64,
    /// Display label.
    pub name: String,
    /// Base URL the index archive and rendered documents live under.
    /// Absent (or missing a scheme) for local-only indices.
    pub url: Option<String>,
}

impl IndexRecord {
    /// Whether this index can be refreshed from a remote.
    ///
    /// Local-only records (no url, or a url without a scheme separator)
    /// are never updated.
    pub fn updateable(&self) -> bool {
        self.url.as_deref().is_some_and(|url| url.contains("://"))
    }

    /// URL of the downloadable archive, `None` for local-only records.
    pub fn archive_url(&self) -> Option<String> {
        if !self.updateable() {
            return None;
        }
        self.url.as_deref().map(|url| format!("{url}/{ARCHIVE_NAME}"))
    }

    /// Rendered-document URL for a hit: `{url}/{name}.html`.
    ///
    /// The base url is used verbatim, for display only; a record
    /// without one projects a bare `/{name}.html` path.
    pub fn document_url(&self, doc_name: &str) -> String {
        format!("{}/{doc_name}.html", self.url.as_deref().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: Option<&str>) -> IndexRecord {
        IndexRecord {
            id: 7,
            name: "manual".to_string(),
            url: url.map(str::to_string),
        }
    }

    #[test]
    fn updateable_requires_a_scheme() {
        assert!(record(Some("https://docs.example.org/lib")).updateable());
        assert!(record(Some("file:///srv/indices")).updateable());
        assert!(!record(Some("docs.example.org/lib")).updateable());
        assert!(!record(Some("")).updateable());
        assert!(!record(None).updateable());
    }

    #[test]
    fn archive_url_appends_the_wire_filename() {
        assert_eq!(
            record(Some("https://docs.example.org/lib")).archive_url(),
            Some("https://docs.example.org/lib/whoosh-index.zip".to_string())
        );
        assert_eq!(record(Some("not-a-url")).archive_url(), None);
        assert_eq!(record(None).archive_url(), None);
    }

    #[test]
    fn document_url_projection() {
        assert_eq!(
            record(Some("https://docs.example.org/lib")).document_url("alpha"),
            "https://docs.example.org/lib/alpha.html"
        );
        // Local-only records still project, with an empty base.
        assert_eq!(record(None).document_url("alpha"), "/alpha.html");
    }
}
