use std::{collections::HashMap, fs, io, io::Cursor, path::Path, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    data_dir::DataDir,
    engine::{IndexHandle, SearchEngine},
    error::Result,
    extract::extract_archive,
    fetch::ArchiveFetcher,
    handle_cache::HandleCache,
    record::IndexRecord,
};

/// Fallback title for documents that carry none.
const NO_TITLE: &str = "No title";

/// A search hit projected into display form.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SearchHit {
    /// `{record url}/{document name}.html`
    pub url: String,
    pub title: String,
}

/// Outcome of an update attempt. Distinguished by value rather than by
/// fault, so callers branch without error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The on-disk index was replaced and the cached handle dropped.
    Updated,
    /// Nothing changed; the reason says why.
    NotUpdated(NotUpdatedReason),
}

impl UpdateOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, UpdateOutcome::Updated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotUpdatedReason {
    /// The record has no remote URL; local-only indices are never
    /// updated.
    NotRemote,
    /// Downloading the archive failed. The existing index is untouched.
    FetchFailed,
    /// The archive could not be extracted. The existing index is
    /// untouched.
    ExtractFailed,
    /// The freshly extracted index could not be moved into place.
    SwapFailed,
}

impl NotUpdatedReason {
    /// Stable machine-readable reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotUpdatedReason::NotRemote => "not-remote",
            NotUpdatedReason::FetchFailed => "fetch-failed",
            NotUpdatedReason::ExtractFailed => "extract-failed",
            NotUpdatedReason::SwapFailed => "swap-failed",
        }
    }
}

impl std::fmt::Display for NotUpdatedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            NotUpdatedReason::NotRemote => "record has no remote URL",
            NotUpdatedReason::FetchFailed => "archive download failed",
            NotUpdatedReason::ExtractFailed => "archive extraction failed",
            NotUpdatedReason::SwapFailed => "index directory swap failed",
        };
        f.write_str(text)
    }
}

/// Orchestrates the index lifecycle: cached searches, and the
/// fetch, extract, swap, invalidate update pipeline.
pub struct SearchService<E: SearchEngine, F> {
    data_dir: DataDir,
    engine: E,
    fetcher: F,
    handles: HandleCache<E::Handle>,
    // One lock per record id; updates of distinct ids run in parallel.
    update_locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl<E: SearchEngine, F: ArchiveFetcher> SearchService<E, F> {
    pub fn new(data_dir: DataDir, engine: E, fetcher: F) -> Self {
        Self {
            data_dir,
            engine,
            fetcher,
            handles: HandleCache::new(),
            update_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> &DataDir {
        &self.data_dir
    }

    /// Search `record`'s index, returning at most `limit` projected
    /// hits in relevance order.
    ///
    /// Open and parse failures propagate; neither is retried here.
    pub fn search(
        &self,
        record: &IndexRecord,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let dir = self.data_dir.index_dir(record.id)?;
        let handle = self
            .handles
            .get_or_open(record.id, || self.engine.open(&dir))?;

        let hits = handle.search(query, limit)?;
        debug!(id = record.id, query, hits = hits.len(), "search executed");

        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                url: record.document_url(&hit.name),
                title: hit.title.unwrap_or_else(|| NO_TITLE.to_string()),
            })
            .collect())
    }

    /// Refresh `record`'s index from its remote archive.
    ///
    /// A failure at any stage leaves the currently-serving index intact
    /// and is reported as a [`NotUpdated`](UpdateOutcome::NotUpdated)
    /// outcome: the archive is extracted into a staging directory next
    /// to the serving one, and only a fully extracted archive replaces
    /// the old directory. Updates of the same id are serialized;
    /// searches racing an update may still see the previously cached
    /// handle until the final invalidation.
    pub fn update(&self, record: &IndexRecord) -> Result<UpdateOutcome> {
        let lock = self.update_lock(record.id);
        let _serialized = lock.lock();

        let Some(archive_url) = record.archive_url() else {
            debug!(id = record.id, "record has no remote, skipping update");
            return Ok(UpdateOutcome::NotUpdated(NotUpdatedReason::NotRemote));
        };

        let bytes = match self.fetcher.fetch(&archive_url) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(id = record.id, url = %archive_url, %err, "archive fetch failed");
                return Ok(UpdateOutcome::NotUpdated(
                    NotUpdatedReason::FetchFailed,
                ));
            }
        };

        let indices_root = self.data_dir.indices_dir()?;
        let dir = indices_root.join(record.id.to_string());

        // Stage next to the serving directory so the final rename stays
        // on one filesystem.
        let staging = tempfile::Builder::new()
            .prefix(&format!("{}.update-", record.id))
            .tempdir_in(&indices_root)?;

        match extract_archive(
            Cursor::new(bytes),
            staging.path(),
            self.engine.archive_extensions(),
        ) {
            Ok(count) => {
                debug!(id = record.id, files = count, "archive extracted");
            }
            Err(err) => {
                warn!(id = record.id, %err, "archive extract failed");
                return Ok(UpdateOutcome::NotUpdated(
                    NotUpdatedReason::ExtractFailed,
                ));
            }
        }

        if let Err(err) = swap_into_place(staging, &dir) {
            warn!(id = record.id, %err, "index directory swap failed");
            return Ok(UpdateOutcome::NotUpdated(NotUpdatedReason::SwapFailed));
        }

        self.handles.invalidate(record.id);
        info!(id = record.id, name = %record.name, "index updated");
        Ok(UpdateOutcome::Updated)
    }

    fn update_lock(&self, id: u64) -> Arc<Mutex<()>> {
        Arc::clone(self.update_locks.lock().entry(id).or_default())
    }
}

/// Replace `dir` with the fully extracted `staging` directory.
fn swap_into_place(staging: tempfile::TempDir, dir: &Path) -> io::Result<()> {
    let fresh = staging.keep();
    let swapped = (|| {
        if dir.is_dir() {
            fs::remove_dir_all(dir)?;
        }
        fs::rename(&fresh, dir)
    })();
    if swapped.is_err() {
        // Do not leave the orphaned staging directory behind.
        let _ = fs::remove_dir_all(&fresh);
    }
    swapped
}

#[cfg(test)]
mod tests {
    use std::{
        io::Write,
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::{engine::Hit, error::Error};

    /// Minimal engine over extracted directories: every allow-listed
    /// file is one document named by its file stem, with no title.
    struct StubEngine {
        opens: AtomicUsize,
    }

    impl StubEngine {
        fn new() -> Self {
            Self {
                opens: AtomicUsize::new(0),
            }
        }
    }

    impl SearchEngine for StubEngine {
        type Handle = StubHandle;

        fn open(&self, dir: &Path) -> Result<StubHandle> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if !dir.is_dir() {
                return Err(Error::IndexOpen {
                    path: dir.to_path_buf(),
                    reason: "no such directory".into(),
                });
            }
            let mut docs: Vec<String> = fs::read_dir(dir)?
                .filter_map(|entry| {
                    let path = entry.ok()?.path();
                    let stem = path.file_stem()?.to_str()?;
                    Some(stem.to_string())
                })
                .collect();
            docs.sort();
            Ok(StubHandle { docs })
        }
    }

    struct StubHandle {
        docs: Vec<String>,
    }

    impl IndexHandle for StubHandle {
        fn search(&self, query: &str, limit: usize) -> Result<Vec<Hit>> {
            Ok(self
                .docs
                .iter()
                .filter(|doc| doc.contains(query))
                .take(limit)
                .map(|doc| Hit {
                    name: doc.clone(),
                    title: None,
                    score: 1.0,
                })
                .collect())
        }
    }

    struct StaticFetcher(Vec<u8>);

    impl ArchiveFetcher for StaticFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    /// A fetcher whose served archive can be swapped mid-test.
    #[derive(Clone)]
    struct SwitchFetcher(Arc<Mutex<Vec<u8>>>);

    impl SwitchFetcher {
        fn new(bytes: Vec<u8>) -> Self {
            Self(Arc::new(Mutex::new(bytes)))
        }

        fn set(&self, bytes: Vec<u8>) {
            *self.0.lock() = bytes;
        }
    }

    impl ArchiveFetcher for SwitchFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.lock().clone())
        }
    }

    struct FailingFetcher;

    impl ArchiveFetcher for FailingFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(Error::Fetch(format!("GET {url}: connection refused")))
        }
    }

    fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in members {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn remote_record(id: u64) -> IndexRecord {
        IndexRecord {
            id,
            name: "library docs".to_string(),
            url: Some("https://docs.example.org/lib".to_string()),
        }
    }

    fn service_with(
        root: &Path,
        fetcher: impl ArchiveFetcher,
    ) -> SearchService<StubEngine, impl ArchiveFetcher> {
        let data_dir = DataDir::resolve(Some(root)).unwrap();
        SearchService::new(data_dir, StubEngine::new(), fetcher)
    }

    fn index_files(root: &Path, id: u64) -> Vec<String> {
        let dir = root.join("indices").join(id.to_string());
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn local_only_record_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_with(tmp.path(), FailingFetcher);
        let record = IndexRecord {
            id: 1,
            name: "local".to_string(),
            url: None,
        };

        let outcome = service.update(&record).unwrap();

        assert_eq!(
            outcome,
            UpdateOutcome::NotUpdated(NotUpdatedReason::NotRemote)
        );
        // Index storage was never touched.
        assert!(!tmp.path().join("indices").exists());
    }

    #[test]
    fn update_extracts_only_index_members() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = build_zip(&[
            ("alpha.toc", b"alpha"),
            ("beta.pst", b"beta"),
            ("junk.bin", b"ignored"),
        ]);
        let service = service_with(tmp.path(), StaticFetcher(archive));
        let record = remote_record(1);

        assert!(service.update(&record).unwrap().is_updated());
        assert_eq!(index_files(tmp.path(), 1), vec!["alpha.toc", "beta.pst"]);
    }

    #[test]
    fn search_projects_hits() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = build_zip(&[("alpha.toc", b"alpha")]);
        let service = service_with(tmp.path(), StaticFetcher(archive));
        let record = remote_record(1);

        service.update(&record).unwrap();
        let hits = service.search(&record, "alpha", 100).unwrap();

        assert_eq!(
            hits,
            vec![SearchHit {
                url: "https://docs.example.org/lib/alpha.html".to_string(),
                title: "No title".to_string(),
            }]
        );
    }

    #[test]
    fn search_without_an_index_fails_to_open() {
        let tmp = tempfile::tempdir().unwrap();
        let service = service_with(tmp.path(), FailingFetcher);
        let record = remote_record(1);

        let err = service.search(&record, "anything", 10).unwrap_err();
        assert!(matches!(err, Error::IndexOpen { .. }));
    }

    #[test]
    fn failed_fetch_leaves_the_index_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let record = remote_record(1);

        {
            let archive = build_zip(&[("alpha.toc", b"alpha")]);
            let service = service_with(tmp.path(), StaticFetcher(archive));
            service.update(&record).unwrap();
        }

        let service = service_with(tmp.path(), FailingFetcher);
        let before = index_files(tmp.path(), 1);

        let outcome = service.update(&record).unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::NotUpdated(NotUpdatedReason::FetchFailed)
        );
        assert_eq!(index_files(tmp.path(), 1), before);
        // The old index still serves.
        assert_eq!(service.search(&record, "alpha", 10).unwrap().len(), 1);
    }

    #[test]
    fn failed_extract_leaves_the_index_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let record = remote_record(1);

        {
            let archive = build_zip(&[("alpha.toc", b"alpha")]);
            let service = service_with(tmp.path(), StaticFetcher(archive));
            service.update(&record).unwrap();
        }

        let service = service_with(
            tmp.path(),
            StaticFetcher(b"not a zip archive".to_vec()),
        );

        let outcome = service.update(&record).unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::NotUpdated(NotUpdatedReason::ExtractFailed)
        );
        assert_eq!(index_files(tmp.path(), 1), vec!["alpha.toc"]);
        assert_eq!(service.search(&record, "alpha", 10).unwrap().len(), 1);
    }

    #[test]
    fn update_invalidates_the_cached_handle() {
        let tmp = tempfile::tempdir().unwrap();
        let record = remote_record(1);

        let fetcher = SwitchFetcher::new(build_zip(&[("alpha.toc", b"v1")]));
        let service = service_with(tmp.path(), fetcher.clone());

        service.update(&record).unwrap();
        assert_eq!(service.search(&record, "alpha", 10).unwrap().len(), 1);
        assert_eq!(service.engine.opens.load(Ordering::SeqCst), 1);

        fetcher.set(build_zip(&[("beta.toc", b"v2")]));
        service.update(&record).unwrap();

        // No leftovers from v1, and the next search reopens fresh.
        assert_eq!(index_files(tmp.path(), 1), vec!["beta.toc"]);
        assert!(service.search(&record, "alpha", 10).unwrap().is_empty());
        assert_eq!(service.search(&record, "beta", 10).unwrap().len(), 1);
        assert_eq!(service.engine.opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn update_is_idempotent_for_identical_archives() {
        let tmp = tempfile::tempdir().unwrap();
        let record = remote_record(1);
        let archive = build_zip(&[("alpha.toc", b"alpha"), ("b.pst", b"b")]);
        let service = service_with(tmp.path(), StaticFetcher(archive));

        service.update(&record).unwrap();
        let first = index_files(tmp.path(), 1);
        service.update(&record).unwrap();

        assert_eq!(index_files(tmp.path(), 1), first);
    }

    #[test]
    fn no_staging_directories_are_left_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let record = remote_record(1);
        let archive = build_zip(&[("alpha.toc", b"alpha")]);
        let service = service_with(tmp.path(), StaticFetcher(archive));

        service.update(&record).unwrap();

        let entries: Vec<PathBuf> = fs::read_dir(tmp.path().join("indices"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries, vec![tmp.path().join("indices").join("1")]);
    }
}
