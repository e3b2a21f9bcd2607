use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use crate::error::Result;

/// Process-wide cache of open index handles, keyed by record id.
///
/// At most one handle is ever live per id: the map lock is held across
/// the open call, so concurrent lookups for the same id cannot race
/// into two opens. Handles are shared out as `Arc`s; a searcher keeps
/// its clone working even after `invalidate` drops the cached one and
/// the backing directory is replaced.
pub struct HandleCache<H> {
    handles: Mutex<HashMap<u64, Arc<H>>>,
}

impl<H> HandleCache<H> {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached handle for `id`, opening and caching one with
    /// `open` if none is present. An `open` failure caches nothing.
    pub fn get_or_open(
        &self,
        id: u64,
        open: impl FnOnce() -> Result<H>,
    ) -> Result<Arc<H>> {
        let mut handles = self.handles.lock();
        if let Some(handle) = handles.get(&id) {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(open()?);
        handles.insert(id, Arc::clone(&handle));
        Ok(handle)
    }

    /// Drop the cached handle for `id`, if any; the next `get_or_open`
    /// re-reads from disk. Invalidating an uncached id is a no-op.
    pub fn invalidate(&self, id: u64) -> bool {
        self.handles.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.lock().is_empty()
    }
}

impl<H> Default for HandleCache<H> {
    fn default() -> Self {
        Self::new()
    }
}
