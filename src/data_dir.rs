use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The DOCDEX_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/docdex/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var("DOCDEX_DATA_DIR") {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("docdex")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn records_db(&self) -> PathBuf {
        self.root.join("records.redb")
    }

    /// Root under which every index gets its own directory.
    pub fn indices_dir(&self) -> Result<PathBuf> {
        let path = self.root.join("indices");
        std::fs::create_dir_all(&path)
            .map_err(|_| Error::DataDir(path.clone()))?;
        Ok(path)
    }

    /// Storage directory for one index, named by the string form of its
    /// id. Only a successful update brings the directory itself into
    /// being.
    pub fn index_dir(&self, id: u64) -> Result<PathBuf> {
        Ok(self.indices_dir()?.join(id.to_string()))
    }
}
