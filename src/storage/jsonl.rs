//! Newline-delimited JSON run store
//!
//! Layout of a run directory:
//!
//! ```text
//! {data_path}/{run_id}/
//!     run.json                          run manifest
//!     users/{node_id}_{direction}.jsonl one user object per line, API order
//! ```

use crate::state::{EdgeDirection, NodeId, UserRecord};
use crate::storage::manifest::RunManifest;
use crate::storage::traits::{RunStore, StorageError, StorageResult};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "jsonl";
const MANIFEST_FILE: &str = "run.json";

/// File-system run store writing one JSONL file per edge-set
#[derive(Debug, Clone)]
pub struct JsonlRunStore {
    run_id: String,
    run_dir: PathBuf,
}

impl JsonlRunStore {
    /// Opens the store for a run
    ///
    /// No files are touched until the first write.
    ///
    /// # Arguments
    ///
    /// * `data_path` - Base output directory holding all runs
    /// * `run_id` - Identifier of this run (used as the directory name)
    pub fn open(data_path: &Path, run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            run_dir: data_path.join(run_id),
        }
    }

    /// Directory holding every artifact of this run
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Directory holding the edge-set records
    pub fn users_dir(&self) -> PathBuf {
        self.run_dir.join("users")
    }

    /// Location of the edge-set record for a pair
    pub fn record_path(&self, node: &NodeId, direction: EdgeDirection) -> PathBuf {
        self.users_dir()
            .join(format!("{}_{}.{}", node, direction, RECORD_EXTENSION))
    }

    /// Location of the run manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.run_dir.join(MANIFEST_FILE)
    }

    /// Loads the run manifest, if this run has one
    pub fn load_manifest(&self) -> StorageResult<Option<RunManifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Saves the run manifest atomically
    pub fn save_manifest(&self, manifest: &RunManifest) -> StorageResult<()> {
        let content = serde_json::to_vec_pretty(manifest)?;
        write_atomic(&self.manifest_path(), |writer| {
            writer.write_all(&content)?;
            Ok(())
        })
    }
}

impl RunStore for JsonlRunStore {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn exists(&self, node: &NodeId, direction: EdgeDirection) -> StorageResult<bool> {
        Ok(self.record_path(node, direction).is_file())
    }

    fn read(&self, node: &NodeId, direction: EdgeDirection) -> StorageResult<Vec<UserRecord>> {
        let path = self.record_path(node, direction);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    node: node.clone(),
                    direction,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|source| StorageError::Corrupt {
                path: path.display().to_string(),
                line: index + 1,
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn write(
        &self,
        node: &NodeId,
        direction: EdgeDirection,
        records: &[UserRecord],
    ) -> StorageResult<()> {
        write_atomic(&self.record_path(node, direction), |writer| {
            for record in records {
                serde_json::to_writer(&mut *writer, record)?;
                writer.write_all(b"\n")?;
            }
            Ok(())
        })
    }

    fn list(&self) -> StorageResult<Vec<(NodeId, EdgeDirection)>> {
        let dir = self.users_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut pairs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match parse_record_stem(stem) {
                Some(pair) => pairs.push(pair),
                None => tracing::debug!("Ignoring unrecognized file {}", path.display()),
            }
        }
        pairs.sort();
        Ok(pairs)
    }
}

/// Parses `{node_id}_{direction}` back into its parts
fn parse_record_stem(stem: &str) -> Option<(NodeId, EdgeDirection)> {
    let (node, direction) = stem.rsplit_once('_')?;
    Some((NodeId::parse(node).ok()?, direction.parse().ok()?))
}

/// Writes a file by filling a temporary sibling and renaming it into place
///
/// The temporary file is synced before the rename, so a crash leaves either
/// the previous file or the complete new one.
pub(crate) fn write_atomic<F>(path: &Path, fill: F) -> StorageResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> StorageResult<()>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result: StorageResult<()> = (|| {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        fill(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}
