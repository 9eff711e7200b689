use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::changepoint::{ChangepointDocument, DocumentFormat};
use crate::error::Result;

pub const BUILD_LOG_FILE: &str = "build-log.txt";
pub const TEST_REPORT_FILE: &str = "junit_operator.xml";
pub const COMPONENT_HEALTH_FILE: &str = "clusteroperators.json";
pub const CHANGEPOINT_DIR: &str = "orion";

/// The artifacts of one job run that the analysis reads.
///
/// Every artifact is optional; absence selects a fallback path rather than
/// failing the analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactBundle {
    pub build_log: Option<String>,
    pub test_report: Option<String>,
    pub component_health: Option<String>,
    /// Ordered by document name.
    pub changepoints: Vec<ChangepointDocument>,
}

/// Resolves a job reference to its materialized artifacts.
pub trait ArtifactSource {
    fn load(&self, job_ref: &str) -> Result<ArtifactBundle>;
}

/// Reads artifacts laid out the way prow stores them:
///
/// ```text
/// <job>/build-log.txt
/// <job>/junit_operator.xml
/// <job>/clusteroperators.json
/// <job>/orion/*.{json,xml,txt}
/// ```
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactSource for DirectorySource {
    fn load(&self, job_ref: &str) -> Result<ArtifactBundle> {
        let dir = self.root.join(job_ref);
        debug!("Loading artifacts from {}", dir.display());

        Ok(ArtifactBundle {
            build_log: read_optional(&dir.join(BUILD_LOG_FILE)),
            test_report: read_optional(&dir.join(TEST_REPORT_FILE)),
            component_health: read_optional(&dir.join(COMPONENT_HEALTH_FILE)),
            changepoints: read_changepoints(&dir.join(CHANGEPOINT_DIR)),
        })
    }
}

/// Reads a text artifact, mapping "not there" to `None`.
///
/// Invalid UTF-8 is replaced rather than rejected. Other read failures are
/// logged and the artifact is treated as absent.
fn read_optional(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8(bytes).unwrap_or_else(|e| {
            debug!("{} is not valid UTF-8, replacing invalid sequences", path.display());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        })),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Failed to read {}: {e}", path.display());
            None
        }
    }
}

fn read_changepoints(dir: &Path) -> Vec<ChangepointDocument> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!("Failed to list {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let Some(format) = DocumentFormat::from_path(&path) else {
            continue;
        };
        if let Some(content) = read_optional(&path) {
            documents.push(ChangepointDocument {
                name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                format,
                content,
            });
        }
    }
    documents
}
