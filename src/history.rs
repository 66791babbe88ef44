//! Access to the previously accepted protocol revision of a repository.
//!
//! The breaking change detector only needs the latest accepted document, so
//! the trait exposes exactly that. Two backends are provided:
//! - [`GitRevisionHistory`] reads `HEAD:<protocol_path>` from a `<id>.ctrepo`
//!   repository through the `git` binary.
//! - [`MemoryRevisionHistory`] keeps an append-only log per repository.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::document::ProtocolDocument;
use crate::error::HistoryError;

/// Default location of the protocol inside a repository.
pub const DEFAULT_PROTOCOL_PATH: &str = "protocol.yaml";

/// Suffix of repository directories under the repository root.
pub const REPOSITORY_SUFFIX: &str = ".ctrepo";

/// Read-only view of the accepted revisions of each repository.
pub trait RevisionHistory: Send + Sync {
    /// Returns the most recently accepted document, or `None` for a
    /// repository with no accepted protocol yet.
    fn most_recent_document(
        &self,
        repository_id: &str,
    ) -> Result<Option<ProtocolDocument>, HistoryError>;
}

/// Rejects ids that could escape the repository root.
pub fn check_repository_id(repository_id: &str) -> Result<(), HistoryError> {
    let bad = repository_id.is_empty()
        || repository_id.starts_with('.')
        || repository_id.contains(['/', '\\'])
        || repository_id.contains("..");
    if bad {
        return Err(HistoryError::InvalidRepositoryId(repository_id.to_string()));
    }
    Ok(())
}

fn parse_stored(repository_id: &str, raw_text: &str) -> Result<ProtocolDocument, HistoryError> {
    ProtocolDocument::parse(raw_text).map_err(|e| HistoryError::Corrupt {
        repository: repository_id.to_string(),
        reason: e.to_string(),
    })
}

/// Revision history backed by git repositories on disk.
///
/// Each repository is addressed through an explicit `--git-dir`, so a
/// `<id>.ctrepo` that is not itself a repository is an error rather than a
/// read from an enclosing checkout. Inherited `GIT_*` variables are cleared.
#[derive(Debug, Clone)]
pub struct GitRevisionHistory {
    repo_root: PathBuf,
    protocol_path: String,
    command_timeout: Option<Duration>,
}

impl GitRevisionHistory {
    pub fn new<P: Into<PathBuf>>(repo_root: P) -> Self {
        Self {
            repo_root: repo_root.into(),
            protocol_path: DEFAULT_PROTOCOL_PATH.to_string(),
            command_timeout: None,
        }
    }

    /// Kills any git command still running after `timeout`.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn with_protocol_path<S: Into<String>>(mut self, protocol_path: S) -> Self {
        self.protocol_path = protocol_path.into();
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn protocol_path(&self) -> &str {
        &self.protocol_path
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout
    }

    /// Filesystem location of a repository: `<repo_root>/<id>.ctrepo`.
    pub fn repository_path(&self, repository_id: &str) -> Result<PathBuf, HistoryError> {
        check_repository_id(repository_id)?;
        Ok(self
            .repo_root
            .join(format!("{repository_id}{REPOSITORY_SUFFIX}")))
    }
}

/// `<path>/.git` for a working tree, the path itself for a bare repository.
fn git_dir(repo_path: &Path) -> PathBuf {
    let dot_git = repo_path.join(".git");
    if dot_git.exists() {
        dot_git
    } else {
        repo_path.to_path_buf()
    }
}

impl GitRevisionHistory {
    fn git(&self, git_dir: &Path, args: &[&str]) -> Result<Output, HistoryError> {
        let mut command = Command::new("git");
        for (key, _) in std::env::vars_os() {
            if key.to_string_lossy().starts_with("GIT_") {
                command.env_remove(&key);
            }
        }
        command
            .env("LC_ALL", "C")
            .arg("--git-dir")
            .arg(git_dir)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| HistoryError::Git(format!("failed to run git: {e}")))?;
        let Some(timeout) = self.command_timeout else {
            return child
                .wait_with_output()
                .map_err(|e| HistoryError::Git(format!("failed to run git: {e}")));
        };

        // Drain both pipes while polling so a large blob cannot stall the child.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(HistoryError::Git(format!(
                        "git {} timed out after {timeout:?}",
                        args.first().copied().unwrap_or_default()
                    )));
                }
                Ok(None) => thread::sleep(Duration::from_millis(10)),
                Err(e) => return Err(HistoryError::Git(format!("failed to wait for git: {e}"))),
            }
        };
        Ok(Output {
            status,
            stdout: stdout.map(join_drain).unwrap_or_default(),
            stderr: stderr.map(join_drain).unwrap_or_default(),
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_drain(handle: thread::JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

impl RevisionHistory for GitRevisionHistory {
    fn most_recent_document(
        &self,
        repository_id: &str,
    ) -> Result<Option<ProtocolDocument>, HistoryError> {
        let repo_path = self.repository_path(repository_id)?;
        if !repo_path.is_dir() {
            return Err(HistoryError::RepositoryNotFound(repository_id.to_string()));
        }
        let git_dir = git_dir(&repo_path);

        // Exit 1 means the revision does not resolve: no commits yet, or no
        // protocol in HEAD. Anything else (128) is a broken repository.
        let object = format!("HEAD:{}", self.protocol_path);
        let resolved = self.git(&git_dir, &["rev-parse", "--verify", "--quiet", &object])?;
        match resolved.status.code() {
            Some(0) => {}
            Some(1) => {
                debug!(repository = repository_id, "no committed protocol found");
                return Ok(None);
            }
            _ => {
                return Err(HistoryError::Git(format!(
                    "{}: {}",
                    repo_path.display(),
                    String::from_utf8_lossy(&resolved.stderr).trim()
                )));
            }
        }
        let oid = String::from_utf8_lossy(&resolved.stdout).trim().to_string();

        let output = self.git(&git_dir, &["cat-file", "blob", &oid])?;
        if !output.status.success() {
            return Err(HistoryError::Git(format!(
                "git cat-file {object} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let content = String::from_utf8(output.stdout).map_err(|e| HistoryError::Corrupt {
            repository: repository_id.to_string(),
            reason: format!("protocol is not UTF-8: {e}"),
        })?;
        debug!(
            repository = repository_id,
            bytes = content.len(),
            "loaded committed protocol"
        );
        parse_stored(repository_id, &content).map(Some)
    }
}

/// Append-only in-memory history. The last appended revision is the latest.
#[derive(Debug, Default)]
pub struct MemoryRevisionHistory {
    log: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryRevisionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an accepted revision's raw text.
    pub fn append<S: Into<String>>(&self, repository_id: &str, raw_text: S) {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.entry(repository_id.to_string())
            .or_default()
            .push(raw_text.into());
    }

    pub fn revision_count(&self, repository_id: &str) -> usize {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.get(repository_id).map_or(0, Vec::len)
    }
}

impl RevisionHistory for MemoryRevisionHistory {
    fn most_recent_document(
        &self,
        repository_id: &str,
    ) -> Result<Option<ProtocolDocument>, HistoryError> {
        let latest = {
            let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
            log.get(repository_id)
                .and_then(|revisions| revisions.last())
                .cloned()
        };
        latest
            .map(|raw| parse_stored(repository_id, &raw))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_id_rules() {
        assert!(check_repository_id("nsclc-phase2").is_ok());
        for bad in ["", "../etc", "a/b", "a\\b", ".hidden", "x..y"] {
            assert!(
                matches!(
                    check_repository_id(bad),
                    Err(HistoryError::InvalidRepositoryId(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_repository_path_layout() {
        let history = GitRevisionHistory::new("/var/ctrepos");
        assert_eq!(
            history.repository_path("trial").unwrap(),
            PathBuf::from("/var/ctrepos/trial.ctrepo")
        );
        assert_eq!(history.protocol_path(), DEFAULT_PROTOCOL_PATH);
    }

    #[test]
    fn test_missing_repository_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let history = GitRevisionHistory::new(dir.path());
        assert!(matches!(
            history.most_recent_document("absent"),
            Err(HistoryError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn test_memory_history_latest_wins() {
        let history = MemoryRevisionHistory::new();
        assert!(history.most_recent_document("t").unwrap().is_none());

        history.append("t", "meta: {id: P1, version: '1'}\n");
        history.append("t", "meta: {id: P1, version: '2'}\n");
        assert_eq!(history.revision_count("t"), 2);
        assert_eq!(history.revision_count("other"), 0);

        let latest = history.most_recent_document("t").unwrap().unwrap();
        assert_eq!(latest.version().as_deref(), Some("2"));
    }

    #[test]
    fn test_memory_history_corrupt_revision() {
        let history = MemoryRevisionHistory::new();
        history.append("t", "[unterminated");
        assert!(matches!(
            history.most_recent_document("t"),
            Err(HistoryError::Corrupt { .. })
        ));
    }
}
