use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{debug, trace};

/// Session record file name, shared by every SDK that talks to the same
/// auth server so a session created by one can be reused by another.
pub const SESSION_FILE: &str = "semantria-session.dat";

/// Environment variable naming a directory for the session record.
pub const ENV_SESSION_DIR: &str = "SEMANTRIA_SESSION_DIR";

/// Best-effort local record of the last session id per username.
///
/// The record is two lines, `<username>\n<session id>\n`, stored in the first
/// writable directory among the candidates. Nothing here ever fails: every
/// I/O problem is logged and treated as a cache miss. There is no locking,
/// so processes sharing a directory race and the last writer wins.
#[derive(Debug)]
pub struct SessionCache {
    candidates: Vec<PathBuf>,
    resolved: OnceLock<PathBuf>,
}

impl SessionCache {
    /// Cache over [`candidate_dirs`] for this process's home directory and
    /// `$SEMANTRIA_SESSION_DIR`.
    pub fn new(explicit: Option<PathBuf>) -> Self {
        let env_dir = std::env::var_os(ENV_SESSION_DIR).map(PathBuf::from);
        Self::from_candidates(candidate_dirs(explicit, dirs::home_dir(), env_dir))
    }

    pub fn from_candidates(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            resolved: OnceLock::new(),
        }
    }

    /// First existing, writable candidate directory. Remembered once found.
    pub fn resolve_writable_directory(&self) -> Option<&Path> {
        if let Some(dir) = self.resolved.get() {
            return Some(dir.as_path());
        }

        match self.candidates.iter().find(|dir| is_writable_dir(dir)) {
            Some(dir) => Some(self.resolved.get_or_init(|| dir.clone()).as_path()),
            None => {
                debug!("No writeable directory found for session data. Will not cache session data.");
                None
            }
        }
    }

    pub fn session_path(&self) -> Option<PathBuf> {
        self.resolve_writable_directory().map(|dir| dir.join(SESSION_FILE))
    }

    /// Cached session id for `username`, if the record belongs to them.
    pub fn load(&self, username: &str) -> Option<String> {
        let path = self.session_path()?;
        if !path.exists() {
            return None;
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Error reading session data");
                return None;
            }
        };

        let mut lines = contents.lines();
        let (Some(stored_user), Some(session_id)) = (lines.next(), lines.next()) else {
            return None;
        };

        let session_id = session_id.trim();
        if stored_user.trim() != username || session_id.is_empty() {
            return None;
        }
        Some(session_id.to_string())
    }

    /// Overwrite the record with `username` and `session_id`.
    pub fn save(&self, session_id: &str, username: &str) {
        let Some(path) = self.session_path() else {
            return;
        };

        let contents = format!("{}\n{}\n", username, session_id);
        if let Err(e) = std::fs::write(&path, contents) {
            debug!(path = %path.display(), error = %e, "Error writing session data");
        }
    }

    pub fn clear(&self) {
        let Some(path) = self.session_path() else {
            return;
        };

        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!(path = %path.display(), error = %e, "Error deleting session data"),
        }
    }
}

/// Directories searched for the session record, in order: `explicit`, the
/// home directory, the `SEMANTRIA_SESSION_DIR` value, `/tmp`, `/temp`.
pub fn candidate_dirs(
    explicit: Option<PathBuf>,
    home: Option<PathBuf>,
    env_dir: Option<PathBuf>,
) -> Vec<PathBuf> {
    explicit
        .into_iter()
        .chain(home)
        .chain(env_dir)
        .chain([PathBuf::from("/tmp"), PathBuf::from("/temp")])
        .collect()
}

/// Whether the current user can create files in `dir`. Mode bits alone are
/// not enough: a 0755 directory owned by someone else is not writable.
fn is_writable_dir(dir: &Path) -> bool {
    match tempfile::NamedTempFile::new_in(dir) {
        Ok(_) => true,
        Err(e) => {
            trace!(dir = %dir.display(), error = %e, "Directory not writable");
            false
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> SessionCache {
        SessionCache::from_candidates(vec![dir.path().to_path_buf()])
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.save("s1", "alice");
        assert_eq!(cache.load("alice").as_deref(), Some("s1"));
        assert_eq!(cache.load("bob"), None);
    }

    #[test]
    fn test_file_format() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.save("s1", "bob@x.com");
        let contents = std::fs::read_to_string(dir.path().join(SESSION_FILE)).unwrap();
        assert_eq!(contents, "bob@x.com\ns1\n");

        cache.save("s2", "bob@x.com");
        let contents = std::fs::read_to_string(dir.path().join(SESSION_FILE)).unwrap();
        assert_eq!(contents, "bob@x.com\ns2\n");
    }

    #[test]
    fn test_load_missing_empty_or_short_file() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let path = dir.path().join(SESSION_FILE);

        assert_eq!(cache.load("alice"), None);

        std::fs::write(&path, "").unwrap();
        assert_eq!(cache.load("alice"), None);

        std::fs::write(&path, "alice\n").unwrap();
        assert_eq!(cache.load("alice"), None);

        std::fs::write(&path, "alice\n\n").unwrap();
        assert_eq!(cache.load("alice"), None);
    }

    #[test]
    fn test_load_tolerates_crlf() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        std::fs::write(dir.path().join(SESSION_FILE), "alice\r\ns9\r\n").unwrap();
        assert_eq!(cache.load("alice").as_deref(), Some("s9"));
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        cache.save("s1", "alice");
        cache.clear();
        assert!(!dir.path().join(SESSION_FILE).exists());
        assert_eq!(cache.load("alice"), None);

        // Clearing twice is fine
        cache.clear();
    }

    #[test]
    fn test_resolution_skips_missing_directories() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let cache = SessionCache::from_candidates(vec![missing, dir.path().to_path_buf()]);
        assert_eq!(cache.resolve_writable_directory(), Some(dir.path()));
    }

    #[test]
    fn test_no_writable_directory() {
        let dir = TempDir::new().unwrap();
        let cache = SessionCache::from_candidates(vec![dir.path().join("nope")]);

        assert_eq!(cache.resolve_writable_directory(), None);
        cache.save("s1", "alice");
        assert_eq!(cache.load("alice"), None);
        cache.clear();
    }

    #[test]
    fn test_candidate_order() {
        let dirs = candidate_dirs(
            Some(PathBuf::from("/explicit")),
            Some(PathBuf::from("/home/bob")),
            Some(PathBuf::from("/from/env")),
        );
        let expected: Vec<PathBuf> = ["/explicit", "/home/bob", "/from/env", "/tmp", "/temp"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(dirs, expected);
    }

    #[test]
    fn test_candidate_order_without_overrides() {
        let dirs = candidate_dirs(None, Some(PathBuf::from("/home/bob")), None);
        let expected: Vec<PathBuf> = ["/home/bob", "/tmp", "/temp"].iter().map(PathBuf::from).collect();
        assert_eq!(dirs, expected);

        let dirs = candidate_dirs(None, None, Some(PathBuf::from("/from/env")));
        let expected: Vec<PathBuf> = ["/from/env", "/tmp", "/temp"].iter().map(PathBuf::from).collect();
        assert_eq!(dirs, expected);
    }

    #[test]
    fn test_resolution_skips_plain_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let cache = SessionCache::from_candidates(vec![file, dir.path().to_path_buf()]);
        assert_eq!(cache.resolve_writable_directory(), Some(dir.path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolution_skips_directories_owned_by_others() {
        // `/` is 0755 and owned by root: its mode bits say writable, but an
        // ordinary user cannot create files there
        let root_dir = Path::new("/");
        let check = root_dir.join(".semantria-write-check");
        if std::fs::OpenOptions::new().write(true).create_new(true).open(&check).is_ok() {
            // Running as root; every directory is writable
            let _ = std::fs::remove_file(&check);
            return;
        }

        let dir = TempDir::new().unwrap();
        let cache = SessionCache::from_candidates(vec![root_dir.to_path_buf(), dir.path().to_path_buf()]);
        assert_eq!(cache.resolve_writable_directory(), Some(dir.path()));

        cache.save("s1", "alice");
        assert_eq!(cache.load("alice").as_deref(), Some("s1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolution_skips_read_only_directories() {
        use std::os::unix::fs::PermissionsExt;

        let locked = TempDir::new().unwrap();
        let open = TempDir::new().unwrap();
        std::fs::set_permissions(locked.path(), std::fs::Permissions::from_mode(0o555)).unwrap();

        let cache = SessionCache::from_candidates(vec![
            locked.path().to_path_buf(),
            open.path().to_path_buf(),
        ]);
        let resolved = cache.resolve_writable_directory().map(Path::to_path_buf);
        let writable_anyway = std::fs::write(locked.path().join("check"), "x").is_ok();
        std::fs::set_permissions(locked.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        if !writable_anyway {
            assert_eq!(resolved.as_deref(), Some(open.path()));
        }
    }

    #[test]
    fn test_writability_check_leaves_no_files() {
        let dir = TempDir::new().unwrap();
        assert!(is_writable_dir(dir.path()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_resolved_directory_is_remembered() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let first = cache.resolve_writable_directory().map(Path::to_path_buf);
        assert_eq!(first.as_deref(), Some(dir.path()));
        assert_eq!(cache.resolve_writable_directory(), first.as_deref());
    }
}
