//! List roots (spec §4.1): enumerate candidate photons from a working
//! directory plus a set of bundled paths, with user-directory entries
//! winning over bundled ones on name collision.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One candidate photon found on disk, before pre-check or load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotonCandidate {
    pub name: String,
    pub path: PathBuf,
}

/// A file named `<name>.photon.ts` directly under a root is a candidate
/// named `<name>`. Non-matching files and directories are ignored by this
/// pass (directory-scoped assets are resolved once a photon is known, see
/// `photon-watch`).
fn candidates_in(root: &Path) -> Vec<PhotonCandidate> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(name) = file_name.strip_suffix(".photon.ts") {
            found.push(PhotonCandidate { name: name.to_string(), path: path.clone() });
        }
    }
    found
}

/// Enumerate candidates from the working directory and a list of bundled
/// roots, with the working directory taking precedence on name collision.
pub fn list_roots(working_dir: &Path, bundled_roots: &[PathBuf]) -> Vec<PhotonCandidate> {
    let mut by_name: HashMap<String, PhotonCandidate> = HashMap::new();

    for root in bundled_roots {
        for candidate in candidates_in(root) {
            by_name.insert(candidate.name.clone(), candidate);
        }
    }
    // User directory wins on collision: inserted last.
    for candidate in candidates_in(working_dir) {
        by_name.insert(candidate.name.clone(), candidate);
    }

    let mut result: Vec<_> = by_name.into_values().collect();
    result.sort_by(|a, b| a.name.cmp(&b.name));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_photon_ts_files_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("git-box.photon.ts"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let found = list_roots(dir.path(), &[]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "git-box");
    }

    #[test]
    fn user_directory_wins_on_name_collision() {
        let bundled = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        fs::write(bundled.path().join("git-box.photon.ts"), "bundled").unwrap();
        fs::write(user.path().join("git-box.photon.ts"), "user").unwrap();

        let found = list_roots(user.path(), &[bundled.path().to_path_buf()]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, user.path().join("git-box.photon.ts"));
    }
}
