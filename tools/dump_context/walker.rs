//! Directory traversal with ignore-set pruning.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Directory names never descended into.
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".github",
    ".bundle",
    ".gradle",
    ".vscode",
    ".vs",
    "dist",
    "build",
    "__pycache__",
    ".idea",
    ".vite",
    "release",
];

/// File-name suffixes that are never dumped (binary assets, lockfiles, secrets).
pub const IGNORED_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".ico", ".svg", ".ttf", ".woff", ".woff2", ".eot", ".lock",
    ".env", ".DS_Store", ".mp3", ".wav", ".ogg", ".zip", ".rar", ".gz", ".exe", ".dll", ".so",
    ".pkg", ".deb", ".dmg",
];

pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

pub fn has_ignored_extension(name: &str) -> bool {
    IGNORED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Collect dumpable files under `root`, top-down. Returns how many
/// entries below the root were skipped because they could not be read.
///
/// Within a directory, files come first in name order, then each
/// non-ignored subdirectory (also in name order) is walked. Ignored
/// directories are pruned before descending, so nothing beneath them is
/// ever listed. Symlinked directories are not followed. Only an unreadable
/// root is an error.
pub fn collect_files(root: &Path, acc: &mut Vec<PathBuf>) -> io::Result<usize> {
    let entries = fs::read_dir(root)?;
    let mut skipped = 0;
    walk_entries(entries, acc, &mut skipped);
    Ok(skipped)
}

fn descend(dir: &Path, acc: &mut Vec<PathBuf>, skipped: &mut usize) {
    match fs::read_dir(dir) {
        Ok(entries) => walk_entries(entries, acc, skipped),
        Err(e) => {
            warn!("Cannot read directory {}: {}", dir.display(), e);
            *skipped += 1;
        }
    }
}

fn walk_entries(entries: fs::ReadDir, acc: &mut Vec<PathBuf>, skipped: &mut usize) {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();

    for entry in entries {
        let (entry, file_type) = match entry.and_then(|e| e.file_type().map(|t| (e, t))) {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Cannot read directory entry: {}", e);
                *skipped += 1;
                continue;
            }
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();

        let path = entry.path();
        if file_type.is_dir() {
            if !is_ignored_dir(&name) {
                subdirs.push(path);
            }
        } else if file_type.is_symlink() && path.is_dir() {
            continue;
        } else if !has_ignored_extension(&name) {
            files.push(path);
        }
    }

    files.sort();
    subdirs.sort();
    acc.extend(files);
    for sub in subdirs {
        descend(&sub, acc, skipped);
    }
}

/// Relative path from `root` with separators normalized to `/`.
pub fn display_relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, "x").unwrap();
    }

    fn walk(root: &Path) -> Vec<String> {
        let mut acc = Vec::new();
        assert_eq!(collect_files(root, &mut acc).unwrap(), 0);
        acc.iter().map(|p| display_relative(root, p)).collect()
    }

    #[test]
    fn prunes_ignored_dirs_at_any_depth() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "src/app.ts");
        touch(root, "node_modules/react/index.js");
        touch(root, "src/nested/build/out.js");
        touch(root, "android/.gradle/cache.bin");
        touch(root, "android/app/Main.java");

        let got = walk(root);
        assert_eq!(got, vec!["android/app/Main.java", "src/app.ts"]);
        assert!(got.iter().all(|p| !p.contains("node_modules") && !p.contains("/build/")));
    }

    #[test]
    fn skips_ignored_extensions_outside_ignored_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "assets/logo.png");
        touch(root, "yarn.lock");
        touch(root, ".env");
        touch(root, "prod.env");
        touch(root, "index.js");

        assert_eq!(walk(root), vec!["index.js"]);
    }

    #[test]
    fn files_before_subdirs_each_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "b.ts");
        touch(root, "a.ts");
        touch(root, "z/inner.ts");
        touch(root, "m/inner.ts");

        assert_eq!(walk(root), vec!["a.ts", "b.ts", "m/inner.ts", "z/inner.ts"]);
    }

    #[test]
    fn extension_matching_is_suffix_based() {
        assert!(has_ignored_extension("font.woff2"));
        assert!(has_ignored_extension(".DS_Store"));
        assert!(!has_ignored_extension("main.rs"));
        assert!(!has_ignored_extension("png.ts"));
    }

    #[test]
    fn ignored_dir_names_are_exact() {
        assert!(is_ignored_dir("node_modules"));
        assert!(!is_ignored_dir("builds"));
        assert!(!is_ignored_dir("src"));
    }

    #[test]
    fn vanished_subdir_is_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut acc = Vec::new();
        let mut skipped = 0;
        descend(&tmp.path().join("removed-during-walk"), &mut acc, &mut skipped);
        assert_eq!(skipped, 1);
        assert!(acc.is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut acc = Vec::new();
        assert!(collect_files(&tmp.path().join("nope"), &mut acc).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdir_keeps_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(root, "a/keep.ts");
        touch(root, "locked/secret.ts");
        touch(root, "z/keep.ts");
        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Running with privileges that bypass permission bits.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut acc = Vec::new();
        let skipped = collect_files(root, &mut acc).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(skipped, 1);
        let got: Vec<String> = acc.iter().map(|p| display_relative(root, p)).collect();
        assert_eq!(got, vec!["a/keep.ts", "z/keep.ts"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_still_go_through_ignore_sets() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::write(root.join(OsStr::from_bytes(b"x\xff.png")), "img").unwrap();
        fs::write(root.join(OsStr::from_bytes(b"y\xff.ts")), "code").unwrap();
        let odd_dir = root.join(OsStr::from_bytes(b"d\xff"));
        fs::create_dir(&odd_dir).unwrap();
        fs::write(odd_dir.join("inner.ts"), "code").unwrap();

        let mut acc = Vec::new();
        collect_files(root, &mut acc).unwrap();
        let got: Vec<String> = acc.iter().map(|p| display_relative(root, p)).collect();
        assert_eq!(got, vec!["y\u{FFFD}.ts", "d\u{FFFD}/inner.ts"]);
    }
}
