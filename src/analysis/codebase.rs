//! Working-tree scan for languages and component buckets.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisOptions;
use crate::error::DataSourceError;

/// Path keywords per component bucket. A file may land in several buckets.
const COMPONENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("api", &["api", "controller", "router", "endpoint"]),
    ("services", &["service", "usecase", "domain"]),
    ("models", &["model", "entity", "schema", "dto"]),
    (
        "infrastructure",
        &["infra", "adapter", "db", "repository", "persistence"],
    ),
    ("frontend", &["ui", "view", "component", "page"]),
    ("tests", &["test", "spec", "e2e", "integration"]),
];

/// What the scan found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseProfile {
    /// Files scanned, relative to the root with `/` separators.
    pub files: Vec<String>,
    /// File count per lower-cased extension.
    pub languages: BTreeMap<String, usize>,
    /// Files per component bucket; empty buckets are omitted.
    pub components: BTreeMap<String, Vec<String>>,
    /// Whether the scan stopped at the file limit.
    pub truncated: bool,
}

/// Walks a working tree.
pub struct CodebaseScanner<'a> {
    exclude: &'a GlobSet,
    extensions: &'a [String],
    max_files: usize,
}

impl<'a> CodebaseScanner<'a> {
    /// Creates a scanner from the analysis options.
    pub fn new(options: &'a AnalysisOptions) -> Self {
        Self {
            exclude: &options.exclude,
            extensions: &options.languages_of_interest,
            max_files: options.max_files,
        }
    }

    /// Scans `root`, skipping `.git`, symlinks and excluded paths.
    ///
    /// Entries are visited in name order so the result is stable.
    pub fn scan(&self, root: &Path) -> Result<CodebaseProfile, DataSourceError> {
        let mut files = Vec::new();
        let truncated = self
            .walk(root, root, &mut files)
            .map_err(|e| DataSourceError::CodeScan {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;

        debug!(root = %root.display(), files = files.len(), truncated, "Scanned working tree");

        Ok(CodebaseProfile {
            languages: language_breakdown(&files),
            components: detect_components(&files),
            files,
            truncated,
        })
    }

    /// Returns `true` when a wanted file was left out because the limit was reached.
    fn walk(&self, root: &Path, dir: &Path, files: &mut Vec<String>) -> std::io::Result<bool> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        entries.sort();

        for path in entries {
            if path.file_name().is_some_and(|name| name == ".git") {
                continue;
            }
            let file_type = fs::symlink_metadata(&path)?.file_type();
            if file_type.is_symlink() {
                continue;
            }

            let relative = relative_path(root, &path);
            if self.exclude.is_match(&relative) {
                continue;
            }

            if file_type.is_dir() {
                if self.walk(root, &path, files)? {
                    return Ok(true);
                }
            } else if file_type.is_file() && self.wanted(&relative) {
                if files.len() >= self.max_files {
                    return Ok(true);
                }
                files.push(relative);
            }
        }
        Ok(false)
    }

    fn wanted(&self, relative: &str) -> bool {
        self.extensions.is_empty()
            || extension(relative).is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(&ext))
            })
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_lowercase())
}

/// File count per lower-cased extension; files without one are skipped.
pub fn language_breakdown(files: &[String]) -> BTreeMap<String, usize> {
    let mut languages = BTreeMap::new();
    for ext in files.iter().filter_map(|f| extension(f)) {
        *languages.entry(ext).or_default() += 1;
    }
    languages
}

/// Buckets files by keywords in their lower-cased path.
pub fn detect_components(files: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut buckets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for file in files {
        let lower = file.to_lowercase();
        for (bucket, keywords) in COMPONENT_KEYWORDS {
            if keywords.iter().any(|k| lower.contains(k)) {
                buckets
                    .entry((*bucket).to_string())
                    .or_default()
                    .push(file.clone());
            }
        }
    }
    for files in buckets.values_mut() {
        files.sort();
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisOptions;
    use globset::{Glob, GlobSetBuilder};

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn options(exclude: &[&str], languages: &[&str], max_files: usize) -> AnalysisOptions {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude {
            builder.add(Glob::new(pattern).unwrap());
        }
        AnalysisOptions {
            max_files,
            languages_of_interest: languages.iter().map(|s| (*s).to_string()).collect(),
            exclude: builder.build().unwrap(),
            exclude_patterns: exclude.iter().map(|s| (*s).to_string()).collect(),
            ..AnalysisOptions::default()
        }
    }

    #[test]
    fn test_scan_skips_git_and_excluded() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".git/HEAD");
        touch(dir.path(), "src/api/routes.rs");
        touch(dir.path(), "src/models/user.rs");
        touch(dir.path(), "target/debug/build.rs");
        touch(dir.path(), "README.md");

        let opts = options(&["target/**"], &[], 100);
        let profile = CodebaseScanner::new(&opts).scan(dir.path()).unwrap();

        assert_eq!(
            profile.files,
            vec!["README.md", "src/api/routes.rs", "src/models/user.rs"]
        );
        assert_eq!(profile.languages.get("rs"), Some(&2));
        assert_eq!(profile.languages.get("md"), Some(&1));
        assert!(!profile.truncated);
    }

    #[test]
    fn test_scan_filters_extensions_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.py");
        touch(dir.path(), "b.rs");
        touch(dir.path(), "c.rs");
        touch(dir.path(), "d.RS");

        let opts = options(&[], &["rs"], 2);
        let profile = CodebaseScanner::new(&opts).scan(dir.path()).unwrap();
        assert_eq!(profile.files, vec!["b.rs", "c.rs"]);
        assert!(profile.truncated);
    }

    #[test]
    fn test_scan_limit_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.rs");
        touch(dir.path(), "b.rs");

        let profile = CodebaseScanner::new(&options(&[], &[], 2)).scan(dir.path()).unwrap();
        assert_eq!(profile.files.len(), 2);
        assert!(!profile.truncated);

        let profile = CodebaseScanner::new(&options(&[], &[], 0)).scan(dir.path()).unwrap();
        assert!(profile.files.is_empty());
        assert!(profile.truncated);
    }

    #[test]
    fn test_scan_missing_root_is_data_source_error() {
        let opts = AnalysisOptions::default();
        let err = CodebaseScanner::new(&opts)
            .scan(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert_eq!(err.source_name(), "codebase scan");
    }

    #[test]
    fn test_detect_components() {
        let files: Vec<String> = [
            "src/api/user_controller.rs",
            "src/domain/billing_service.rs",
            "tests/integration_test.rs",
            "Makefile",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect();

        let components = detect_components(&files);
        assert_eq!(components["api"], vec!["src/api/user_controller.rs"]);
        assert_eq!(components["services"], vec!["src/domain/billing_service.rs"]);
        assert_eq!(components["tests"], vec!["tests/integration_test.rs"]);
        assert!(!components.contains_key("frontend"));
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("src/lib.RS"), Some("rs".to_string()));
        assert_eq!(extension(".gitignore"), None);
        assert_eq!(extension("Makefile"), None);
    }
}
