//! Keyword-driven file discovery, e.g. "the newest admissions extract under
//! data/raw".

use crate::utils::error::{KitError, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    pub keywords: Vec<String>,
    pub mode: MatchMode,
    /// Without leading dot; empty means any extension.
    pub extensions: Vec<String>,
    /// `None` searches the whole tree, `Some(1)` only the root's direct children.
    pub max_depth: Option<usize>,
    pub include_hidden: bool,
}

impl FileQuery {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn matches_name(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();

        if !self.extensions.is_empty() {
            let ext = Path::new(&name)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("");
            if !self.extensions.iter().any(|wanted| wanted == ext) {
                return false;
            }
        }

        let mut keywords = self
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .peekable();
        if keywords.peek().is_none() {
            return true;
        }
        match self.mode {
            MatchMode::All => keywords.all(|k| name.contains(&k)),
            MatchMode::Any => keywords.any(|k| name.contains(&k)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FoundFile {
    pub path: PathBuf,
    pub modified: Option<DateTime<Local>>,
    pub size: u64,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

fn is_office_lock_file(name: &str) -> bool {
    name.starts_with("~$")
}

/// Newest first; equal timestamps fall back to path order.
pub fn find_files(root: &Path, query: &FileQuery) -> Result<Vec<FoundFile>> {
    if !root.is_dir() {
        return Err(KitError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Search root is not a directory: {}", root.display()),
        )));
    }

    let mut walker = WalkDir::new(root).follow_links(false);
    if let Some(depth) = query.max_depth {
        walker = walker.max_depth(depth);
    }

    let mut found = Vec::new();
    let entries = walker
        .into_iter()
        .filter_entry(|e| query.include_hidden || !is_hidden(e));

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if is_office_lock_file(name) || !query.matches_name(name) {
            continue;
        }

        let metadata = entry.metadata().map_err(std::io::Error::from)?;
        found.push(FoundFile {
            path: entry.path().to_path_buf(),
            modified: metadata.modified().ok().map(DateTime::<Local>::from),
            size: metadata.len(),
        });
    }

    found.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
    tracing::debug!(
        "Found {} file(s) under {} for {:?}",
        found.len(),
        root.display(),
        query.keywords
    );
    Ok(found)
}

pub fn latest_file(root: &Path, query: &FileQuery) -> Result<FoundFile> {
    find_files(root, query)?
        .into_iter()
        .next()
        .ok_or_else(|| KitError::FileNotFound {
            root: root.display().to_string(),
            keywords: query.keywords.clone(),
        })
}
