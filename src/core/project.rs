//! Analysis project scaffolding.
//!
//! A project is named after the commitment it reports on, e.g.
//! `1.3.a_Use_Of_Force_Review/`, with a fixed folder skeleton, a period
//! subfolder for the current reporting period and a starter script.

use crate::core::period::Period;
use crate::utils::error::{KitError, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

const MAX_PROJECT_NAME: usize = 60;

static COMMITMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(?:\.\d{1,3})*(?:\.[a-z])?$").expect("commitment pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Commitment(String);

impl Commitment {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `1.3.a` → `1_3_a`, for file names that should not contain dots.
    pub fn underscored(&self) -> String {
        self.0.replace('.', "_")
    }
}

impl FromStr for Commitment {
    type Err = KitError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        if COMMITMENT.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(KitError::InvalidCommitment {
                value: s.to_string(),
            })
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Title words joined by `_`, punctuation dropped, first letter of each word
/// upper-cased.
pub fn title_slug(title: &str) -> String {
    title
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-' || c == '/')
        .map(|word| word.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

pub fn project_name(commitment: &Commitment, title: &str) -> String {
    let slug = title_slug(title);
    let name = if slug.is_empty() {
        commitment.to_string()
    } else {
        format!("{}_{}", commitment, slug)
    };
    let truncated: String = name.chars().take(MAX_PROJECT_NAME).collect();
    truncated.trim_end_matches('_').to_string()
}

pub fn script_name(commitment: &Commitment, title: &str, ext: &str) -> String {
    let slug = title_slug(title);
    let stem = if slug.is_empty() {
        commitment.underscored()
    } else {
        format!("{}_{}", commitment.underscored(), slug)
    };
    let stem: String = stem.chars().take(MAX_PROJECT_NAME).collect();
    format!("{}.{}", stem.trim_end_matches('_'), ext.trim_start_matches('.'))
}

#[derive(Debug, Clone)]
pub struct ScaffoldConfig {
    pub folders: Vec<String>,
    /// Folders that get a `<period>` subfolder.
    pub period_folders: Vec<String>,
    pub script_extension: String,
    pub author: Option<String>,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            folders: ["data/raw", "data/clean", "output", "scripts", "docs"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            period_folders: vec!["data/raw".to_string(), "output".to_string()],
            script_extension: "R".to_string(),
            author: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectRequest {
    pub commitment: Commitment,
    pub title: String,
    pub period: Period,
    pub created: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedFile {
    pub path: PathBuf,
    #[serde(skip)]
    pub contents: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScaffoldPlan {
    pub root: PathBuf,
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PlannedFile>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScaffoldReport {
    pub created_dirs: Vec<PathBuf>,
    pub created_files: Vec<PathBuf>,
    pub skipped_files: Vec<PathBuf>,
}

pub fn plan(
    request: &ProjectRequest,
    config: &ScaffoldConfig,
    projects_root: &Path,
) -> ScaffoldPlan {
    let root = projects_root.join(project_name(&request.commitment, &request.title));
    let period = request.period.to_string();

    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut push_dir = |dir: PathBuf| {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    };
    for folder in &config.folders {
        push_dir(root.join(folder));
    }
    for folder in &config.period_folders {
        push_dir(root.join(folder).join(&period));
    }
    let scripts_dir = root.join("scripts");
    push_dir(scripts_dir.clone());

    let script = script_name(&request.commitment, &request.title, &config.script_extension);
    let files = vec![
        PlannedFile {
            path: root.join("README.md"),
            contents: readme(request, config),
        },
        PlannedFile {
            path: root.join(".gitignore"),
            contents: gitignore(),
        },
        PlannedFile {
            path: scripts_dir.join(&script),
            contents: script_stub(request, config),
        },
    ];

    ScaffoldPlan { root, dirs, files }
}

/// Creates the planned tree. An existing project root is an error unless
/// `force`, and existing files are never overwritten.
pub fn scaffold(plan: &ScaffoldPlan, force: bool) -> Result<ScaffoldReport> {
    if plan.root.exists() && !force {
        return Err(KitError::ProjectExists {
            path: plan.root.display().to_string(),
        });
    }

    let mut report = ScaffoldReport::default();
    if !plan.root.exists() {
        report.created_dirs.push(plan.root.clone());
    }
    std::fs::create_dir_all(&plan.root)?;

    for dir in &plan.dirs {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            tracing::debug!("Created {}", dir.display());
            report.created_dirs.push(dir.clone());
        }
    }

    for file in &plan.files {
        if file.path.exists() {
            tracing::debug!("Keeping existing {}", file.path.display());
            report.skipped_files.push(file.path.clone());
            continue;
        }
        if let Some(parent) = file.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file.path, &file.contents)?;
        report.created_files.push(file.path.clone());
    }

    Ok(report)
}

fn readme(request: &ProjectRequest, config: &ScaffoldConfig) -> String {
    let mut text = format!(
        "# {} {}\n\n- Commitment: {}\n- Reporting period: {}\n- Created: {}\n",
        request.commitment,
        request.title.trim(),
        request.commitment,
        request.period,
        request.created.format("%Y-%m-%d"),
    );
    if let Some(author) = &config.author {
        text.push_str(&format!("- Analyst: {}\n", author));
    }
    text.push_str("\n## Layout\n\n");
    for folder in &config.folders {
        text.push_str(&format!("- `{}/`\n", folder));
    }
    text.push_str(&format!(
        "\nRaw extracts and outputs are filed under `{}/` subfolders per reporting period.\n",
        request.period
    ));
    text
}

fn gitignore() -> String {
    concat!(
        "# Extracts and outputs may contain sensitive records\n",
        "data/\noutput/\n*.xlsx\n~$*\n",
        ".Rhistory\n.RData\n.Rproj.user/\n",
    )
    .to_string()
}

fn script_stub(request: &ProjectRequest, config: &ScaffoldConfig) -> String {
    let mut text = format!(
        "# Commitment {}: {}\n# Reporting period: {}\n# Created: {}\n",
        request.commitment,
        request.title.trim(),
        request.period,
        request.created.format("%Y-%m-%d"),
    );
    if let Some(author) = &config.author {
        text.push_str(&format!("# Analyst: {}\n", author));
    }
    text.push_str(&format!(
        concat!(
            "\nfolder_date <- \"{}\"\n",
            "data_dir <- file.path(\"data\", \"raw\", folder_date)\n",
            "output_dir <- file.path(\"output\", folder_date)\n",
        ),
        request.period
    ));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request() -> ProjectRequest {
        ProjectRequest {
            commitment: "1.3.A".parse().unwrap(),
            title: "use of force review".to_string(),
            period: "2025_Q1".parse().unwrap(),
            created: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
        }
    }

    #[test]
    fn test_commitment_parsing() {
        for ok in ["1", "1.3", "1.3.a", " 12.4.B ", "100.2.1.c"] {
            assert!(ok.parse::<Commitment>().is_ok(), "{}", ok);
        }
        for bad in ["", "a", "1.", "1..3", "1.3.ab", "1.a.3", "1-3", "1.3.a.b"] {
            assert!(
                matches!(bad.parse::<Commitment>(), Err(KitError::InvalidCommitment { .. })),
                "{}",
                bad
            );
        }
        assert_eq!(" 12.4.B ".parse::<Commitment>().unwrap().as_str(), "12.4.b");
    }

    #[test]
    fn test_names() {
        let c: Commitment = "1.3.a".parse().unwrap();
        assert_eq!(title_slug("  use of-force: review (draft) "), "Use_Of_Force_Review_Draft");
        assert_eq!(project_name(&c, "use of force review"), "1.3.a_Use_Of_Force_Review");
        assert_eq!(project_name(&c, "!!!"), "1.3.a");
        assert_eq!(script_name(&c, "use of force review", ".R"), "1_3_a_Use_Of_Force_Review.R");

        let long = project_name(&c, &"word ".repeat(30));
        assert!(long.chars().count() <= 60);
        assert!(!long.ends_with('_'));
    }

    #[test]
    fn test_plan_layout() {
        let plan = plan(&request(), &ScaffoldConfig::default(), Path::new("/projects"));
        assert_eq!(plan.root, PathBuf::from("/projects/1.3.a_Use_Of_Force_Review"));
        assert!(plan.dirs.contains(&plan.root.join("data/raw/2025_Q1")));
        assert!(plan.dirs.contains(&plan.root.join("output/2025_Q1")));
        let scripts: Vec<_> = plan.dirs.iter().filter(|d| d.ends_with("scripts")).collect();
        assert_eq!(scripts.len(), 1);
        assert!(plan
            .files
            .iter()
            .any(|f| f.path.ends_with("scripts/1_3_a_Use_Of_Force_Review.R")));
    }

    #[test]
    fn test_scaffold_refuses_existing_project_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let plan = plan(&request(), &ScaffoldConfig::default(), temp_dir.path());

        let first = scaffold(&plan, false).unwrap();
        assert_eq!(first.created_files.len(), 3);
        assert!(first.skipped_files.is_empty());

        assert!(matches!(
            scaffold(&plan, false),
            Err(KitError::ProjectExists { .. })
        ));
    }

    #[test]
    fn test_force_fills_gaps_without_overwriting() {
        let temp_dir = TempDir::new().unwrap();
        let plan = plan(&request(), &ScaffoldConfig::default(), temp_dir.path());
        scaffold(&plan, false).unwrap();

        let readme = plan.root.join("README.md");
        std::fs::write(&readme, "my notes").unwrap();
        std::fs::remove_dir_all(plan.root.join("docs")).unwrap();

        let report = scaffold(&plan, true).unwrap();
        assert_eq!(report.created_dirs, vec![plan.root.join("docs")]);
        assert!(report.created_files.is_empty());
        assert_eq!(report.skipped_files.len(), 3);
        assert_eq!(std::fs::read_to_string(readme).unwrap(), "my notes");
    }
}
