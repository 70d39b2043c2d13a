//! Container registry cleanup through the `doctl` command line tool.

use crate::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde_derive::*;
use std::process::Command;

pub const DEFAULT_REPOSITORIES: &[&str] = &["api", "app", "jobs/collector", "jobs/handlers"];
pub const DEFAULT_MIN_KEEP: usize = 3;

/// tag as listed by `doctl registry repository list-tags --output json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistryTag {
    pub tag: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub manifest_digest: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// keeps the `min_keep` most recently updated tags, returns the others oldest last
pub fn select_deletable(mut tags: Vec<RegistryTag>, min_keep: usize) -> Vec<RegistryTag> {
    tags.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    tags.into_iter().skip(min_keep).collect()
}

/// registry operations, `Ok(None)`/`Ok(false)` when the tool exits non-zero
pub trait RegistryCli {
    fn list_tags(&self, repository: &str) -> Result<Option<String>>;
    fn delete_tags(&self, repository: &str, tags: &[String]) -> Result<bool>;
}

pub struct DoctlCli {
    program: String,
}

impl DoctlCli {
    pub fn new(program: &str) -> Self {
        DoctlCli {
            program: program.to_owned(),
        }
    }
}

impl Default for DoctlCli {
    fn default() -> Self {
        DoctlCli::new("doctl")
    }
}

impl RegistryCli for DoctlCli {
    fn list_tags(&self, repository: &str) -> Result<Option<String>> {
        let output = Command::new(&self.program)
            .args(&["registry", "repository", "list-tags", repository, "--output", "json"])
            .output()?;
        if !output.status.success() {
            debug!(
                "{} list-tags exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    fn delete_tags(&self, repository: &str, tags: &[String]) -> Result<bool> {
        let output = Command::new(&self.program)
            .args(&["registry", "repository", "delete-tag", repository])
            .args(tags)
            .arg("-f")
            .output()?;
        if !output.status.success() {
            debug!(
                "{} delete-tag exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.status.success())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub scanned: usize,
    pub skipped: Vec<String>,
    pub deleted: usize,
    pub planned: usize,
    pub failed: Vec<String>,
}

pub fn cleanup(
    cli: &dyn RegistryCli,
    repositories: &[String],
    min_keep: usize,
    dry_run: bool,
) -> Result<CleanupReport> {
    let mut report = CleanupReport::default();
    for repository in repositories {
        info!("Retrieving tags for the {} repository.", repository);
        report.scanned += 1;
        let raw = match cli.list_tags(repository)? {
            Some(raw) => raw,
            None => {
                warn!("Could not list the tags of {}, nothing to do.", repository);
                report.skipped.push(repository.clone());
                continue;
            }
        };
        debug!("Found tags:\n{}", raw);
        let tags: Vec<RegistryTag> = serde_json::from_str(&raw)?;
        let names: Vec<String> = select_deletable(tags, min_keep)
            .into_iter()
            .map(|t| t.tag)
            .collect();
        debug!("Deletable tags: {:?}", names);
        if names.is_empty() {
            info!("Nothing to delete in {}.", repository);
            continue;
        }
        if dry_run {
            info!("Would delete from {}: {}", repository, names.join(" "));
            report.planned += names.len();
            continue;
        }
        if cli.delete_tags(repository, &names)? {
            info!("Following tags were deleted: {}", names.join(" "));
            report.deleted += names.len();
        } else {
            warn!("Could not delete the tags of {}: {}", repository, names.join(" "));
            report.failed.push(repository.clone());
        }
    }
    Ok(report)
}
