//! Moltbot assistant skill installation.
//!
//! The skill is a single `SKILL.md` that teaches the assistant how to drive
//! this CLI. It is placed under the assistant's config directory:
//! `~/.clawdbot` when present, otherwise `~/.moltbot` (created on demand).

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Embedded skill document
pub const SKILL_CONTENT: &str = include_str!("SKILL.md");

/// Skill directory name under `<base>/skills/`
pub const SKILL_NAME: &str = "moltbot-widgets";

const CONFIG_DIRS: [&str; 2] = [".clawdbot", ".moltbot"];

/// Outcome of [`install`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Assistant config directory the skill went into
    pub base: PathBuf,
    /// Whether `base` had to be created
    pub created_base: bool,
    /// Written `SKILL.md`
    pub skill_path: PathBuf,
}

/// Skill directory for an assistant config directory
pub fn skill_dir(base: &Path) -> PathBuf {
    base.join("skills").join(SKILL_NAME)
}

/// Write `SKILL.md` into the detected (or newly created) config directory
pub fn install(home: &Path) -> Result<InstallReport> {
    let existing = CONFIG_DIRS.iter().map(|dir| home.join(dir)).find(|path| path.exists());

    let (base, created_base) = match existing {
        Some(base) => (base, false),
        None => {
            let base = home.join(CONFIG_DIRS[1]);
            std::fs::create_dir_all(&base)?;
            (base, true)
        },
    };

    let dir = skill_dir(&base);
    std::fs::create_dir_all(&dir)?;
    let skill_path = dir.join("SKILL.md");
    std::fs::write(&skill_path, SKILL_CONTENT)?;

    tracing::info!("Installed skill at {}", skill_path.display());
    Ok(InstallReport {
        base,
        created_base,
        skill_path,
    })
}

/// Remove the skill from every config directory; returns what was removed
pub fn uninstall(home: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for dir in CONFIG_DIRS {
        let path = skill_dir(&home.join(dir));
        if path.exists() {
            std::fs::remove_dir_all(&path)?;
            removed.push(path);
        }
    }
    Ok(removed)
}

/// Directory the skill is installed in, if any
pub fn status(home: &Path) -> Option<PathBuf> {
    CONFIG_DIRS
        .iter()
        .map(|dir| skill_dir(&home.join(dir)))
        .find(|path| path.join("SKILL.md").exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_creates_moltbot_dir() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(status(home.path()), None);

        let report = install(home.path()).unwrap();
        assert!(report.created_base);
        assert_eq!(report.base, home.path().join(".moltbot"));
        assert_eq!(std::fs::read_to_string(&report.skill_path).unwrap(), SKILL_CONTENT);
        assert_eq!(status(home.path()), Some(skill_dir(&home.path().join(".moltbot"))));
    }

    #[test]
    fn test_install_prefers_clawdbot() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir(home.path().join(".clawdbot")).unwrap();
        std::fs::create_dir(home.path().join(".moltbot")).unwrap();

        let report = install(home.path()).unwrap();
        assert!(!report.created_base);
        assert_eq!(report.base, home.path().join(".clawdbot"));
    }

    #[test]
    fn test_uninstall() {
        let home = tempfile::tempdir().unwrap();
        assert!(uninstall(home.path()).unwrap().is_empty());

        install(home.path()).unwrap();
        let removed = uninstall(home.path()).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(status(home.path()), None);
    }

    #[test]
    fn test_skill_content_front_matter() {
        assert!(SKILL_CONTENT.starts_with("---\nname: moltbot-widgets\n"));
    }
}
