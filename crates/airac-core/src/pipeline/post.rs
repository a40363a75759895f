//! Steps run after the edits are committed
//!
//! Nothing here can fail a run: problems become warnings and the committed
//! edits stay in place.

use std::fs;
use std::path::Path;

use airac_rules::{CopyRule, RuleAction};

use crate::settings::Settings;

const CYCLE_INFO: &str = "cycle_info.txt";
const NAVDATA_FILES: [&str; 2] = ["AIRWAY.txt", "ISEC.txt"];

/// Copy rules to run after committing, plus the reasons for skipping any.
#[derive(Debug, Default)]
pub struct PostSteps {
    pub actions: Vec<RuleAction>,
    pub warnings: Vec<String>,
}

impl PostSteps {
    pub fn build(settings: &Settings, region: &str, root: &Path) -> Self {
        let mut steps = Self::default();
        if let Some(dir) = &settings.paths.navdata_dir {
            steps.navdata(dir, region, root);
        }
        if settings.options.use_custom_files {
            match &settings.paths.custom_files_dir {
                Some(dir) if dir.is_dir() => steps
                    .actions
                    .push(CopyRule::new("custom files", dir, "").into()),
                Some(dir) => steps.warnings.push(format!(
                    "Custom files directory not found: {}",
                    dir.display()
                )),
                None => steps
                    .warnings
                    .push("Custom files enabled but no custom_files_dir set".to_string()),
            }
        }
        steps
    }

    /// Current navigation data replaces the package's airway and
    /// intersection files when the package has a NavData folder.
    fn navdata(&mut self, dir: &Path, region: &str, root: &Path) {
        if !dir.is_dir() {
            return;
        }
        let cycle_info = dir.join(CYCLE_INFO);
        let content = match fs::read_to_string(&cycle_info) {
            Ok(content) => content,
            Err(e) => {
                self.warnings.push(format!(
                    "NavData cycle info unreadable ({}): {}; skipping NavData copy",
                    cycle_info.display(),
                    e
                ));
                return;
            }
        };
        if !content.contains("Valid") {
            self.warnings
                .push("NavData appears outdated; skipping NavData copy".to_string());
            return;
        }

        let target = root.join(region).join("NavData");
        if !target.is_dir() {
            tracing::debug!(target = %target.display(), "Package has no NavData folder");
            return;
        }
        for name in NAVDATA_FILES {
            let source = dir.join(name);
            if source.is_file() {
                self.actions.push(
                    CopyRule::new(
                        format!("navdata {}", name),
                        source,
                        format!("{}/NavData/{}", region, name.to_ascii_lowercase()),
                    )
                    .optional()
                    .into(),
                );
            }
        }
    }
}

/// Remove the installed archive.
pub fn delete_package(path: &Path) -> std::io::Result<()> {
    fs::remove_file(path)?;
    tracing::info!(path = %path.display(), "Package removed");
    Ok(())
}
