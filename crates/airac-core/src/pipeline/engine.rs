//! The update state machine
//!
//! ```text
//! Resolving -> BackingUp -> Extracting -> Planning -> Transforming -> Committing -> Done
//!                                \_______________________\______> RollingBack -> Done
//! ```
//!
//! A snapshot is taken before the first destructive step. Any failure after
//! that point restores it, so a run either commits completely or leaves the
//! package's files as they were.

use std::fs;
use std::path::{Path, PathBuf};

use airac_fs::NormalizedPath;
use airac_rules::{DiskStore, FileStore, OverlayStore, RuleEngine};

use crate::acquire::{DownloadSource, PackageFetcher};
use crate::backup::{BackupManager, BackupSnapshot};
use crate::extract::{self, ArchiveExtractor};
use crate::package::{PackageInfo, PackageSource};
use crate::regions::RegionRegistry;
use crate::scope::{ScopedStore, TreeScope};
use crate::settings::Settings;
use crate::{Error, Result};

use super::plan::PipelinePlan;
use super::post::{self, PostSteps};
use super::report::{Outcome, PipelineResult, Stage};

/// Options for a pipeline run
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Compute the changes without writing anything
    pub dry_run: bool,
    /// Snapshot the install tree before the first destructive step
    pub backup: bool,
    /// Attach unified diffs to reported changes
    pub diffs: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            backup: true,
            diffs: false,
        }
    }
}

/// Drives one package update from source to committed edits.
pub struct Pipeline<'a> {
    settings: &'a Settings,
    registry: &'a RegionRegistry,
    fetcher: &'a dyn PackageFetcher,
    extractor: &'a dyn ArchiveExtractor,
    backups: BackupManager,
    options: RunOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        settings: &'a Settings,
        registry: &'a RegionRegistry,
        fetcher: &'a dyn PackageFetcher,
        extractor: &'a dyn ArchiveExtractor,
    ) -> Self {
        Self {
            settings,
            registry,
            fetcher,
            extractor,
            backups: BackupManager::new(&settings.paths.backup_dir),
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Plan for `package` without running anything.
    pub fn plan(&self, package: PackageInfo) -> PipelinePlan {
        PipelinePlan::build(self.settings, self.registry, package)
    }

    /// Run the update for `source`.
    ///
    /// Never returns an error: failures are reported through the result's
    /// outcome and cause chain.
    pub fn run(&self, source: &PackageSource) -> PipelineResult {
        let mut result = PipelineResult::new(source.to_string(), self.options.dry_run);
        tracing::info!(source = %source, dry_run = self.options.dry_run, "Starting update");

        if self.options.dry_run {
            self.simulate(source, &mut result);
        } else {
            self.execute(source, &mut result);
        }

        result.enter(Stage::Done);
        tracing::info!(outcome = ?result.outcome, modified = result.modified.len(), "Update finished");
        result
    }

    fn execute(&self, source: &PackageSource, result: &mut PipelineResult) {
        result.enter(Stage::Resolving);
        let package = match self.resolve(source, result) {
            Ok(package) => package,
            Err(e) => return result.fail(&e),
        };
        record_package(result, &package);

        let region = package.region.clone();
        let root = self.settings.install_root(&region);
        let scope = TreeScope::for_region(&region, self.settings.options.use_subdirs);
        result.install_root = Some(root.clone());

        let snapshot = if self.options.backup {
            result.enter(Stage::BackingUp);
            match self.back_up(&package, &root, &scope) {
                Ok(snapshot) => {
                    result.snapshot = Some(snapshot.id.clone());
                    Some(snapshot)
                }
                Err(e) => return result.fail(&e),
            }
        } else {
            result.warn("Backup disabled; a failure cannot be rolled back");
            None
        };

        result.enter(Stage::Extracting);
        if let Err(e) = self.extract(&package, &root, &scope, result) {
            return self.roll_back(snapshot.as_ref(), e, result);
        }

        result.enter(Stage::Planning);
        let plan = self.plan_into(package, result);

        result.enter(Stage::Transforming);
        let mut disk = DiskStore::new(&plan.install_root);
        if let Err(e) = self.transform(&plan, &mut disk, result) {
            return self.roll_back(snapshot.as_ref(), e, result);
        }

        result.enter(Stage::Committing);
        self.commit(&plan, &mut disk, result);
        if self.settings.options.delete_package
            && plan.package.path.is_file()
            && let Err(e) = post::delete_package(&plan.package.path)
        {
            result.warn(format!(
                "Could not delete {}: {}",
                plan.package.path.display(),
                e
            ));
        }
        result.outcome = Outcome::Committed;
    }

    /// Dry run: no backup, and every write, extraction included, kept in
    /// memory.
    fn simulate(&self, source: &PackageSource, result: &mut PipelineResult) {
        result.enter(Stage::Resolving);
        let package = match self.probe(source, result) {
            Ok(package) => package,
            Err(e) => return result.fail(&e),
        };
        record_package(result, &package);

        let root = self.settings.install_root(&package.region);
        let scope = TreeScope::for_region(&package.region, self.settings.options.use_subdirs);
        result.install_root = Some(root.clone());
        let mut overlay = OverlayStore::new(&root);

        if package.path.is_file() {
            result.enter(Stage::Extracting);
            if let Err(e) = self.stage_archive(&package, &scope, &mut overlay, result) {
                return result.fail(&e);
            }
        }

        result.enter(Stage::Planning);
        let plan = self.plan_into(package, result);

        result.enter(Stage::Transforming);
        if let Err(e) = self.transform(&plan, &mut overlay, result) {
            return result.fail(&e);
        }

        result.enter(Stage::Committing);
        self.commit(&plan, &mut overlay, result);
        result.outcome = Outcome::DryRunOnly;
    }

    /// Turn the source into an archive on disk.
    fn resolve(&self, source: &PackageSource, result: &mut PipelineResult) -> Result<PackageInfo> {
        match source {
            PackageSource::Region(id) => {
                let download = self.download_source(id)?;
                let fetched = self.fetcher.fetch(id, download, &self.settings.paths.download_dir)?;
                for warning in fetched.warnings {
                    result.warn(warning);
                }
                PackageInfo::parse(&fetched.path, Some(id))
            }
            PackageSource::Archive(path) => {
                if !path.is_file() {
                    return Err(Error::resolution(format!(
                        "Archive not found: {}",
                        path.display()
                    )));
                }
                PackageInfo::parse(path, None)
            }
        }
    }

    /// Resolution for dry runs: nothing is downloaded and an unreachable
    /// source only warns.
    fn probe(&self, source: &PackageSource, result: &mut PipelineResult) -> Result<PackageInfo> {
        match source {
            PackageSource::Region(id) => {
                let download = self.download_source(id)?;
                match self.fetcher.probe(id, download) {
                    Ok(url) => {
                        result.warn(format!(
                            "{} is not downloaded in a dry run; simulating against the installed files",
                            url
                        ));
                        let name = url.rsplit('/').next().unwrap_or_default();
                        let mut package = PackageInfo::parse(Path::new(name), Some(id))
                            .unwrap_or_else(|_| PackageInfo::for_region(id));
                        package.path = PathBuf::from(url);
                        Ok(package)
                    }
                    Err(e) => {
                        result.warn(format!("Package index unreachable: {}", e));
                        Ok(PackageInfo::for_region(id))
                    }
                }
            }
            PackageSource::Archive(path) => {
                if !path.is_file() {
                    result.warn(format!(
                        "Archive not found: {}; simulating against the installed files",
                        path.display()
                    ));
                }
                PackageInfo::parse(path, None)
            }
        }
    }

    fn download_source(&self, id: &str) -> Result<&DownloadSource> {
        self.registry
            .get(id)
            .and_then(|registration| registration.download.as_ref())
            .ok_or_else(|| Error::resolution(format!("No download source for region '{}'", id)))
    }

    /// Snapshot the package scope plus every file the archive would write
    /// outside it. An unreadable archive fails here, before anything is
    /// touched.
    fn back_up(&self, package: &PackageInfo, root: &Path, scope: &TreeScope) -> Result<BackupSnapshot> {
        let mut targets = self.extractor.list(&package.path)?;
        targets.extend(
            self.renames(&package.region)
                .into_iter()
                .map(|(_, to)| NormalizedPath::new(to)),
        );
        targets.retain(|path| !scope.contains(path));
        if !targets.is_empty() {
            tracing::debug!(files = targets.len(), "Archive writes outside the package entries");
        }
        self.backups
            .snapshot_including(root, &package.region, scope, &targets)
    }

    /// Profile renames applied after extraction into a shared root.
    fn renames(&self, region: &str) -> Vec<(String, String)> {
        match self.registry.get(region) {
            Some(registration) if !self.settings.options.use_subdirs => registration.renames.clone(),
            _ => Vec::new(),
        }
    }

    /// Replace the package's files with the archive content.
    fn extract(
        &self,
        package: &PackageInfo,
        root: &Path,
        scope: &TreeScope,
        result: &mut PipelineResult,
    ) -> Result<()> {
        fs::create_dir_all(root).map_err(|e| airac_fs::Error::io(root, e))?;
        extract::clear_scope(root, scope)?;
        let written = self.extractor.extract(&package.path, root)?;
        result.extracted = written.len();
        extract::apply_renames(root, &self.renames(&package.region))?;
        Ok(())
    }

    /// What [`extract`](Self::extract) does, applied to `overlay` instead
    /// of the disk.
    fn stage_archive(
        &self,
        package: &PackageInfo,
        scope: &TreeScope,
        overlay: &mut OverlayStore,
        result: &mut PipelineResult,
    ) -> Result<()> {
        for path in scope.filter(overlay.list()?) {
            overlay.remove(&path);
        }
        let files = self.extractor.read(&package.path)?;
        result.extracted = files.len();
        for file in &files {
            overlay.write(&file.path, &file.content)?;
        }
        for (from, to) in self.renames(&package.region) {
            let from = NormalizedPath::new(from);
            if overlay.exists(&from) {
                let content = overlay.read(&from)?;
                overlay.remove(&from);
                overlay.write(&NormalizedPath::new(to), &content)?;
            }
        }
        Ok(())
    }

    fn plan_into(&self, package: PackageInfo, result: &mut PipelineResult) -> PipelinePlan {
        let plan = self.plan(package);
        for warning in &plan.warnings {
            result.warn(warning.clone());
        }
        plan
    }

    fn engine(&self) -> RuleEngine {
        if self.options.diffs {
            RuleEngine::new().with_diffs()
        } else {
            RuleEngine::new()
        }
    }

    /// Run the plan's rules in order. Optional rules only warn.
    fn transform(
        &self,
        plan: &PipelinePlan,
        store: &mut dyn FileStore,
        result: &mut PipelineResult,
    ) -> Result<()> {
        let engine = self.engine();
        let mut scoped = ScopedStore::new(store, &plan.scope);
        for action in &plan.actions {
            match engine.apply(action, &mut scoped) {
                Ok(outcome) => result.absorb(outcome),
                Err(e) if action.is_optional() => {
                    result.warn(format!("Optional rule '{}' skipped: {}", action.name(), e));
                }
                Err(source) => {
                    return Err(Error::Rule {
                        rule: action.name().to_string(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Post steps; failures never undo the committed edits.
    fn commit(&self, plan: &PipelinePlan, store: &mut dyn FileStore, result: &mut PipelineResult) {
        let steps = PostSteps::build(self.settings, &plan.region, &plan.install_root);
        for warning in steps.warnings {
            result.warn(warning);
        }

        let engine = self.engine();
        for action in &steps.actions {
            match engine.apply(action, store) {
                Ok(outcome) => result.absorb(outcome),
                Err(e) => result.warn(format!("Post step '{}' failed: {}", action.name(), e)),
            }
        }
    }

    fn roll_back(&self, snapshot: Option<&BackupSnapshot>, error: Error, result: &mut PipelineResult) {
        result.fail(&error);
        let Some(snapshot) = snapshot else {
            result.warn("No snapshot to restore; the install tree is left as the failure found it");
            return;
        };

        result.enter(Stage::RollingBack);

        match self.backups.restore(snapshot) {
            Ok(report) => {
                tracing::info!(
                    id = %snapshot.id,
                    restored = report.restored.len(),
                    removed = report.removed.len(),
                    "Rolled back"
                );
                result.outcome = Outcome::RolledBack;
                // Nothing the run changed survives the restore
                result.modified.clear();
                result.changes.clear();
            }
            Err(e) => {
                tracing::error!(id = %snapshot.id, error = %e, "Rollback failed");
                result.outcome = Outcome::Inconsistent;
                result.rollback_error = crate::error::cause_chain(&e);
            }
        }
    }
}

fn record_package(result: &mut PipelineResult, package: &PackageInfo) {
    result.region = Some(package.region.clone());
    result.airac = package.airac.clone();
    result.archive = Some(package.path.clone()).filter(|p| !p.as_os_str().is_empty());
}
