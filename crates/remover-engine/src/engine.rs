use super::*;
use remover_kernel::run_blocking;
use remover_settings::EngineSettings;
use std::sync::Arc;

/// Entry point used by shells. Owns the catalog, settings and staging area
/// and exposes the removal workflow as async operations; blocking
/// filesystem work runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct RemoverEngine {
    catalog: Arc<PathCatalog>,
    settings: Arc<EngineSettings>,
    staging: StagingArea,
    startup: Arc<Vec<StartupLocation>>,
    service_control: Arc<dyn ServiceControl>,
}

/// Batch name for orphan removals, which have no owning application.
const ORPHANS_BATCH_NAME: &str = "orphaned data";
const STARTUP_BATCH_NAME: &str = "startup items";

impl RemoverEngine {
    pub fn new(catalog: PathCatalog, settings: EngineSettings, staging_root: PathBuf) -> Self {
        let staging = StagingArea::new(staging_root, settings.retention());
        let startup = default_startup_locations(catalog.home());
        Self {
            catalog: Arc::new(catalog),
            settings: Arc::new(settings),
            staging,
            startup: Arc::new(startup),
            service_control: Arc::new(LaunchctlControl),
        }
    }

    pub fn with_startup_locations(mut self, locations: Vec<StartupLocation>) -> Self {
        self.startup = Arc::new(locations);
        self
    }

    pub fn with_service_control(mut self, control: Arc<dyn ServiceControl>) -> Self {
        self.service_control = control;
        self
    }

    pub fn catalog(&self) -> &PathCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn resolve_identity(&self, reference: &ApplicationReference) -> AppResult<Identity> {
        resolve_identity(reference)
    }

    pub async fn scan(&self, identity: &Identity, cancel: &CancelFlag) -> AppResult<ScanReport> {
        let options = ScanOptions {
            max_depth: self.settings.max_scan_depth,
        };
        scan(
            Arc::new(identity.clone()),
            Arc::clone(&self.catalog),
            options,
            cancel.clone(),
        )
        .await
    }

    /// Policy for one identity: bundles of every other installed application
    /// are protected.
    pub fn risk_policy(&self, identity: &Identity) -> RiskPolicy {
        let own_bundle = identity.install_path.as_deref().map(lexical_normalize);
        let other_bundles = installed_bundle_roots(&self.catalog)
            .into_iter()
            .filter(|path| Some(path) != own_bundle.as_ref())
            .filter(|path| !owned_by_identity(path, identity))
            .collect();
        RiskPolicy::from_settings(&self.settings, &self.catalog)
            .with_other_bundle_roots(other_bundles)
    }

    pub async fn load_risk_policy(&self, identity: &Identity) -> AppResult<RiskPolicy> {
        let engine = self.clone();
        let identity = identity.clone();
        run_blocking("remover_risk_policy", move || Ok(engine.risk_policy(&identity))).await
    }

    /// Policy for entries no single application owns: every installed
    /// bundle is protected.
    fn shared_risk_policy(&self) -> RiskPolicy {
        RiskPolicy::from_settings(&self.settings, &self.catalog)
            .with_other_bundle_roots(installed_bundle_roots(&self.catalog))
    }

    pub async fn classify(
        &self,
        identity: &Identity,
        candidates: Vec<Candidate>,
    ) -> AppResult<Vec<ClassifiedCandidate>> {
        let engine = self.clone();
        let identity = identity.clone();
        run_blocking("remover_classify", move || {
            let policy = engine.risk_policy(&identity);
            Ok(classify(candidates, &policy))
        })
        .await
    }

    pub async fn execute(
        &self,
        plan: RemovalPlan,
        mode: RemovalMode,
        app_name: &str,
        cancel: &CancelFlag,
    ) -> AppResult<RemovalResult> {
        let staging = self.staging.clone();
        let app_name = app_name.to_string();
        let cancel = cancel.clone();
        run_blocking("remover_execute", move || {
            execute_plan(&plan, mode, &staging, app_name.as_str(), &cancel)
        })
        .await
    }

    pub async fn restore(&self, batch_id: &str) -> AppResult<RestoreResult> {
        let staging = self.staging.clone();
        let batch_id = batch_id.to_string();
        run_blocking("remover_restore", move || {
            staging.restore(batch_id.as_str(), now_unix_millis())
        })
        .await
    }

    pub async fn purge_expired(&self) -> AppResult<PurgeReport> {
        let staging = self.staging.clone();
        run_blocking("remover_purge", move || {
            staging.purge_expired(now_unix_millis())
        })
        .await
    }

    pub async fn list_staged_batches(&self) -> AppResult<Vec<StagedBatchSummary>> {
        let staging = self.staging.clone();
        run_blocking("remover_list_batches", move || staging.list_batches()).await
    }

    pub async fn list_installed_apps(&self) -> AppResult<Vec<InstalledApp>> {
        let catalog = Arc::clone(&self.catalog);
        run_blocking("remover_installed_apps", move || {
            Ok(list_installed_apps(&catalog))
        })
        .await
    }

    pub async fn scan_orphans(&self) -> AppResult<Vec<OrphanEntry>> {
        let engine = self.clone();
        run_blocking("remover_orphans", move || Ok(engine.current_orphans())).await
    }

    /// Removes orphans the user picked from [`Self::scan_orphans`]. The
    /// listing is taken again and every selected path must still be on it;
    /// classification and planning run as for an application's leftovers.
    pub async fn remove_orphans(
        &self,
        selected: Vec<PathBuf>,
        mode: RemovalMode,
        cancel: &CancelFlag,
    ) -> AppResult<RemovalResult> {
        let engine = self.clone();
        let cancel = cancel.clone();
        run_blocking("remover_remove_orphans", move || {
            let selected = selected.iter().map(|path| lexical_normalize(path)).collect::<Vec<_>>();
            let candidates = engine
                .current_orphans()
                .iter()
                .filter(|orphan| selected.contains(&orphan.path))
                .filter_map(|orphan| orphan_candidate(orphan, engine.catalog.home()))
                .collect();
            let policy = engine.shared_risk_policy();
            let classified = classify(candidates, &policy);
            let plan = RemovalPlan::build(&classified, &selected, &policy)?;
            execute_plan(&plan, mode, &engine.staging, ORPHANS_BATCH_NAME, &cancel)
        })
        .await
    }

    pub async fn list_startup_items(&self) -> AppResult<Vec<StartupItem>> {
        let engine = self.clone();
        run_blocking("remover_startup_list", move || {
            Ok(list_startup_items(
                &engine.startup,
                &engine.settings.protected_name_prefixes,
            ))
        })
        .await
    }

    pub async fn disable_startup_item(&self, path: &Path) -> AppResult<StartupItem> {
        let engine = self.clone();
        let path = path.to_path_buf();
        run_blocking("remover_startup_disable", move || {
            let item = find_startup_item(
                &engine.startup,
                &engine.settings.protected_name_prefixes,
                &path,
            )?;
            let location = engine.startup_location(&item)?;
            disable_startup_item(&item, location, engine.service_control.as_ref())
        })
        .await
    }

    /// Unloads the selected jobs and removes their definitions through a
    /// regular plan, so staged removals can be restored.
    pub async fn remove_startup_items(
        &self,
        selected: Vec<PathBuf>,
        mode: RemovalMode,
        cancel: &CancelFlag,
    ) -> AppResult<RemovalResult> {
        let engine = self.clone();
        let cancel = cancel.clone();
        run_blocking("remover_startup_remove", move || {
            let mut items = Vec::with_capacity(selected.len());
            for path in &selected {
                items.push(find_startup_item(
                    &engine.startup,
                    &engine.settings.protected_name_prefixes,
                    path,
                )?);
            }
            let mut candidates = Vec::with_capacity(items.len());
            for item in &items {
                let location = engine.startup_location(item)?;
                candidates.extend(startup_candidate(item, location, engine.catalog.home()));
            }
            let policy = engine.shared_risk_policy();
            let classified = classify(candidates, &policy);
            let confirmed = items.iter().map(|item| item.path.clone()).collect::<Vec<_>>();
            let plan = RemovalPlan::build(&classified, &confirmed, &policy)?;
            for item in &items {
                if let Err(error) = engine.service_control.unload(item, false) {
                    tracing::warn!(
                        event = "startup_unload_failed",
                        path = %sanitize_path(&item.path),
                        error = %error
                    );
                }
            }
            execute_plan(&plan, mode, &engine.staging, STARTUP_BATCH_NAME, &cancel)
        })
        .await
    }

    fn startup_location(&self, item: &StartupItem) -> AppResult<&StartupLocation> {
        location_of(&self.startup, item).ok_or_else(|| {
            engine_error(
                EngineErrorCode::StartupItemNotFound,
                "startup item is outside every startup location",
            )
            .with_context("path", item.path.display().to_string())
        })
    }

    fn current_orphans(&self) -> Vec<OrphanEntry> {
        let installed_ids = installed_bundle_roots(&self.catalog)
            .iter()
            .filter_map(|path| read_bundle_manifest(path).and_then(|manifest| manifest.bundle_id))
            .collect::<HashSet<_>>();
        scan_orphans(
            &self.catalog,
            &installed_ids,
            &self.settings.protected_name_prefixes,
        )
    }
}

/// The identity's own bundle, found by manifest id or, lacking one, by name.
fn owned_by_identity(bundle: &Path, identity: &Identity) -> bool {
    let manifest_id = read_bundle_manifest(bundle).and_then(|manifest| manifest.bundle_id);
    match (identity.bundle_id.as_deref(), manifest_id.as_deref()) {
        (Some(wanted), Some(found)) => wanted.eq_ignore_ascii_case(found),
        _ => {
            identity.name_matchable
                && bundle
                    .file_name()
                    .and_then(|value| value.to_str())
                    .is_some_and(|value| normalize_display_name(value) == identity.normalized_name)
        }
    }
}

#[cfg(test)]
#[path = "../tests/engine/engine_tests.rs"]
mod engine_tests;
