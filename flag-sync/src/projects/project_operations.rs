use chrono::Utc;
use metrics::counter;
use tracing::{info, instrument, warn};

use crate::{
    adapters::EvaluationContext,
    api::errors::{ResultExt, SyncError},
    context::RequestContext,
    flags::flag_models::{
        flags_state_from_all_flags, flatten_variations, FlagVariation, FlagsState,
    },
    metrics::consts::{
        CLONED_OVERRIDES_COUNTER, PROJECT_CLONE_COUNTER, PROJECT_CREATE_COUNTER,
        PROJECT_REFRESH_COUNTER, PROJECT_UPDATE_COUNTER,
    },
    observers::{ProjectEvent, SyncEvent},
    overrides::override_models::Override,
    projects::project_models::Project,
};

fn outcome<T>(result: &Result<T, SyncError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.error_code(),
    }
}

impl Project {
    /// Builds a project, syncs it from the remote and stores it. Without a context the
    /// configured default identity is used.
    #[instrument(
        skip_all,
        fields(project_key = %project_key, source_environment_key = %source_environment_key)
    )]
    pub async fn create(
        ctx: &RequestContext,
        project_key: &str,
        source_environment_key: &str,
        context: Option<EvaluationContext>,
    ) -> Result<Project, SyncError> {
        let result: Result<Project, SyncError> = async {
            let context = context.unwrap_or_else(|| ctx.config().default_context());
            let mut project = Project::new(project_key, source_environment_key, context);
            project.refresh_external_state(ctx).await?;

            ctx.store_call(
                "insert_project",
                ctx.store().insert_project(project.clone()),
            )
            .await?;
            Ok(project)
        }
        .await;

        counter!(PROJECT_CREATE_COUNTER, "outcome" => outcome(&result)).increment(1);
        if let Ok(project) = &result {
            info!(
                flag_count = project.all_flags_state.len(),
                "created project"
            );
        }
        result
    }

    /// Applies the given context and source environment, re-syncs, stores the result and
    /// notifies observers with the overridden flag state. The returned project carries the
    /// synced state without overrides.
    #[instrument(skip_all, fields(project_key = %project_key))]
    pub async fn update(
        ctx: &RequestContext,
        project_key: &str,
        context: Option<EvaluationContext>,
        source_environment_key: Option<String>,
    ) -> Result<Project, SyncError> {
        let result: Result<Project, SyncError> = async {
            let mut project = ctx
                .store_call("get_dev_project", ctx.store().get_dev_project(project_key))
                .await?;
            if let Some(context) = context {
                project.context = context;
            }
            if let Some(source_environment_key) = source_environment_key {
                project.source_environment_key = source_environment_key;
            }

            project.refresh_external_state(ctx).await?;

            let updated = ctx
                .store_call(
                    "update_project",
                    ctx.store().update_project(project.clone()),
                )
                .await?;
            if !updated {
                warn!("store reported no change, project was likely deleted concurrently");
                return Err(SyncError::UpdateConflict);
            }

            let all_flags_state = project
                .flag_state_with_overrides(ctx)
                .await
                .with_context(|| format!("unable to get overrides for project {project_key}"))?;

            ctx.notify(ProjectEvent::Sync(SyncEvent {
                project_key: project.key.clone(),
                all_flags_state,
            }));
            Ok(project)
        }
        .await;

        counter!(PROJECT_UPDATE_COUNTER, "outcome" => outcome(&result)).increment(1);
        result
    }

    /// Copies a project's synced state under a new key without contacting the remote.
    ///
    /// The clone's source project is the *cloud* project of the source, so cloning a clone
    /// still syncs from the original cloud project. When `include_overrides` is set the
    /// source's overrides are copied one by one; a failure part way leaves the ones already
    /// copied in place.
    #[instrument(skip_all, fields(source_key = %source_key, target_key = %target_key))]
    pub async fn clone_project(
        ctx: &RequestContext,
        source_key: &str,
        target_key: &str,
        include_overrides: bool,
    ) -> Result<Project, SyncError> {
        let result: Result<Project, SyncError> = async {
            let source = ctx
                .store_call("get_dev_project", ctx.store().get_dev_project(source_key))
                .await
                .with_context(|| format!("unable to get source project {source_key}"))?;

            let cloned = Project {
                key: target_key.to_string(),
                source_environment_key: source.source_environment_key.clone(),
                source_project_key: Some(source.cloud_project_key().to_string()),
                context: source.context.clone(),
                last_sync_time: Utc::now(),
                all_flags_state: source.all_flags_state.clone(),
                available_variations: source.available_variations.clone(),
            };

            ctx.store_call("insert_project", ctx.store().insert_project(cloned.clone()))
                .await
                .with_context(|| format!("unable to insert cloned project {target_key}"))?;

            if include_overrides {
                let copied = copy_overrides(ctx, source_key, target_key).await?;
                info!(copied, "cloned overrides");
            }

            Ok(cloned)
        }
        .await;

        counter!(PROJECT_CLONE_COUNTER, "outcome" => outcome(&result)).increment(1);
        result
    }

    /// Loads a stored project as is.
    pub async fn get(ctx: &RequestContext, project_key: &str) -> Result<Project, SyncError> {
        ctx.store_call("get_dev_project", ctx.store().get_dev_project(project_key))
            .await
    }

    pub async fn list_keys(ctx: &RequestContext) -> Result<Vec<String>, SyncError> {
        ctx.store_call("get_dev_project_keys", ctx.store().get_dev_project_keys())
            .await
    }

    #[instrument(skip_all, fields(project_key = %project_key))]
    pub async fn delete(ctx: &RequestContext, project_key: &str) -> Result<(), SyncError> {
        let deleted = ctx
            .store_call(
                "delete_dev_project",
                ctx.store().delete_dev_project(project_key),
            )
            .await?;
        if !deleted {
            return Err(SyncError::project_not_found(project_key));
        }
        info!("deleted project");
        Ok(())
    }

    /// The synced flag state with this project's active overrides layered on. Leaves
    /// `all_flags_state` untouched.
    pub async fn flag_state_with_overrides(
        &self,
        ctx: &RequestContext,
    ) -> Result<FlagsState, SyncError> {
        let overrides = ctx
            .store_call(
                "get_overrides_for_project",
                ctx.store().get_overrides_for_project(&self.key),
            )
            .await
            .with_context(|| format!("unable to fetch overrides for project {}", self.key))?;

        Ok(overrides.layer_over(&self.all_flags_state))
    }

    /// Re-fetches flag state and the variation catalog from the remote.
    ///
    /// The flag state and sync time are written to `self` before the catalog is fetched, so a
    /// catalog failure leaves this in-memory copy half refreshed. Callers discard it on error.
    pub async fn refresh_external_state(&mut self, ctx: &RequestContext) -> Result<(), SyncError> {
        let result: Result<(), SyncError> = async {
            let flags_state = self.fetch_flag_state(ctx).await?;
            self.all_flags_state = flags_state;
            self.last_sync_time = Utc::now();

            self.available_variations = self.fetch_available_variations(ctx).await?;
            Ok(())
        }
        .await;

        counter!(PROJECT_REFRESH_COUNTER, "outcome" => outcome(&result)).increment(1);
        result
    }

    async fn fetch_flag_state(&self, ctx: &RequestContext) -> Result<FlagsState, SyncError> {
        let sdk_key = ctx
            .remote_call(
                "get_sdk_key",
                ctx.api()
                    .get_sdk_key(self.cloud_project_key(), &self.source_environment_key),
            )
            .await?;

        let all_flags = ctx
            .remote_call(
                "get_all_flags_state",
                ctx.sdk().get_all_flags_state(&self.context, &sdk_key),
            )
            .await?;

        Ok(flags_state_from_all_flags(all_flags))
    }

    async fn fetch_available_variations(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<FlagVariation>, SyncError> {
        let flags = ctx
            .remote_call(
                "get_all_flags",
                ctx.api().get_all_flags(self.cloud_project_key()),
            )
            .await?;
        Ok(flatten_variations(flags))
    }
}

async fn copy_overrides(
    ctx: &RequestContext,
    source_key: &str,
    target_key: &str,
) -> Result<usize, SyncError> {
    let source_overrides = ctx
        .store_call(
            "get_overrides_for_project",
            ctx.store().get_overrides_for_project(source_key),
        )
        .await
        .with_context(|| format!("unable to get overrides for source project {source_key}"))?;

    let mut copied = 0;
    for source_override in source_overrides {
        let flag_key = source_override.flag_key.clone();
        let cloned = Override {
            project_key: target_key.to_string(),
            flag_key: source_override.flag_key,
            value: source_override.value,
            active: source_override.active,
            version: 0,
        };
        ctx.store_call("upsert_override", ctx.store().upsert_override(cloned))
            .await
            .with_context(|| format!("unable to clone override for flag {flag_key}"))?;
        copied += 1;
        counter!(CLONED_OVERRIDES_COUNTER).increment(1);
    }
    Ok(copied)
}
