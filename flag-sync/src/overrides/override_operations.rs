use metrics::counter;
use serde_json::Value;
use tracing::{info, instrument};

use crate::{
    api::errors::SyncError,
    context::RequestContext,
    metrics::consts::OVERRIDE_WRITES_COUNTER,
    observers::{OverrideEvent, ProjectEvent},
    overrides::override_models::Override,
    projects::project_models::Project,
};

impl Override {
    /// Sets an active override for a flag the project knows about and notifies observers with
    /// the resulting layered flag state. Returns the stored override with the version the
    /// store assigned.
    #[instrument(skip_all, fields(project_key = %project_key, flag_key = %flag_key))]
    pub async fn upsert_for_flag(
        ctx: &RequestContext,
        project_key: &str,
        flag_key: &str,
        value: Value,
    ) -> Result<Override, SyncError> {
        let project = Project::get(ctx, project_key).await?;
        let Some(synced) = project.all_flags_state.get(flag_key) else {
            return Err(SyncError::NotFound {
                entity: "flag",
                key: flag_key.to_string(),
            });
        };

        let stored = ctx
            .store_call(
                "upsert_override",
                ctx.store().upsert_override(Override {
                    project_key: project_key.to_string(),
                    flag_key: flag_key.to_string(),
                    value,
                    active: true,
                    version: 0,
                }),
            )
            .await?;
        counter!(OVERRIDE_WRITES_COUNTER, "op" => "upsert").increment(1);
        info!(version = stored.version, "override set");

        ctx.notify(ProjectEvent::Override(OverrideEvent {
            project_key: project_key.to_string(),
            flag_key: flag_key.to_string(),
            flag_state: stored.apply(synced),
        }));
        Ok(stored)
    }

    /// Suppresses a flag's override without deleting it. Observers get the synced state back.
    /// Returns the override's new version.
    #[instrument(skip_all, fields(project_key = %project_key, flag_key = %flag_key))]
    pub async fn deactivate(
        ctx: &RequestContext,
        project_key: &str,
        flag_key: &str,
    ) -> Result<i64, SyncError> {
        let project = Project::get(ctx, project_key).await?;

        let version = ctx
            .store_call(
                "deactivate_override",
                ctx.store().deactivate_override(project_key, flag_key),
            )
            .await?;
        counter!(OVERRIDE_WRITES_COUNTER, "op" => "deactivate").increment(1);
        info!(version, "override deactivated");

        // a flag dropped by the last sync has nothing left to show
        if let Some(synced) = project.all_flags_state.get(flag_key) {
            ctx.notify(ProjectEvent::Override(OverrideEvent {
                project_key: project_key.to_string(),
                flag_key: flag_key.to_string(),
                flag_state: synced.clone(),
            }));
        }
        Ok(version)
    }
}
