use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{api::errors::SyncError, context::RequestContext, projects::project_models::Project};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Environment {
    pub key: String,
    pub name: String,
}

/// Lists the remote environments of the cloud project behind `project_key`. `query` and
/// `limit` are passed through to the management API untouched.
#[instrument(skip_all, fields(project_key = %project_key, query = %query))]
pub async fn get_environments_for_project(
    ctx: &RequestContext,
    project_key: &str,
    query: &str,
    limit: Option<usize>,
) -> Result<Vec<Environment>, SyncError> {
    let project = Project::get(ctx, project_key).await?;

    let environments = ctx
        .remote_call(
            "get_project_environments",
            ctx.api()
                .get_project_environments(project.cloud_project_key(), query, limit),
        )
        .await?;

    Ok(environments
        .into_iter()
        .map(|environment| Environment {
            key: environment.key,
            name: environment.name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        adapters::{EvaluationContext, MockApiAdapter, RemoteEnvironment, RemoteError},
        api::errors::ErrorKind,
        config::DEFAULT_TEST_CONFIG,
        observers::Observers,
        store::{MockStore, StoreError},
        utils::test_utils::FakeSdkAdapter,
    };

    fn context_with(store: MockStore, api: MockApiAdapter) -> RequestContext {
        RequestContext::new(
            Arc::new(store),
            Arc::new(api),
            Arc::new(FakeSdkAdapter::new()),
            Arc::new(Observers::new()),
            Arc::new(DEFAULT_TEST_CONFIG.clone()),
        )
    }

    fn production_project(key: &str) -> Project {
        Project::new(key, "production", EvaluationContext::user("u"))
    }

    #[tokio::test]
    async fn test_missing_project_is_not_found() {
        let mut store = MockStore::new();
        let mut api = MockApiAdapter::new();
        store
            .expect_get_dev_project()
            .times(1)
            .returning(|key| Err(StoreError::project_not_found(key)));
        api.expect_get_project_environments().never();
        let ctx = context_with(store, api);

        let err = get_environments_for_project(&ctx, "missing", "", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_queries_the_cloud_project_of_a_clone() {
        let mut store = MockStore::new();
        let mut api = MockApiAdapter::new();
        store.expect_get_dev_project().times(1).returning(|key| {
            let mut project = production_project(key);
            project.source_project_key = Some("cloud-project".to_string());
            Ok(project)
        });
        api.expect_get_project_environments()
            .withf(|project, query, limit| {
                project == "cloud-project" && query == "prod" && *limit == Some(5)
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    RemoteEnvironment {
                        key: "production".to_string(),
                        name: "Production".to_string(),
                    },
                    RemoteEnvironment {
                        key: "preprod".to_string(),
                        name: "Pre-production".to_string(),
                    },
                ])
            });
        let ctx = context_with(store, api);

        let environments = get_environments_for_project(&ctx, "local-clone", "prod", Some(5))
            .await
            .unwrap();

        assert_eq!(
            environments,
            vec![
                Environment {
                    key: "production".to_string(),
                    name: "Production".to_string(),
                },
                Environment {
                    key: "preprod".to_string(),
                    name: "Pre-production".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_remote_failure_is_returned_verbatim() {
        let mut store = MockStore::new();
        let mut api = MockApiAdapter::new();
        store
            .expect_get_dev_project()
            .times(1)
            .returning(|key| Ok(production_project(key)));
        api.expect_get_project_environments()
            .times(1)
            .returning(|_, _, _| {
                Err(RemoteError::Status {
                    status: 401,
                    message: "unauthorized".to_string(),
                })
            });
        let ctx = context_with(store, api);

        let err = get_environments_for_project(&ctx, "proj", "", None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteFetch);
    }

    #[tokio::test]
    async fn test_empty_remote_list_is_empty() {
        let mut store = MockStore::new();
        let mut api = MockApiAdapter::new();
        store
            .expect_get_dev_project()
            .times(1)
            .returning(|key| Ok(production_project(key)));
        api.expect_get_project_environments()
            .withf(|project, _, limit| project == "proj" && limit.is_none())
            .times(1)
            .returning(|_, _, _| Ok(vec![]));
        let ctx = context_with(store, api);

        let environments = get_environments_for_project(&ctx, "proj", "", None)
            .await
            .unwrap();

        assert!(environments.is_empty());
    }
}
