//! Metric Registry
//!
//! An explicit table of every metric the service exposes: route path,
//! scope kind, reduction label, unit label and handler, built once at
//! process start. The routing layer iterates the table to mount
//! endpoints and dispatches through [`MetricRoute::invoke`]; no runtime
//! registration happens after construction.
//!
//! The reduction and unit labels travel into response metadata only -
//! computation is entirely the handler's business.

use crate::metrics::catalog;
use crate::metrics::{MetricError, MetricOutcome, MetricParams, Reduction, Scope};
use crate::store::CiStore;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Which entity kind a metric is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Org,
    Repo,
    Product,
    Project,
}

impl ScopeKind {
    /// True for kinds that carry an entity id in the request path
    pub fn takes_id(&self) -> bool {
        !matches!(self, ScopeKind::Org)
    }

    /// Label used in the metric listing
    pub fn label(&self) -> &'static str {
        match self {
            ScopeKind::Org => "org",
            ScopeKind::Repo => "repo",
            ScopeKind::Product => "product",
            ScopeKind::Project => "project",
        }
    }
}

type MetricFuture = BoxFuture<'static, MetricOutcome>;
type OrgFn = Arc<dyn Fn(Arc<dyn CiStore>, MetricParams) -> MetricFuture + Send + Sync>;
type ScopedFn = Arc<dyn Fn(Arc<dyn CiStore>, String, MetricParams) -> MetricFuture + Send + Sync>;

enum Handler {
    Org(OrgFn),
    Scoped(ScopedFn),
}

/// One registered metric
pub struct MetricRoute {
    /// Route path, with leading slash (`/total-builds`)
    pub path: &'static str,
    /// Entity kind the metric is computed for
    pub scope: ScopeKind,
    /// Reduction label (`sum` / `avg`), response metadata only
    pub reduction: Reduction,
    /// Unit label (`builds`, `executions`, ...), response metadata only
    pub unit: &'static str,
    /// Optional display title
    pub title: Option<&'static str>,
    handler: Handler,
}

impl MetricRoute {
    /// Route name without the leading slash
    pub fn name(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    /// Builder method: set the display title
    fn title(mut self, title: &'static str) -> Self {
        self.title = Some(title);
        self
    }

    /// Run the metric for a scope.
    ///
    /// The scope's kind must match the registration; a mismatch is a
    /// dispatch bug in the caller, not a store condition.
    pub async fn invoke(
        &self,
        store: Arc<dyn CiStore>,
        scope: Scope,
        params: MetricParams,
    ) -> MetricOutcome {
        match (&self.handler, scope) {
            (Handler::Org(f), Scope::Org) => f(store, params).await,
            (Handler::Scoped(f), Scope::Repo(id)) if self.scope == ScopeKind::Repo => {
                f(store, id, params).await
            }
            (Handler::Scoped(f), Scope::Product(id)) if self.scope == ScopeKind::Product => {
                f(store, id, params).await
            }
            (Handler::Scoped(f), Scope::Project(id)) if self.scope == ScopeKind::Project => {
                f(store, id, params).await
            }
            _ => Err(MetricError::ScopeMismatch {
                metric: self.name().to_string(),
            }),
        }
    }
}

fn org<F, Fut>(
    path: &'static str,
    reduction: Reduction,
    unit: &'static str,
    f: F,
) -> MetricRoute
where
    F: Fn(Arc<dyn CiStore>, MetricParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MetricOutcome> + Send + 'static,
{
    MetricRoute {
        path,
        scope: ScopeKind::Org,
        reduction,
        unit,
        title: None,
        handler: Handler::Org(Arc::new(move |store, params| -> MetricFuture {
            Box::pin(f(store, params))
        })),
    }
}

fn scoped<F, Fut>(
    kind: ScopeKind,
    path: &'static str,
    reduction: Reduction,
    unit: &'static str,
    f: F,
) -> MetricRoute
where
    F: Fn(Arc<dyn CiStore>, String, MetricParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MetricOutcome> + Send + 'static,
{
    MetricRoute {
        path,
        scope: kind,
        reduction,
        unit,
        title: None,
        handler: Handler::Scoped(Arc::new(move |store, id, params| -> MetricFuture {
            Box::pin(f(store, id, params))
        })),
    }
}

/// The metric registry
pub struct Registry {
    routes: Vec<MetricRoute>,
}

impl Registry {
    /// Build the standard catalog
    pub fn standard() -> Self {
        use Reduction::{Avg, Sum};
        use ScopeKind::{Product, Project, Repo};

        let routes = vec![
            // Organization
            org("/total-builds", Sum, "builds", catalog::total_builds),
            org("/avg-builds", Avg, "builds", catalog::avg_builds),
            org("/total-executions", Sum, "executions", catalog::total_executions),
            org("/total-passed-builds", Sum, "passedbuilds", catalog::total_passed_builds),
            org("/total-failed-builds", Sum, "failedbuilds", catalog::total_failed_builds),
            org(
                "/total-passed-executions",
                Sum,
                "passedexecutions",
                catalog::total_passed_executions,
            ),
            org(
                "/total-failed-executions",
                Sum,
                "failedexecutions",
                catalog::total_failed_executions,
            ),
            org("/avg-build-time", Avg, "buildtime", catalog::avg_build_time),
            org("/total-build-time", Sum, "buildtime", catalog::total_build_time),
            org("/total-broken-time", Sum, "brokentime", catalog::total_broken_time),
            org("/time-to-fix", Avg, "timetofix", catalog::time_to_fix),
            // Repository
            scoped(Repo, "/total-repo-builds", Sum, "builds", catalog::repo_builds)
                .title("Builds"),
            scoped(Repo, "/total-repo-executions", Sum, "executions", catalog::repo_executions),
            scoped(Repo, "/avg-repo-executions", Avg, "executions", catalog::avg_repo_executions),
            scoped(
                Repo,
                "/total-passed-repo-executions",
                Sum,
                "passedexecutions",
                catalog::passed_repo_executions,
            ),
            scoped(
                Repo,
                "/total-failed-repo-executions",
                Sum,
                "failedexecutions",
                catalog::failed_repo_executions,
            ),
            scoped(Repo, "/repo-build-time", Sum, "buildtime", catalog::repo_build_time),
            scoped(Repo, "/repo-broken-time", Sum, "brokentime", catalog::repo_broken_time),
            scoped(Repo, "/repo-time-to-fix", Avg, "timetofix", catalog::repo_time_to_fix),
            // Product
            scoped(Product, "/total-product-builds", Sum, "builds", catalog::product_builds),
            scoped(
                Product,
                "/total-product-executions",
                Sum,
                "executions",
                catalog::product_executions,
            ),
            scoped(
                Product,
                "/total-passed-product-executions",
                Sum,
                "passedexecutions",
                catalog::passed_product_executions,
            ),
            scoped(
                Product,
                "/total-failed-product-executions",
                Sum,
                "failedexecutions",
                catalog::failed_product_executions,
            ),
            // Project
            scoped(Project, "/total-project-builds", Sum, "builds", catalog::project_builds),
            scoped(
                Project,
                "/total-project-executions",
                Sum,
                "executions",
                catalog::project_executions,
            ),
            scoped(
                Project,
                "/total-passed-project-executions",
                Sum,
                "passedexecutions",
                catalog::passed_project_executions,
            ),
            scoped(
                Project,
                "/total-failed-project-executions",
                Sum,
                "failedexecutions",
                catalog::failed_project_executions,
            ),
        ];

        Self { routes }
    }

    /// All registered routes, in registration order
    pub fn routes(&self) -> &[MetricRoute] {
        &self.routes
    }

    /// Look up a route by name (leading slash optional)
    pub fn find(&self, name: &str) -> Option<&MetricRoute> {
        let name = name.trim_start_matches('/');
        self.routes.iter().find(|route| route.name() == name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::TimeRange;
    use crate::store::{Execution, MemoryStore};

    fn store() -> Arc<dyn CiStore> {
        let mut store = MemoryStore::new();
        store.add_build("repo-a", "a-1");
        store.record_execution("a-1", Execution::passed(100).duration(10.0));
        store.link_product("prod", &["proj-1"]);
        store.link_project("proj-1", &["repo-a"]);
        Arc::new(store)
    }

    fn params() -> MetricParams {
        MetricParams::new(TimeRange::between(0, 1000), None)
    }

    #[test]
    fn test_standard_catalog_is_complete() {
        let registry = Registry::standard();
        assert_eq!(registry.len(), 27);

        let by_kind = |kind: ScopeKind| {
            registry
                .routes()
                .iter()
                .filter(|r| r.scope == kind)
                .count()
        };
        assert_eq!(by_kind(ScopeKind::Org), 11);
        assert_eq!(by_kind(ScopeKind::Repo), 8);
        assert_eq!(by_kind(ScopeKind::Product), 4);
        assert_eq!(by_kind(ScopeKind::Project), 4);
    }

    #[test]
    fn test_find_by_name_or_path() {
        let registry = Registry::standard();

        assert!(registry.find("total-builds").is_some());
        assert!(registry.find("/total-builds").is_some());
        assert!(registry.find("no-such-metric").is_none());

        let route = registry.find("repo-broken-time").unwrap();
        assert_eq!(route.scope, ScopeKind::Repo);
        assert_eq!(route.unit, "brokentime");
        assert_eq!(route.reduction, Reduction::Sum);
    }

    #[tokio::test]
    async fn test_invoke_dispatches_to_handler() {
        let registry = Registry::standard();
        let route = registry.find("total-builds").unwrap();

        let result = route.invoke(store(), Scope::Org, params()).await.unwrap();
        assert_eq!(result.series, vec![1.0]);
    }

    #[tokio::test]
    async fn test_invoke_rejects_scope_mismatch() {
        let registry = Registry::standard();
        let route = registry.find("total-builds").unwrap();

        let result = route
            .invoke(store(), Scope::Repo("repo-a".into()), params())
            .await;
        assert!(matches!(result, Err(MetricError::ScopeMismatch { .. })));

        // A repo metric invoked with a product scope is also a mismatch
        let route = registry.find("repo-build-time").unwrap();
        let result = route
            .invoke(store(), Scope::Product("prod".into()), params())
            .await;
        assert!(matches!(result, Err(MetricError::ScopeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_every_route_is_invokable() {
        let registry = Registry::standard();
        let store = store();

        for route in registry.routes() {
            let scope = match route.scope {
                ScopeKind::Org => Scope::Org,
                ScopeKind::Repo => Scope::Repo("repo-a".into()),
                ScopeKind::Product => Scope::Product("prod".into()),
                ScopeKind::Project => Scope::Project("proj-1".into()),
            };
            let result = route.invoke(store.clone(), scope, params()).await;
            assert!(result.is_ok(), "route {} failed: {:?}", route.name(), result.err());
        }
    }
}
