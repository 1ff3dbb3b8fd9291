//! # Categories state.
//!
//! Holds the flat category list, the derived hierarchy, a loading flag and the
//! field-level errors of the last failed load.
//!
//! ## `load` transitions
//! ```text
//! start                    ─► {waiting: true,  errors: None}
//! Ok(list)                 ─► {items, count, roots: tree(items), waiting: false, errors: None}   Ok(Some(list))
//! Err(Validation{issues})  ─► {waiting: false, errors: Some(issues)}                             Ok(None)
//! Err(other)               ─► {waiting: false, errors: <as before load>}                         Err(other)
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{ApiService, Issue, QueryParams};
use crate::core::StateContext;
use crate::error::{ApiError, JobError, LoadError, PatchError};
use crate::events::Bus;
use crate::init::{InitFn, InitRef};
use crate::state::{Patch, Snapshot, StateContainer, StateModule};
use crate::utils::{TreeItem, TreeNode, list_to_tree};

/// Reference to the parent category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A category as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TreeItem for Category {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.id.as_str())
    }
}

/// Result of the `categories` list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryList {
    #[serde(default)]
    pub items: Vec<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// Snapshot of [`CategoriesState`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Categories {
    pub items: Vec<Category>,
    pub count: Option<u64>,
    pub roots: Vec<TreeNode<Category>>,
    pub waiting: bool,
    pub errors: Option<Vec<Issue>>,
}

/// Typed patch of [`Categories`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct CategoriesPatch {
    pub items: Option<Vec<Category>>,
    pub count: Option<Option<u64>>,
    pub roots: Option<Vec<TreeNode<Category>>>,
    pub waiting: Option<bool>,
    pub errors: Option<Option<Vec<Issue>>>,
}

impl CategoriesPatch {
    fn waiting() -> Self {
        Self {
            waiting: Some(true),
            errors: Some(None),
            ..Self::default()
        }
    }

    fn loaded(list: &CategoryList) -> Self {
        Self {
            roots: Some(list_to_tree(&list.items)),
            items: Some(list.items.clone()),
            count: Some(list.count),
            waiting: Some(false),
            errors: Some(None),
        }
    }

    fn rejected(issues: Vec<Issue>) -> Self {
        Self {
            waiting: Some(false),
            errors: Some(Some(issues)),
            ..Self::default()
        }
    }

    fn aborted(errors: Option<Vec<Issue>>) -> Self {
        Self {
            waiting: Some(false),
            errors: Some(errors),
            ..Self::default()
        }
    }
}

impl Patch<Categories> for CategoriesPatch {
    fn apply(self, current: &Categories) -> Result<Categories, PatchError> {
        if self.roots.is_some() && self.items.is_none() {
            return Err(PatchError::new("roots must be patched together with items"));
        }
        let mut next = current.clone();
        if let Some(items) = self.items {
            next.items = items;
        }
        if let Some(count) = self.count {
            next.count = count;
        }
        if let Some(roots) = self.roots {
            next.roots = roots;
        }
        if let Some(waiting) = self.waiting {
            next.waiting = waiting;
        }
        if let Some(errors) = self.errors {
            next.errors = errors;
        }
        Ok(next)
    }
}

/// Category list loaded from the `categories` endpoint.
pub struct CategoriesState {
    container: StateContainer<Categories>,
    api: Arc<ApiService>,
}

impl CategoriesState {
    /// Registration name and API namespace.
    pub const NAME: &'static str = "categories";

    pub fn new(api: Arc<ApiService>, bus: Bus) -> Self {
        Self {
            container: StateContainer::new(Self::NAME, Self::initial(), bus),
            api,
        }
    }

    /// Constructor used with [`ServicesBuilder::with_state`](crate::ServicesBuilder::with_state).
    pub fn from_context(ctx: &StateContext) -> Self {
        Self::new(ctx.api(), ctx.bus()).with_logging(ctx.log())
    }

    /// Enables transition logging.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.container = self.container.with_logging(log);
        self
    }

    pub fn current(&self) -> Arc<Snapshot<Categories>> {
        self.container.current()
    }

    /// Loads the list and records the result in state.
    ///
    /// Returns `Ok(None)` when the server rejected `params` with field-level
    /// issues; those are stored in `errors` instead.
    ///
    /// ### Errors
    /// Any other endpoint or decoding failure. `waiting` is cleared and
    /// `errors` restored to its value from before the call.
    pub async fn load(&self, params: &QueryParams) -> Result<Option<CategoryList>, LoadError> {
        let before = self.container.current().errors.clone();
        self.container
            .update(CategoriesPatch::waiting(), "categories: waiting")?;

        match self.fetch(params).await {
            Ok(list) => {
                self.container
                    .update(CategoriesPatch::loaded(&list), "categories: loaded")?;
                Ok(Some(list))
            }
            Err(LoadError::Api(ApiError::Validation { issues, .. })) => {
                self.container
                    .update(CategoriesPatch::rejected(issues), "categories: rejected")?;
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(error = %err, "categories load failed");
                self.container
                    .update(CategoriesPatch::aborted(before), "categories: load failed")?;
                Err(err)
            }
        }
    }

    /// Init function running [`load`](Self::load) with `params`.
    ///
    /// Resolves to the loaded list as JSON, or `null` when the server rejected
    /// the request with field-level issues.
    pub fn init(self: &Arc<Self>, params: QueryParams) -> InitRef {
        let state = Arc::clone(self);
        InitFn::arc(move || {
            let state = Arc::clone(&state);
            let params = params.clone();
            async move {
                let loaded = state.load(&params).await?;
                serde_json::to_value(loaded).map_err(JobError::fail)
            }
        })
    }

    async fn fetch(&self, params: &QueryParams) -> Result<CategoryList, LoadError> {
        let response = self.api.endpoint(Self::NAME).find_many(params).await?;
        Ok(serde_json::from_value(response.result)?)
    }
}

impl StateModule for CategoriesState {
    type State = Categories;

    fn initial() -> Categories {
        Categories::default()
    }

    fn container(&self) -> &StateContainer<Categories> {
        &self.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResponse, Endpoint};
    use crate::config::ApiConfig;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::sync::oneshot;

    /// Endpoint answering `find_many` with queued responses.
    struct Scripted {
        replies: Mutex<Vec<Result<ApiResponse, ApiError>>>,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<ApiResponse, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                gate: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Endpoint for Scripted {
        fn namespace(&self) -> &str {
            CategoriesState::NAME
        }

        async fn find_many(&self, _params: &QueryParams) -> Result<ApiResponse, ApiError> {
            let gate = self.gate.lock().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.replies.lock().remove(0)
        }

        async fn find_one(&self, _id: &str, _params: &QueryParams) -> Result<ApiResponse, ApiError> {
            unreachable!("not used")
        }
    }

    fn state(endpoint: Arc<Scripted>) -> Arc<CategoriesState> {
        let api = ApiService::new(&ApiConfig::default()).unwrap();
        api.register_endpoint(endpoint);
        Arc::new(CategoriesState::new(Arc::new(api), Bus::new(64)))
    }

    fn list() -> Value {
        json!({
            "items": [
                {"_id": "1", "title": "Books"},
                {"_id": "2", "title": "Novels", "parent": {"_id": "1", "_type": "category"}},
                {"_id": "3", "title": "Music"}
            ],
            "count": 3
        })
    }

    fn validation() -> ApiError {
        ApiError::Validation {
            status: 400,
            issues: vec![Issue::new("limit", "too large")],
        }
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: 500,
            message: "boom".into(),
        }
    }

    #[tokio::test]
    async fn test_load_success_builds_tree() {
        let state = state(Scripted::new(vec![Ok(ApiResponse::new(list()))]));

        let loaded = state.load(&QueryParams::new()).await.unwrap().unwrap();

        assert_eq!(loaded.items.len(), 3);
        let snap = state.current();
        assert!(!snap.waiting);
        assert_eq!(snap.errors, None);
        assert_eq!(snap.count, Some(3));
        assert_eq!(snap.roots.len(), 2);
        assert_eq!(snap.roots[0].item.title, "Books");
        assert_eq!(snap.roots[0].children[0].item.id, "2");
        assert_eq!(
            snap.items[1].parent.as_ref().unwrap().extra.get("_type"),
            Some(&json!("category"))
        );
    }

    #[tokio::test]
    async fn test_waiting_is_visible_during_load() {
        let endpoint = Scripted::new(vec![Ok(ApiResponse::new(list()))]);
        let (release, gate) = oneshot::channel();
        *endpoint.gate.lock() = Some(gate);
        let state = state(endpoint);

        let loading = tokio::spawn({
            let state = Arc::clone(&state);
            async move { state.load(&QueryParams::new()).await }
        });
        let mut changes = state.container().watch();
        while !state.current().waiting {
            changes.changed().await.unwrap();
        }
        assert_eq!(state.current().errors, None);

        release.send(()).unwrap();
        loading.await.unwrap().unwrap();
        assert!(!state.current().waiting);
    }

    #[tokio::test]
    async fn test_validation_failure_is_absorbed() {
        let state = state(Scripted::new(vec![Err(validation())]));

        let loaded = state.load(&QueryParams::new()).await.unwrap();

        assert!(loaded.is_none());
        let snap = state.current();
        assert!(!snap.waiting);
        assert_eq!(snap.errors, Some(vec![Issue::new("limit", "too large")]));
        assert!(snap.items.is_empty());
    }

    #[tokio::test]
    async fn test_other_failure_propagates_and_restores_errors() {
        let state = state(Scripted::new(vec![Err(validation()), Err(server_error())]));
        state.load(&QueryParams::new()).await.unwrap();
        let errors_before = state.current().errors.clone();
        assert!(errors_before.is_some());

        let err = state.load(&QueryParams::new()).await.unwrap_err();

        assert_eq!(err.as_label(), "api_status");
        let snap = state.current();
        assert!(!snap.waiting);
        assert_eq!(snap.errors, errors_before);
    }

    #[tokio::test]
    async fn test_unexpected_shape_propagates() {
        let state = state(Scripted::new(vec![Ok(ApiResponse::new(json!({"items": 7})))]));
        let err = state.load(&QueryParams::new()).await.unwrap_err();
        assert_eq!(err.as_label(), "load_decode");
        assert!(!state.current().waiting);
    }

    #[tokio::test]
    async fn test_init_resolves_to_json() {
        let state = state(Scripted::new(vec![
            Ok(ApiResponse::new(list())),
            Err(validation()),
            Err(server_error()),
        ]));
        let init = state.init(QueryParams::new().limit(10));

        let value = init.call().await.unwrap();
        assert_eq!(value["count"], 3);
        assert_eq!(init.call().await.unwrap(), Value::Null);
        assert!(matches!(init.call().await, Err(JobError::Fail { .. })));
    }

    #[test]
    fn test_roots_without_items_is_rejected() {
        let patch = CategoriesPatch {
            roots: Some(Vec::new()),
            ..CategoriesPatch::default()
        };
        assert!(patch.apply(&Categories::default()).is_err());
    }
}
