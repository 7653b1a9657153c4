use crate::{
    document::{design_document_id, local_document_id, LOCAL_PREFIX},
    error::{Error, Result},
    observer::{ChangeListener, ListenOptions},
    query::ViewQuery,
    replicator::ReplicationRequest,
    request::{QueryParams, RestRequest, RestResponse},
    transport::{Authentication, ReqwestTransport, Transport},
};
use log::trace;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Where database lives and how to access it
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    base_url: String,
    name: String,
    auth: Authentication,
}

impl DatabaseConfig {
    /// `base_url` is concatenated with `name` as is, so it should end with '/',
    /// for example "http://127.0.0.1:4984/"
    pub fn new<U, N>(base_url: U, name: N) -> Self
    where
        U: Into<String>,
        N: Into<String>,
    {
        Self {
            base_url: base_url.into(),
            name: name.into(),
            auth: Authentication::None,
        }
    }
    pub fn with_authentication(mut self, auth: Authentication) -> Self {
        self.auth = auth;
        self
    }
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[inline]
    pub fn authentication(&self) -> &Authentication {
        &self.auth
    }
}

/// Client of one database on Couchbase Lite REST API.
///
/// Cheap to clone, all clones share configuration and transport.
#[derive(Clone)]
pub struct Database {
    pub(crate) inner: Arc<DbInner>,
}

pub(crate) struct DbInner {
    config: DatabaseConfig,
    transport: Box<dyn Transport>,
}

impl Database {
    /// Create client that talks to server via `reqwest`
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.base_url(), config.authentication())?;
        Ok(Self::with_transport(config, transport))
    }
    pub fn with_transport<T: Transport>(config: DatabaseConfig, transport: T) -> Self {
        Self {
            inner: Arc::new(DbInner {
                config,
                transport: Box::new(transport),
            }),
        }
    }
    /// Returns base url of server, as given in `DatabaseConfig`
    #[inline]
    pub fn url(&self) -> &str {
        self.inner.config.base_url()
    }
    /// Returns the name of the database
    #[inline]
    pub fn name(&self) -> &str {
        self.inner.config.name()
    }
    #[inline]
    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// Create database with name from config
    pub async fn create_database(&self) -> Result<Value> {
        self.request(Method::PUT, self.db_url(), None, None).await
    }
    /// Get database information
    pub async fn get_database(&self) -> Result<Value> {
        self.request(Method::GET, self.db_url(), None, None).await
    }

    /// Create or replace design document `name` with given views,
    /// `_design/` prefix is added to `name` if it is missing
    pub async fn create_design_document<V: Serialize>(
        &self,
        name: &str,
        views: &V,
    ) -> Result<Value> {
        let body = json!({ "views": serde_json::to_value(views)? });
        let url = self.doc_url(&design_document_id(name));
        self.request(Method::PUT, url, None, Some(body)).await
    }
    pub async fn get_design_document(&self, name: &str) -> Result<Value> {
        let url = self.doc_url(&design_document_id(name));
        self.request(Method::GET, url, None, None).await
    }
    /// Query view `view_name` of design document `design_name`,
    /// `design_name` should be full id, like "_design/chat"
    pub async fn query_view(
        &self,
        design_name: &str,
        view_name: &str,
        options: &ViewQuery,
    ) -> Result<Value> {
        let url = self.doc_url(&format!("{}/_view/{}", design_name, view_name));
        self.request(Method::GET, url, options.to_params(), None)
            .await
    }

    /// Create document with id generated by server
    pub async fn create_document<T: Serialize>(&self, doc: &T) -> Result<Value> {
        let body = serde_json::to_value(doc)?;
        self.request(Method::POST, self.db_url(), None, Some(body))
            .await
    }
    /// Create local (not replicated) document, empty `id` means generate one
    pub async fn create_local_document<T: Serialize>(
        &self,
        id: &str,
        doc: &T,
    ) -> Result<Value> {
        let body = serde_json::to_value(doc)?;
        let url = self.doc_url(&format!("{}{}", LOCAL_PREFIX, local_document_id(id)));
        self.request(Method::PUT, url, None, Some(body)).await
    }
    /// Save new revision of document, `rev` is revision we replace
    pub async fn update_document<T: Serialize>(
        &self,
        id: &str,
        rev: &str,
        doc: &T,
    ) -> Result<Value> {
        let body = serde_json::to_value(doc)?;
        self.request(Method::PUT, self.doc_url(id), rev_param(rev), Some(body))
            .await
    }
    pub async fn delete_document(&self, id: &str, rev: &str) -> Result<Value> {
        self.request(Method::DELETE, self.doc_url(id), rev_param(rev), None)
            .await
    }
    pub async fn get_all_documents(&self) -> Result<Value> {
        self.request(Method::GET, self.doc_url("_all_docs"), None, None)
            .await
    }
    pub async fn get_document(&self, id: &str) -> Result<Value> {
        self.request(Method::GET, self.doc_url(id), None, None).await
    }
    pub async fn get_local_document(&self, id: &str) -> Result<Value> {
        let url = self.doc_url(&format!("{}{}", LOCAL_PREFIX, id));
        self.request(Method::GET, url, None, None).await
    }

    /// Replicate in one direction, from `source` to `target`
    pub async fn replicate(
        &self,
        source: &str,
        target: &str,
        continuous: bool,
    ) -> Result<Value> {
        let body = serde_json::to_value(ReplicationRequest {
            source,
            target,
            continuous,
        })?;
        self.request(Method::POST, self.server_url("_replicate"), None, Some(body))
            .await
    }
    /// List of tasks running on server, like replications
    pub async fn get_active_tasks(&self) -> Result<Value> {
        self.request(Method::GET, self.server_url("_active_tasks"), None, None)
            .await
    }

    /// Wait for changes after `since`, single long-poll request
    pub async fn poll_changes(&self, since: &Value) -> Result<Value> {
        let since = match since {
            Value::String(s) => s.clone(),
            _ => since.to_string(),
        };
        let params = vec![
            ("feed".to_string(), "longpoll".to_string()),
            ("since".to_string(), since),
        ];
        self.request(Method::GET, self.doc_url("_changes"), Some(params), None)
            .await
    }

    /// Start listening for changes from the beginning of change feed.
    /// Should be called within tokio runtime.
    pub fn listen(&self) -> Result<ChangeListener> {
        self.listen_with(ListenOptions::default())
    }
    pub fn listen_with(&self, options: ListenOptions) -> Result<ChangeListener> {
        let handle = Handle::try_current().map_err(|err| {
            Error::LogicError(format!("listen outside of tokio runtime: {}", err))
        })?;
        Ok(ChangeListener::start(self.clone(), options, &handle))
    }

    /// Make request and return body of response, non-2xx response is `Error::Http`
    pub async fn request(
        &self,
        method: Method,
        url: String,
        params: Option<QueryParams>,
        body: Option<Value>,
    ) -> Result<Value> {
        self.request_complete(method, url, params, body)
            .await
            .map(|response| response.body)
    }

    /// The same as `Database::request`, but return whole response,
    /// for cases when status or headers are needed.
    /// Headers of non-2xx response are kept in `Error::Http`
    pub async fn request_complete(
        &self,
        method: Method,
        url: String,
        params: Option<QueryParams>,
        body: Option<Value>,
    ) -> Result<RestResponse> {
        let request = RestRequest::new(method, url)
            .with_params(params)
            .with_body(body);
        let response = self.inner.transport.execute(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            trace!("request failed with status {}", response.status);
            Err(Error::Http {
                status: response.status,
                headers: response.headers,
                body: response.body,
            })
        }
    }

    fn db_url(&self) -> String {
        format!("{}{}", self.url(), self.name())
    }
    fn doc_url(&self, path: &str) -> String {
        format!("{}{}/{}", self.url(), self.name(), path)
    }
    fn server_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.url(), endpoint)
    }
}

fn rev_param(rev: &str) -> Option<QueryParams> {
    Some(vec![("rev".to_string(), rev.to_string())])
}
