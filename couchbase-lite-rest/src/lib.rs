mod database;
mod document;
mod error;
mod observer;
mod query;
mod replicator;
mod request;
mod transport;

pub use crate::{
    database::{Database, DatabaseConfig},
    document::design_document_id,
    error::{Error, Result},
    observer::{ChangeEvent, ChangeListener, ChangeNotification, ListenOptions, RetryPolicy},
    query::ViewQuery,
    replicator::ReplicationRequest,
    request::{QueryParams, RestRequest, RestResponse},
    transport::{Authentication, ReqwestTransport, Transport},
};
pub use futures_util::future::BoxFuture;
pub use reqwest::Method;
pub use serde_json;
