use crate::request::QueryParams;
use serde_json::{Map, Value};

/// Options of view query, see `Database::query_view`.
///
/// Every option becomes one query parameter, in order of calls.
/// Setting the same option twice replaces previous value.
/// Key helpers (`key`, `keys`, `start_key`, `end_key`) JSON encode their
/// argument, `option` and `from_json` send values as given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewQuery {
    params: QueryParams,
}

impl ViewQuery {
    pub fn new() -> Self {
        Self::default()
    }
    /// Build from JSON object, like `{"limit": 10, "descending": true}`
    pub fn from_json(options: &Map<String, Value>) -> Self {
        options
            .iter()
            .fold(Self::new(), |query, (name, value)| {
                query.option(name, value.clone())
            })
    }
    /// Set arbitrary option, string is sent raw, other values as JSON text
    pub fn option<N, V>(self, name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        let value = match value.into() {
            Value::String(s) => s,
            value => value.to_string(),
        };
        self.set(name.into(), value)
    }
    #[inline]
    pub fn key<V: Into<Value>>(self, key: V) -> Self {
        self.set_json("key", key.into())
    }
    #[inline]
    pub fn keys<V: Into<Value>>(self, keys: Vec<V>) -> Self {
        let keys: Vec<Value> = keys.into_iter().map(Into::into).collect();
        self.set_json("keys", Value::Array(keys))
    }
    #[inline]
    pub fn start_key<V: Into<Value>>(self, key: V) -> Self {
        self.set_json("startkey", key.into())
    }
    #[inline]
    pub fn end_key<V: Into<Value>>(self, key: V) -> Self {
        self.set_json("endkey", key.into())
    }
    #[inline]
    pub fn limit(self, limit: u64) -> Self {
        self.option("limit", limit)
    }
    #[inline]
    pub fn skip(self, skip: u64) -> Self {
        self.option("skip", skip)
    }
    #[inline]
    pub fn descending(self, descending: bool) -> Self {
        self.option("descending", descending)
    }
    #[inline]
    pub fn include_docs(self, include_docs: bool) -> Self {
        self.option("include_docs", include_docs)
    }
    #[inline]
    pub fn inclusive_end(self, inclusive_end: bool) -> Self {
        self.option("inclusive_end", inclusive_end)
    }
    #[inline]
    pub fn reduce(self, reduce: bool) -> Self {
        self.option("reduce", reduce)
    }
    #[inline]
    pub fn group(self, group: bool) -> Self {
        self.option("group", group)
    }
    #[inline]
    pub fn group_level(self, level: u32) -> Self {
        self.option("group_level", level)
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
    /// Query parameters in wire form, `None` if no option was set
    pub fn to_params(&self) -> Option<QueryParams> {
        if self.params.is_empty() {
            None
        } else {
            Some(self.params.clone())
        }
    }
}

impl ViewQuery {
    /// Keys are JSON values for server, so string key goes with quotes
    fn set_json(self, name: &str, value: Value) -> Self {
        self.set(name.to_string(), value.to_string())
    }
    fn set(mut self, name: String, value: String) -> Self {
        match self.params.iter_mut().find(|(key, _)| *key == name) {
            Some(param) => param.1 = value,
            None => self.params.push((name, value)),
        }
        self
    }
}
