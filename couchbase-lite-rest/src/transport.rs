use crate::{
    error::{Error, Result},
    request::{RestRequest, RestResponse},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use futures_util::future::{BoxFuture, FutureExt};
use log::trace;
use reqwest::{
    cookie::Jar,
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Url,
};
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Something that can deliver `RestRequest` to server.
///
/// `Database` funnels every call through this trait, so tests can
/// replace network with scripted answers. Implementation should return
/// `Ok` for any answer of server, including non-2xx ones, and `Err`
/// only if there is no answer at all.
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, request: RestRequest) -> BoxFuture<'_, Result<RestResponse>>;
}

/// How to authenticate requests, in addition to cookies set by server
#[derive(Clone, Default)]
pub enum Authentication {
    #[default]
    None,
    /// HTTP Basic authentication
    Basic { user: String, password: String },
    /// Sync Gateway session, sent as `SyncGatewaySession` cookie
    SessionToken(String),
}

impl fmt::Debug for Authentication {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Authentication::None => write!(fmt, "None"),
            Authentication::Basic { user, .. } => {
                write!(fmt, "Basic {{ user: {:?}, password: *** }}", user)
            }
            Authentication::SessionToken(_) => write!(fmt, "SessionToken(***)"),
        }
    }
}

/// `Transport` on top of `reqwest::Client` with cookie store,
/// so credentials set by server are sent with every request.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// `base_url` is the server the session cookie is bound to
    pub fn new(base_url: &str, auth: &Authentication) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::new(cookie_jar(base_url, auth)?))
            .default_headers(auth_headers(auth)?)
            .build()?;
        Ok(Self { client })
    }

    async fn do_execute(&self, request: RestRequest) -> Result<RestResponse> {
        trace!(
            "{} {}, params {:?}, has body {}",
            request.method,
            request.url,
            request.params,
            request.body.is_some()
        );
        let RestRequest {
            method,
            url,
            params,
            body,
        } = request;
        let mut builder = self.client.request(method, &url);
        if let Some(params) = params.as_ref() {
            builder = builder.query(params);
        }
        if let Some(body) = body.as_ref() {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;
        trace!("{}: status {}, {} bytes", url, status, bytes.len());
        let body = decode_body(status, &bytes)?;
        Ok(RestResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: RestRequest) -> BoxFuture<'_, Result<RestResponse>> {
        self.do_execute(request).boxed()
    }
}

/// Session token lives in the same jar as cookies set by server,
/// so server can refresh it and add its own ones
fn cookie_jar(base_url: &str, auth: &Authentication) -> Result<Jar> {
    let jar = Jar::default();
    if let Authentication::SessionToken(token) = auth {
        let url = Url::parse(base_url)
            .map_err(|err| Error::LogicError(format!("invalid url {}: {}", base_url, err)))?;
        if token.contains(|ch: char| ch == ';' || ch.is_control()) {
            return Err(Error::LogicError("invalid session token".into()));
        }
        jar.add_cookie_str(&format!("SyncGatewaySession={}; Path=/", token), &url);
    }
    Ok(jar)
}

fn auth_headers(auth: &Authentication) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Authentication::Basic { user, password } = auth {
        let mut value = HeaderValue::from_str(&http_basic_auth_header(user, password))
            .map_err(|err| Error::LogicError(format!("invalid authorization header: {}", err)))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

/// Empty body is `null`. Error bodies that are not JSON are kept as text.
fn decode_body(status: u16, bytes: &[u8]) -> Result<Value> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_slice(bytes) {
        Ok(body) => Ok(body),
        Err(_) if !(200..300).contains(&status) => {
            Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
        }
        Err(err) => Err(err.into()),
    }
}

fn http_basic_auth_header(user_id: &str, password: &str) -> String {
    let credentials = format!("{}:{}", user_id, password);
    let mut ret = "Basic ".to_string();
    STANDARD.encode_string(credentials.as_bytes(), &mut ret);
    ret
}

#[test]
fn test_basic_auth_encode() {
    assert_eq!(
        "Basic Ym9iOnNlY3JldA==",
        http_basic_auth_header("bob", "secret")
    );
}

#[test]
fn test_decode_body() {
    assert_eq!(Value::Null, decode_body(200, b"").unwrap());
    assert_eq!(
        serde_json::json!({"ok": true}),
        decode_body(201, br#"{"ok":true}"#).unwrap()
    );
    assert_eq!(
        Value::String("Bad Gateway".into()),
        decode_body(502, b"Bad Gateway").unwrap()
    );
    assert!(matches!(decode_body(200, b"<html>"), Err(Error::Json(_))));
}

#[test]
fn test_auth_headers() {
    assert!(auth_headers(&Authentication::None).unwrap().is_empty());
    assert!(auth_headers(&Authentication::SessionToken("abc".into()))
        .unwrap()
        .is_empty());
    let headers = auth_headers(&Authentication::Basic {
        user: "bob".into(),
        password: "secret".into(),
    })
    .unwrap();
    assert_eq!(
        "Basic Ym9iOnNlY3JldA==",
        headers[AUTHORIZATION].to_str().unwrap()
    );
}

#[test]
fn test_session_token_in_cookie_jar() {
    use reqwest::cookie::CookieStore;

    let url = Url::parse("http://127.0.0.1:4984/mydb").unwrap();
    let jar = cookie_jar(
        "http://127.0.0.1:4984/",
        &Authentication::SessionToken("abc".into()),
    )
    .unwrap();
    assert_eq!(
        "SyncGatewaySession=abc",
        jar.cookies(&url).unwrap().to_str().unwrap()
    );
    let jar = cookie_jar("http://127.0.0.1:4984/", &Authentication::None).unwrap();
    assert!(jar.cookies(&url).is_none());
    assert!(cookie_jar("not url", &Authentication::SessionToken("abc".into())).is_err());
    assert!(cookie_jar(
        "http://127.0.0.1:4984/",
        &Authentication::SessionToken("a\nb".into())
    )
    .is_err());
}

#[test]
fn test_credentials_are_not_printed() {
    let auth = Authentication::Basic {
        user: "bob".into(),
        password: "secret".into(),
    };
    let text = format!("{:?}", auth);
    assert!(text.contains("bob"), "{}", text);
    assert!(!text.contains("secret"), "{}", text);
    let text = format!("{:?}", Authentication::SessionToken("abc123".into()));
    assert!(!text.contains("abc123"), "{}", text);
}
