use serde::Serialize;

/// Body of `POST /_replicate`.
///
/// `source` and `target` are either local database names or
/// URLs of remote databases, like "http://192.168.1.132:4984/demo".
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReplicationRequest<'a> {
    pub source: &'a str,
    pub target: &'a str,
    /// keep replicating changes after catching up
    pub continuous: bool,
}

#[test]
fn test_replication_request_json() {
    let req = ReplicationRequest {
        source: "mydb",
        target: "http://host:4984/remote",
        continuous: true,
    };
    assert_eq!(
        serde_json::json!({
            "source": "mydb",
            "target": "http://host:4984/remote",
            "continuous": true
        }),
        serde_json::to_value(&req).unwrap()
    );
}
