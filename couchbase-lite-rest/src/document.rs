use std::borrow::Cow;
use uuid::Uuid;

pub(crate) const DESIGN_PREFIX: &str = "_design/";
pub(crate) const LOCAL_PREFIX: &str = "_local/";

/// Full id of design document: `name` with `_design/` prefix,
/// prefix is not added second time if `name` already has it.
pub fn design_document_id(name: &str) -> Cow<str> {
    if name.contains(DESIGN_PREFIX) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{}{}", DESIGN_PREFIX, name))
    }
}

/// Id for local document, empty id means "generate one"
pub(crate) fn local_document_id(id: &str) -> Cow<str> {
    if id.is_empty() {
        Cow::Owned(Uuid::new_v4().hyphenated().to_string())
    } else {
        Cow::Borrowed(id)
    }
}

#[test]
fn test_design_document_id() {
    assert_eq!("_design/foo", design_document_id("foo"));
    assert_eq!("_design/foo", design_document_id("_design/foo"));
    assert!(matches!(design_document_id("_design/foo"), Cow::Borrowed(_)));
}

#[test]
fn test_local_document_id() {
    assert_eq!("checkpoint", local_document_id("checkpoint"));
    let generated = local_document_id("");
    assert!(Uuid::parse_str(&generated).is_ok());
    assert_ne!(generated, local_document_id(""));
}
