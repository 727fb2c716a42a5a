//! Tagged body carried by an envelope.

use serde::{Deserialize, Serialize};

use crate::record::{CollectionInfo, Record};

/// Body of a request or response.
///
/// Serialised with an explicit `kind` tag so a decoder never has to guess
/// the shape of `value`:
///
/// ```json
/// {"kind":"flag","value":true}
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    /// No body.
    #[default]
    None,
    /// A single record (`add`, `remove`).
    Record(Record),
    /// A list of records (`show` replies).
    Records(Vec<Record>),
    /// Collection summary (`info` replies).
    CollectionInfo(CollectionInfo),
    /// Boolean outcome (`login`, `register` replies).
    Flag(bool),
    /// Free text (`register` address, `import` document).
    Text(String),
}

impl Payload {
    /// Returns the record when this is a [`Payload::Record`].
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Returns the records when this is a [`Payload::Records`].
    #[must_use]
    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            Self::Records(records) => Some(records),
            _ => None,
        }
    }

    /// Returns the summary when this is a [`Payload::CollectionInfo`].
    #[must_use]
    pub fn as_collection_info(&self) -> Option<&CollectionInfo> {
        match self {
            Self::CollectionInfo(info) => Some(info),
            _ => None,
        }
    }

    /// Returns the flag when this is a [`Payload::Flag`].
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the text when this is a [`Payload::Text`].
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Short name of the variant for log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Record(_) => "record",
            Self::Records(_) => "records",
            Self::CollectionInfo(_) => "collection_info",
            Self::Flag(_) => "flag",
            Self::Text(_) => "text",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_uses_kind_and_value_tags() {
        let json = serde_json::to_string(&Payload::Flag(true)).expect("serialise");
        assert_eq!(json, r#"{"kind":"flag","value":true}"#);
    }

    #[test]
    fn none_has_no_value() {
        let json = serde_json::to_string(&Payload::None).expect("serialise");
        assert_eq!(json, r#"{"kind":"none"}"#);
        let decoded: Payload = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(decoded, Payload::None);
    }

    #[test]
    fn accessors_reject_other_variants() {
        let payload = Payload::Text(String::from("a@b.io"));
        assert_eq!(payload.as_text(), Some("a@b.io"));
        assert!(payload.as_flag().is_none());
        assert!(payload.as_record().is_none());
        assert_eq!(payload.kind(), "text");
    }
}
