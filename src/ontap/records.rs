//! Wire shapes exchanged with the ONTAP REST API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resource::CloneSpec;

/// Collection envelope returned by list endpoints.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub(crate) struct Collection {
    #[serde(default)]
    pub(crate) records: Vec<Record>,
}

impl Collection {
    /// Parses a collection body. An empty body is an empty collection.
    pub(crate) fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(body)
    }
}

/// Single record in a collection; only the fields this crate requests.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(crate) struct Record {
    #[serde(default)]
    pub(crate) uuid: Option<Uuid>,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

impl Record {
    /// Returns the record UUID, rejecting missing and nil values.
    pub(crate) fn require_uuid(&self) -> Result<Uuid, String> {
        match self.uuid {
            Some(uuid) if !uuid.is_nil() => Ok(uuid),
            Some(_) => Err(String::from("record carries the nil UUID")),
            None => Err(format!(
                "record '{}' has no uuid",
                self.name.as_deref().unwrap_or("<unnamed>")
            )),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct CreateSnapshotBody<'a> {
    pub(crate) name: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct NameRef<'a> {
    pub(crate) name: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct CloneSource<'a> {
    pub(crate) is_flexclone: bool,
    pub(crate) parent_snapshot: NameRef<'a>,
    pub(crate) parent_volume: NameRef<'a>,
}

/// Body of `POST /storage/volumes` for a FlexClone.
#[derive(Clone, Debug, Serialize)]
pub(crate) struct CreateCloneBody<'a> {
    pub(crate) name: &'a str,
    pub(crate) svm: NameRef<'a>,
    pub(crate) clone: CloneSource<'a>,
    pub(crate) comment: String,
}

impl<'a> CreateCloneBody<'a> {
    pub(crate) fn new(spec: &'a CloneSpec) -> Self {
        Self {
            name: &spec.clone_volume,
            svm: NameRef { name: &spec.svm },
            clone: CloneSource {
                is_flexclone: true,
                parent_snapshot: NameRef {
                    name: &spec.source_snapshot,
                },
                parent_volume: NameRef {
                    name: &spec.source_volume,
                },
            },
            comment: spec.comment_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("")]
    #[case("{}")]
    #[case(r#"{"num_records":0}"#)]
    fn missing_records_mean_empty_collection(#[case] body: &str) {
        let collection = Collection::from_body(body).expect("body should parse");
        assert!(collection.records.is_empty());
    }

    #[rstest]
    fn record_uuid_is_parsed() {
        let body = r#"{"records":[{"uuid":"1cd8a442-86d1-11e0-ae1c-123478563412","name":"vol1"}],"num_records":1}"#;
        let collection = Collection::from_body(body).expect("body should parse");
        let uuid = collection
            .records
            .first()
            .map(Record::require_uuid)
            .expect("one record")
            .expect("uuid present");
        assert_eq!(uuid.to_string(), "1cd8a442-86d1-11e0-ae1c-123478563412");
    }

    #[rstest]
    #[case(r#"{"records":[{"name":"vol1"}]}"#)]
    #[case(r#"{"records":[{"uuid":"00000000-0000-0000-0000-000000000000"}]}"#)]
    fn record_without_usable_uuid_is_rejected(#[case] body: &str) {
        let collection = Collection::from_body(body).expect("body should parse");
        let record = collection.records.first().expect("one record");
        assert!(record.require_uuid().is_err());
    }

    #[rstest]
    fn garbage_uuid_fails_to_parse() {
        assert!(Collection::from_body(r#"{"records":[{"uuid":"not-a-uuid"}]}"#).is_err());
    }

    #[rstest]
    fn clone_body_matches_flexclone_shape() {
        let spec = CloneSpec::builder()
            .source_volume("vol1")
            .source_snapshot("snap1")
            .clone_volume("clone1")
            .svm("svm0")
            .build()
            .expect("spec should build");
        let value = serde_json::to_value(CreateCloneBody::new(&spec)).expect("serialise");
        assert_eq!(
            value,
            json!({
                "name": "clone1",
                "svm": {"name": "svm0"},
                "clone": {
                    "is_flexclone": true,
                    "parent_snapshot": {"name": "snap1"},
                    "parent_volume": {"name": "vol1"}
                },
                "comment": "FlexClone from snapshot snap1"
            })
        );
    }
}
