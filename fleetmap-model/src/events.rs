use crate::record::RawRecord;

use std::fmt;

/// Action tag carried by a change-stream event.
///
/// Parsing never fails: tags outside the known set are kept verbatim in
/// [`ChangeAction::Unrecognized`] so the reconciler can decide what to do.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub enum ChangeAction {
    Insert,
    Update,
    Delete,
    Unrecognized(String),
}

impl ChangeAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unrecognized(tag) => tag,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<&str> for ChangeAction {
    fn from(value: &str) -> Self {
        match value {
            // PocketBase calls inserts "create"
            "insert" | "create" => Self::Insert,
            "update" => Self::Update,
            "delete" => Self::Delete,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for ChangeAction {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<ChangeAction> for String {
    fn from(value: ChangeAction) -> Self {
        match value {
            ChangeAction::Unrecognized(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{action, record}` message from the live change stream.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeEvent {
    pub action: ChangeAction,
    #[cfg_attr(feature = "serde", serde(default))]
    pub record: RawRecord,
}

impl ChangeEvent {
    pub fn new(action: impl Into<ChangeAction>, record: RawRecord) -> Self {
        Self {
            action: action.into(),
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeAction;

    #[test]
    fn action_tags_parse() {
        for (tag, action) in [
            ("insert", ChangeAction::Insert),
            ("create", ChangeAction::Insert),
            ("update", ChangeAction::Update),
            ("delete", ChangeAction::Delete),
        ] {
            assert_eq!(ChangeAction::from(tag), action);
            assert!(action.is_recognized());
        }

        let odd = ChangeAction::from("archive");
        assert_eq!(odd, ChangeAction::Unrecognized("archive".into()));
        assert_eq!(odd.as_str(), "archive");
        assert!(!odd.is_recognized());
    }
}
