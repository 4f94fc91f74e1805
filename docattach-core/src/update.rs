//! Update documents and single-field modifiers.
//!
//! An update document is either an operator document (`{ "$set": {...}, "$inc": {...} }`)
//! or a whole-document replacement (`{ "name": ..., "tags": [...] }`). The store decides
//! what to do based on that shape, so the shape is checked up front and carried as an
//! [`UpdateDoc`].

use std::fmt;

use bson::{Bson, Document, doc};

use crate::error::{AttachError, AttachResult};

/// A classified update document.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateDoc {
    /// Every top-level key is an `$operator`.
    Operators(Document),
    /// No top-level key is an operator; the document replaces the match wholesale.
    Replacement(Document),
}

impl UpdateDoc {
    /// Classifies `update` by the shape of its top-level keys.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::InvalidUpdate`] if the document is empty or mixes
    /// operators with plain fields.
    pub fn classify(update: Document) -> AttachResult<Self> {
        if update.is_empty() {
            return Err(AttachError::InvalidUpdate("update document is empty".into()));
        }

        let operators = update.keys().filter(|k| k.starts_with('$')).count();

        if operators == update.len() {
            Ok(UpdateDoc::Operators(update))
        } else if operators == 0 {
            Ok(UpdateDoc::Replacement(update))
        } else {
            Err(AttachError::InvalidUpdate(format!(
                "update mixes operators and fields: {:?}",
                update.keys().collect::<Vec<_>>()
            )))
        }
    }

    /// A `$set` of the given fields.
    pub fn set(fields: Document) -> Self {
        UpdateDoc::Operators(doc! { "$set": fields })
    }

    pub fn is_replacement(&self) -> bool {
        matches!(self, UpdateDoc::Replacement(_))
    }

    pub fn as_document(&self) -> &Document {
        match self {
            UpdateDoc::Operators(doc) | UpdateDoc::Replacement(doc) => doc,
        }
    }

    pub fn into_document(self) -> Document {
        match self {
            UpdateDoc::Operators(doc) | UpdateDoc::Replacement(doc) => doc,
        }
    }
}

/// A single update operator, as used by `apply_modifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    Set,
    Unset,
    Inc,
    Mul,
    Min,
    Max,
    Rename,
    Push,
    /// Appends every element of an array. Sent as `$push` with `$each`, since servers
    /// from 3.6 on reject `$pushAll`.
    PushAll,
    AddToSet,
    Pop,
    Pull,
    PullAll,
    SetOnInsert,
    /// Any other operator, stored without its leading `$`.
    Other(String),
}

impl Modifier {
    /// The operator key including its `$` prefix.
    pub fn operator(&self) -> String {
        let name = match self {
            Modifier::Set => "set",
            Modifier::Unset => "unset",
            Modifier::Inc => "inc",
            Modifier::Mul => "mul",
            Modifier::Min => "min",
            Modifier::Max => "max",
            Modifier::Rename => "rename",
            Modifier::Push => "push",
            Modifier::PushAll => "pushAll",
            Modifier::AddToSet => "addToSet",
            Modifier::Pop => "pop",
            Modifier::Pull => "pull",
            Modifier::PullAll => "pullAll",
            Modifier::SetOnInsert => "setOnInsert",
            Modifier::Other(name) => name.as_str(),
        };

        format!("${name}")
    }

    /// `{ "$op": { key: value } }`
    pub fn to_update(&self, key: &str, value: impl Into<Bson>) -> UpdateDoc {
        let value: Bson = value.into();

        match self {
            Modifier::PushAll => UpdateDoc::Operators(doc! { "$push": { key: { "$each": value } } }),
            _ => UpdateDoc::Operators(doc! { self.operator(): { key: value } }),
        }
    }
}

impl From<&str> for Modifier {
    fn from(op: &str) -> Self {
        match op.trim_start_matches('$') {
            "set" => Modifier::Set,
            "unset" => Modifier::Unset,
            "inc" => Modifier::Inc,
            "mul" => Modifier::Mul,
            "min" => Modifier::Min,
            "max" => Modifier::Max,
            "rename" => Modifier::Rename,
            "push" => Modifier::Push,
            "pushAll" => Modifier::PushAll,
            "addToSet" => Modifier::AddToSet,
            "pop" => Modifier::Pop,
            "pull" => Modifier::Pull,
            "pullAll" => Modifier::PullAll,
            "setOnInsert" => Modifier::SetOnInsert,
            other => Modifier::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.operator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_classify_operators() {
        let update = UpdateDoc::classify(doc! { "$set": { "a": 1 }, "$inc": { "n": 2 } }).unwrap();
        assert!(!update.is_replacement());
    }

    #[rstest]
    fn test_classify_replacement() {
        let update = UpdateDoc::classify(doc! { "a": 1, "b": "two" }).unwrap();
        assert!(update.is_replacement());
    }

    #[rstest]
    #[case(doc! {})]
    #[case(doc! { "$set": { "a": 1 }, "b": 2 })]
    fn test_classify_rejects(#[case] update: Document) {
        assert!(matches!(
            UpdateDoc::classify(update),
            Err(AttachError::InvalidUpdate(_))
        ));
    }

    #[rstest]
    #[case("inc", Modifier::Inc)]
    #[case("$push", Modifier::Push)]
    #[case("addToSet", Modifier::AddToSet)]
    #[case("$currentDate", Modifier::Other("currentDate".into()))]
    fn test_modifier_parse(#[case] op: &str, #[case] expected: Modifier) {
        assert_eq!(Modifier::from(op), expected);
    }

    #[rstest]
    fn test_modifier_to_update() {
        assert_eq!(
            Modifier::Push.to_update("tags", "red").into_document(),
            doc! { "$push": { "tags": "red" } }
        );
        assert_eq!(Modifier::Other("currentDate".into()).to_string(), "$currentDate");
    }

    #[rstest]
    fn test_push_all_is_sent_as_push_each() {
        assert_eq!(
            Modifier::from("pushAll").to_update("tags", vec!["a", "b"]).into_document(),
            doc! { "$push": { "tags": { "$each": ["a", "b"] } } }
        );
    }
}
