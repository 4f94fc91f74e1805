//! Option and result types passed across the driver seam.

use std::time::Duration;

use bson::{Bson, Document, doc};

/// Options for a find.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Fields to include or exclude.
    pub projection: Option<Document>,
    /// Ordered `{ field: 1 | -1 }` sort specification.
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    /// Number of documents fetched per server round trip.
    pub batch_size: Option<u32>,
}

impl FindOptions {
    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::default()
    }
}

/// Builder for [`FindOptions`].
#[derive(Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    pub fn projection(mut self, projection: Document) -> Self {
        self.options.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.options.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.options.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.options.batch_size = Some(batch_size);
        self
    }

    pub fn build(self) -> FindOptions {
        self.options
    }
}

/// Options for an insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOptions {
    /// Stop at the first failing document (the store default) or keep going.
    pub ordered: Option<bool>,
    pub bypass_document_validation: Option<bool>,
}

/// Options for an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Apply to every match instead of the first one only.
    pub multi: bool,
    /// Create a document when nothing matches.
    pub upsert: bool,
}

impl UpdateOptions {
    pub fn multi() -> Self {
        Self {
            multi: true,
            upsert: false,
        }
    }

    pub fn upsert() -> Self {
        Self {
            multi: false,
            upsert: true,
        }
    }
}

/// Outcome of an update as reported by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
    /// Identifier of the document created by an upsert, if any.
    pub upserted_id: Option<Bson>,
}

/// Direction or kind of an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDirection {
    Ascending,
    Descending,
    Geo2d,
    Geo2dSphere,
    Text,
    Hashed,
}

impl IndexDirection {
    pub fn to_bson(self) -> Bson {
        match self {
            IndexDirection::Ascending => Bson::Int32(1),
            IndexDirection::Descending => Bson::Int32(-1),
            IndexDirection::Geo2d => Bson::String("2d".into()),
            IndexDirection::Geo2dSphere => Bson::String("2dsphere".into()),
            IndexDirection::Text => Bson::String("text".into()),
            IndexDirection::Hashed => Bson::String("hashed".into()),
        }
    }

    fn name_part(self) -> String {
        match self {
            IndexDirection::Ascending => "1".into(),
            IndexDirection::Descending => "-1".into(),
            other => other
                .to_bson()
                .as_str()
                .map(str::to_string)
                .unwrap_or_default(),
        }
    }
}

/// Index key specification: one ascending field, or ordered `(field, direction)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKeys {
    keys: Vec<(String, IndexDirection)>,
}

impl IndexKeys {
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            keys: vec![(field.into(), IndexDirection::Ascending)],
        }
    }

    pub fn compound<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = (S, IndexDirection)>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(|(field, direction)| (field.into(), direction))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, IndexDirection)> {
        self.keys
            .iter()
            .map(|(field, direction)| (field.as_str(), *direction))
    }

    /// The ordered key document, e.g. `{ "a": 1, "b": -1 }`.
    pub fn to_document(&self) -> Document {
        let mut keys = doc! {};
        for (field, direction) in &self.keys {
            keys.insert(field.clone(), direction.to_bson());
        }
        keys
    }

    /// The name the store generates when none is given, e.g. `a_1_b_-1`.
    pub fn default_name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, direction)| format!("{field}_{}", direction.name_part()))
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl From<&str> for IndexKeys {
    fn from(field: &str) -> Self {
        IndexKeys::field(field)
    }
}

impl From<String> for IndexKeys {
    fn from(field: String) -> Self {
        IndexKeys::field(field)
    }
}

impl<S: Into<String>> From<Vec<(S, IndexDirection)>> for IndexKeys {
    fn from(keys: Vec<(S, IndexDirection)>) -> Self {
        IndexKeys::compound(keys)
    }
}

/// Options for index creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    pub name: Option<String>,
    pub unique: Option<bool>,
    pub sparse: Option<bool>,
    pub background: Option<bool>,
    /// Documents expire this long after the indexed date field.
    pub expire_after: Option<Duration>,
}

impl IndexOptions {
    pub fn unique() -> Self {
        Self {
            unique: Some(true),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_single_field_index() {
        let keys = IndexKeys::from("color");

        assert_eq!(keys.to_document(), doc! { "color": 1 });
        assert_eq!(keys.default_name(), "color_1");
    }

    #[rstest]
    fn test_compound_index_keeps_order() {
        let keys = IndexKeys::from(vec![
            ("score", IndexDirection::Descending),
            ("name", IndexDirection::Ascending),
            ("loc", IndexDirection::Geo2d),
        ]);

        let document = keys.to_document();
        let fields: Vec<&str> = document.keys().map(String::as_str).collect();

        assert_eq!(fields, vec!["score", "name", "loc"]);
        assert_eq!(document.get("loc"), Some(&Bson::String("2d".into())));
        assert_eq!(keys.default_name(), "score_-1_name_1_loc_2d");
    }

    #[rstest]
    fn test_find_options_builder() {
        let options = FindOptions::builder()
            .projection(doc! { "_id": 1 })
            .sort(doc! { "_id": 1 })
            .limit(5)
            .build();

        assert_eq!(options.projection, Some(doc! { "_id": 1 }));
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.skip, None);
    }
}
