//! Query specification handed to a `DocumentStore`

use bson::{doc, Document as BsonDocument};
use mangrove_common::{MangroveError, Result};

use crate::validation::ValidatedFieldName;

/// Collection, filter and cursor options for a find
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    collection_name: String,
    filter: BsonDocument,
    sort: Option<BsonDocument>,
    projection: Option<BsonDocument>,
    skip: Option<u64>,
    limit: Option<i64>,
}

impl QuerySpec {
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            filter: BsonDocument::new(),
            sort: None,
            projection: None,
            skip: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: BsonDocument) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort(mut self, sort: BsonDocument) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sort using a comma separated field list such as `"-age,name"`
    pub fn sort_by(self, criteria: &str) -> Result<Self> {
        Ok(self.sort(parse_sort(criteria)?))
    }

    /// Restrict the returned fields
    pub fn projection(mut self, projection: BsonDocument) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// A limit of 0 leaves the cursor unbounded
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = if limit == 0 { None } else { Some(limit) };
        self
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn get_filter(&self) -> &BsonDocument {
        &self.filter
    }

    pub fn get_sort(&self) -> Option<&BsonDocument> {
        self.sort.as_ref()
    }

    pub fn get_projection(&self) -> Option<&BsonDocument> {
        self.projection.as_ref()
    }

    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn get_limit(&self) -> Option<i64> {
        self.limit
    }
}

/// Turn `"-age, name,+city"` into `{ age: -1, name: 1, city: 1 }`
pub fn parse_sort(criteria: &str) -> Result<BsonDocument> {
    let mut sort = BsonDocument::new();

    for raw in criteria.split(',') {
        let field = raw.trim();
        let (name, direction) = match field.strip_prefix('-') {
            Some(rest) => (rest, -1),
            None => (field.strip_prefix('+').unwrap_or(field), 1),
        };

        if name.is_empty() {
            return Err(MangroveError::Query(format!(
                "Empty field in sort criteria: '{}'",
                criteria
            )));
        }

        let name = ValidatedFieldName::new(name)?;
        sort.insert(name.into_string(), direction);
    }

    Ok(sort)
}

/// How an update document is applied by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// `$set`, `$unset`, `$inc`, ...
    Operators,
    /// Whole document replacement
    Replacement,
}

impl UpdateKind {
    /// Classified by the first key, matching the server's own rule
    pub fn of(update: &BsonDocument) -> Self {
        match update.keys().next() {
            Some(key) if key.starts_with('$') => UpdateKind::Operators,
            _ => UpdateKind::Replacement,
        }
    }
}

/// `{ $unset: { f1: "", f2: "" } }` for the given field names
pub fn unset_fields<S: AsRef<str>>(fields: &[S]) -> Result<BsonDocument> {
    if fields.is_empty() {
        return Err(MangroveError::Query("No fields to delete".to_string()));
    }

    let mut unset = BsonDocument::new();
    for field in fields {
        let name = ValidatedFieldName::new(field.as_ref())?;
        unset.insert(name.into_string(), "");
    }
    Ok(doc! { "$unset": unset })
}
