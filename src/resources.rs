//! Typed views over Up API resource records
//!
//! Records arrive as raw JSON and are only deserialized into these shapes by
//! the tabulators. Nullable fields are `Option`; relationship blocks default
//! to empty so a missing block reads as "no relationship".

use chrono::{DateTime, FixedOffset};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, UpError};

/// `{ id, attributes, relationships }`
#[derive(Debug, Clone, Deserialize)]
pub struct Resource<A, R = Value> {
    pub id: String,
    pub attributes: A,
    #[serde(default)]
    pub relationships: R,
}

impl<A, R> Resource<A, R>
where
    A: DeserializeOwned,
    R: DeserializeOwned + Default,
{
    /// Deserialize one raw record, naming the resource type on failure
    pub fn from_value(kind: &str, value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| UpError::malformed(format!("invalid {} record: {}", kind, e)))
    }
}

/// `{ "type": "categories", "id": "takeaway" }`
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// To-one relationship; `data` is null when unset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationshipOne {
    #[serde(default)]
    pub data: Option<ResourceRef>,
}

impl RelationshipOne {
    pub fn id(&self) -> Option<&str> {
        self.data.as_ref().map(|r| r.id.as_str())
    }
}

/// To-many relationship
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelationshipMany {
    #[serde(default)]
    pub data: Vec<ResourceRef>,
}

/// Amount of money in a currency
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub currency_code: String,
    /// Decimal string, e.g. `"-12.50"`
    pub value: String,
    /// Integer amount in the smallest unit, e.g. `-1250`
    pub value_in_base_units: i64,
}

impl Money {
    pub fn decimal(&self) -> Result<f64> {
        self.value
            .trim()
            .parse::<f64>()
            .map_err(|_| UpError::malformed(format!("amount '{}' is not a number", self.value)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAttributes {
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub message: Option<String>,
    pub amount: Money,
    pub created_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub settled_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRelationships {
    #[serde(default)]
    pub category: RelationshipOne,
    #[serde(default)]
    pub parent_category: RelationshipOne,
    #[serde(default)]
    pub tags: RelationshipMany,
}

pub type Transaction = Resource<TransactionAttributes, TransactionRelationships>;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountAttributes {
    pub display_name: String,
    pub account_type: String,
    pub balance: Money,
    pub created_at: DateTime<FixedOffset>,
}

pub type Account = Resource<AccountAttributes>;

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryAttributes {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryRelationships {
    #[serde(default)]
    pub parent: RelationshipOne,
}

pub type Category = Resource<CategoryAttributes, CategoryRelationships>;

/// Tags only carry an id worth showing
#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub id: String,
}

/// `meta` block of `GET /util/ping`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingMeta {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status_emoji: String,
}
