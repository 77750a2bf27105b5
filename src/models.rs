// src/models.rs
use bson::oid::ObjectId;
use bson::Decimal128;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A blog post in `blog.posts`. Unknown fields in stored documents are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub age: i32,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Post {
    pub fn new(name: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            name: name.into(),
            age,
            kind: None,
        }
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{id} ")?,
            None => write!(f, "- ")?,
        }
        write!(
            f,
            "{} (age {}, type {})",
            self.name,
            self.age,
            self.kind.as_deref().unwrap_or("none")
        )
    }
}

/// A bank account. `balance` is kept as Decimal128 to avoid float rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub account_id: String,
    pub account_holder: String,
    pub account_type: String,
    pub balance: Decimal128,

    #[serde(rename = "transfers_complete", default)]
    pub transfers_completed: Vec<String>,
}

/// Output of the group-by-type stage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostTypeTotal {
    #[serde(rename = "_id")]
    pub post_type: Option<String>,
    pub total: i64,
}

/// Output of the type/age projection stage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PostSummary {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub age: i32,
}

impl fmt::Display for PostSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type {}, age {}",
            self.kind.as_deref().unwrap_or("none"),
            self.age
        )
    }
}
