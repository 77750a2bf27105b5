// src/pipeline.rs
//! Filter, update and aggregation stage documents used by the examples.

use bson::{doc, Document, Regex};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;

const REGEX_META: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

pub fn name_eq(name: &str) -> Document {
    doc! { "name": name }
}

/// Substring match on `name`. The needle is matched literally.
pub fn name_contains(needle: &str) -> Document {
    doc! {
        "name": Regex {
            pattern: escape_regex(needle),
            options: String::new(),
        }
    }
}

pub fn set_name(name: &str) -> Document {
    doc! { "$set": { "name": name } }
}

pub fn match_name_contains(needle: &str) -> Document {
    doc! { "$match": name_contains(needle) }
}

pub fn group_by_type() -> Document {
    doc! {
        "$group": {
            "_id": "$type",
            "total": { "$sum": 1 },
        }
    }
}

pub fn sort_by_name_desc() -> Document {
    doc! { "$sort": { "name": -1 } }
}

pub fn project_type_and_age() -> Document {
    doc! { "$project": { "_id": 0, "type": 1, "age": 1 } }
}

/// `"{prefix} {timestamp}"`, used to give updated posts a unique name.
pub fn timestamped_name<Tz>(prefix: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{} {}", prefix, now.format("%Y-%m-%d %H:%M:%S"))
}

fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if REGEX_META.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
