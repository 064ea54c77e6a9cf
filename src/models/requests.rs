//! Request DTOs for the table API
//!
//! Query strings and bodies accepted by the generic table endpoints.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::db::{Filters, Pagination};
use crate::error::{Result, StoreError};

/// A parsed `GET /tables/:table` query string.
///
/// `page` and `limit` select the window; every other parameter is an
/// equality filter on the column of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub pagination: Pagination,
    pub filters: Filters,
}

impl ListQuery {
    pub fn from_params(params: HashMap<String, String>, default_limit: u64) -> Result<Self> {
        let mut pagination = Pagination::new(1, default_limit);
        let mut filters = Filters::new();

        for (name, value) in params {
            match name.as_str() {
                "page" => pagination.page = positive(&name, &value)?,
                "limit" => pagination.limit = positive(&name, &value)?,
                _ if name.is_empty() => {}
                _ => filters.insert(name, value),
            }
        }
        Ok(Self {
            pagination,
            filters,
        })
    }
}

fn positive(name: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            StoreError::InvalidRequest(format!("'{}' must be a positive integer", name))
        })
}

/// Body of `POST /tables/:table`: one object, or an array of objects.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateBody {
    One(Map<String, Value>),
    Many(Vec<Map<String, Value>>),
}

impl TryFrom<Value> for CreateBody {
    type Error = StoreError;

    fn try_from(body: Value) -> Result<Self> {
        match body {
            Value::Object(row) => Ok(CreateBody::One(row)),
            Value::Array(items) => items
                .into_iter()
                .map(object)
                .collect::<Result<Vec<_>>>()
                .map(CreateBody::Many),
            _ => Err(StoreError::InvalidRequest(
                "body must be an object or an array of objects".to_string(),
            )),
        }
    }
}

/// Requires a JSON object body.
pub fn object(body: Value) -> Result<Map<String, Value>> {
    match body {
        Value::Object(row) => Ok(row),
        _ => Err(StoreError::InvalidRequest(
            "expected a JSON object".to_string(),
        )),
    }
}
