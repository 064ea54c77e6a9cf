//! Training groups.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::{Filters, Paginated, Pagination, Record, RecordId};
use crate::error::{Result, StoreError};
use crate::queries::PortalQueries;

pub const GROUPS: &str = "groups";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub trainer_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn validated_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidRequest(
            "group name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

impl PortalQueries {
    /// Groups, optionally only those run by `trainer_id`.
    pub async fn list_groups(
        &self,
        trainer_id: Option<i64>,
        pagination: Pagination,
    ) -> Result<Paginated<Record<Group>>> {
        let filters = Filters::new().eq("trainer_id", trainer_id);
        self.groups.get_all(pagination, &filters).await
    }

    pub async fn get_group(&self, id: impl Into<RecordId>) -> Result<Option<Record<Group>>> {
        self.groups.get_by_id(id).await
    }

    pub async fn create_group(&self, group: &Group) -> Result<Record<Group>> {
        let name = validated_name(&group.name)?;
        let group = Group {
            name: name.to_string(),
            ..group.clone()
        };
        self.groups.create(&group).await
    }

    pub async fn rename_group(
        &self,
        id: impl Into<RecordId>,
        name: &str,
    ) -> Result<Record<Group>> {
        let name = validated_name(name)?;
        self.groups.update(id, &json!({ "name": name })).await
    }

    pub async fn delete_group(&self, id: impl Into<RecordId>) -> Result<()> {
        self.groups.delete(id).await
    }
}
