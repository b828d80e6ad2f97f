//! Response projections shared by several services. These are the shapes
//! written to the cache, so field renames invalidate cached snapshots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::types::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: Uuid,
    pub nickname: String,
    pub name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

impl From<&UserRecord> for AuthorSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname.clone(),
            name: user.name.clone(),
            last_name: user.last_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Profile visible to anyone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub nickname: String,
    pub name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub car: Option<String>,
    pub rank: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&UserRecord> for PublicProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname.clone(),
            name: user.name.clone(),
            last_name: user.last_name.clone(),
            avatar: user.avatar.clone(),
            car: user.car.clone(),
            rank: user.rank.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// The caller's own account, cached under `userInfo:<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub car: Option<String>,
    pub rank: String,
    pub role: Role,
    pub is_banned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&UserRecord> for UserInfo {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            nickname: user.nickname.clone(),
            name: user.name.clone(),
            last_name: user.last_name.clone(),
            avatar: user.avatar.clone(),
            car: user.car.clone(),
            rank: user.rank.clone(),
            role: user.role,
            is_banned: user.is_banned,
            created_at: user.created_at,
        }
    }
}

/// Look up the authors of a batch of records in one store call.
pub(crate) async fn author_index(
    users: &dyn UsersRepo,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, AuthorSummary>, RepoError> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let records = users.find_many(&ids).await?;
    Ok(records
        .iter()
        .map(|user| (user.id, AuthorSummary::from(user)))
        .collect())
}
