use std::sync::Arc;

use serde::Serialize;

use crate::application::error::AppError;
use crate::application::repos::{ContentRepo, TaxonomyRepo, UsersRepo};
use crate::domain::types::ContentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SiteStats {
    pub users: u64,
    pub topics: u64,
    pub posts: u64,
    pub news: u64,
    pub events: u64,
}

#[derive(Clone)]
pub struct StatsService {
    users: Arc<dyn UsersRepo>,
    taxonomy: Arc<dyn TaxonomyRepo>,
    content: Arc<dyn ContentRepo>,
}

impl StatsService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        taxonomy: Arc<dyn TaxonomyRepo>,
        content: Arc<dyn ContentRepo>,
    ) -> Self {
        Self {
            users,
            taxonomy,
            content,
        }
    }

    pub async fn snapshot(&self) -> Result<SiteStats, AppError> {
        Ok(SiteStats {
            users: self.users.count_users().await?,
            topics: self.taxonomy.count_topics().await?,
            posts: self.content.count_content(ContentKind::Post).await?,
            news: self.content.count_content(ContentKind::News).await?,
            events: self.content.count_content(ContentKind::Event).await?,
        })
    }
}
