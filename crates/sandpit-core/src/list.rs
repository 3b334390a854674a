//! Paginated sandbox listing.
//!
//! Two modes:
//!
//! - **Limit** (default): pages of `limit` records are fetched until `limit`
//!   sandboxes are collected or the server runs out of pages.
//! - **Manual cursor**: the caller picks the starting page and page size and
//!   follows [`PageCursor::next_page`] itself.
//!
//! In both modes records already seen are skipped, so a record that moves
//! between pages while listing is only reported once.

use crate::client::SandboxClient;
use crate::connect::RealtimeClient;
use crate::error::{CoreError, Result};
use crate::info::SandboxInfo;
use crate::resolve::resolve;
use sandpit_api::types::ListQuery;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of sandboxes returned when no limit is given.
pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    InsertedAt,
    UpdatedAt,
}

impl OrderBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InsertedAt => "inserted_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Only running sandboxes can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Running,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
        }
    }
}

/// Manual page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    /// First page to fetch; defaults to 1.
    pub page: Option<u32>,
    /// Defaults to the limit.
    pub page_size: Option<u32>,
}

/// Options for [`SandboxClient::list`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListOptions {
    /// Only sandboxes carrying all of these tags.
    pub tags: Vec<String>,
    pub order_by: Option<OrderBy>,
    pub direction: Option<Direction>,
    pub status: Option<StatusFilter>,
    /// Maximum number of sandboxes to return; defaults to 50.
    pub limit: Option<usize>,
    /// Switches to manual-cursor mode.
    pub pagination: Option<Pagination>,
}

/// Where a listing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    /// Last page fetched.
    pub current_page: u32,
    /// Page to continue from; `None` when there is nothing left to fetch.
    pub next_page: Option<u32>,
    pub page_size: u32,
}

/// Result of [`SandboxClient::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListResponse {
    pub sandboxes: Vec<SandboxInfo>,
    /// More sandboxes match than were returned.
    pub has_more: bool,
    /// Total number of matching sandboxes on the server.
    pub total_count: u64,
    pub pagination: PageCursor,
}

impl<R: RealtimeClient> SandboxClient<R> {
    /// List sandboxes, newest pages first as ordered by the server.
    pub async fn list(&self, opts: ListOptions) -> Result<ListResponse> {
        let limit = opts.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let manual = opts.pagination.is_some();
        let cursor = opts.pagination.unwrap_or_default();
        let page_size = cursor
            .page_size
            .unwrap_or_else(|| u32::try_from(limit).unwrap_or(u32::MAX));
        let tags = (!opts.tags.is_empty()).then(|| opts.tags.join(","));

        let mut current_page = cursor.page.unwrap_or(1);
        let mut next_page;
        let mut total_count;
        let mut visited = HashSet::new();
        let mut seen = HashSet::new();
        let mut sandboxes: Vec<SandboxInfo> = Vec::new();

        loop {
            visited.insert(current_page);
            let query = ListQuery {
                tags: tags.clone(),
                page: current_page,
                page_size,
                order_by: opts.order_by.map(|o| o.as_str().to_string()),
                direction: opts.direction.map(|d| d.as_str().to_string()),
                status: opts.status.map(|s| s.as_str().to_string()),
            };

            tracing::debug!(page = current_page, page_size, "Fetching sandbox page");
            let response = self.api().sandbox_list(&query).await?;
            let page = resolve(response, "Failed to list sandboxes")?;

            total_count = page.pagination.total_records;
            next_page = page.pagination.next_page.filter(|&p| p > 0);

            for record in page.sandboxes {
                if seen.contains(&record.id) {
                    continue;
                }
                let info = SandboxInfo::try_from(record)?;
                seen.insert(info.id.clone());
                sandboxes.push(info);
            }

            let Some(next) = next_page else {
                break;
            };
            if sandboxes.len() >= limit {
                break;
            }
            if visited.contains(&next) {
                return Err(CoreError::Protocol(format!(
                    "list pagination revisits page {next} after page {current_page}"
                )));
            }
            current_page = next;
        }

        let reached_limit = sandboxes.len() >= limit;
        sandboxes.truncate(limit);

        if manual && reached_limit {
            next_page = None;
        }

        tracing::debug!(
            count = sandboxes.len(),
            total_count,
            pages = visited.len(),
            "Listed sandboxes"
        );

        Ok(ListResponse {
            has_more: total_count > sandboxes.len() as u64,
            total_count,
            pagination: PageCursor {
                current_page,
                next_page,
                page_size,
            },
            sandboxes,
        })
    }
}
