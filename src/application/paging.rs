//! Filtering, deprecation and offset/limit windowing over resolved artifacts.
//!
//! The same engine runs on cached and freshly resolved sets so both read
//! paths return identical pages.

use std::sync::Arc;

use serde::Serialize;

use crate::application::repos::{ArtifactQueryFilter, FilterFields};
use crate::application::resolver::ArtifactView;

/// Parameters for one listing request, after boundary parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactListQuery {
    pub depth: u32,
    pub show_deprecated: bool,
    pub filter: ArtifactQueryFilter,
    pub limit: Option<u32>,
    /// Page index. Negative values are treated as zero.
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub data: Vec<Arc<ArtifactView>>,
    pub has_more: bool,
}

/// Window bounds derived from a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub limit: Option<usize>,
}

impl Window {
    pub fn from_query(query: &ArtifactListQuery) -> Self {
        match query.limit {
            None | Some(0) => Self {
                start: 0,
                limit: None,
            },
            Some(limit) => {
                let page = query.offset.unwrap_or(0).max(0) as usize;
                let limit = limit as usize;
                Self {
                    start: page.saturating_mul(limit),
                    limit: Some(limit),
                }
            }
        }
    }
}

fn filter_fields(view: &ArtifactView) -> FilterFields<'_> {
    FilterFields {
        artifact_type: view.artifact_type,
        creator: view.creator.as_deref(),
        title: view.title.as_deref(),
        content: &view.content,
        topics: &view.topics,
        in_line: view.in_line,
    }
}

/// Applies search filters, then the deprecation filter, then the window.
pub fn apply(views: &[Arc<ArtifactView>], query: &ArtifactListQuery) -> Page {
    let matched: Vec<&Arc<ArtifactView>> = views
        .iter()
        .filter(|view| query.filter.matches(filter_fields(view)))
        .filter(|view| query.show_deprecated || !view.deprecated)
        .collect();

    let total = matched.len();
    let window = Window::from_query(query);

    let data: Vec<Arc<ArtifactView>> = match window.limit {
        None => matched.into_iter().cloned().collect(),
        Some(limit) => matched
            .into_iter()
            .skip(window.start)
            .take(limit)
            .cloned()
            .collect(),
    };

    let has_more = total > window.start.saturating_add(data.len());
    Page { data, has_more }
}
