//! # Feed Composer
//!
//! Builds the paginated post listings: the main feed, a group's feed, an
//! author's profile feed and the feed of followed authors.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::guard::require_user;
use crate::models::{Actor, FeedScope, Post};
use crate::pagination::{Page, PageWindow};
use crate::traits::ContentRepo;

pub const POSTS_ON_MAIN_PAGE: u64 = 10;
pub const POSTS_ON_GROUP_PAGE: u64 = 10;
pub const POSTS_ON_PROFILE_PAGE: u64 = 10;

/// Page size per feed kind. The follow feed uses the main size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PageSizes {
    pub main: u64,
    pub group: u64,
    pub profile: u64,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            main: POSTS_ON_MAIN_PAGE,
            group: POSTS_ON_GROUP_PAGE,
            profile: POSTS_ON_PROFILE_PAGE,
        }
    }
}

impl PageSizes {
    pub fn for_scope(&self, scope: FeedScope) -> u64 {
        match scope {
            FeedScope::All | FeedScope::Followed(_) => self.main,
            FeedScope::Group(_) => self.group,
            FeedScope::Author(_) => self.profile,
        }
    }
}

impl FeedScope {
    /// The follow feed of the acting identity. Anonymous actors have none.
    pub fn followed_by(actor: &Actor) -> Result<Self> {
        Ok(FeedScope::Followed(require_user(actor)?.id))
    }
}

#[derive(Clone)]
pub struct FeedComposer {
    repo: Arc<dyn ContentRepo>,
    sizes: PageSizes,
}

impl FeedComposer {
    pub fn new(repo: Arc<dyn ContentRepo>, sizes: PageSizes) -> Self {
        Self { repo, sizes }
    }

    pub fn page_sizes(&self) -> PageSizes {
        self.sizes
    }

    /// Returns the requested page of `scope`, newest post first.
    pub async fn get_feed(&self, scope: FeedScope, page: Option<&str>) -> Result<Page<Post>> {
        let per_page = self.sizes.for_scope(scope);
        let total = self.repo.count_posts(scope).await?;
        let window = PageWindow::resolve(page, total, per_page);
        let items = self
            .repo
            .list_posts(scope, window.limit, window.offset)
            .await?;
        debug!(
            ?scope,
            page = window.number,
            num_pages = window.num_pages,
            items = items.len(),
            "feed composed"
        );
        Ok(Page::new(items, window, total))
    }
}
