//! Shared application state handed to every handler.

use std::sync::Arc;

use secrecy::SecretString;
use yt_core::cache::ResponseCache;
use yt_core::feed::{FeedComposer, PageSizes};
use yt_core::follow::FollowManager;
use yt_core::traits::{AuthProvider, ContentRepo, FollowRepo, MediaStore, UserRepo};

/// Cloned per request; everything inside is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<dyn ContentRepo>,
    pub users: Arc<dyn UserRepo>,
    pub media: Arc<dyn MediaStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub feeds: FeedComposer,
    pub follows: FollowManager,
    pub cache: ResponseCache,
    /// `None` disables the cache flush endpoint
    pub admin_token: Option<Arc<SecretString>>,
}

impl AppState {
    /// Wires the core components around one store implementing every
    /// repository port.
    pub fn new<R>(
        repo: Arc<R>,
        media: Arc<dyn MediaStore>,
        auth: Arc<dyn AuthProvider>,
        sizes: PageSizes,
        cache: ResponseCache,
    ) -> Self
    where
        R: ContentRepo + UserRepo + FollowRepo + 'static,
    {
        let content: Arc<dyn ContentRepo> = repo.clone();
        let follows: Arc<dyn FollowRepo> = repo.clone();
        Self {
            feeds: FeedComposer::new(content.clone(), sizes),
            follows: FollowManager::new(follows),
            users: repo,
            content,
            media,
            auth,
            cache,
            admin_token: None,
        }
    }

    pub fn with_admin_token(mut self, token: Option<SecretString>) -> Self {
        self.admin_token = token.map(Arc::new);
        self
    }
}
