//! # yt-ui
//!
//! Askama page templates. Handlers build these structs; every value the
//! markup needs is computed up front so the templates stay logic-free.

use askama::Template;
use yt_core::forms::{CommentForm, FormErrors, LoginForm, PostForm, SignupForm};
use yt_core::models::{Comment, Group, GroupId, Post, User};
use yt_core::pagination::Page;
use yt_core::traits::MediaStore;

/// Header state shared by every full page.
pub struct Layout<'a> {
    pub user: Option<&'a User>,
    pub csrf_token: String,
}

/// A post with its resolved media URLs.
pub struct PostCard<'a> {
    pub post: &'a Post,
    pub image_url: Option<String>,
    pub thumb_url: Option<String>,
}

impl<'a> PostCard<'a> {
    pub fn new(post: &'a Post, media: &dyn MediaStore) -> Self {
        Self {
            post,
            image_url: post.image.as_deref().map(|name| media.url(name)),
            thumb_url: post.image.as_deref().map(|name| media.thumbnail_url(name)),
        }
    }
}

/// One `<option>` of the group select.
pub struct GroupOption<'a> {
    pub id: GroupId,
    pub title: &'a str,
    pub selected: bool,
}

pub fn group_options<'a>(groups: &'a [Group], form: &PostForm) -> Vec<GroupOption<'a>> {
    groups
        .iter()
        .map(|group| GroupOption {
            id: group.id,
            title: &group.title,
            selected: form.is_selected(group),
        })
        .collect()
}

/// Post cards plus the paginator. Rendered on its own so listing pages can
/// embed (and the main page can cache) it without the per-user header.
#[derive(Template)]
#[template(path = "posts/includes/feed.html")]
pub struct FeedFragment<'a> {
    pub page: &'a Page<PostCard<'a>>,
    pub show_author: bool,
    pub show_group: bool,
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate<'a> {
    pub layout: Layout<'a>,
    pub feed_html: &'a str,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate<'a> {
    pub layout: Layout<'a>,
    pub group: &'a Group,
    pub feed_html: &'a str,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate<'a> {
    pub layout: Layout<'a>,
    pub author: &'a User,
    pub feed_html: &'a str,
    pub post_count: u64,
    pub follower_count: u64,
    pub following: bool,
    /// False for anonymous visitors and for the author's own profile
    pub can_follow: bool,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate<'a> {
    pub layout: Layout<'a>,
    pub feed_html: &'a str,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate<'a> {
    pub layout: Layout<'a>,
    pub card: PostCard<'a>,
    pub author_post_count: u64,
    pub comments: &'a [Comment],
    pub comment_form: &'a CommentForm,
    pub can_edit: bool,
    pub can_comment: bool,
}

/// Shared by create and edit.
#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate<'a> {
    pub layout: Layout<'a>,
    pub is_edit: bool,
    pub action: String,
    pub form: &'a PostForm,
    pub group_options: Vec<GroupOption<'a>>,
    pub errors: &'a FormErrors,
    pub current_image_url: Option<String>,
}

#[derive(Template)]
#[template(path = "users/signup.html")]
pub struct SignupTemplate<'a> {
    pub layout: Layout<'a>,
    pub form: &'a SignupForm,
    pub errors: &'a FormErrors,
}

#[derive(Template)]
#[template(path = "users/login.html")]
pub struct LoginTemplate<'a> {
    pub layout: Layout<'a>,
    pub form: &'a LoginForm,
    pub errors: &'a FormErrors,
    pub next: &'a str,
}

#[derive(Template)]
#[template(path = "users/logged_out.html")]
pub struct LoggedOutTemplate<'a> {
    pub layout: Layout<'a>,
}

#[derive(Template)]
#[template(path = "about/author.html")]
pub struct AboutAuthorTemplate<'a> {
    pub layout: Layout<'a>,
}

#[derive(Template)]
#[template(path = "about/tech.html")]
pub struct AboutTechTemplate<'a> {
    pub layout: Layout<'a>,
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate<'a> {
    pub layout: Layout<'a>,
    pub detail: &'a str,
}

/// Malformed requests: unreadable forms, wrong content types.
#[derive(Template)]
#[template(path = "core/400.html")]
pub struct BadRequestTemplate<'a> {
    pub layout: Layout<'a>,
    pub detail: &'a str,
}

#[derive(Template)]
#[template(path = "core/403csrf.html")]
pub struct CsrfFailureTemplate<'a> {
    pub layout: Layout<'a>,
}
