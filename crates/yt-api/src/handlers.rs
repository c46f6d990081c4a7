//! # yt-api Handlers
//!
//! Feeds, post pages, comments and follows. Each handler resolves the acting
//! identity, calls into yt-core and renders a yt-ui template or redirects.

use askama::Template;
use axum::extract::{Multipart, Path, State};
use axum::http::Uri;
use axum::response::{Html, IntoResponse, Response};
use tracing::{debug, info};
use yt_core::error::AppError;
use yt_core::follow::FollowOutcome;
use yt_core::forms::{CleanPost, CommentForm, FormErrors, PostForm, Upload};
use yt_core::guard::{authorize_edit, can_act, can_edit, require_user};
use yt_core::models::{
    FeedScope, Group, ImageChange, NewComment, NewPost, Post, PostId, PostUpdate, User,
};
use yt_core::pagination::Page;
use yt_ui::{
    group_options, FeedFragment, FollowTemplate, GroupTemplate, IndexTemplate, PostCard,
    PostDetailTemplate, PostFormTemplate, ProfileTemplate,
};

use crate::error::{found, WebError};
use crate::extract::{HtmlForm, HtmlMultipart, PageParam};
use crate::session::{CsrfOnly, CsrfProtectedForm, SignedIn, Visitor};
use crate::state::AppState;

pub(crate) fn render_page(page: impl Template) -> Result<Response, WebError> {
    Ok(Html(page.render()?).into_response())
}

fn render_feed(
    state: &AppState,
    page: &Page<Post>,
    show_author: bool,
    show_group: bool,
) -> Result<String, WebError> {
    let cards = page.map_ref(|post| PostCard::new(post, state.media.as_ref()));
    Ok(FeedFragment {
        page: &cards,
        show_author,
        show_group,
    }
    .render()?)
}

fn post_url(id: PostId) -> String {
    format!("/posts/{id}/")
}

fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

/// Non-numeric ids are unknown posts, not bad requests.
async fn find_post(state: &AppState, raw_id: &str) -> Result<Post, WebError> {
    let not_found = || AppError::NotFound("post", raw_id.to_string());
    let id: PostId = raw_id.parse().map_err(|_| not_found())?;
    Ok(state.content.get_post(id).await?.ok_or_else(not_found)?)
}

async fn find_author(state: &AppState, username: &str) -> Result<User, WebError> {
    Ok(state
        .users
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound("user", username.to_string()))?)
}

async fn render_main_feed(state: &AppState, page: Option<&str>) -> Result<String, WebError> {
    let page = state.feeds.get_feed(FeedScope::All, page).await?;
    render_feed(state, &page, true, true)
}

/// GET / -- the only cached page. The cached part is the feed fragment;
/// the per-user header is rendered fresh around it.
pub async fn index(
    State(state): State<AppState>,
    visitor: Visitor,
    uri: Uri,
    page: PageParam,
) -> Result<Response, WebError> {
    let key = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let feed_html = state
        .cache
        .get_or_try_insert_with(key, || render_main_feed(&state, page.as_deref()))
        .await?;
    render_page(IndexTemplate {
        layout: visitor.layout().await?,
        feed_html: &feed_html,
    })
}

pub async fn group_posts(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(slug): Path<String>,
    page: PageParam,
) -> Result<Response, WebError> {
    let group = state
        .content
        .get_group(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("group", slug.clone()))?;
    let page = state
        .feeds
        .get_feed(FeedScope::Group(group.id), page.as_deref())
        .await?;
    let feed_html = render_feed(&state, &page, true, false)?;
    render_page(GroupTemplate {
        layout: visitor.layout().await?,
        group: &group,
        feed_html: &feed_html,
    })
}

pub async fn profile(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(username): Path<String>,
    page: PageParam,
) -> Result<Response, WebError> {
    let author = find_author(&state, &username).await?;
    let page = state
        .feeds
        .get_feed(FeedScope::Author(author.id), page.as_deref())
        .await?;
    let following = state.follows.is_following(&visitor.actor, &author).await?;
    let follower_count = state.follows.follower_count(&author).await?;
    let feed_html = render_feed(&state, &page, false, true)?;
    render_page(ProfileTemplate {
        can_follow: visitor.actor.user().is_some_and(|user| user.id != author.id),
        layout: visitor.layout().await?,
        author: &author,
        feed_html: &feed_html,
        post_count: page.total,
        follower_count,
        following,
    })
}

pub async fn post_detail(
    State(state): State<AppState>,
    visitor: Visitor,
    Path(raw_id): Path<String>,
) -> Result<Response, WebError> {
    let post = find_post(&state, &raw_id).await?;
    let comments = state.content.list_comments(post.id).await?;
    let author_post_count = state
        .content
        .count_posts(FeedScope::Author(post.author.id))
        .await?;
    let comment_form = CommentForm::default();
    render_page(PostDetailTemplate {
        can_edit: can_edit(&visitor.actor, &post),
        can_comment: can_act(&visitor.actor),
        layout: visitor.layout().await?,
        card: PostCard::new(&post, state.media.as_ref()),
        author_post_count,
        comments: &comments,
        comment_form: &comment_form,
    })
}

async fn render_post_form(
    state: &AppState,
    visitor: &Visitor,
    form: &PostForm,
    groups: &[Group],
    errors: &FormErrors,
    editing: Option<&Post>,
) -> Result<Response, WebError> {
    render_page(PostFormTemplate {
        layout: visitor.layout().await?,
        is_edit: editing.is_some(),
        action: editing.map_or_else(|| "/create/".to_string(), |post| format!("/posts/{}/edit/", post.id)),
        form,
        group_options: group_options(groups, form),
        errors,
        current_image_url: editing
            .and_then(|post| post.image.as_deref())
            .map(|name| state.media.url(name)),
    })
}

/// Reads the multipart post form. Returns the submitted CSRF token too.
async fn read_post_form(mut multipart: Multipart) -> Result<(String, PostForm), WebError> {
    let bad_request = |err: axum::extract::multipart::MultipartError| {
        WebError::rejected(err.status(), err.body_text())
    };
    let mut csrf_token = String::new();
    let mut form = PostForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "csrf_token" => csrf_token = field.text().await.map_err(bad_request)?,
            "text" => form.text = field.text().await.map_err(bad_request)?,
            "group" => form.group = field.text().await.map_err(bad_request)?,
            "image-clear" => form.clear_image = true,
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(bad_request)?;
                // Browsers send an empty part when no file was chosen.
                if !data.is_empty() {
                    form.image = Some(Upload {
                        filename,
                        data: data.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok((csrf_token, form))
}

/// Decodes the uploaded image, if any, on the blocking pool and validates
/// the whole form against `groups`.
async fn clean_post_form(
    state: &AppState,
    form: PostForm,
    groups: &[Group],
) -> Result<(PostForm, Result<CleanPost, FormErrors>), WebError> {
    let media = state.media.clone();
    let (form, image_ok) = tokio::task::spawn_blocking(move || {
        let image_ok = form
            .image
            .as_ref()
            .is_none_or(|upload| media.is_valid_image(&upload.data));
        (form, image_ok)
    })
    .await
    .map_err(WebError::internal)?;
    let clean = form.clean(groups, |_| image_ok);
    Ok((form, clean))
}

async fn store_upload(state: &AppState, upload: Option<Upload>) -> Result<Option<String>, WebError> {
    match upload {
        Some(upload) => Ok(Some(
            state.media.save_image(upload.data, &upload.filename).await?,
        )),
        None => Ok(None),
    }
}

pub async fn post_create(
    State(state): State<AppState>,
    SignedIn(visitor): SignedIn,
) -> Result<Response, WebError> {
    let groups = state.content.list_groups().await?;
    render_post_form(
        &state,
        &visitor,
        &PostForm::default(),
        &groups,
        &FormErrors::default(),
        None,
    )
    .await
}

pub async fn post_create_submit(
    State(state): State<AppState>,
    SignedIn(visitor): SignedIn,
    HtmlMultipart(multipart): HtmlMultipart,
) -> Result<Response, WebError> {
    let (csrf_token, form) = read_post_form(multipart).await?;
    visitor.verify_csrf(&csrf_token).await?;
    let author = require_user(&visitor.actor)?;

    let groups = state.content.list_groups().await?;
    let (form, clean) = clean_post_form(&state, form, &groups).await?;
    let clean = match clean {
        Ok(clean) => clean,
        Err(errors) => {
            return render_post_form(&state, &visitor, &form, &groups, &errors, None).await;
        }
    };

    let image = store_upload(&state, form.image).await?;
    let post = state
        .content
        .create_post(NewPost {
            author_id: author.id,
            text: clean.text,
            group_id: clean.group_id,
            image,
        })
        .await?;
    info!(post_id = post.id, author = %author.username, "post created");
    Ok(found(&profile_url(&author.username)))
}

pub async fn post_edit(
    State(state): State<AppState>,
    SignedIn(visitor): SignedIn,
    Path(raw_id): Path<String>,
) -> Result<Response, WebError> {
    let post = find_post(&state, &raw_id).await?;
    authorize_edit(&visitor.actor, &post)?;
    let groups = state.content.list_groups().await?;
    let form = PostForm {
        text: post.text.clone(),
        group: post
            .group
            .as_ref()
            .map(|group| group.id.to_string())
            .unwrap_or_default(),
        ..Default::default()
    };
    render_post_form(&state, &visitor, &form, &groups, &FormErrors::default(), Some(&post)).await
}

pub async fn post_edit_submit(
    State(state): State<AppState>,
    SignedIn(visitor): SignedIn,
    Path(raw_id): Path<String>,
    HtmlMultipart(multipart): HtmlMultipart,
) -> Result<Response, WebError> {
    let (csrf_token, form) = read_post_form(multipart).await?;
    visitor.verify_csrf(&csrf_token).await?;
    let post = find_post(&state, &raw_id).await?;
    let editor = authorize_edit(&visitor.actor, &post)?;

    let groups = state.content.list_groups().await?;
    let (form, clean) = clean_post_form(&state, form, &groups).await?;
    let clean = match clean {
        Ok(clean) => clean,
        Err(errors) => {
            return render_post_form(&state, &visitor, &form, &groups, &errors, Some(&post)).await;
        }
    };

    let image = match store_upload(&state, form.image).await? {
        Some(name) => ImageChange::Replace(name),
        None if clean.clear_image => ImageChange::Clear,
        None => ImageChange::Keep,
    };
    state
        .content
        .update_post(
            post.id,
            PostUpdate {
                text: clean.text,
                group_id: clean.group_id,
                image,
            },
        )
        .await?;
    info!(post_id = post.id, editor = %editor.username, "post updated");
    Ok(found(&post_url(post.id)))
}

/// GET on the comment endpoint just goes back to the post.
pub async fn add_comment_redirect(
    State(state): State<AppState>,
    SignedIn(_): SignedIn,
    Path(raw_id): Path<String>,
) -> Result<Response, WebError> {
    let post = find_post(&state, &raw_id).await?;
    Ok(found(&post_url(post.id)))
}

pub async fn add_comment(
    State(state): State<AppState>,
    SignedIn(visitor): SignedIn,
    Path(raw_id): Path<String>,
    HtmlForm(submitted): HtmlForm<CsrfProtectedForm<CommentForm>>,
) -> Result<Response, WebError> {
    visitor.verify_csrf(&submitted.csrf_token).await?;
    let post = find_post(&state, &raw_id).await?;
    let author = require_user(&visitor.actor)?;
    match submitted.data.clean() {
        Ok(text) => {
            let comment = state
                .content
                .create_comment(NewComment {
                    post_id: post.id,
                    author_id: author.id,
                    text,
                })
                .await?;
            info!(comment_id = comment.id, post_id = post.id, author = %author.username, "comment added");
        }
        Err(errors) => debug!(post_id = post.id, %errors, "comment rejected"),
    }
    Ok(found(&post_url(post.id)))
}

pub async fn follow_index(
    State(state): State<AppState>,
    SignedIn(visitor): SignedIn,
    page: PageParam,
) -> Result<Response, WebError> {
    let scope = FeedScope::followed_by(&visitor.actor)?;
    let page = state.feeds.get_feed(scope, page.as_deref()).await?;
    let feed_html = render_feed(&state, &page, true, true)?;
    render_page(FollowTemplate {
        layout: visitor.layout().await?,
        feed_html: &feed_html,
    })
}

async fn follow_author(state: &AppState, visitor: &Visitor, username: &str) -> Result<Response, WebError> {
    let author = find_author(state, username).await?;
    if state.follows.follow(&visitor.actor, &author).await? == FollowOutcome::SelfFollowIgnored {
        debug!(author = %author.username, "self-follow ignored");
    }
    Ok(found(&profile_url(&author.username)))
}

async fn unfollow_author(state: &AppState, visitor: &Visitor, username: &str) -> Result<Response, WebError> {
    let author = find_author(state, username).await?;
    state.follows.unfollow(&visitor.actor, &author).await?;
    Ok(found(&profile_url(&author.username)))
}

pub async fn profile_follow(
    State(state): State<AppState>,
    SignedIn(visitor): SignedIn,
    Path(username): Path<String>,
) -> Result<Response, WebError> {
    follow_author(&state, &visitor, &username).await
}

pub async fn profile_follow_submit(
    State(state): State<AppState>,
    SignedIn(visitor): SignedIn,
    Path(username): Path<String>,
    HtmlForm(submitted): HtmlForm<CsrfOnly>,
) -> Result<Response, WebError> {
    visitor.verify_csrf(&submitted.csrf_token).await?;
    follow_author(&state, &visitor, &username).await
}

pub async fn profile_unfollow(
    State(state): State<AppState>,
    SignedIn(visitor): SignedIn,
    Path(username): Path<String>,
) -> Result<Response, WebError> {
    unfollow_author(&state, &visitor, &username).await
}

pub async fn profile_unfollow_submit(
    State(state): State<AppState>,
    SignedIn(visitor): SignedIn,
    Path(username): Path<String>,
    HtmlForm(submitted): HtmlForm<CsrfOnly>,
) -> Result<Response, WebError> {
    visitor.verify_csrf(&submitted.csrf_token).await?;
    unfollow_author(&state, &visitor, &username).await
}
