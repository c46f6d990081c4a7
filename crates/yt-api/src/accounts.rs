//! Signup, login and logout.

use axum::extract::State;
use axum::http::Uri;
use axum::response::Response;
use serde::Deserialize;
use tracing::{info, warn};
use yt_core::error::AppError;
use yt_core::forms::{FormErrors, LoginForm, SignupForm};
use yt_core::models::NewUser;
use yt_ui::{LoggedOutTemplate, LoginTemplate, SignupTemplate};

use crate::error::{found, WebError};
use crate::extract::{last_query_value, HtmlForm};
use crate::handlers::render_page;
use crate::session::{CsrfOnly, CsrfProtectedForm, Visitor};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginSubmission {
    pub next: String,
    #[serde(flatten)]
    pub form: LoginForm,
}

/// Only same-site absolute paths are followed after login. Browsers drop
/// tabs and newlines while parsing, so any control character disqualifies.
fn safe_next(next: &str) -> &str {
    if next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control)
    {
        next
    } else {
        "/"
    }
}

async fn render_signup(visitor: &Visitor, form: &SignupForm, errors: &FormErrors) -> Result<Response, WebError> {
    render_page(SignupTemplate {
        layout: visitor.layout().await?,
        form,
        errors,
    })
}

async fn render_login(
    visitor: &Visitor,
    form: &LoginForm,
    errors: &FormErrors,
    next: &str,
) -> Result<Response, WebError> {
    render_page(LoginTemplate {
        layout: visitor.layout().await?,
        form,
        errors,
        next,
    })
}

pub async fn signup(visitor: Visitor) -> Result<Response, WebError> {
    render_signup(&visitor, &SignupForm::default(), &FormErrors::default()).await
}

pub async fn signup_submit(
    State(state): State<AppState>,
    visitor: Visitor,
    HtmlForm(submitted): HtmlForm<CsrfProtectedForm<SignupForm>>,
) -> Result<Response, WebError> {
    visitor.verify_csrf(&submitted.csrf_token).await?;
    let form = submitted.data;

    let taken = state
        .users
        .get_user_by_username(form.username.trim())
        .await?
        .is_some();
    let clean = match form.clean(taken) {
        Ok(clean) => clean,
        Err(errors) => return render_signup(&visitor, &form, &errors).await,
    };

    let password_hash = state.auth.hash_password(&clean.password)?;
    let created = state
        .users
        .create_user(NewUser {
            username: clean.username,
            first_name: clean.first_name,
            last_name: clean.last_name,
            email: clean.email,
            password_hash,
        })
        .await
        .map_err(AppError::from_adapter);
    let user = match created {
        Ok(user) => user,
        // Claimed by a concurrent signup after the availability check.
        Err(AppError::Conflict(what)) => {
            warn!(%what, "signup lost a username race");
            return render_signup(&visitor, &form, &SignupForm::username_taken()).await;
        }
        Err(err) => return Err(err.into()),
    };
    info!(user_id = user.id, username = %user.username, "user registered");

    visitor.log_in(&user).await?;
    Ok(found("/"))
}

pub async fn login(visitor: Visitor, uri: Uri) -> Result<Response, WebError> {
    let next = last_query_value(&uri, "next").unwrap_or_default();
    render_login(&visitor, &LoginForm::default(), &FormErrors::default(), &next).await
}

pub async fn login_submit(
    State(state): State<AppState>,
    visitor: Visitor,
    HtmlForm(submitted): HtmlForm<CsrfProtectedForm<LoginSubmission>>,
) -> Result<Response, WebError> {
    visitor.verify_csrf(&submitted.csrf_token).await?;
    let LoginSubmission { next, form } = submitted.data;

    if let Err(errors) = form.clean() {
        return render_login(&visitor, &form, &errors, &next).await;
    }

    let credentials = state.users.get_credentials(form.username.trim()).await?;
    let user = match credentials {
        Some((user, hash)) if state.auth.verify_password(&form.password, &hash) => user,
        _ => {
            warn!(username = %form.username.trim(), "failed login");
            let form = LoginForm {
                password: String::new(),
                ..form
            };
            return render_login(&visitor, &form, &LoginForm::invalid_credentials(), &next).await;
        }
    };

    visitor.log_in(&user).await?;
    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(found(safe_next(&next)))
}

pub async fn logout(
    visitor: Visitor,
    HtmlForm(submitted): HtmlForm<CsrfOnly>,
) -> Result<Response, WebError> {
    visitor.verify_csrf(&submitted.csrf_token).await?;
    if let Some(user) = visitor.actor.user() {
        info!(user_id = user.id, username = %user.username, "user logged out");
    }
    visitor.log_out().await?;
    let anonymous = Visitor {
        actor: Default::default(),
        session: visitor.session,
    };
    render_page(LoggedOutTemplate {
        layout: anonymous.layout().await?,
    })
}

#[cfg(test)]
mod tests {
    use super::safe_next;

    #[test]
    fn only_local_paths_are_followed() {
        assert_eq!(safe_next("/follow/"), "/follow/");
        assert_eq!(safe_next("https://evil.example/"), "/");
        assert_eq!(safe_next("//evil.example/"), "/");
        assert_eq!(safe_next(""), "/");
        assert_eq!(safe_next("/\t/evil.example/"), "/");
        assert_eq!(safe_next("/\n/evil.example/"), "/");
        assert_eq!(safe_next("/\r\n/evil.example/"), "/");
        assert_eq!(safe_next("/posts/1/?page=2"), "/posts/1/?page=2");
    }
}
