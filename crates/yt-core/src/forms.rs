//! # Forms
//!
//! Submitted form data and its validation. Each `clean` returns the
//! normalized values or the per-field errors to re-render the form with.

use std::collections::BTreeMap;
use std::fmt;

use email_address::EmailAddress;
use serde::Deserialize;

use crate::models::{Group, GroupId};

pub const USERNAME_MAX_CHARS: usize = 150;
pub const NAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

const REQUIRED: &str = "This field is required.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Field errors keyed by field name, plus errors not tied to any field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let fields = self.fields.iter().flat_map(|(name, msgs)| {
            msgs.iter().map(move |msg| format!("{name}: {msg}"))
        });
        for line in fields.chain(self.non_field.iter().cloned()) {
            if !first {
                f.write_str("; ")?;
            }
            f.write_str(&line)?;
            first = false;
        }
        Ok(())
    }
}

/// An uploaded file taken from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Create/edit post form. `group` holds the raw select value ("" for none).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub text: String,
    pub group: String,
    pub image: Option<Upload>,
    /// The "clear" checkbox next to an existing illustration.
    pub clear_image: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<GroupId>,
    pub clear_image: bool,
}

impl PostForm {
    /// Validates text, the group choice against `groups`, and the image bytes.
    pub fn clean(
        &self,
        groups: &[Group],
        is_valid_image: impl Fn(&[u8]) -> bool,
    ) -> Result<CleanPost, FormErrors> {
        let mut errors = FormErrors::default();

        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group_id = match self.group.trim() {
            "" => None,
            raw => match raw.parse::<GroupId>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add(
                        "group",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    None
                }
            },
        };

        if let Some(upload) = &self.image {
            if self.clear_image {
                errors.add(
                    "image",
                    "Please either submit a file or check the clear checkbox, not both.",
                );
            } else if !is_valid_image(&upload.data) {
                errors.add(
                    "image",
                    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
                );
            }
        }

        errors.into_result(CleanPost {
            text,
            group_id,
            clear_image: self.clear_image,
        })
    }

    /// Whether the select option for `group` should be pre-selected.
    pub fn is_selected(&self, group: &Group) -> bool {
        self.group.trim() == group.id.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }
        errors.into_result(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanSignup {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    /// Errors for a username claimed between validation and insert.
    pub fn username_taken() -> FormErrors {
        let mut errors = FormErrors::default();
        errors.add("username", USERNAME_TAKEN);
        errors
    }

    /// `username_taken` is looked up by the caller before validation.
    pub fn clean(&self, username_taken: bool) -> Result<CleanSignup, FormErrors> {
        let mut errors = FormErrors::default();

        let username = self.username.trim().to_string();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else if username.chars().count() > USERNAME_MAX_CHARS {
            errors.add(
                "username",
                format!("Ensure this value has at most {USERNAME_MAX_CHARS} characters."),
            );
        } else if !username.chars().all(is_username_char) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        } else if username_taken {
            errors.add("username", USERNAME_TAKEN);
        }

        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        for (field, value) in [("first_name", &first_name), ("last_name", &last_name)] {
            if value.chars().count() > NAME_MAX_CHARS {
                errors.add(
                    field,
                    format!("Ensure this value has at most {NAME_MAX_CHARS} characters."),
                );
            }
        }

        let email = self.email.trim().to_string();
        if !email.is_empty() && !EmailAddress::is_valid(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn’t match.");
        } else {
            if self.password1.chars().count() < PASSWORD_MIN_CHARS {
                errors.add(
                    "password2",
                    format!(
                        "This password is too short. It must contain at least {PASSWORD_MIN_CHARS} characters."
                    ),
                );
            }
            if self.password1.chars().all(|c| c.is_ascii_digit()) {
                errors.add("password2", "This password is entirely numeric.");
            }
        }

        errors.into_result(CleanSignup {
            first_name,
            last_name,
            username,
            email,
            password: self.password1.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(())
    }

    pub fn invalid_credentials() -> FormErrors {
        let mut errors = FormErrors::default();
        errors.add_non_field(
            "Please enter a correct username and password. Note that both fields may be case-sensitive.",
        );
        errors
    }
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(id: GroupId) -> Group {
        Group {
            id,
            title: format!("Group {id}"),
            slug: format!("group-{id}"),
            description: String::new(),
        }
    }

    #[test]
    fn post_form_trims_text_and_resolves_group() {
        let form = PostForm {
            text: "  Hello  ".into(),
            group: "2".into(),
            ..Default::default()
        };
        let clean = form.clean(&[group(1), group(2)], |_| true).unwrap();
        assert_eq!(clean.text, "Hello");
        assert_eq!(clean.group_id, Some(2));
    }

    #[test]
    fn post_form_rejects_blank_text_unknown_group_and_bad_image() {
        let form = PostForm {
            text: "   ".into(),
            group: "99".into(),
            image: Some(Upload {
                filename: "notes.txt".into(),
                data: b"plain text".to_vec(),
            }),
            clear_image: false,
        };
        let errors = form.clean(&[group(1)], |_| false).unwrap_err();
        assert!(errors.has("text"));
        assert!(errors.has("group"));
        assert!(errors.has("image"));
    }

    #[test]
    fn post_form_clear_flag_excludes_a_new_upload() {
        let clearing = PostForm {
            text: "x".into(),
            clear_image: true,
            ..Default::default()
        };
        assert!(clearing.clean(&[], |_| true).unwrap().clear_image);

        let both = PostForm {
            image: Some(Upload {
                filename: "cat.gif".into(),
                data: b"GIF89a".to_vec(),
            }),
            ..clearing
        };
        assert_eq!(
            both.clean(&[], |_| true).unwrap_err().field("image"),
            ["Please either submit a file or check the clear checkbox, not both."]
        );
    }

    #[test]
    fn empty_group_means_no_group() {
        let form = PostForm {
            text: "x".into(),
            ..Default::default()
        };
        assert_eq!(form.clean(&[], |_| true).unwrap().group_id, None);
    }

    #[test]
    fn comment_form_requires_text() {
        assert!(CommentForm::default().clean().is_err());
        assert_eq!(
            CommentForm { text: " Nice ".into() }.clean().unwrap(),
            "Nice"
        );
    }

    #[test]
    fn signup_form_checks_passwords_and_username() {
        let mut form = SignupForm {
            username: "leo tolstoy".into(),
            password1: "12345678".into(),
            password2: "12345678".into(),
            ..Default::default()
        };
        let errors = form.clean(false).unwrap_err();
        assert!(errors.has("username"));
        assert_eq!(errors.field("password2"), ["This password is entirely numeric."]);

        form.username = "leo".into();
        form.password1 = "war-and-peace".into();
        form.password2 = "war-and-peace".into();
        assert!(form.clean(true).unwrap_err().has("username"));

        let clean = form.clean(false).unwrap();
        assert_eq!(clean.username, "leo");
        assert_eq!(clean.password, "war-and-peace");
    }

    #[test]
    fn signup_form_validates_email_when_given() {
        let form = SignupForm {
            username: "leo".into(),
            email: "not-an-email".into(),
            password1: "war-and-peace".into(),
            password2: "war-and-peace".into(),
            ..Default::default()
        };
        assert!(form.clean(false).unwrap_err().has("email"));

        for bad in ["a@b@c.d", "a@@b.c", "@example.com", "leo@"] {
            let form = SignupForm {
                email: bad.into(),
                ..form.clone()
            };
            assert!(form.clean(false).unwrap_err().has("email"), "{bad}");
        }

        let form = SignupForm {
            email: "leo@yasnaya.ru".into(),
            ..form
        };
        assert_eq!(form.clean(false).unwrap().email, "leo@yasnaya.ru");
    }

    #[test]
    fn errors_display_joins_messages() {
        let mut errors = FormErrors::default();
        errors.add("text", "required");
        errors.add_non_field("bad");
        assert_eq!(errors.to_string(), "text: required; bad");
    }
}
