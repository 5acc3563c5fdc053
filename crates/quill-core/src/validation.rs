//! Form-style field validation.
//!
//! Validators never short-circuit: each one records its messages into a shared
//! [`ValidationErrors`] so a caller can report every bad field at once.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

pub const USERNAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const TITLE_MAX_LEN: usize = 100;

const REQUIRED: &str = "This field is required.";

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "12345678", "123456789", "1234567890", "qwertyui",
    "qwerty123", "iloveyou", "sunshine", "princess", "football", "baseball",
    "welcome1", "letmein1", "abc12345", "admin123", "passw0rd", "trustno1",
];

/// Field name to messages, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Flattened `field: message` lines.
    pub fn messages(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(field, msgs)| msgs.iter().map(move |m| format!("{field}: {m}")))
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages().join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn check_max_len(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

/// Record an error unless `value` is non-blank.
pub fn require(errors: &mut ValidationErrors, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        return false;
    }
    true
}

pub fn validate_username(errors: &mut ValidationErrors, value: &str) {
    if !require(errors, "username", value) {
        return;
    }
    check_max_len(errors, "username", value, USERNAME_MAX_LEN);
    if !USERNAME_RE.is_match(value) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

pub fn validate_email(errors: &mut ValidationErrors, value: &str) {
    if !require(errors, "email", value) {
        return;
    }
    check_max_len(errors, "email", value, EMAIL_MAX_LEN);
    if !EMAIL_RE.is_match(value) {
        errors.add("email", "Enter a valid email address.");
    }
}

/// Registration password pair checks. Strength rules run against `password1` only
/// once both entries agree.
pub fn validate_new_password(
    errors: &mut ValidationErrors,
    username: &str,
    password1: &str,
    password2: &str,
) {
    let has_first = require(errors, "password1", password1);
    let has_second = require(errors, "password2", password2);
    if !(has_first && has_second) {
        return;
    }
    if password1 != password2 {
        errors.add("password2", "The two password fields didn't match.");
        return;
    }

    if password1.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            "password2",
            format!(
                "This password is too short. It must contain at least {PASSWORD_MIN_LEN} characters."
            ),
        );
    }
    if password1.chars().all(|c| c.is_ascii_digit()) {
        errors.add("password2", "This password is entirely numeric.");
    }
    if !username.is_empty() && password1.to_lowercase() == username.to_lowercase() {
        errors.add("password2", "The password is too similar to the username.");
    }
    if COMMON_PASSWORDS.contains(&password1.to_lowercase().as_str()) {
        errors.add("password2", "This password is too common.");
    }
}

pub fn validate_post(errors: &mut ValidationErrors, title: &str, content: &str) {
    if require(errors, "title", title) {
        check_max_len(errors, "title", title, TITLE_MAX_LEN);
    }
    require(errors, "content", content);
}

/// A decoded and type-checked avatar upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn magic_matches(extension: &str, bytes: &[u8]) -> bool {
    match extension {
        "jpg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "png" => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "gif" => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
        "webp" => bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
        _ => false,
    }
}

/// Decode a base64 avatar upload (optionally a `data:` URL) and check it is an image
/// of the claimed type no larger than `max_bytes`.
pub fn decode_avatar(
    content_type: &str,
    data: &str,
    max_bytes: usize,
) -> Result<AvatarImage, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let Some(extension) = extension_for(content_type) else {
        errors.add(
            "image",
            "Invalid file type. Only JPEG, PNG, GIF, and WEBP are allowed.",
        );
        return Err(errors);
    };

    let payload = match data.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };

    let bytes = match general_purpose::STANDARD.decode(payload.trim()) {
        Ok(bytes) => bytes,
        Err(_) => {
            errors.add("image", "Invalid base64 image data.");
            return Err(errors);
        }
    };

    if bytes.is_empty() {
        errors.add("image", "The submitted file is empty.");
    } else if bytes.len() > max_bytes {
        errors.add(
            "image",
            format!("Image is too large ({} bytes, limit {max_bytes}).", bytes.len()),
        );
    } else if !magic_matches(extension, &bytes) {
        errors.add(
            "image",
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        );
    }

    errors.into_result()?;
    Ok(AvatarImage { bytes, extension })
}
