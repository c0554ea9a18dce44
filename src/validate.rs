//! Field and file validation for pitch submissions.
//!
//! Pure functions: every rule is checked independently and the result
//! is a per-field error map, so the form can show all problems at
//! once. Nothing here does I/O and nothing here is a fault; an
//! invalid submission is an ordinary value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hard cap on uploaded image size, in bytes (5 MB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Content types accepted for the pitch image.
pub const ACCEPTED_IMAGE_TYPES: [&str; 4] =
    ["image/jpeg", "image/jpg", "image/png", "image/webp"];

const TITLE_CHARS: (usize, usize) = (3, 100);
const DESCRIPTION_CHARS: (usize, usize) = (20, 500);
const CATEGORY_CHARS: (usize, usize) = (3, 20);
const PITCH_MIN_CHARS: usize = 10;

/// What the validator needs to know about the selected image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMeta {
    pub byte_size: u64,
    pub content_type: String,
    pub filename: String,
}

/// One candidate submission, assembled by the form controller from the
/// posted fields, the pitch editor content and the staged image.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub pitch: &'a str,
    pub image: Option<&'a ImageMeta>,
}

/// Field name → human-readable violation message. At most one message
/// per field; iteration order is stable for rendering.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldErrors(pub BTreeMap<String, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn put(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }
}

/// Validate a candidate against the submission rules. Checks every
/// field regardless of earlier failures.
pub fn validate_submission(c: &Candidate) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    check_char_range(&mut errors, "title", c.title, TITLE_CHARS);
    check_char_range(&mut errors, "description", c.description, DESCRIPTION_CHARS);
    check_char_range(&mut errors, "category", c.category, CATEGORY_CHARS);
    if c.pitch.chars().count() < PITCH_MIN_CHARS {
        errors.put(
            "pitch",
            format!("Pitch must be at least {} characters.", PITCH_MIN_CHARS),
        );
    }
    check_image(&mut errors, c.image);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_char_range(errors: &mut FieldErrors, field: &str, value: &str, (min, max): (usize, usize)) {
    let len = value.chars().count();
    if len < min || len > max {
        let label = capitalize(field);
        errors.put(
            field,
            format!("{} must be between {} and {} characters.", label, min, max),
        );
    }
}

fn check_image(errors: &mut FieldErrors, image: Option<&ImageMeta>) {
    let Some(image) = image else {
        errors.put("image", "Please select an image file.");
        return;
    };
    if image.byte_size > MAX_IMAGE_BYTES {
        errors.put(
            "image",
            format!(
                "The image is too large. Please choose an image smaller than {}.",
                format_bytes(MAX_IMAGE_BYTES)
            ),
        );
        return;
    }
    if !is_accepted_type(&image.content_type) {
        errors.put(
            "image",
            "Please upload a valid image file (JPEG, PNG, or WebP).",
        );
    }
}

/// Case-insensitive content-type check; any `;` parameter suffix (for
/// example a charset) is ignored before comparing.
pub fn is_accepted_type(content_type: &str) -> bool {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_IMAGE_TYPES.contains(&normalized.as_str())
}

/// Human-readable byte count: base 1024, two decimals, trailing zeros
/// trimmed. `0` renders as `0 Bytes`.
pub fn format_bytes(bytes: u64) -> String {
    const SIZES: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exp = (((bytes as f64).ln() / 1024f64.ln()).floor() as usize).min(SIZES.len() - 1);
    let scaled = bytes as f64 / 1024f64.powi(exp as i32);
    let mut formatted = format!("{:.2}", scaled);
    if formatted.contains('.') {
        formatted = formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string();
    }
    format!("{} {}", formatted, SIZES[exp])
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(byte_size: u64, content_type: &str) -> ImageMeta {
        ImageMeta {
            byte_size,
            content_type: content_type.to_string(),
            filename: "pitch.png".to_string(),
        }
    }

    fn valid_candidate<'a>(image: &'a ImageMeta, description: &'a str) -> Candidate<'a> {
        Candidate {
            title: "We Robots",
            description,
            category: "Robots",
            pitch: "A fleet of helpful robots.",
            image: Some(image),
        }
    }

    #[test]
    fn accepts_a_valid_submission() {
        let img = image(1024, "image/png");
        let description = "Robots that sort your recycling for you.";
        assert!(validate_submission(&valid_candidate(&img, description)).is_ok());
    }

    #[test]
    fn reports_each_violated_field_independently() {
        // Three violations at once: short title, short description, no image.
        let c = Candidate {
            title: "ab",
            description: "too short",
            category: "Robots",
            pitch: "A fleet of helpful robots.",
            image: None,
        };
        let errors = validate_submission(&c).unwrap_err();
        assert_eq!(errors.0.len(), 3);
        assert!(errors.get("title").is_some());
        assert!(errors.get("description").is_some());
        assert!(errors.get("image").is_some());
        assert!(errors.get("category").is_none());
        assert!(errors.get("pitch").is_none());
    }

    #[test]
    fn field_boundaries() {
        let img = image(1024, "image/png");
        let description = "d".repeat(20);

        let mut c = valid_candidate(&img, &description);
        c.title = "abc";
        assert!(validate_submission(&c).is_ok());
        c.title = "ab";
        assert!(validate_submission(&c).unwrap_err().get("title").is_some());

        let long_title = "t".repeat(100);
        c.title = &long_title;
        assert!(validate_submission(&c).is_ok());
        let too_long = "t".repeat(101);
        c.title = &too_long;
        assert!(validate_submission(&c).unwrap_err().get("title").is_some());

        let mut c = valid_candidate(&img, &description);
        let short_desc = "d".repeat(19);
        c.description = &short_desc;
        assert!(validate_submission(&c)
            .unwrap_err()
            .get("description")
            .is_some());

        let mut c = valid_candidate(&img, &description);
        c.pitch = "123456789";
        assert!(validate_submission(&c).unwrap_err().get("pitch").is_some());
        c.pitch = "1234567890";
        assert!(validate_submission(&c).is_ok());

        let mut c = valid_candidate(&img, &description);
        let wide_category = "c".repeat(21);
        c.category = &wide_category;
        assert!(validate_submission(&c)
            .unwrap_err()
            .get("category")
            .is_some());
    }

    #[test]
    fn image_size_limit_is_inclusive() {
        let description = "Robots that sort your recycling for you.";
        let at_limit = image(MAX_IMAGE_BYTES, "image/png");
        assert!(validate_submission(&valid_candidate(&at_limit, description)).is_ok());

        let over = image(MAX_IMAGE_BYTES + 1, "image/png");
        let errors = validate_submission(&valid_candidate(&over, description)).unwrap_err();
        let message = errors.get("image").unwrap();
        assert!(message.contains("5 MB"), "message was: {}", message);
    }

    #[test]
    fn image_type_checks_ignore_case_and_parameters() {
        let description = "Robots that sort your recycling for you.";
        let upper = image(10, "IMAGE/JPEG");
        assert!(validate_submission(&valid_candidate(&upper, description)).is_ok());

        let with_params = image(10, "image/png; charset=binary");
        assert!(validate_submission(&valid_candidate(&with_params, description)).is_ok());

        let gif = image(10, "image/gif");
        let errors = validate_submission(&valid_candidate(&gif, description)).unwrap_err();
        assert!(errors.get("image").unwrap().contains("JPEG, PNG, or WebP"));
    }

    #[test]
    fn format_bytes_matches_display_contract() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_bytes(1023), "1023 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1300), "1.27 KB");
    }
}
