//! HTML views.
//!
//! Rendered with [maud](https://maud.lambda.xyz/) so templates are
//! type-checked and text is escaped by default. The stylesheet and the
//! drop-zone script are embedded at compile time.

use chrono::{DateTime, Utc};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use pulldown_cmark::{html as md_html, Event, Parser};

use crate::db::StagedImageRow;
use crate::model::{SessionIdentity, StartupDetail, StartupSummary, SubmitStatus};
use crate::pipeline::{PitchDraft, PitchResponse};
use crate::validate::format_bytes;

const SITE_CSS: &str = include_str!("../../static/style.css");
const DROP_JS: &str = include_str!("../../static/drop.js");

// ============================================================================
// Document chrome
// ============================================================================

fn base_document(title: &str, identity: Option<&SessionIdentity>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(SITE_CSS)) }
            }
            body {
                (navbar(identity))
                main { (content) }
            }
        }
    }
}

fn navbar(identity: Option<&SessionIdentity>) -> Markup {
    html! {
        header.navbar {
            nav {
                a.brand href="/" { "PitchBoard" }
                div.nav-links {
                    @if let Some(id) = identity {
                        a href="/submit" { "Submit" }
                        span.nav-user { (id.name) }
                        form.inline-form method="post" action="/signout" {
                            button.link-button type="submit" { "Sign out" }
                        }
                    } @else {
                        a href="/signin" { "Sign in" }
                    }
                }
            }
        }
    }
}

fn format_date(ts: &DateTime<Utc>) -> String {
    ts.format("%B %-d, %Y").to_string()
}

// ============================================================================
// Directory pages
// ============================================================================

/// Landing page: hero, search box and the card grid.
pub fn home_page(
    identity: Option<&SessionIdentity>,
    term: Option<&str>,
    startups: &[StartupSummary],
) -> Markup {
    let content = html! {
        section.hero {
            h1 { "Pitch Your Startup, Connect With Entrepreneurs" }
            p.sub-heading {
                "Submit Ideas, Vote On Pitches, And Get Noticed In Virtual Competitions."
            }
            form.search-form method="get" action="/" {
                input type="search" name="query" value=[term] placeholder="Search startups";
                button type="submit" { "Search" }
            }
        }
        section.directory {
            p.section-heading {
                @if let Some(term) = term {
                    "Search results for \"" (term) "\""
                } @else {
                    "All Startups"
                }
            }
            @if startups.is_empty() {
                p.no-results { "No startups found" }
            } @else {
                ul.card-grid {
                    @for startup in startups {
                        (startup_card(startup))
                    }
                }
            }
        }
    };
    base_document("PitchBoard", identity, content)
}

fn startup_card(startup: &StartupSummary) -> Markup {
    let link = format!("/startup/{}", startup.id);
    html! {
        li.startup-card {
            div.card-meta {
                span.card-date { (format_date(&startup.created_at)) }
                span.card-views { (startup.views) " views" }
            }
            p.card-author { (startup.author_name) }
            h3.card-title { a href=(link) { (startup.title) } }
            p.card-description { (startup.description) }
            @if let Some(url) = &startup.image_url {
                img.card-image src=(url) alt=(startup.title) loading="lazy";
            }
            div.card-footer {
                span.category-pill { (startup.category) }
                a.details-link href=(link) { "Details" }
            }
        }
    }
}

/// One pitch in full, with the markdown body rendered to HTML.
pub fn detail_page(
    identity: Option<&SessionIdentity>,
    startup: &StartupDetail,
    just_created: bool,
) -> Markup {
    let content = html! {
        @if just_created {
            div.flash { "Your pitch has been published." }
        }
        section.hero {
            p.hero-date { (format_date(&startup.created_at)) }
            h1 { (startup.title) }
            p.sub-heading { (startup.description) }
        }
        section.detail {
            @if let Some(url) = &startup.image_url {
                img.detail-image src=(url) alt=(startup.title);
            }
            div.detail-meta {
                span.card-author { (startup.author_name) }
                span.category-pill { (startup.category) }
                span.card-views { (startup.views) " views" }
            }
            h3 { "Pitch Details" }
            article.pitch-body { (render_markdown(&startup.pitch)) }
        }
    };
    base_document(&startup.title, identity, content)
}

/// Pitch text is trusted for formatting only: raw HTML blocks and
/// inline tags are re-emitted as text so they render inert.
fn render_markdown(text: &str) -> Markup {
    let parser = Parser::new(text).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    PreEscaped(out)
}

// ============================================================================
// Submission form
// ============================================================================

/// The pitch form plus the image slot. `envelope` is the outcome of
/// the last attempt, if any; `pending` disables the submit button
/// while an attempt is still running.
pub fn submit_page(
    identity: &SessionIdentity,
    draft: &PitchDraft,
    staged: Option<&StagedImageRow>,
    envelope: Option<&PitchResponse>,
    pending: bool,
) -> Markup {
    let prev = envelope.map(|e| e.status.as_str()).unwrap_or("INITIAL");
    let banner = envelope
        .filter(|e| e.status == SubmitStatus::Error)
        .map(|e| {
            if e.field_errors.is_some() {
                "Please check your inputs and try again."
            } else {
                e.error.as_str()
            }
        });

    let content = html! {
        section.hero {
            h1 { "Submit Your Startup" }
        }
        section.form-wrap {
            @if let Some(msg) = banner {
                div.form-banner { (msg) }
            }
            form.pitch-form method="post" action="/submit" {
                input type="hidden" name="prev" value=(prev);
                div.form-field {
                    label for="title" { "Title" }
                    input #title type="text" name="title" value=(draft.title)
                        placeholder="Startup title";
                    @if let Some(msg) = field_error(envelope, "title") {
                        p.field-error { (msg) }
                    }
                }
                div.form-field {
                    label for="description" { "Description" }
                    textarea #description name="description"
                        placeholder="Short description of your startup idea" {
                        (draft.description)
                    }
                    @if let Some(msg) = field_error(envelope, "description") {
                        p.field-error { (msg) }
                    }
                }
                div.form-field {
                    label for="category" { "Category" }
                    input #category type="text" name="category" value=(draft.category)
                        placeholder="Tech, Health, Education...";
                    @if let Some(msg) = field_error(envelope, "category") {
                        p.field-error { (msg) }
                    }
                }
                div.form-field {
                    label for="pitch" { "Pitch" }
                    textarea #pitch name="pitch"
                        placeholder="Briefly describe your idea and what problem it solves" {
                        (draft.pitch)
                    }
                    p.field-hint { "Markdown is supported." }
                    @if let Some(msg) = field_error(envelope, "pitch") {
                        p.field-error { (msg) }
                    }
                }
                button.submit-button type="submit" disabled[pending] {
                    @if pending { "Submitting..." } @else { "Submit Your Pitch" }
                }
            }
            div.image-slot {
                label { "Image" }
                @if let Some(row) = staged {
                    img.staged-preview src={ "/submit/preview/" (row.token) }
                        alt=(row.original_filename);
                    p.staged-meta {
                        (row.original_filename)
                        " (" (format_bytes(row.byte_size as u64)) ")"
                    }
                    form method="post" action="/submit/image/reset" {
                        button.reset-button type="submit" { "Remove image" }
                    }
                } @else {
                    form #image-form method="post" action="/submit/image"
                        enctype="multipart/form-data" {
                        div #drop-zone.drop-zone {
                            p { "Drag an image here, or pick a file below." }
                        }
                        input #file-input type="file" name="file"
                            accept="image/jpeg,image/png,image/webp";
                        noscript {
                            button type="submit" { "Upload image" }
                        }
                    }
                    script { (PreEscaped(DROP_JS)) }
                }
                @if let Some(msg) = field_error(envelope, "image") {
                    p.field-error { (msg) }
                }
            }
        }
    };
    base_document("Submit Your Startup", Some(identity), content)
}

fn field_error<'a>(envelope: Option<&'a PitchResponse>, field: &str) -> Option<&'a str> {
    envelope
        .and_then(|e| e.field_errors.as_ref())
        .and_then(|errors| errors.get(field))
}

// ============================================================================
// Sign-in and error pages
// ============================================================================

pub fn signin_page(error: Option<&str>) -> Markup {
    let content = html! {
        section.hero {
            h1 { "Sign In" }
            p.sub-heading { "Enter your access key to submit a pitch." }
        }
        section.form-wrap {
            @if let Some(msg) = error {
                div.form-banner { (msg) }
            }
            form.signin-form method="post" action="/signin" {
                div.form-field {
                    label for="access_key" { "Access key" }
                    input #access_key type="password" name="access_key" autocomplete="off";
                }
                button.submit-button type="submit" { "Sign In" }
            }
        }
    };
    base_document("Sign In", None, content)
}

pub fn not_found_page() -> Markup {
    message_page("Not Found", "There is no such page or pitch here.")
}

pub fn unauthorized_page() -> Markup {
    message_page("Sign-in Required", "You need to sign in before doing that.")
}

pub fn server_error_page() -> Markup {
    message_page(
        "Something Went Wrong",
        "An unexpected error has occurred. Please try again.",
    )
}

fn message_page(heading: &str, body: &str) -> Markup {
    let content = html! {
        section.hero {
            h1 { (heading) }
            p.sub-heading { (body) }
            a.details-link href="/" { "Back to the board" }
        }
    };
    base_document(heading, None, content)
}

// ============================================================================
// Tests
// ============================================================================
