//! Markdown rendering with HTML sanitization.
//!
//! Page and comment bodies are stored twice: the raw Markdown the author
//! typed and the HTML produced here. Raw HTML embedded in the Markdown is
//! never passed through; it is rendered as escaped text. Link and image
//! targets are limited to relative URLs and a small scheme allow-list.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};

/// URL schemes allowed in link and image targets.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Render Markdown to sanitized HTML.
pub fn render_and_sanitize(raw: &str) -> String {
    let parser = Parser::new_ext(raw, markdown_options()).map(sanitize_event);
    let mut html = String::with_capacity(raw.len() + raw.len() / 2);
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        CowStr::Borrowed("")
    }
}

/// A URL is safe when it is relative or uses an allow-listed scheme.
fn is_safe_url(url: &str) -> bool {
    let trimmed = url.trim_start();
    match trimmed.split_once(':') {
        Some((scheme, _)) if !scheme.contains(['/', '?', '#']) => {
            ALLOWED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str())
        }
        _ => true,
    }
}
