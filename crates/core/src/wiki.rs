//! Wiki document kinds, slug generation, and field validation rules.
//!
//! This module lives in `core` (zero internal deps) so it can be used by both
//! the storage layer and the content engine.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Document kinds
// ---------------------------------------------------------------------------

pub const DOC_TYPE_PAGE: &str = "page";
pub const DOC_TYPE_COMMENT: &str = "comment";
pub const DOC_TYPE_FILE: &str = "file";

/// Maximum length of a page title, in characters.
pub const MAX_TITLE_LENGTH: usize = 128;

/// Name of the backing database that holds a wiki's documents.
pub fn wiki_db_name(wiki_id: &str) -> String {
    format!("wiki_{wiki_id}")
}

// ---------------------------------------------------------------------------
// Slug generation
// ---------------------------------------------------------------------------

/// Generate a URL slug from a page title.
///
/// Letters are lowercased, digits and `_`, `-`, `+` are kept, each
/// whitespace character becomes a hyphen, and everything else is dropped.
/// Hyphens are not collapsed: `"1 < 3"` becomes `"1--3"`.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphabetic() {
            slug.extend(c.to_lowercase());
        } else if c.is_numeric() || matches!(c, '_' | '-' | '+') {
            slug.push(c);
        } else if c.is_whitespace() {
            slug.push('-');
        }
    }
    slug
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a document's `type` discriminator.
pub fn validate_doc_type(actual: &str, expected: &str) -> Result<(), CoreError> {
    if actual != expected {
        return Err(CoreError::Validation(format!("Type must be {expected}")));
    }
    Ok(())
}

/// Validate a page title (non-empty, at most 128 characters).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.is_empty() {
        return Err(CoreError::Validation("Page title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Page title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate a generated slug. A title made only of punctuation yields an
/// empty slug, which is reserved for history copies.
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() {
        return Err(CoreError::Validation(
            "Page title must contain at least one letter or digit".into(),
        ));
    }
    Ok(())
}

/// Validate that a page has both an owner and a last editor.
pub fn validate_authorship(owner: &str, editor: &str) -> Result<(), CoreError> {
    if owner.is_empty() || editor.is_empty() {
        return Err(CoreError::Validation(
            "Page must have an owner and editor".into(),
        ));
    }
    Ok(())
}

/// Validate that a page or comment is attached to an owning page.
pub fn validate_owning_page(owning_page: &str) -> Result<(), CoreError> {
    if owning_page.is_empty() {
        return Err(CoreError::Validation("Owning page not set".into()));
    }
    Ok(())
}

/// Validate that a comment has an author.
pub fn validate_author(author: &str) -> Result<(), CoreError> {
    if author.is_empty() {
        return Err(CoreError::Validation("Comment has no author".into()));
    }
    Ok(())
}

/// Validate a file record name.
pub fn validate_file_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("File name must not be empty".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
