use askama::Template;

use super::assets::assets;
use crate::app::AppState;

/// Values every page shares through `base.html`.
pub struct Page {
    pub css: String,
    pub js: String,
    pub extend_head: String,
}

impl Page {
    pub fn new(state: &AppState) -> Self {
        let assets = assets();
        Self {
            css: assets.css.hashed_name.clone(),
            js: assets.js.hashed_name.clone(),
            extend_head: state.extend_head.clone().unwrap_or_default(),
        }
    }
}

/// A rendered file or bundled doc.
#[derive(Template)]
#[template(path = "file.html")]
pub struct FileTemplate {
    pub page: Page,
    pub file_id: String,
    pub file_size: String,
    pub file_type: String,
    pub private: bool,
    pub updated_at: Option<String>,
    pub revisions_href: Option<String>,
    pub raw_href: Option<String>,
    pub html: String,
}

pub struct RevisionRow {
    pub href: String,
    pub sequence: i64,
    pub file_type: String,
    pub size: String,
    pub created_at: String,
    pub created_ago: String,
}

#[derive(Template)]
#[template(path = "revisions.html")]
pub struct RevisionsTemplate {
    pub page: Page,
    pub file_id: String,
    pub file_href: String,
    pub revisions: Vec<RevisionRow>,
}

#[derive(Template)]
#[template(path = "revision.html")]
pub struct RevisionTemplate {
    pub page: Page,
    pub file_id: String,
    pub file_href: String,
    pub revisions_href: String,
    pub sequence: i64,
    pub file_type: String,
    pub created_at: String,
    pub created_ago: String,
    pub html: String,
}
