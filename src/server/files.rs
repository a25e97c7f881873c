//! File pages: the rendered view, raw content and the read-only revision
//! history. Every route here sits behind [`with_file`].

use std::collections::HashMap;
use std::sync::Arc;

use askama::Template;
use axum::Extension;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use tracing::warn;
use url::Url;

use super::response::{HttpError, HttpResult, OptionExt};
use super::templates::{FileTemplate, Page, RevisionRow, RevisionTemplate, RevisionsTemplate};
use crate::app::AppState;
use crate::renderer::{binary_html_placeholder, to_diff_html, to_markdown, to_syntax_highlighted_html};
use crate::signer::{self, SIGNATURE_QUERY_PARAM};
use crate::timeutil::{human_bytes, human_time};
use crate::types::File;

const RAW_QUERY_PARAM: &str = "r";

/// The file a gated request resolved to, and the URL it was reached by.
pub struct FileContext {
    pub file: File,
    pub url: Url,
    /// Whether the request carried a valid, unexpired signature.
    pub signed: bool,
}

impl FileContext {
    /// A same-origin link to `path` that stays reachable for whoever holds
    /// this request's URL. Private files get a fresh signature carrying the
    /// same expiry as the incoming one.
    fn href(&self, state: &AppState, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = state.config.http.external.clone();
        url.set_path(path);
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        if self.signed {
            url = match signer::expires_at(&self.url) {
                Some(expires_at) => state.signer.sign_url_with_expiry(&url, expires_at),
                None => state.signer.sign_url(&url),
            };
        }

        match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        }
    }
}

/// Resolves `{id}` to a file, 404ing when it is missing or when it is
/// private and the URL is not validly signed.
pub async fn with_file(
    State(state): State<Arc<AppState>>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> HttpResult<Response> {
    let file_id = params.get("id").ok_or_else(HttpError::not_found)?;
    let file = state.store.find_file(file_id)?.or_not_found()?;

    let mut url = state.config.http.external.clone();
    url.set_path(request.uri().path());
    url.set_query(request.uri().query());

    let signed = url.query_pairs().any(|(k, _)| k == SIGNATURE_QUERY_PARAM)
        && state.signer.verify_url_and_not_expired(&url);

    if file.private && !signed {
        warn!(file_id = %file.id, "attempted to access private file");
        return Err(HttpError::not_found());
    }

    request
        .extensions_mut()
        .insert(Arc::new(FileContext { file, url, signed }));
    Ok(next.run(request).await)
}

fn wants_raw(headers: &HeaderMap, url: &Url) -> bool {
    let curl = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ua| ua.to_lowercase().contains("curl"));
    curl || url.query_pairs().any(|(k, _)| k == RAW_QUERY_PARAM)
}

fn raw(content: Vec<u8>) -> Response {
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        content,
    )
        .into_response()
}

fn render_file(file: &File, content: &[u8]) -> crate::error::Result<String> {
    if file.is_binary() {
        Ok(binary_html_placeholder())
    } else if file.is_markdown() {
        to_markdown(content)
    } else {
        to_syntax_highlighted_html(&file.file_type, content)
    }
}

pub async fn file(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<Arc<FileContext>>,
    headers: HeaderMap,
) -> HttpResult<Response> {
    let file = &ctx.file;
    let content = file.get_content()?;

    if wants_raw(&headers, &ctx.url) {
        return Ok(raw(content));
    }

    let path = format!("/f/{}", file.id);
    let revisions_href = (state.store.count_revisions_by_file_id(&file.id)? > 0)
        .then(|| ctx.href(&state, &format!("{path}/rev"), &[]));

    let template = FileTemplate {
        page: Page::new(&state),
        file_id: file.id.clone(),
        file_size: human_bytes(file.size),
        file_type: file.file_type.to_lowercase(),
        private: file.private,
        updated_at: Some(human_time(file.updated_at)),
        revisions_href,
        raw_href: Some(ctx.href(&state, &path, &[(RAW_QUERY_PARAM, "1")])),
        html: render_file(file, &content)?,
    };
    Ok(Html(template.render()?).into_response())
}

pub async fn revisions(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<Arc<FileContext>>,
) -> HttpResult<Response> {
    let file_id = &ctx.file.id;
    let revisions = state
        .store
        .find_revisions_by_file_id(file_id)?
        .into_iter()
        .map(|rev| RevisionRow {
            href: ctx.href(&state, &format!("/f/{file_id}/rev/{}", rev.id), &[]),
            sequence: rev.sequence,
            file_type: rev.file_type.to_lowercase(),
            size: human_bytes(rev.size),
            created_at: rev.created_at.to_rfc3339(),
            created_ago: human_time(rev.created_at),
        })
        .collect();

    let template = RevisionsTemplate {
        page: Page::new(&state),
        file_id: file_id.clone(),
        file_href: ctx.href(&state, &format!("/f/{file_id}"), &[]),
        revisions,
    };
    Ok(Html(template.render()?).into_response())
}

pub async fn revision(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<Arc<FileContext>>,
    Path(params): Path<HashMap<String, String>>,
    headers: HeaderMap,
) -> HttpResult<Response> {
    let file_id = &ctx.file.id;
    let rev_id = params
        .get("rev")
        .and_then(|rev| rev.parse::<i64>().ok())
        .ok_or_else(HttpError::not_found)?;
    let revision = state.store.find_revision(file_id, rev_id)?.or_not_found()?;
    let diff = revision.get_diff()?;

    if wants_raw(&headers, &ctx.url) {
        return Ok(raw(diff));
    }

    let template = RevisionTemplate {
        page: Page::new(&state),
        file_id: file_id.clone(),
        file_href: ctx.href(&state, &format!("/f/{file_id}"), &[]),
        revisions_href: ctx.href(&state, &format!("/f/{file_id}/rev"), &[]),
        sequence: revision.sequence,
        file_type: revision.file_type.to_lowercase(),
        created_at: revision.created_at.to_rfc3339(),
        created_ago: human_time(revision.created_at),
        html: to_diff_html(&diff),
    };
    Ok(Html(template.render()?).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_raw() {
        let page = Url::parse("http://localhost:8080/f/abc").unwrap();
        let raw = Url::parse("http://localhost:8080/f/abc?r=1").unwrap();

        let mut headers = HeaderMap::new();
        assert!(!wants_raw(&headers, &page));
        assert!(wants_raw(&headers, &raw));

        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.4.0"));
        assert!(wants_raw(&headers, &page));

        headers.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        assert!(!wants_raw(&headers, &page));
    }
}
