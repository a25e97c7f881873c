//! Embedded CSS and JS, bundled once per process. Each bundle is served
//! under a content-hashed name with immutable caching, and under its plain
//! name with a short cache and ETag revalidation.

use std::io::Write;
use std::sync::OnceLock;

use axum::body::Body;
use axum::extract::Path;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use rust_embed::RustEmbed;
use sha2::{Digest, Sha256};
use tracing::{error, warn};

use crate::renderer::syntax_css;

#[derive(RustEmbed)]
#[folder = "web/static"]
struct StaticFiles;

const CSS_FILES: &[&str] = &["css/index.css", "css/code.css", "css/markdown.css"];
const JS_FILES: &[&str] = &["js/snips.js"];

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";
const REVALIDATE_CACHE: &str = "public, max-age=300, must-revalidate";

pub struct Bundle {
    pub name: String,
    pub hashed_name: String,
    pub mime: &'static str,
    pub etag: String,
    identity: Bytes,
    gzip: Option<Bytes>,
    zstd: Option<Bytes>,
}

impl Bundle {
    fn new(stem: &str, ext: &str, content: String) -> Self {
        let content = minify(&content);
        let digest = hex::encode(Sha256::digest(content.as_bytes()));
        let short = &digest[..12];
        let mime = mime_guess::from_ext(ext)
            .first_raw()
            .unwrap_or("application/octet-stream");

        let identity = Bytes::from(content.into_bytes());
        Self {
            name: format!("{stem}.{ext}"),
            hashed_name: format!("{stem}.{short}.{ext}"),
            mime,
            etag: format!("\"{short}\""),
            gzip: gzip(&identity),
            zstd: zstd::encode_all(identity.as_ref(), 19)
                .inspect_err(|e| error!(error = %e, "unable to zstd asset"))
                .ok()
                .map(Bytes::from),
            identity,
        }
    }

    /// The body and `Content-Encoding` best matching `Accept-Encoding`.
    fn encoded(&self, headers: &HeaderMap) -> (Bytes, Option<&'static str>) {
        let accept = headers
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        if accept.contains("zstd") {
            if let Some(body) = &self.zstd {
                return (body.clone(), Some("zstd"));
            }
        }
        if accept.contains("gzip") {
            if let Some(body) = &self.gzip {
                return (body.clone(), Some("gzip"));
            }
        }
        (self.identity.clone(), None)
    }

    #[must_use]
    pub fn identity(&self) -> &[u8] {
        &self.identity
    }
}

pub struct Assets {
    pub css: Bundle,
    pub js: Bundle,
}

impl Assets {
    fn load() -> Self {
        let mut css = concat(CSS_FILES);
        css.push_str(syntax_css());
        Self {
            css: Bundle::new("snips", "css", css),
            js: Bundle::new("snips", "js", concat(JS_FILES)),
        }
    }

    fn find(&self, name: &str) -> Option<(&Bundle, bool)> {
        [&self.css, &self.js].into_iter().find_map(|bundle| {
            if bundle.hashed_name == name {
                Some((bundle, true))
            } else if bundle.name == name {
                Some((bundle, false))
            } else {
                None
            }
        })
    }
}

pub fn assets() -> &'static Assets {
    static ASSETS: OnceLock<Assets> = OnceLock::new();
    ASSETS.get_or_init(Assets::load)
}

fn concat(files: &[&str]) -> String {
    let mut out = String::new();
    for file in files {
        match StaticFiles::get(file) {
            Some(content) => {
                out.push_str(&String::from_utf8_lossy(&content.data));
                out.push('\n');
            }
            None => warn!(file, "embedded asset missing"),
        }
    }
    out
}

/// Drops comment-only lines, indentation and blank lines. Line breaks are
/// kept so statements never merge.
fn minify(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_comment = false;
    for line in content.lines() {
        let line = line.trim();
        if in_comment {
            if line.ends_with("*/") {
                in_comment = false;
            }
            continue;
        }
        if line.starts_with("/*") {
            in_comment = !line.ends_with("*/");
            continue;
        }
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn gzip(content: &[u8]) -> Option<Bytes> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    match encoder.write_all(content).and_then(|()| encoder.finish()) {
        Ok(out) => Some(Bytes::from(out)),
        Err(e) => {
            error!(error = %e, "unable to gzip asset");
            None
        }
    }
}

pub async fn serve_asset(Path(asset): Path<String>, headers: HeaderMap) -> Response {
    let Some((bundle, hashed)) = assets().find(&asset) else {
        return (StatusCode::NOT_FOUND, "not found\n").into_response();
    };

    let etag = HeaderValue::from_str(&bundle.etag).ok();
    if !hashed {
        let matches = headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.split(',').any(|tag| tag.trim() == bundle.etag));
        if matches {
            let mut response = StatusCode::NOT_MODIFIED.into_response();
            if let Some(etag) = etag {
                response.headers_mut().insert(header::ETAG, etag);
            }
            return response;
        }
    }

    let (body, encoding) = bundle.encoded(&headers);
    let mut response = Response::new(Body::from(body));
    let out = response.headers_mut();
    out.insert(header::CONTENT_TYPE, HeaderValue::from_static(bundle.mime));
    out.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    if let Some(encoding) = encoding {
        out.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding));
    }
    if hashed {
        out.insert(header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE_CACHE));
    } else {
        out.insert(header::CACHE_CONTROL, HeaderValue::from_static(REVALIDATE_CACHE));
        if let Some(etag) = etag {
            out.insert(header::ETAG, etag);
        }
    }
    response
}
