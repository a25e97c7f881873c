//! Process-wide counters. Lock-free so any session or request may record
//! without coordination.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    SshSessions,
    SshUploads,
    SshUploadBytes,
    SshFileActions,
    SshInteractive,
    SshAuthFailures,
    FilesDeleted,
    FilesSigned,
    HttpRequests,
    HttpRequestMicros,
    HttpServerErrors,
    HttpPanics,
}

impl Counter {
    const ALL: [Counter; 12] = [
        Counter::SshSessions,
        Counter::SshUploads,
        Counter::SshUploadBytes,
        Counter::SshFileActions,
        Counter::SshInteractive,
        Counter::SshAuthFailures,
        Counter::FilesDeleted,
        Counter::FilesSigned,
        Counter::HttpRequests,
        Counter::HttpRequestMicros,
        Counter::HttpServerErrors,
        Counter::HttpPanics,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Counter::SshSessions => "ssh.session",
            Counter::SshUploads => "ssh.upload",
            Counter::SshUploadBytes => "ssh.upload.bytes",
            Counter::SshFileActions => "ssh.file_action",
            Counter::SshInteractive => "ssh.interactive",
            Counter::SshAuthFailures => "ssh.auth.failure",
            Counter::FilesDeleted => "file.delete",
            Counter::FilesSigned => "file.sign",
            Counter::HttpRequests => "http.request",
            Counter::HttpRequestMicros => "http.request.duration_us",
            Counter::HttpServerErrors => "http.request.5xx",
            Counter::HttpPanics => "http.panic",
        }
    }
}

static COUNTERS: [AtomicU64; Counter::ALL.len()] = [const { AtomicU64::new(0) }; Counter::ALL.len()];

pub fn incr(counter: Counter) {
    add(counter, 1);
}

pub fn add(counter: Counter, value: u64) {
    COUNTERS[counter as usize].fetch_add(value, Ordering::Relaxed);
}

pub fn measure(counter: Counter, elapsed: Duration) {
    add(counter, elapsed.as_micros() as u64);
}

#[must_use]
pub fn get(counter: Counter) -> u64 {
    COUNTERS[counter as usize].load(Ordering::Relaxed)
}

#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub counters: BTreeMap<&'static str, u64>,
}

#[must_use]
pub fn snapshot() -> Snapshot {
    Snapshot {
        counters: Counter::ALL.iter().map(|c| (c.name(), get(*c))).collect(),
    }
}
