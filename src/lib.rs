//! # snips
//!
//! A passwordless, anonymous pastebin driven over SSH, with a terminal UI for
//! managing files and an HTTP service that renders them as highlighted HTML.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use snips::app::AppState;
//! use snips::config::Config;
//! use snips::server::create_router;
//! use snips::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/snips.db").unwrap();
//! store.migrate().unwrap();
//!
//! let state = Arc::new(AppState::new(Config::default(), Arc::new(store)));
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod actions;
pub mod app;
pub mod config;
pub mod error;
pub mod id;
pub mod renderer;
pub mod server;
pub mod signer;
pub mod ssh;
pub mod stats;
pub mod store;
pub mod timeutil;
pub mod tui;
pub mod types;
