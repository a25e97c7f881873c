use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::codec;
use crate::error::Result;

pub const FILE_TYPE_BINARY: &str = "binary";
pub const FILE_TYPE_MARKDOWN: &str = "markdown";
pub const FILE_TYPE_TEXT: &str = "text";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKey {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fingerprint: String,
    #[serde(rename = "type")]
    pub key_type: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Logical (uncompressed) length of the content.
    pub size: u64,
    #[serde(skip)]
    pub raw_content: Vec<u8>,
    pub private: bool,
    #[serde(rename = "type")]
    pub file_type: String,
    pub user_id: String,
}

impl File {
    /// Builds a new file owned by `user_id`. The id and timestamps are assigned
    /// by the store on insert.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            created_at: now,
            updated_at: now,
            size: 0,
            raw_content: Vec::new(),
            private: false,
            file_type: FILE_TYPE_TEXT.to_string(),
            user_id: user_id.into(),
        }
    }

    /// Decodes the stored bytes. Binary uploads are stored as sent, so one
    /// that itself begins with the zstd magic comes back decompressed and no
    /// longer matches `size`.
    pub fn get_content(&self) -> Result<Vec<u8>> {
        codec::decode(&self.raw_content)
    }

    /// Stores `content`, zstd-framed when `compress` is set. `size` always
    /// tracks the uncompressed length.
    pub fn set_content(&mut self, content: &[u8], compress: bool) -> Result<()> {
        self.raw_content = codec::encode(content, compress)?;
        self.size = content.len() as u64;
        Ok(())
    }

    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.file_type == FILE_TYPE_BINARY
    }

    #[must_use]
    pub fn is_markdown(&self) -> bool {
        self.file_type == FILE_TYPE_MARKDOWN
    }

    #[must_use]
    pub fn visibility(&self) -> &'static str {
        if self.private { "private" } else { "public" }
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub id: i64,
    pub sequence: i64,
    pub file_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub raw_diff: Vec<u8>,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
}

impl Revision {
    pub fn get_diff(&self) -> Result<Vec<u8>> {
        codec::decode(&self.raw_diff)
    }

    pub fn set_diff(&mut self, diff: &[u8], compress: bool) -> Result<()> {
        self.raw_diff = codec::encode(diff, compress)?;
        Ok(())
    }
}
