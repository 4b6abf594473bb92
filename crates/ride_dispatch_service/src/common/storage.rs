/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/
use crate::tools::error::AppError;
use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::time::Duration;
use tokio::time::Instant;

pub type StorageFields = FxHashMap<String, String>;

/// Key/value store with a per-key TTL backing the location registry.
///
/// Implementations must make a single `set_fields` call atomic per key; nothing
/// else in the service serializes concurrent writers.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Replaces every field of `key` and restarts its time-to-live.
    async fn set_fields(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
        ttl: Duration,
    ) -> Result<(), AppError>;

    /// `None` when the key is absent or has expired.
    async fn get_fields(&self, key: &str) -> Result<Option<StorageFields>, AppError>;

    /// Live keys matching a glob pattern (`*` and `?` wildcards), in no particular order.
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, AppError>;
}

struct Entry {
    fields: StorageFields,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Process-local backend used for single-node runs and tests.
///
/// Expiry is evaluated lazily against the tokio clock, so paused-time tests can
/// age records without sleeping.
#[derive(Default)]
pub struct InMemoryStorage {
    entries: RwLock<FxHashMap<String, Entry>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries still held, expired ones included until the next write.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn set_fields(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
        ttl: Duration,
    ) -> Result<(), AppError> {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).ok_or_else(|| {
            AppError::InvalidRequest(format!("ttl of {}s is out of range", ttl.as_secs()))
        })?;
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                fields: fields.into_iter().collect(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get_fields(&self, key: &str) -> Result<Option<StorageFields>, AppError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.fields.clone()))
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, AppError> {
        let matcher = glob_to_regex(pattern)?;
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|(key, entry)| entry.is_live(now) && matcher.is_match(key))
            .map(|(key, _)| key.to_owned())
            .collect())
    }
}

/// Translates a Redis-style glob into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, AppError> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            _ => expr.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|err| AppError::InternalError(err.to_string()))
}
