//! Short, URL-safe identifiers for users, keys, files and requests.

use std::sync::{LazyLock, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// Length of generated ids. Collisions are tolerated; the store rejects
/// duplicates on insert and callers retry.
pub const ID_LENGTH: usize = 10;

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

static GENERATOR: LazyLock<Option<Mutex<StdRng>>> = LazyLock::new(|| {
    let seed = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    Some(Mutex::new(StdRng::seed_from_u64(seed.as_nanos() as u64)))
});

/// Seeds the generator. Call once at process start so a broken clock
/// surfaces before any request is served.
pub fn init() -> Result<()> {
    GENERATOR.as_ref().map(|_| ()).ok_or(Error::IdGeneration)
}

pub fn generate() -> Result<String> {
    let generator = GENERATOR.as_ref().ok_or(Error::IdGeneration)?;
    let mut rng = generator.lock().unwrap_or_else(|e| e.into_inner());

    Ok((0..ID_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect())
}

/// Like [`generate`], but aborts the process if the generator could not be
/// seeded.
#[must_use]
pub fn must_generate() -> String {
    match generate() {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("unable to generate id: {e}");
            std::process::abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generate_shape() {
        let id = generate().unwrap();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_is_mostly_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| must_generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_init() {
        assert!(init().is_ok());
    }
}
