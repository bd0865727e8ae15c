//! Environment/runtime helpers
//!
//! `.env` loading and variable lookups shared by the binary and the config layer.

use tracing::debug;

/// Load `.env` from the working directory if present. Missing files are not an error.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => eprintln!("ignoring unreadable .env: {e}"),
    }
}

/// Read a process environment variable, treating blank values as unset.
pub fn var_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Return the first non-blank value among `keys` according to `lookup`.
pub fn first_non_empty<F>(keys: &[&str], lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|k| lookup(k))
        .find(|v| !v.trim().is_empty())
}
