//! Extension API key generation.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of a generated API key.
pub const API_KEY_LENGTH: usize = 32;

/// Generate a fresh random alphanumeric API key.
pub fn generate_api_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(API_KEY_LENGTH)
        .map(char::from)
        .collect()
}
