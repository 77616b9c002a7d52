//! LocalStorage JSON helpers
//!
//! Shared by tuning overrides and the leaderboard. Natively there is no
//! backing store, so loads miss and saves report failure.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Load and deserialize a JSON value stored under `key`
#[cfg(target_arch = "wasm32")]
pub fn load_json<T: DeserializeOwned>(key: &str) -> Option<T> {
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()?;

    let json = storage.get_item(key).ok().flatten()?;
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Discarding unreadable {}: {}", key, e);
            None
        }
    }
}

/// Serialize and store a JSON value under `key`. Returns true on success.
#[cfg(target_arch = "wasm32")]
pub fn save_json<T: Serialize>(key: &str, value: &T) -> bool {
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten();

    match (storage, serde_json::to_string(value)) {
        (Some(storage), Ok(json)) => storage.set_item(key, &json).is_ok(),
        _ => false,
    }
}

/// Native stubs
#[cfg(not(target_arch = "wasm32"))]
pub fn load_json<T: DeserializeOwned>(_key: &str) -> Option<T> {
    None
}

#[cfg(not(target_arch = "wasm32"))]
pub fn save_json<T: Serialize>(_key: &str, _value: &T) -> bool {
    false
}

/// Current wall-clock time in milliseconds
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn test_native_storage_is_inert() {
        assert!(!save_json("key", &42u32));
        assert_eq!(load_json::<u32>("key"), None);
        assert!(now_ms() > 0.0);
    }
}
