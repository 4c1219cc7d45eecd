//! Wall clock access
//!
//! Only defaults read the clock; callers can always pass explicit times.

/// Current unix time in milliseconds
#[cfg(target_arch = "wasm32")]
pub fn unix_now_millis() -> u64 {
    js_sys::Date::now() as u64
}

/// Current unix time in milliseconds
#[cfg(not(target_arch = "wasm32"))]
pub fn unix_now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
