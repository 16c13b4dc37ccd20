//! API utilities for frontend-backend communication
//!
//! The reception page is served by the same origin as the order API, so the
//! base URL is simply the current window origin.

use wasm_bindgen::JsCast;

/// Get the base URL for API requests
///
/// # Returns
/// - Origin like "https://po.example.com" or "http://127.0.0.1:8000"
/// - Empty string if window is not available (relative URLs still work)
pub fn api_base() -> String {
    let window = match web_sys::window() {
        Some(w) => w,
        None => return String::new(),
    };
    let location = window.location();
    location.origin().unwrap_or_default()
}

/// Build a full API URL from a path
///
/// # Example
/// ```rust,ignore
/// let url = api_url("/orders/api/update-quantity-delivered/12/");
/// ```
pub fn api_url(path: &str) -> String {
    format!("{}{}", api_base(), path)
}

/// CSRF token required by every mutating request (`X-CSRFToken` header)
pub fn csrf_token() -> Option<String> {
    let document = web_sys::window()?.document()?;
    let cookies = document
        .dyn_into::<web_sys::HtmlDocument>()
        .ok()?
        .cookie()
        .ok()?;
    cookie_value(&cookies, "csrftoken")
}

/// Find `name` in a `document.cookie` string
pub fn cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
}
