//! Typing-time mask for the quantity-delivered input.
//!
//! Display-level only: it keeps the text parseable, business validation
//! happens when the row loses focus.

/// Keep digits, a single leading minus sign and a single decimal point.
///
/// ```rust,ignore
/// assert_eq!(sanitize_quantity_input("-1.2.3"), "-1.23");
/// assert_eq!(sanitize_quantity_input("4-5"), "45");
/// ```
pub fn sanitize_quantity_input(raw: &str) -> String {
    let negative = raw.starts_with('-');

    let mut out = String::with_capacity(raw.len());
    if negative {
        out.push('-');
    }

    let mut seen_point = false;
    for c in raw.chars() {
        match c {
            '0'..='9' => out.push(c),
            '.' if !seen_point => {
                seen_point = true;
                out.push('.');
            }
            _ => {}
        }
    }
    out
}
