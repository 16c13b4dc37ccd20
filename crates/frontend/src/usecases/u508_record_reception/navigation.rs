//! Keyboard handling for the quantity-delivered inputs.

/// What a key press on a focused quantity input means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIntent {
    /// Tab / ArrowDown: focus the next editable row
    Next,
    /// Shift+Tab / ArrowUp: focus the previous editable row
    Previous,
    /// Enter: capture the edit, then open the batch summary
    Confirm,
    /// Escape: drop the focused row's edit only
    Cancel,
    Other,
}

pub fn classify_key(key: &str, shift: bool) -> KeyIntent {
    match key {
        "ArrowDown" => KeyIntent::Next,
        "ArrowUp" => KeyIntent::Previous,
        "Tab" if shift => KeyIntent::Previous,
        "Tab" => KeyIntent::Next,
        "Enter" => KeyIntent::Confirm,
        "Escape" => KeyIntent::Cancel,
        _ => KeyIntent::Other,
    }
}

/// Index of the row to focus, `None` at either end of the table.
pub fn neighbor_index(current: usize, len: usize, intent: KeyIntent) -> Option<usize> {
    match intent {
        KeyIntent::Next if current + 1 < len => Some(current + 1),
        KeyIntent::Previous if current > 0 && current < len => Some(current - 1),
        _ => None,
    }
}
