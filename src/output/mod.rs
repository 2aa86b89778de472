// Output formatting for the command line.

use std::borrow::Cow;

pub mod terminal;

/// Fit `text` into a column `width` characters wide.
///
/// Text that is too long is cut on a character boundary and ends in "…", so
/// the result (ellipsis included) never exceeds `width` characters.
pub fn fit_width(text: &str, width: usize) -> Cow<'_, str> {
    if text.chars().count() <= width {
        return Cow::Borrowed(text);
    }
    if width == 0 {
        return Cow::Borrowed("");
    }
    let kept: String = text.chars().take(width - 1).collect();
    Cow::Owned(format!("{kept}…"))
}
