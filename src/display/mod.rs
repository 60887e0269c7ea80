use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::model::DocumentItem;

const BYTES_PER_MB: f64 = 1_048_576.0;
const LEADING_GRAPHEMES: usize = 9;
const TRAILING_GRAPHEMES: usize = 3;

pub const DEFAULT_NAME_WIDTH: usize = 19;
pub const DEFAULT_SIZE_PRECISION: usize = 2;

/// Sizes are always shown in megabytes, e.g. `0.50 MB`.
pub fn format_file_size(size_bytes: u64, precision: usize) -> String {
    let megabytes = size_bytes as f64 / BYTES_PER_MB;
    format!("{megabytes:.precision$} MB")
}

/// Lowercased text after the last dot, if any.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Shortens long names to `start...end.ext`, keeping the extension readable.
/// Names shorter than `max_len` graphemes are returned unchanged.
pub fn middle_ellipsis(name: &str, max_len: usize) -> String {
    let total = name.graphemes(true).count();
    if total < max_len {
        return name.to_string();
    }

    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let graphemes: Vec<&str> = stem.graphemes(true).collect();
    let start: String = graphemes.iter().take(LEADING_GRAPHEMES).copied().collect();
    let tail_from = graphemes.len().saturating_sub(TRAILING_GRAPHEMES);
    let end: String = graphemes[tail_from..].concat();

    match extension {
        Some(ext) => format!("{start}...{end}.{ext}"),
        None => format!("{start}...{end}"),
    }
}

/// Right-pads to a terminal column width, truncating with the ellipsis first.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let shown = middle_ellipsis(text, width.max(LEADING_GRAPHEMES + TRAILING_GRAPHEMES + 4));
    let used = UnicodeWidthStr::width(shown.as_str());
    if used >= width {
        return shown;
    }
    format!("{shown}{}", " ".repeat(width - used))
}

/// One listing row as printed by the command line front end.
pub fn listing_row(item: &DocumentItem, name_width: usize, precision: usize) -> String {
    let marker = if item.is_folder() { "d" } else { "-" };
    let size = if item.is_folder() {
        String::from("-")
    } else {
        format_file_size(item.size_bytes(), precision)
    };
    format!(
        "{marker} {} {size:>12}  {}",
        pad_to_width(item.name(), name_width),
        item.id()
    )
}
