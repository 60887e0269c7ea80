use std::cmp::Ordering;

use crate::model::DocumentItem;

/// Case-insensitive substring filter over an already loaded listing.
/// Blank input keeps every item.
pub fn filter_items<'a>(items: &'a [DocumentItem], text: &str) -> Vec<&'a DocumentItem> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| matches_text(item, &needle))
        .collect()
}

fn matches_text(item: &DocumentItem, needle: &str) -> bool {
    if item.name().to_lowercase().contains(needle) {
        return true;
    }
    match item {
        DocumentItem::NoteAttachment(note) => note
            .subject
            .as_deref()
            .map(|subject| subject.to_lowercase().contains(needle))
            .unwrap_or(false),
        DocumentItem::RemoteDocument(_) => false,
    }
}

/// Folders first, then names in case-insensitive ascending order.
pub fn sort_folders_first(items: &mut [DocumentItem]) {
    items.sort_by(compare_folders_first);
}

fn compare_folders_first(a: &DocumentItem, b: &DocumentItem) -> Ordering {
    b.is_folder()
        .cmp(&a.is_folder())
        .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
}
