use scraper::ElementRef;

use crate::error::ScrapeError;

/// Every element below `root` carrying attribute `key` with exactly `value`,
/// in document order. `root` itself is never a candidate.
///
/// Walks with an explicit stack so deep trees cannot overflow the call stack.
pub fn search<'a>(
    root: ElementRef<'a>,
    key: &str,
    value: &str,
) -> Result<Vec<ElementRef<'a>>, ScrapeError> {
    let mut found = Vec::new();
    // Children pushed in reverse so pops come out pre-order.
    let mut stack: Vec<_> = root.children().rev().collect();

    while let Some(node) = stack.pop() {
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().attr(key) == Some(value) {
                found.push(el);
            }
        }
        stack.extend(node.children().rev());
    }

    if found.is_empty() {
        return Err(ScrapeError::NotFound {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(found)
}
