//! Sibling ordering.

use std::cmp::Ordering;

/// Case-insensitive ascending comparison of element names.
///
/// Equal names compare as `Equal`; callers sort with a stable sort so that
/// same-named siblings keep their existing relative order.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}
