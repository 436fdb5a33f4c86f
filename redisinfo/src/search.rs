/// Keep the keys containing `term`, ignoring case. An empty term keeps all keys.
pub fn filter_keys<'a, S: AsRef<str>>(keys: &'a [S], term: &str) -> Vec<&'a str> {
    let needle = term.to_lowercase();
    keys.iter()
        .map(AsRef::<str>::as_ref)
        .filter(|key| needle.is_empty() || key.to_lowercase().contains(&needle))
        .collect()
}

/// A 1-based page cut out of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T: Clone> Page<T> {
    /// Slice page `page` (1-based) of `per_page` items. Pages past the end are empty.
    pub fn of(items: &[T], page: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let page = page.max(1);
        let total_items = items.len();
        let total_pages = total_items.div_ceil(per_page);

        let start = (page - 1).saturating_mul(per_page).min(total_items);
        let end = start.saturating_add(per_page).min(total_items);

        Self {
            items: items[start..end].to_vec(),
            page,
            total_pages,
            total_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_case_insensitive() {
        let keys = vec!["sample:Hash", "user:1", "SAMPLE:list"];
        assert_eq!(filter_keys(&keys, "sample"), vec!["sample:Hash", "SAMPLE:list"]);
        assert_eq!(filter_keys(&keys, "HASH"), vec!["sample:Hash"]);
        assert_eq!(filter_keys(&keys, "").len(), 3);
        assert!(filter_keys(&keys, "missing").is_empty());
    }

    #[test]
    fn test_pages() {
        let items: Vec<u32> = (1..=25).collect();

        let first = Page::of(&items, 1, 10);
        assert_eq!(first.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_items, 25);

        let last = Page::of(&items, 3, 10);
        assert_eq!(last.items, (21..=25).collect::<Vec<_>>());

        assert!(Page::of(&items, 4, 10).items.is_empty());
    }

    #[test]
    fn test_empty_list() {
        let items: Vec<u32> = Vec::new();
        let page = Page::of(&items, 1, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
    }
}
