use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// `page_<N>.html` -> N
fn page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("page_")?
        .strip_suffix(".html")?
        .parse()
        .ok()
}

/// Fragment files of a pages directory, keyed by page number.
pub fn scan_pages_dir(dir: &Path) -> Result<BTreeMap<u32, PathBuf>> {
    let mut pages = BTreeMap::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(n) = name.to_str().and_then(page_number) {
            pages.insert(n, entry.path());
        }
    }
    Ok(pages)
}

/// Clamps a 1-based inclusive range to `total` pages.
///
/// A missing or too large `end` means the last page.
pub fn resolve_range(start: u32, end: Option<u32>, total: u32) -> Result<(u32, u32)> {
    if total == 0 {
        bail!("no pages to process");
    }
    if start == 0 {
        bail!("start page is 1-based");
    }
    let end = match end {
        Some(e) if e != 0 && e <= total => e,
        _ => total,
    };
    if start > end {
        bail!("start page {start} is after end page {end}");
    }
    Ok((start, end))
}

/// Existing fragments within `start..=end` of a scanned directory, plus the
/// resolved range. Gaps are logged and left out.
pub fn select_pages(
    found: &BTreeMap<u32, PathBuf>,
    start: u32,
    end: Option<u32>,
) -> Result<(Vec<(u32, PathBuf)>, (u32, u32))> {
    let total = found.keys().next_back().copied().unwrap_or(0);
    let (start, end) = resolve_range(start, end, total)?;
    let mut selected = Vec::new();
    for n in start..=end {
        match found.get(&n) {
            Some(path) => selected.push((n, path.clone())),
            None => log::warn!("page {n} has no fragment"),
        }
    }
    Ok((selected, (start, end)))
}

pub fn default_output_name(name: &str, range: Option<(u32, u32)>) -> String {
    match range {
        Some((start, end)) => format!("{name}_pages_{start}_to_{end}.docx"),
        None => format!("{name}.docx"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_page_file_names() {
        assert_eq!(page_number("page_12.html"), Some(12));
        assert_eq!(page_number("page_.html"), None);
        assert_eq!(page_number("page_3.jpg"), None);
        assert_eq!(page_number("cover.html"), None);
    }

    #[test]
    fn end_clamps_to_total() {
        assert_eq!(resolve_range(1, None, 10).unwrap(), (1, 10));
        assert_eq!(resolve_range(2, Some(50), 10).unwrap(), (2, 10));
        assert_eq!(resolve_range(2, Some(0), 10).unwrap(), (2, 10));
        assert_eq!(resolve_range(3, Some(4), 10).unwrap(), (3, 4));
    }

    #[test]
    fn bad_ranges_are_rejected() {
        assert!(resolve_range(0, None, 5).is_err());
        assert!(resolve_range(6, None, 5).is_err());
        assert!(resolve_range(4, Some(2), 5).is_err());
        assert!(resolve_range(1, None, 0).is_err());
    }

    #[test]
    fn output_name_mentions_range() {
        assert_eq!(
            default_output_name("book", Some((3, 7))),
            "book_pages_3_to_7.docx"
        );
        assert_eq!(default_output_name("book", None), "book.docx");
    }

    #[test]
    fn scan_keeps_only_page_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page_1.html", "page_3.html", "cover.html", "page_2.txt"] {
            std::fs::write(dir.path().join(name), "<p>x</p>").unwrap();
        }
        let found = scan_pages_dir(dir.path()).unwrap();
        assert_eq!(found.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(found[&3], dir.path().join("page_3.html"));
    }

    #[test]
    fn missing_pages_are_left_out_of_the_selection() {
        let found: BTreeMap<u32, PathBuf> = [(1, "page_1.html"), (3, "page_3.html"), (4, "page_4.html")]
            .into_iter()
            .map(|(n, p)| (n, PathBuf::from(p)))
            .collect();
        let (selected, range) = select_pages(&found, 1, None).unwrap();
        assert_eq!(range, (1, 4));
        assert_eq!(
            selected.iter().map(|(n, _)| *n).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );

        let (selected, range) = select_pages(&found, 2, Some(3)).unwrap();
        assert_eq!(range, (2, 3));
        assert_eq!(selected, vec![(3, PathBuf::from("page_3.html"))]);

        assert!(select_pages(&BTreeMap::new(), 1, None).is_err());
    }
}
