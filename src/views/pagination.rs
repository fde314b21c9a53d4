//! Page-window computation for list components.
//!
//! Works over an already-fetched page of data; there is no cursor or
//! streaming logic here, only presentation math.

/// One slot in the rendered pagination strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// How many pages to show on each side of the current one.
const WINDOW_DELTA: u32 = 2;

pub fn total_pages(total_items: u64, items_per_page: u64) -> u64 {
    if items_per_page == 0 {
        return 0;
    }
    total_items.div_ceil(items_per_page)
}

/// First and last item index (1-based, inclusive) of the current page.
pub fn page_bounds(current_page: u32, items_per_page: u64, total_items: u64) -> (u64, u64) {
    if total_items == 0 || current_page == 0 {
        return (0, 0);
    }

    let start = (current_page as u64 - 1) * items_per_page + 1;
    let end = (current_page as u64 * items_per_page).min(total_items);
    (start, end)
}

/// The visible page strip: first and last page always, a window of
/// `WINDOW_DELTA` around the current page, a gap of exactly one page filled
/// with that page's number, and larger gaps collapsed to an ellipsis.
pub fn page_window(current_page: u32, total_pages: u32) -> Vec<PageItem> {
    let mut range = Vec::new();
    for page in 1..=total_pages {
        if page == 1
            || page == total_pages
            || (page + WINDOW_DELTA >= current_page && page <= current_page + WINDOW_DELTA)
        {
            range.push(page);
        }
    }

    let mut window = Vec::new();
    let mut last: Option<u32> = None;
    for page in range {
        if let Some(previous) = last {
            if page - previous == 2 {
                window.push(PageItem::Page(previous + 1));
            } else if page - previous != 1 {
                window.push(PageItem::Ellipsis);
            }
        }
        window.push(PageItem::Page(page));
        last = Some(page);
    }

    window
}

/// Results summary shown above the strip.
pub fn summary_line(current_page: u32, items_per_page: u64, total_items: u64) -> String {
    if total_pages(total_items, items_per_page) <= 1 {
        return format!("{} reviews", total_items);
    }

    let (start, end) = page_bounds(current_page, items_per_page, total_items);
    format!("Showing {}-{} of {} reviews", start, end, total_items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageItem::{Ellipsis, Page};

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(95, 20), 5);
        assert_eq!(total_pages(100, 20), 5);
        assert_eq!(total_pages(101, 20), 6);
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(95, 0), 0);
    }

    #[test]
    fn test_page_three_of_ninety_five_shows_41_to_60() {
        assert_eq!(page_bounds(3, 20, 95), (41, 60));
        assert_eq!(summary_line(3, 20, 95), "Showing 41-60 of 95 reviews");
    }

    #[test]
    fn test_last_page_clamped_to_total() {
        assert_eq!(page_bounds(5, 20, 95), (81, 95));
    }

    #[test]
    fn test_single_page_summary() {
        assert_eq!(summary_line(1, 20, 7), "7 reviews");
    }

    #[test]
    fn test_window_compresses_both_sides() {
        assert_eq!(
            page_window(10, 20),
            vec![
                Page(1),
                Ellipsis,
                Page(8),
                Page(9),
                Page(10),
                Page(11),
                Page(12),
                Ellipsis,
                Page(20),
            ]
        );
    }

    #[test]
    fn test_gap_of_one_page_is_filled_not_elided() {
        // 1 .. [2..6] .. 8: the gap between 6 and 8 is exactly page 7.
        assert_eq!(
            page_window(4, 8),
            vec![
                Page(1),
                Page(2),
                Page(3),
                Page(4),
                Page(5),
                Page(6),
                Page(7),
                Page(8),
            ]
        );
    }

    #[test]
    fn test_small_total_shows_everything() {
        assert_eq!(
            page_window(1, 4),
            vec![Page(1), Page(2), Page(3), Page(4)]
        );
    }

    #[test]
    fn test_first_page_window() {
        assert_eq!(
            page_window(1, 10),
            vec![Page(1), Page(2), Page(3), Ellipsis, Page(10)]
        );
    }
}
