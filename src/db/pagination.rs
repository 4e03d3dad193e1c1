pub const PER_PAGE: u32 = 5;

/// One page of a listing plus what the page-link bar needs.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Entry in the page-link bar. `number == None` is a gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub number: Option<u32>,
    pub current: bool,
}

/// Parse a `?page=` value. Missing, garbage and zero all mean the first page.
pub fn page_number(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|&n| n >= 1)
        .unwrap_or(1)
}

/// Row offset for a 1-based page number.
pub fn offset(page: u32, per_page: u32) -> i64 {
    i64::from(page.saturating_sub(1)) * i64::from(per_page)
}

impl<T> Page<T> {
    pub fn pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        ((self.total + per_page - 1) / per_page) as u32
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages()
    }

    pub fn prev_num(&self) -> u32 {
        self.page.saturating_sub(1).max(1)
    }

    pub fn next_num(&self) -> u32 {
        self.page + 1
    }

    /// Page numbers to show: one at each edge plus the pages directly before
    /// and after the current one, with `None` wherever numbers were skipped.
    /// `RIGHT_CURRENT` is exclusive, so 2 means one page after.
    pub fn iter_pages(&self) -> Vec<Option<u32>> {
        const LEFT_EDGE: u32 = 1;
        const LEFT_CURRENT: u32 = 1;
        const RIGHT_CURRENT: u32 = 2;
        const RIGHT_EDGE: u32 = 1;

        let pages = self.pages();
        let mut out = Vec::new();
        let mut last = 0;
        for num in 1..=pages {
            let near_current =
                num + LEFT_CURRENT + 1 > self.page && num < self.page + RIGHT_CURRENT;
            if num <= LEFT_EDGE || near_current || num + RIGHT_EDGE > pages {
                if last + 1 != num {
                    out.push(None);
                }
                out.push(Some(num));
                last = num;
            }
        }
        out
    }

    pub fn links(&self) -> Vec<PageLink> {
        self.iter_pages()
            .into_iter()
            .map(|number| PageLink {
                number,
                current: number == Some(self.page),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, total: i64) -> Page<()> {
        Page {
            items: Vec::new(),
            page,
            per_page: PER_PAGE,
            total,
        }
    }

    #[test]
    fn page_number_defaults_to_one() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some("")), 1);
        assert_eq!(page_number(Some("abc")), 1);
        assert_eq!(page_number(Some("0")), 1);
        assert_eq!(page_number(Some("-3")), 1);
        assert_eq!(page_number(Some("4")), 4);
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(offset(1, 5), 0);
        assert_eq!(offset(3, 5), 10);
    }

    #[test]
    fn pages_rounds_up() {
        assert_eq!(page(1, 0).pages(), 0);
        assert_eq!(page(1, 5).pages(), 1);
        assert_eq!(page(1, 12).pages(), 3);
    }

    #[test]
    fn prev_and_next_flags() {
        assert!(!page(1, 12).has_prev());
        assert!(page(1, 12).has_next());
        assert!(page(3, 12).has_prev());
        assert!(!page(3, 12).has_next());
        assert!(!page(4, 12).has_next());
    }

    #[test]
    fn iter_pages_small_listing_shows_everything() {
        assert_eq!(page(1, 12).iter_pages(), vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn iter_pages_marks_gaps() {
        // 10 pages, on page 5: 1 … 4 5 6 … 10
        let p = page(5, 50);
        assert_eq!(
            p.iter_pages(),
            vec![Some(1), None, Some(4), Some(5), Some(6), None, Some(10)]
        );
    }

    #[test]
    fn iter_pages_at_start() {
        let p = page(1, 50);
        assert_eq!(p.iter_pages(), vec![Some(1), Some(2), None, Some(10)]);
    }

    #[test]
    fn links_flag_the_current_page() {
        let links = page(2, 12).links();
        assert_eq!(links.len(), 3);
        assert!(links[1].current);
        assert!(!links[0].current);
    }
}
