//! Paged viewer state: an ordered list of pages and a cursor.

use reactkit_core::content::Content;
use reactkit_core::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Back,
    Forward,
}

/// Pages plus a cursor that never leaves `0..pages.len()`.
#[derive(Debug, Clone)]
pub struct PagedSession {
    pages: Vec<Content>,
    cursor: usize,
    footer: bool,
}

impl PagedSession {
    pub fn new(pages: Vec<Content>, footer: bool) -> Result<Self, SessionError> {
        if pages.is_empty() {
            return Err(SessionError::EmptyPages);
        }
        Ok(Self {
            pages,
            cursor: 0,
            footer,
        })
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Move the cursor. Returns `false` at a boundary, leaving it unchanged.
    pub fn navigate(&mut self, direction: Navigation) -> bool {
        match direction {
            Navigation::Forward if self.cursor + 1 < self.pages.len() => {
                self.cursor += 1;
                true
            }
            Navigation::Back if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            _ => false,
        }
    }

    /// The page under the cursor, with a `Page i/n` footer on embeds.
    pub fn current(&self) -> Content {
        let page = &self.pages[self.cursor];
        if self.footer && self.pages.len() > 1 {
            page.with_footer(format!("Page {}/{}", self.cursor + 1, self.pages.len()))
        } else {
            page.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactkit_core::content::Embed;

    fn pages(n: usize) -> Vec<Content> {
        (1..=n).map(|i| Content::text(format!("page {i}"))).collect()
    }

    #[test]
    fn empty_pages_rejected() {
        assert!(matches!(
            PagedSession::new(vec![], true),
            Err(SessionError::EmptyPages)
        ));
    }

    #[test]
    fn boundaries_are_no_ops() {
        let mut session = PagedSession::new(pages(2), false).unwrap();
        assert!(!session.navigate(Navigation::Back));
        assert_eq!(session.cursor(), 0);

        assert!(session.navigate(Navigation::Forward));
        assert!(!session.navigate(Navigation::Forward));
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.current(), Content::text("page 2"));
    }

    #[test]
    fn cursor_stays_in_bounds_for_any_sequence() {
        // Deterministic pseudo-random walks over several page counts.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for len in 1..=6 {
            let mut session = PagedSession::new(pages(len), false).unwrap();
            for _ in 0..200 {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                let direction = if seed % 2 == 0 {
                    Navigation::Back
                } else {
                    Navigation::Forward
                };
                let before = session.cursor();
                let moved = session.navigate(direction);
                assert!(session.cursor() < len);
                assert_eq!(moved, before != session.cursor());
            }
        }
    }

    #[test]
    fn single_page_never_moves() {
        let mut session = PagedSession::new(pages(1), true).unwrap();
        assert!(!session.navigate(Navigation::Forward));
        assert!(!session.navigate(Navigation::Back));
        assert_eq!(session.current(), Content::text("page 1"));
    }

    #[test]
    fn embed_pages_get_footer() {
        let embeds = vec![
            Content::from(Embed::new("Queue").description("1. a")),
            Content::from(Embed::new("Queue").description("2. b")),
        ];
        let mut session = PagedSession::new(embeds, true).unwrap();
        session.navigate(Navigation::Forward);
        match session.current() {
            Content::Embed(e) => assert_eq!(e.footer.as_deref(), Some("Page 2/2")),
            other => panic!("Expected embed, got {other:?}"),
        }
    }
}
