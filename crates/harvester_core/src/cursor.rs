/// Points at the next listing page to fetch. Pages are 1-based and only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
}

impl PageCursor {
    pub fn first() -> Self {
        Self { page: 1 }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn advance(&mut self) {
        self.page = self.page.saturating_add(1);
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::first()
    }
}
