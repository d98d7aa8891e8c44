use crate::scm::ScmStatus;

/// Characters used to draw statuses and open/closed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSet {
    pub added: char,
    pub deleted: char,
    pub changed: char,
    pub same: char,
    pub closed: char,
    pub open: char,
    pub unknown: char,
    pub out_of_date: char,
}

impl MarkerSet {
    pub const UNICODE: MarkerSet = MarkerSet {
        added: '+',
        deleted: '✗',
        changed: '±',
        same: ' ',
        closed: '▸',
        open: '▾',
        unknown: '?',
        out_of_date: 'U',
    };

    pub const ASCII: MarkerSet = MarkerSet {
        added: '+',
        deleted: 'x',
        changed: '~',
        same: ' ',
        closed: '>',
        open: 'v',
        unknown: '?',
        out_of_date: 'U',
    };

    pub fn select(use_unicode: bool) -> Self {
        if use_unicode {
            Self::UNICODE
        } else {
            Self::ASCII
        }
    }

    pub fn status_marker(&self, status: ScmStatus) -> char {
        match status {
            ScmStatus::Added => self.added,
            ScmStatus::Modified => self.changed,
            ScmStatus::Deleted => self.deleted,
            ScmStatus::Unknown => self.unknown,
            ScmStatus::OutOfDate => self.out_of_date,
            ScmStatus::Cleared => self.same,
        }
    }

    pub fn open_marker(&self, open: bool) -> char {
        if open { self.open } else { self.closed }
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self::UNICODE
    }
}
