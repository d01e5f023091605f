use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PageMode {
    /// Desktop-class surfaces: everything is visible, no paging state.
    Unbounded,
    /// Constrained surfaces: a growing prefix, `page_size` at a time.
    Paged { page_size: NonZeroUsize },
}

impl PageMode {
    pub fn for_platform(constrained: bool, page_size: NonZeroUsize) -> Self {
        if constrained {
            Self::Paged { page_size }
        } else {
            Self::Unbounded
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePhase {
    #[default]
    Idle,
    Advancing,
}

/// Proof that an advance was started. Invalidated by [`Paginator::reset`],
/// so a delayed advance can never move the boundary of a newer result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceTicket {
    epoch: u64,
}

/// `Idle -> Advancing -> Idle`. At most one advance is in flight; requests
/// that arrive while advancing are dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    mode: PageMode,
    current_page: usize,
    phase: AdvancePhase,
    epoch: u64,
}

impl Paginator {
    pub fn new(mode: PageMode) -> Self {
        Self {
            mode,
            current_page: 1,
            phase: AdvancePhase::Idle,
            epoch: 0,
        }
    }

    pub fn mode(&self) -> PageMode {
        self.mode
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn phase(&self) -> AdvancePhase {
        self.phase
    }

    pub fn is_advancing(&self) -> bool {
        self.phase == AdvancePhase::Advancing
    }

    pub fn visible_len(&self, total: usize) -> usize {
        match self.mode {
            PageMode::Unbounded => total,
            PageMode::Paged { page_size } => self
                .current_page
                .saturating_mul(page_size.get())
                .min(total),
        }
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.visible_len(total) < total
    }

    /// Enters `Advancing` if there is more to show and nothing is in flight.
    pub fn begin_advance(&mut self, total: usize) -> Option<AdvanceTicket> {
        if matches!(self.mode, PageMode::Unbounded)
            || self.is_advancing()
            || !self.has_more(total)
        {
            return None;
        }
        self.phase = AdvancePhase::Advancing;
        Some(AdvanceTicket { epoch: self.epoch })
    }

    /// Moves the page boundary. Returns false for tickets made stale by a
    /// reset.
    pub fn finish_advance(&mut self, ticket: AdvanceTicket) -> bool {
        if ticket.epoch != self.epoch || !self.is_advancing() {
            return false;
        }
        self.current_page += 1;
        self.phase = AdvancePhase::Idle;
        true
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
        self.phase = AdvancePhase::Idle;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paged(size: usize) -> Paginator {
        Paginator::new(PageMode::Paged {
            page_size: NonZeroUsize::new(size).unwrap(),
        })
    }

    fn advance(p: &mut Paginator, total: usize) -> bool {
        match p.begin_advance(total) {
            Some(ticket) => p.finish_advance(ticket),
            None => false,
        }
    }

    #[test]
    fn grows_prefix_until_exhausted() {
        let mut p = paged(20);
        p.reset();

        let mut seen = vec![p.visible_len(45)];
        for _ in 0..3 {
            advance(&mut p, 45);
            seen.push(p.visible_len(45));
        }

        assert_eq!(seen, [20, 40, 45, 45]);
        assert!(!p.has_more(45));
        assert!(!advance(&mut p, 45));
        assert_eq!(p.current_page(), 3);
    }

    #[test]
    fn drops_advance_while_in_flight() {
        let mut p = paged(10);
        let first = p.begin_advance(100).unwrap();
        assert_eq!(p.begin_advance(100), None);
        assert!(p.finish_advance(first));
        assert_eq!(p.visible_len(100), 20);
    }

    #[test]
    fn reset_invalidates_pending_ticket() {
        let mut p = paged(10);
        assert!(advance(&mut p, 100));
        let pending = p.begin_advance(100).unwrap();

        p.reset();

        assert!(!p.finish_advance(pending));
        assert_eq!(p.current_page(), 1);
        assert_eq!(p.visible_len(100), 10);
        assert_eq!(p.phase(), AdvancePhase::Idle);
    }

    #[test]
    fn unbounded_mode_shows_everything() {
        let mut p = Paginator::new(PageMode::Unbounded);
        assert_eq!(p.visible_len(1_000), 1_000);
        assert!(!p.has_more(1_000));
        assert_eq!(p.begin_advance(1_000), None);
    }

    #[test]
    fn short_result_fits_first_page() {
        let p = paged(20);
        assert_eq!(p.visible_len(5), 5);
        assert!(!p.has_more(5));
        assert_eq!(p.visible_len(0), 0);
    }

    #[test]
    fn mode_follows_platform() {
        let size = NonZeroUsize::new(20).unwrap();
        assert_eq!(PageMode::for_platform(false, size), PageMode::Unbounded);
        assert_eq!(
            PageMode::for_platform(true, size),
            PageMode::Paged { page_size: size }
        );
    }
}
