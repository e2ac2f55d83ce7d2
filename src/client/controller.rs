//! Client-side filter state for one browsing session.
//!
//! `FilterController` is a plain state machine: every input returns the
//! [`Effect`] the driver must perform (arm the debounce timer, issue a fetch,
//! or nothing). Timing and I/O live in [`super::runtime`].
//!
//! Phases: `Idle` -> `Pending` on any criteria change, `Pending` -> `Pending`
//! on further changes (timer re-armed), `Pending` -> `Fetching` when the
//! debounce window elapses, `Fetching` -> `Idle` when the current request
//! completes. Every fetch carries a sequence number; a completion is applied
//! only if it belongs to the request in flight, and any criteria change
//! invalidates that request.

use tracing::{debug, warn};

use super::fetcher::FetchError;
use super::filters::{self, FilterKind, QuickFilter};
use crate::catalog::criteria::{FilterCriteria, SortKey, SortOrder};
use crate::catalog::range::{RangeBound, RangeFilter, RangeValue};
use crate::catalog::FilterBoundsSnapshot;
use crate::models::ResultPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
    Fetching { seq: u64 },
}

/// A change to exactly one criteria field.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterEdit {
    Search(Option<String>),
    Brand(Option<String>),
    Price(RangeFilter<f64>),
    Year(RangeFilter<i32>),
    Mileage(RangeFilter<i64>),
    Fuel(Option<String>),
    Transmission(Option<String>),
    FeaturedOnly(bool),
    Sort(SortKey, SortOrder),
    PageSize(u32),
}

impl FilterEdit {
    fn apply(self, criteria: &mut FilterCriteria) {
        match self {
            FilterEdit::Search(v) => criteria.search = normalize(v),
            FilterEdit::Brand(v) => criteria.brand = normalize(v),
            FilterEdit::Price(r) => criteria.price = RangeFilter::new(r.min, r.max),
            FilterEdit::Year(r) => criteria.year = RangeFilter::new(r.min, r.max),
            FilterEdit::Mileage(r) => criteria.mileage = RangeFilter::new(r.min, r.max),
            FilterEdit::Fuel(v) => criteria.fuel = normalize(v),
            FilterEdit::Transmission(v) => criteria.transmission = normalize(v),
            FilterEdit::FeaturedOnly(v) => criteria.featured_only = v,
            FilterEdit::Sort(key, order) => {
                criteria.sort_by = key;
                criteria.sort_order = order;
            }
            FilterEdit::PageSize(size) => criteria.page_size = size.max(1),
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub seq: u64,
    pub criteria: FilterCriteria,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// (Re)arm the debounce timer. Anything in flight is superseded.
    Debounce,
    /// Issue this request now. Anything in flight is superseded.
    Fetch(FetchRequest),
    Nothing,
}

/// What the last completed fetch means for the user. Zero matches and failure
/// are kept apart so only the former suggests adjusting filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    NotLoaded,
    Matches,
    NoMatches,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Discarded,
}

/// Render-facing copy of the controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub criteria: FilterCriteria,
    pub bounds: FilterBoundsSnapshot,
    pub phase: Phase,
    /// Last successfully applied page; kept through failures.
    pub results: Option<ResultPage>,
    pub outcome: Outcome,
    pub active_filters: usize,
}

impl ViewState {
    pub fn is_loading(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }
}

#[derive(Debug, Clone)]
pub struct FilterController {
    criteria: FilterCriteria,
    bounds: FilterBoundsSnapshot,
    page_size: u32,
    phase: Phase,
    next_seq: u64,
    in_flight: Option<u64>,
    results: Option<ResultPage>,
    outcome: Outcome,
}

impl FilterController {
    pub fn new(bounds: FilterBoundsSnapshot, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        FilterController {
            criteria: cleared(page_size),
            bounds,
            page_size,
            phase: Phase::Idle,
            next_seq: 1,
            in_flight: None,
            results: None,
            outcome: Outcome::NotLoaded,
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn bounds(&self) -> &FilterBoundsSnapshot {
        &self.bounds
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            criteria: self.criteria.clone(),
            bounds: self.bounds.clone(),
            phase: self.phase,
            results: self.results.clone(),
            outcome: self.outcome.clone(),
            active_filters: filters::active_filters(&self.criteria, &self.bounds).len(),
        }
    }

    /// Initial page load; no debounce.
    pub fn load(&mut self) -> Effect {
        self.issue()
    }

    /// Applies a field change. Resets to page 1 and supersedes any fetch in flight.
    pub fn edit(&mut self, edit: FilterEdit) -> Effect {
        let mut next = self.criteria.clone();
        edit.apply(&mut next);
        open_default_ends(&mut next, &self.bounds);
        next.page = 1;
        if next == self.criteria {
            return Effect::Nothing;
        }
        self.criteria = next;
        if let Some(seq) = self.in_flight.take() {
            debug!(seq, "Criteria changed while fetching, request superseded");
        }
        self.phase = Phase::Pending;
        Effect::Debounce
    }

    pub fn apply_quick_filter(&mut self, quick: QuickFilter, current_year: i32) -> Effect {
        let edit = quick.edit(&self.criteria, &self.bounds, current_year);
        self.edit(edit)
    }

    pub fn remove_filter(&mut self, kind: FilterKind) -> Effect {
        let edit = filters::removal(kind);
        self.edit(edit)
    }

    /// The debounce window closed with no further changes.
    pub fn debounce_elapsed(&mut self) -> Effect {
        match self.phase {
            Phase::Pending => self.issue(),
            // a stale timer from before an immediate fetch
            _ => Effect::Nothing,
        }
    }

    /// Page changes keep every other field and skip the debounce window.
    pub fn set_page(&mut self, page: u32) -> Effect {
        self.criteria.page = page.max(1);
        self.issue()
    }

    /// Resets every field (ranges to the full live range) and fetches at once.
    pub fn clear_all(&mut self) -> Effect {
        self.criteria = cleared(self.page_size);
        self.issue()
    }

    /// Re-issues the current criteria after a failure.
    pub fn retry(&mut self) -> Effect {
        self.issue()
    }

    /// Installs a fresh bounds snapshot. Open range ends keep following the
    /// live bounds; narrowed ends are kept unless they now equal the new bound.
    pub fn update_bounds(&mut self, bounds: FilterBoundsSnapshot) {
        open_default_ends(&mut self.criteria, &bounds);
        self.bounds = bounds;
    }

    /// Delivers the result of request `seq`.
    pub fn complete(&mut self, seq: u64, result: Result<ResultPage, FetchError>) -> Completion {
        if self.in_flight != Some(seq) {
            warn!(seq, in_flight = ?self.in_flight, "Discarding stale catalog response");
            return Completion::Discarded;
        }
        self.in_flight = None;
        self.phase = Phase::Idle;
        match result {
            Ok(page) => {
                self.outcome = if page.is_empty() { Outcome::NoMatches } else { Outcome::Matches };
                debug!(seq, total = page.pagination.total, "Applied catalog response");
                self.results = Some(page);
            }
            Err(e) => {
                warn!(seq, error = %e, "Catalog fetch failed, keeping previous results");
                self.outcome = Outcome::Failed(e.to_string());
            }
        }
        Completion::Applied
    }

    fn issue(&mut self) -> Effect {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight = Some(seq);
        self.phase = Phase::Fetching { seq };
        debug!(seq, criteria = ?self.criteria, "Issuing catalog fetch");
        Effect::Fetch(FetchRequest { seq, criteria: self.criteria.clone() })
    }
}

// Every range open: the server resolves open ends against its live bounds
fn cleared(page_size: u32) -> FilterCriteria {
    FilterCriteria { page_size, ..FilterCriteria::default() }
}

// Range ends equal to the snapshot bound carry no restriction and are sent as
// absent, so they keep spanning the catalog if it widens later.
fn open_default_ends(criteria: &mut FilterCriteria, bounds: &FilterBoundsSnapshot) {
    criteria.price = open_ends(criteria.price, &bounds.price_range);
    criteria.year = open_ends(criteria.year, &bounds.year_range);
    criteria.mileage = open_ends(criteria.mileage, &bounds.mileage_range);
}

fn open_ends<T: RangeValue>(filter: RangeFilter<T>, bound: &RangeBound<T>) -> RangeFilter<T> {
    let filter = RangeFilter::new(filter.min, filter.max);
    RangeFilter {
        min: filter.min.filter(|min| *min != bound.min()),
        max: filter.max.filter(|max| *max != bound.max()),
    }
}
