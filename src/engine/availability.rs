use chrono::NaiveDate;

use crate::index::DateIndex;
use crate::model::*;

use super::{EngineError, Rejection};

pub fn validate_capacity(units: i64) -> Result<u32, EngineError> {
    if units < 0 {
        return Err(EngineError::InvalidArgument("capacity must not be negative"));
    }
    u32::try_from(units).map_err(|_| EngineError::LimitExceeded("capacity too large"))
}

/// Baseline capacity and per-night remaining units for one category.
#[derive(Debug, Clone, Default)]
pub struct CategoryState {
    /// `None` until a capacity source has set it.
    baseline: Option<u32>,
    nights: DateIndex,
}

/// Outcome of the check phase: the remaining units observed for each night.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPlan {
    pub stay: Stay,
    observed: Vec<(NaiveDate, u32)>,
}

impl CategoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Negative counts are refused and leave the current baseline in place.
    pub fn set_capacity(&mut self, units: i64) -> Result<u32, EngineError> {
        let units = validate_capacity(units)?;
        self.set_baseline(units);
        Ok(units)
    }

    pub(super) fn set_baseline(&mut self, units: u32) {
        self.baseline = Some(units);
    }

    pub fn capacity(&self) -> Option<u32> {
        self.baseline
    }

    /// Stored remaining units, or the baseline for a night nobody booked yet.
    pub fn check_availability(&self, date: NaiveDate) -> u32 {
        match self.nights.get(&date) {
            Some(&remaining) => remaining,
            None => self.baseline.unwrap_or(0),
        }
    }

    /// Check phase. Reads every night in `[start, end)` and writes nothing.
    pub fn plan(&self, start: NaiveDate, end: NaiveDate) -> Result<BookingPlan, Rejection> {
        if start == end {
            return Err(Rejection::ZeroNights);
        }
        if start > end {
            return Err(Rejection::InvertedRange);
        }
        let stay = Stay::new(start, end);
        let mut observed = Vec::with_capacity(stay.num_nights() as usize);
        for night in stay.nights() {
            let remaining = self.check_availability(night);
            if remaining == 0 {
                return Err(Rejection::SoldOut(night));
            }
            observed.push((night, remaining));
        }
        Ok(BookingPlan { stay, observed })
    }

    /// Commit phase. Every night in the plan was seen with at least one unit.
    pub fn commit(&mut self, plan: BookingPlan) -> Stay {
        for (night, remaining) in plan.observed {
            debug_assert!(remaining >= 1);
            self.nights.put(night, remaining - 1);
        }
        debug_assert!(
            self.nights.check_invariants().is_ok(),
            "night index corrupted: {:?}",
            self.nights.check_invariants()
        );
        plan.stay
    }

    pub fn create_booking(&mut self, start: NaiveDate, end: NaiveDate) -> Result<Stay, Rejection> {
        let plan = self.plan(start, end)?;
        Ok(self.commit(plan))
    }

    /// Distinct nights ever booked, not the number of bookings.
    pub fn num_bookings(&self) -> usize {
        self.nights.len()
    }

    pub fn nights(&self) -> Vec<(NaiveDate, u32)> {
        self.nights.iter().map(|(d, n)| (*d, *n)).collect()
    }

    /// Overwrite stored nights from a compaction snapshot.
    pub(super) fn restore_nights(&mut self, nights: &[(NaiveDate, u32)]) {
        for &(night, remaining) in nights {
            self.nights.put(night, remaining);
        }
    }
}

/// Capacity table plus one night index per category.
#[derive(Debug, Clone, Default)]
pub struct Availability {
    categories: CategoryTable<CategoryState>,
}

impl Availability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_capacity(&mut self, category: Category, units: i64) -> Result<u32, EngineError> {
        self.categories[category].set_capacity(units)
    }

    pub fn capacity(&self, category: Category) -> Option<u32> {
        self.categories[category].capacity()
    }

    pub fn check_availability(&self, category: Category, date: NaiveDate) -> u32 {
        self.categories[category].check_availability(date)
    }

    /// Book every night in `[start, end)` or none of them.
    pub fn create_booking(
        &mut self,
        category: Category,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Stay, Rejection> {
        self.categories[category].create_booking(start, end)
    }

    pub fn num_bookings(&self, category: Category) -> usize {
        self.categories[category].num_bookings()
    }

    pub fn nights(&self, category: Category) -> Vec<(NaiveDate, u32)> {
        self.categories[category].nights()
    }

    /// Apply one WAL event during replay. Returns the report record it carries, if any.
    pub fn apply(&mut self, event: &Event) -> Result<Option<BookingRecord>, EngineError> {
        match event {
            Event::CapacitySet { category, units } => {
                self.set_capacity(*category, i64::from(*units))?;
                Ok(None)
            }
            Event::StayBooked {
                category,
                stay,
                holder,
                ..
            } => {
                self.create_booking(*category, stay.start, stay.end)?;
                Ok(holder
                    .as_ref()
                    .map(|h| BookingRecord::new(stay.start, h.name.clone(), h.contact.clone())))
            }
            Event::NightsRestored { category, nights } => {
                self.categories[*category].restore_nights(nights);
                Ok(None)
            }
            Event::RecordRestored { record } => Ok(Some(record.clone())),
            Event::Compacted => Ok(None),
        }
    }

    pub fn into_parts(self) -> CategoryTable<CategoryState> {
        self.categories
    }
}
