use std::time::Instant;

use chrono::NaiveDate;
use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::*;

use super::{validate_capacity, Engine, EngineError, WalCommand};

impl Engine {
    /// Set the baseline for a category. Refused values are never persisted.
    pub async fn set_capacity(&self, category: Category, units: i64) -> Result<u32, EngineError> {
        let units = validate_capacity(units)?;
        let rs = self.category(category);
        let mut guard = rs.write().await;

        let event = Event::CapacitySet { category, units };
        self.wal_append(&event).await?;
        guard.set_baseline(units);

        metrics::gauge!(CAPACITY_UNITS, "category" => category.as_str()).set(f64::from(units));
        info!(%category, units, "capacity set");
        self.notify.send(&event);
        Ok(units)
    }

    /// Book every night in `[start, end)` for `category`, or nothing at all.
    ///
    /// The category's write lock is held from the availability check through
    /// the commit, so two stays can never both claim the last unit of a night.
    /// A rejection comes back as `EngineError::Rejected` and writes nothing.
    pub async fn book_stay(
        &self,
        category: Category,
        start: NaiveDate,
        end: NaiveDate,
        holder: Option<Holder>,
    ) -> Result<Ulid, EngineError> {
        let started = Instant::now();
        let result = self.try_book_stay(category, start, end, holder).await;
        metrics::counter!(
            BOOKINGS_TOTAL,
            "category" => category.as_str(),
            "outcome" => outcome_label(&result)
        )
        .increment(1);
        metrics::histogram!(BOOKING_DURATION_SECONDS, "category" => category.as_str())
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn try_book_stay(
        &self,
        category: Category,
        start: NaiveDate,
        end: NaiveDate,
        holder: Option<Holder>,
    ) -> Result<Ulid, EngineError> {
        if let Some(h) = &holder {
            if h.name.len() > MAX_HOLDER_NAME_LEN {
                return Err(EngineError::LimitExceeded("holder name too long"));
            }
            if h.contact.len() > MAX_CONTACT_LEN {
                return Err(EngineError::LimitExceeded("contact too long"));
            }
        }
        if end.signed_duration_since(start).num_days() > MAX_STAY_NIGHTS {
            return Err(EngineError::LimitExceeded("stay too long"));
        }

        let rs = self.category(category);
        let mut guard = rs.write().await;

        // Phase 1: every night must have a unit left.
        let plan = guard.plan(start, end).inspect_err(|r| {
            debug!(%category, %start, %end, "booking rejected: {r}");
        })?;

        let id = Ulid::new();
        let record = holder
            .as_ref()
            .map(|h| BookingRecord::new(start, h.name.clone(), h.contact.clone()));
        let event = Event::StayBooked {
            id,
            category,
            stay: plan.stay,
            holder,
        };
        self.wal_append(&event).await?;

        // Phase 2: cannot fail once the plan exists.
        let stay = guard.commit(plan);
        if let Some(record) = record {
            self.ledger.write().await.insert_and_resort(record);
        }
        let indexed = guard.num_bookings();
        drop(guard);

        metrics::counter!(NIGHTS_BOOKED_TOTAL, "category" => category.as_str())
            .increment(stay.num_nights() as u64);
        metrics::gauge!(INDEXED_NIGHTS, "category" => category.as_str()).set(indexed as f64);
        info!(%id, %category, start = %stay.start, end = %stay.end, "stay booked");
        self.notify.send(&event);
        Ok(id)
    }

    /// Rewrite the WAL as the minimal event list that rebuilds the current state.
    pub async fn compact_wal(&self) -> Result<(), EngineError> {
        // Read guards on every category (then the ledger) keep bookings out
        // until the compacted file has replaced the log.
        let mut guards = Vec::with_capacity(Category::COUNT);
        for (_, rs) in self.categories().iter() {
            guards.push(rs.read().await);
        }
        let ledger = self.ledger.read().await;

        let mut events = Vec::new();
        for (category, guard) in Category::ALL.into_iter().zip(&guards) {
            if let Some(units) = guard.capacity() {
                events.push(Event::CapacitySet { category, units });
            }
            let nights = guard.nights();
            if !nights.is_empty() {
                events.push(Event::NightsRestored { category, nights });
            }
        }
        events.extend(
            ledger
                .records()
                .iter()
                .cloned()
                .map(|record| Event::RecordRestored { record }),
        );
        events.push(Event::Compacted);

        let count = events.len();
        self.send_wal_command(|response| WalCommand::Compact { events, response })
            .await?
            .map_err(|e| EngineError::WalError(e.to_string()))?;

        metrics::counter!(WAL_COMPACTIONS_TOTAL).increment(1);
        info!("WAL compacted to {count} events");
        Ok(())
    }

    /// Compact once the log has grown by `threshold` appends. Returns whether it ran.
    pub async fn compact_if_due(&self, threshold: u64) -> Result<bool, EngineError> {
        if self.wal_appends_since_compact().await < threshold {
            return Ok(false);
        }
        self.compact_wal().await?;
        Ok(true)
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        self.send_wal_command(|response| WalCommand::AppendsSinceCompact { response })
            .await
            .unwrap_or(0)
    }
}
