use chrono::NaiveDate;

use crate::model::*;

use super::Engine;

impl Engine {
    pub async fn capacity(&self, category: Category) -> Option<u32> {
        self.category(category).read().await.capacity()
    }

    /// Units left on `date`. Nights never booked report the baseline (0 if unset).
    pub async fn check_availability(&self, category: Category, date: NaiveDate) -> u32 {
        self.category(category).read().await.check_availability(date)
    }

    /// Availability for every night in `[start, end)`, in date order.
    pub async fn availability_range(
        &self,
        category: Category,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<(NaiveDate, u32)> {
        if start >= end {
            return Vec::new();
        }
        let rs = self.category(category);
        let guard = rs.read().await;
        Stay::new(start, end)
            .nights()
            .map(|night| (night, guard.check_availability(night)))
            .collect()
    }

    /// Distinct nights stored for the category.
    pub async fn num_bookings(&self, category: Category) -> usize {
        self.category(category).read().await.num_bookings()
    }

    /// Stored nights and their remaining units, in date order.
    pub async fn nights(&self, category: Category) -> Vec<(NaiveDate, u32)> {
        self.category(category).read().await.nights()
    }

    /// Booking report records ordered by date. Same-date records keep booking order.
    pub async fn bookings_by_date(&self) -> Vec<BookingRecord> {
        self.ledger.read().await.to_ordered_vec()
    }
}
