use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Kind of interchangeable bookable unit. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Double,
    Twin,
    Queen,
    King,
}

impl Category {
    pub const COUNT: usize = 4;
    pub const ALL: [Category; Category::COUNT] =
        [Category::Double, Category::Twin, Category::Queen, Category::King];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Double => "double",
            Category::Twin => "twin",
            Category::Queen => "queen",
            Category::King => "king",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Fixed-size table with one slot per category, indexed by the variant itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTable<T> {
    slots: [T; Category::COUNT],
}

impl<T> CategoryTable<T> {
    pub fn from_fn(f: impl FnMut(Category) -> T) -> Self {
        Self {
            slots: Category::ALL.map(f),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CategoryTable<U> {
        CategoryTable {
            slots: self.slots.map(f),
        }
    }
}

impl<T> Index<Category> for CategoryTable<T> {
    type Output = T;

    fn index(&self, category: Category) -> &T {
        &self.slots[category as usize]
    }
}

impl<T> IndexMut<Category> for CategoryTable<T> {
    fn index_mut(&mut self, category: Category) -> &mut T {
        &mut self.slots[category as usize]
    }
}

/// Half-open range of nights `[start, end)`. The end date is the check-out day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stay {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Stay {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start < end, "Stay must cover at least one night");
        Self { start, end }
    }

    pub fn num_nights(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_days()
    }

    pub fn nights(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// Who a stay is booked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    pub name: String,
    pub contact: String,
}

impl Holder {
    pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
        }
    }
}

/// One line of the booking report. Ordered by `date` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub date: NaiveDate,
    pub name: String,
    pub contact: String,
}

impl BookingRecord {
    pub fn new(date: NaiveDate, name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
            contact: contact.into(),
        }
    }
}

/// The WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    CapacitySet {
        category: Category,
        units: u32,
    },
    StayBooked {
        id: Ulid,
        category: Category,
        stay: Stay,
        holder: Option<Holder>,
    },
    /// Compaction snapshot of a category's index, in date order.
    NightsRestored {
        category: Category,
        nights: Vec<(NaiveDate, u32)>,
    },
    /// Compaction snapshot of one report record.
    RecordRestored {
        record: BookingRecord,
    },
    /// Last entry of a compaction snapshot.
    Compacted,
}

impl Event {
    pub fn category(&self) -> Option<Category> {
        match self {
            Event::CapacitySet { category, .. }
            | Event::StayBooked { category, .. }
            | Event::NightsRestored { category, .. } => Some(*category),
            Event::RecordRestored { .. } | Event::Compacted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn stay_nights_exclude_checkout() {
        let stay = Stay::new(d("2022-06-29"), d("2022-07-02"));
        let nights: Vec<_> = stay.nights().collect();
        assert_eq!(nights, vec![d("2022-06-29"), d("2022-06-30"), d("2022-07-01")]);
        assert_eq!(stay.num_nights(), 3);
        assert!(stay.contains(d("2022-07-01")));
        assert!(!stay.contains(d("2022-07-02"))); // half-open
    }

    #[test]
    fn stay_across_year_boundary() {
        let stay = Stay::new(d("2023-12-30"), d("2024-01-02"));
        assert_eq!(stay.nights().count(), 3);
        assert_eq!(stay.nights().last(), Some(d("2024-01-01")));
    }

    #[test]
    fn category_parse_and_display() {
        for c in Category::ALL {
            assert_eq!(c.to_string().parse::<Category>().unwrap(), c);
        }
        assert_eq!("KING".parse::<Category>().unwrap(), Category::King);
        let err = "suite".parse::<Category>().unwrap_err();
        assert_eq!(err.to_string(), "unknown category: suite");
    }

    #[test]
    fn category_table_indexed_by_variant() {
        let mut table: CategoryTable<u32> = CategoryTable::default();
        table[Category::Queen] = 5;
        table[Category::Twin] += 3;
        assert_eq!(table[Category::Double], 0);
        assert_eq!(table[Category::Twin], 3);
        assert_eq!(table[Category::Queen], 5);

        let seen: Vec<_> = table.iter().map(|(c, v)| (c, *v)).collect();
        assert_eq!(seen[1], (Category::Twin, 3));
        assert_eq!(seen.len(), Category::COUNT);
    }

    #[test]
    fn category_table_from_fn_and_map() {
        let table = CategoryTable::from_fn(|c| c.as_str().len());
        assert_eq!(table[Category::Double], 6);
        let doubled = table.map(|n| n * 2);
        assert_eq!(doubled[Category::King], 8);
    }

    #[test]
    fn event_category() {
        let e = Event::CapacitySet {
            category: Category::Twin,
            units: 3,
        };
        assert_eq!(e.category(), Some(Category::Twin));
        let r = Event::RecordRestored {
            record: BookingRecord::new(d("2022-06-13"), "Ada", "555-0100"),
        };
        assert_eq!(r.category(), None);
        assert_eq!(Event::Compacted.category(), None);
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::StayBooked {
            id: Ulid::new(),
            category: Category::Double,
            stay: Stay::new(d("2022-06-13"), d("2022-06-18")),
            holder: Some(Holder::new("Ada", "555-0100")),
        };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
