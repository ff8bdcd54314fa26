use crate::model::BookingRecord;

/// Stable bottom-up merge sort.
///
/// Merges adjacent runs of width 1, 2, 4, ... until one run covers the whole
/// slice. On equal keys the element from the left run goes first, so records
/// with the same key keep their relative order. The scratch buffer lives only
/// for the duration of the call.
pub fn merge_sort_by_key<T, K, F>(items: &mut [T], key: F)
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    let n = items.len();
    if n < 2 {
        return;
    }
    let mut aux: Vec<T> = Vec::with_capacity(n);

    let mut width = 1;
    while width < n {
        let mut lo = 0;
        while lo < n - width {
            let mid = lo + width;
            let hi = (lo + 2 * width).min(n);
            merge(items, lo, mid, hi, &mut aux, &key);
            lo += 2 * width;
        }
        width *= 2;
    }
}

/// Merge the sorted runs `items[lo..mid]` and `items[mid..hi]`.
fn merge<T, K, F>(items: &mut [T], lo: usize, mid: usize, hi: usize, aux: &mut Vec<T>, key: &F)
where
    T: Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    aux.clear();
    aux.extend_from_slice(&items[lo..hi]);

    let (left, right) = aux.split_at(mid - lo);
    let (mut i, mut j) = (0, 0);
    for slot in &mut items[lo..hi] {
        let take_right = if i == left.len() {
            true
        } else if j == right.len() {
            false
        } else {
            // strict: ties stay with the left run
            key(&right[j]) < key(&left[i])
        };
        if take_right {
            *slot = right[j].clone();
            j += 1;
        } else {
            *slot = left[i].clone();
            i += 1;
        }
    }
}

/// Booking records kept in ascending date order for reporting.
#[derive(Debug, Clone, Default)]
pub struct BookingLedger {
    records: Vec<BookingRecord>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record`, then re-sort the whole sequence. O(n log n) per call.
    pub fn insert_and_resort(&mut self, record: BookingRecord) {
        self.records.push(record);
        merge_sort_by_key(&mut self.records, |r| r.date);
    }

    /// Bulk append with a single sort afterwards.
    pub fn restore(&mut self, records: impl IntoIterator<Item = BookingRecord>) {
        self.records.extend(records);
        merge_sort_by_key(&mut self.records, |r| r.date);
    }

    pub fn records(&self) -> &[BookingRecord] {
        &self.records
    }

    pub fn to_ordered_vec(&self) -> Vec<BookingRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
