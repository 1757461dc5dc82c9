//! Page-size selection for source pagination.

const DEF_LIMIT: u64 = 100;
const MAX_LIMIT: u64 = 1_000_000;

/// Pick a page size from the total number of rows.
///
/// Larger totals get proportionally larger pages to bound the number of
/// round trips against the source. The returned limit is always greater
/// than zero, so a pagination loop over it always terminates.
pub fn page_limit(total: u64) -> u64 {
    match total {
        0..=1_000 => DEF_LIMIT,
        1_001..=10_000 => 1_000,
        10_001..=100_000 => 10_000,
        100_001..=1_000_000 => 100_000,
        _ => MAX_LIMIT,
    }
}
