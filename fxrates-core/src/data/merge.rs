//! Incremental merge of freshly fetched rates into the persisted dataset.
//!
//! Persisted rows are laid down first, fetched rows on top. For a date present
//! on both sides the fetched row replaces the persisted row whole, so a
//! currency the fetched row lacks is missing on that date. Keying by date
//! alone makes the merge idempotent.

use crate::domain::RateTable;

/// Counts describing what a merge changed, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Dates present in the fetched table but not in the persisted one.
    pub new_dates: usize,
    /// Cells present on both sides whose fetched value differs.
    pub revised_values: usize,
    /// Rows in the merged table.
    pub total_rows: usize,
}

/// Merge `fetched` into `persisted`.
///
/// With no persisted table the fetched table is returned as-is.
pub fn merge_tables(persisted: Option<RateTable>, fetched: RateTable) -> RateTable {
    let Some(persisted) = persisted else {
        return fetched;
    };

    let mut merged = RateTable::with_columns(
        persisted
            .columns()
            .iter()
            .chain(fetched.columns().iter())
            .copied(),
    );

    // Later rows replace earlier ones for a shared date.
    for (date, row) in persisted.into_rows().chain(fetched.into_rows()) {
        merged.insert_row(date, row);
    }

    merged
}

/// Describe the effect of merging `fetched` into `persisted` without performing it.
pub fn merge_report(persisted: Option<&RateTable>, fetched: &RateTable) -> MergeReport {
    let Some(persisted) = persisted else {
        return MergeReport {
            new_dates: fetched.len(),
            revised_values: 0,
            total_rows: fetched.len(),
        };
    };

    let mut report = MergeReport {
        total_rows: persisted.len(),
        ..MergeReport::default()
    };

    for (date, row) in fetched.rows() {
        match persisted.row(date) {
            None => {
                report.new_dates += 1;
                report.total_rows += 1;
            }
            Some(old) => {
                report.revised_values += row
                    .iter()
                    .filter(|(c, v)| old.get(*c).is_some_and(|o| o.to_bits() != v.to_bits()))
                    .count();
            }
        }
    }

    report
}
