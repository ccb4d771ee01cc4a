//! Batch read-plan assembly
//!
//! Folds a slave's working set into as few transport requests as possible:
//! entries are grouped per read range, sorted by offset, and merged into
//! spans. In contiguous mode only adjacent or overlapping entries merge; in
//! gap mode anything within one Modbus request ceiling merges, holes
//! included. Each span is one request on the wire.

use crate::config::PointType;

use super::locator::Locator;

/// Modbus request ceilings (registers per read, bits per read)
pub(crate) const MAX_WORDS_PER_REQUEST: u16 = 125;
pub(crate) const MAX_BITS_PER_REQUEST: u16 = 2000;

/// One point of the working set with its resolved locator
#[derive(Debug, Clone)]
pub(crate) struct BatchEntry {
    pub point: String,
    pub locator: Locator,
}

/// One merged transport request covering a slice of the working set
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReadSpan {
    pub range: PointType,
    pub start: u16,
    pub count: u16,
    /// Indices into the entry slice this span serves
    pub entries: Vec<usize>,
}

/// Assemble the read plan for a working set
pub(crate) fn assemble(entries: &[BatchEntry], contiguous_only: bool) -> Vec<ReadSpan> {
    let mut plan = Vec::new();

    for range in [
        PointType::Coil,
        PointType::Discrete,
        PointType::Holding,
        PointType::Input,
    ] {
        let mut indexed: Vec<usize> = (0..entries.len())
            .filter(|&i| entries[i].locator.range == range)
            .collect();
        if indexed.is_empty() {
            continue;
        }
        indexed.sort_by_key(|&i| (entries[i].locator.offset, entries[i].locator.count));

        let limit = if range.is_bit_range() {
            MAX_BITS_PER_REQUEST
        } else {
            MAX_WORDS_PER_REQUEST
        };

        let mut current: Option<ReadSpan> = None;
        for i in indexed {
            let locator = &entries[i].locator;
            let entry_end = locator.offset + locator.count;

            let merged = if let Some(span) = current.as_mut() {
                let span_end = span.start + span.count;
                let adjacent = locator.offset <= span_end;
                let within_limit = entry_end.saturating_sub(span.start) <= limit;
                if (adjacent || !contiguous_only) && within_limit {
                    span.count = span.count.max(entry_end - span.start);
                    span.entries.push(i);
                    true
                } else {
                    false
                }
            } else {
                false
            };

            if !merged
                && let Some(done) = current.replace(ReadSpan {
                    range,
                    start: locator.offset,
                    count: locator.count,
                    entries: vec![i],
                })
            {
                plan.push(done);
            }
        }
        if let Some(span) = current {
            plan.push(span);
        }
    }

    plan
}
