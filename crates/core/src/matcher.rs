//! Batch matcher: first-match-wins evaluation of compiled rules over a
//! record set.
//!
//! Rules run in the order given (the compiler sorts them by priority). A
//! record claimed by one rule is never evaluated again in the same pass.

use std::collections::HashSet;

use crate::cargo::CargoRecord;
use crate::compiler::CompiledRule;
use crate::types::DbId;

/// Record count above which the smaller chunk size is used.
pub const LARGE_DATASET_THRESHOLD: usize = 50_000;
/// Chunk size for record sets above [`LARGE_DATASET_THRESHOLD`].
pub const LARGE_DATASET_CHUNK_SIZE: usize = 500;
/// Chunk size for everything else.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000;

/// Chunk size used when scanning `total` records.
///
/// Chunking only bounds per-iteration work and drives progress logging;
/// it has no effect on which records match.
pub fn chunk_size_for(total: usize) -> usize {
    if total > LARGE_DATASET_THRESHOLD {
        LARGE_DATASET_CHUNK_SIZE
    } else {
        DEFAULT_CHUNK_SIZE
    }
}

/// One record claimed by one rule. Both fields index the input slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule_index: usize,
    pub record_index: usize,
}

/// Result of a matching pass.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// At most one entry per record, grouped by rule in evaluation order.
    pub matches: Vec<RuleMatch>,
    /// Matches per rule, parallel to the rule slice.
    pub match_counts: Vec<usize>,
    /// Records that were already assigned before the pass started.
    pub already_assigned: usize,
}

/// Match `records` against `rules`, first match wins.
///
/// `is_assigned` reports records whose persisted state already marks them
/// as classified; those seed the matched set and are never touched.
pub fn match_records<T>(
    rules: &[CompiledRule<T>],
    records: &[CargoRecord],
    is_assigned: impl Fn(&CargoRecord) -> bool,
) -> MatchOutcome {
    let mut matched: HashSet<DbId> = records
        .iter()
        .filter(|r| is_assigned(r))
        .map(|r| r.id)
        .collect();
    let already_assigned = matched.len();

    let chunk_size = chunk_size_for(records.len());
    let mut outcome = MatchOutcome {
        matches: Vec::new(),
        match_counts: vec![0; rules.len()],
        already_assigned,
    };

    for (rule_index, rule) in rules.iter().enumerate() {
        for (chunk_index, chunk) in records.chunks(chunk_size).enumerate() {
            let offset = chunk_index * chunk_size;
            let mut chunk_matches = 0usize;

            for (i, record) in chunk.iter().enumerate() {
                if matched.contains(&record.id) || !rule.matches(record) {
                    continue;
                }
                matched.insert(record.id);
                outcome.matches.push(RuleMatch {
                    rule_index,
                    record_index: offset + i,
                });
                chunk_matches += 1;
            }

            outcome.match_counts[rule_index] += chunk_matches;
            tracing::debug!(
                rule_id = rule.id,
                chunk = chunk_index,
                processed = offset + chunk.len(),
                total = records.len(),
                chunk_matches,
                "Processed record chunk"
            );
        }

        tracing::debug!(
            rule_id = rule.id,
            rule_name = %rule.name,
            priority = rule.priority,
            matches = outcome.match_counts[rule_index],
            "Rule evaluated"
        );
    }

    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
