//! Engine orchestration: load, compile, match, stage, write.
//!
//! One invocation is a single sequential pass. The only concurrency is
//! inside the store's bulk writer. No cancellation is polled here; callers
//! bound the whole run with their own timeout.

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use crate::cargo::CargoRecord;
use crate::compiler::{compile_customer_rules, compile_rate_rules, CompiledRule, SkippedRule};
use crate::customer_code::CustomerCodeIndex;
use crate::matcher::{match_records, MatchOutcome};
use crate::rate::round_to_cents;
use crate::resolver::{stage_customer_update, stage_rate_update, AssignmentFields, StagedUpdate};
use crate::rule::RuleKind;
use crate::store::{BulkWriteOutcome, EngineStore, RecordFilter, RuleRunTelemetry, StoreError};
use crate::types::{DbId, Timestamp};

/// Per-rule cap on assignment samples included in a report.
pub const MAX_ASSIGNMENT_SAMPLES: usize = 100;
/// Default page size for reading candidate records.
pub const DEFAULT_PAGE_SIZE: i64 = 1_000;
/// Default number of staged updates sent to the writer per batch.
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 2_000;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Sizing knobs for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLimits {
    pub page_size: i64,
    pub write_batch_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            write_batch_size: DEFAULT_WRITE_BATCH_SIZE,
        }
    }
}

/// Caller options shared by both engines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Restrict the run to these rules. `None` or empty means all active rules.
    pub rule_ids: Option<Vec<DbId>>,
    /// Compile and match but never call the write path.
    pub dry_run: bool,
    /// Customer engine only: scan every record, not just unassigned ones.
    pub process_all_data: bool,
}

impl ExecutionOptions {
    fn rule_ids(&self) -> Option<&[DbId]> {
        self.rule_ids.as_deref().filter(|ids| !ids.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal outcomes of a run.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("No active rules found")]
    NoActiveRules,

    #[error("No active customer codes found")]
    NoCustomerCodes,

    #[error("No valid rules found")]
    NoValidRules { skipped: Vec<SkippedRule> },

    #[error("Failed to load engine inputs: {0}")]
    Store(#[from] StoreError),

    #[error("Bulk update failed after {applied} updates were applied: {source}")]
    Persistence {
        applied: usize,
        #[source]
        source: StoreError,
    },
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// One staged assignment, as shown to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSample {
    pub record_id: DbId,
    pub rec_id: Option<String>,
    #[serde(flatten)]
    pub fields: AssignmentFields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRuleResult {
    pub rule_id: DbId,
    pub rule_name: String,
    pub matches: usize,
    /// First [`MAX_ASSIGNMENT_SAMPLES`] assignments made by this rule.
    pub assignments: Vec<AssignmentSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerExecutionReport {
    pub dry_run: bool,
    pub total_processed: usize,
    pub total_assigned: usize,
    /// Candidate records left without a new assignment.
    pub total_skipped: usize,
    pub total_failed: usize,
    pub invalid_records: usize,
    pub rule_results: Vec<CustomerRuleResult>,
    pub valid_rules_processed: usize,
    pub invalid_rules_skipped: usize,
    pub skipped_rules: Vec<SkippedRule>,
    pub warnings: Vec<String>,
    pub execution_time_ms: u64,
}

impl CustomerExecutionReport {
    pub fn summary_message(&self) -> String {
        format!(
            "{}Assigned customers to {} of {} records using {} rules",
            if self.dry_run { "[dry run] " } else { "" },
            self.total_assigned,
            self.total_processed,
            self.valid_rules_processed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRuleResult {
    pub rule_id: DbId,
    pub rule_name: String,
    pub matches: usize,
    /// Valid staged updates produced by this rule.
    pub assignments: usize,
    pub samples: Vec<AssignmentSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateExecutionReport {
    pub dry_run: bool,
    pub total_processed: usize,
    pub total_assigned: usize,
    pub total_failed: usize,
    pub invalid_records: usize,
    pub execution_time_ms: u64,
    pub performance_records_per_second: f64,
    pub rule_results: Vec<RateRuleResult>,
    pub skipped_rules: Vec<SkippedRule>,
    pub warnings: Vec<String>,
}

impl RateExecutionReport {
    pub fn summary_message(&self) -> String {
        format!(
            "{}Assigned rates to {} of {} records",
            if self.dry_run { "[dry run] " } else { "" },
            self.total_assigned,
            self.total_processed
        )
    }
}

// ---------------------------------------------------------------------------
// Shared pipeline
// ---------------------------------------------------------------------------

struct RulePass {
    matches: usize,
    staged: usize,
    samples: Vec<AssignmentSample>,
}

struct PassResult {
    per_rule: Vec<RulePass>,
    write: BulkWriteOutcome,
    staged_total: usize,
    invalid_records: usize,
    warnings: Vec<String>,
}

async fn load_candidates<S: EngineStore>(
    store: &S,
    filter: RecordFilter,
    page_size: i64,
) -> Result<Vec<CargoRecord>, StoreError> {
    let page_size = page_size.max(1);
    let mut records = Vec::new();
    let mut offset = 0i64;
    loop {
        let page = store.fetch_records(filter, page_size, offset).await?;
        let fetched = page.len();
        records.extend(page);
        tracing::debug!(offset, fetched, total = records.len(), "Loaded record page");
        if (fetched as i64) < page_size {
            break;
        }
        offset += page_size;
    }
    Ok(records)
}

async fn write_in_batches<S: EngineStore>(
    store: &S,
    updates: &[StagedUpdate],
    batch_size: usize,
) -> Result<BulkWriteOutcome, ExecutionError> {
    let mut total = BulkWriteOutcome::default();
    for (index, batch) in updates.chunks(batch_size.max(1)).enumerate() {
        match store.apply_updates(batch).await {
            Ok(outcome) => {
                if outcome.total_failed > 0 {
                    tracing::warn!(
                        batch = index,
                        failed = outcome.total_failed,
                        "Some updates in batch were rejected"
                    );
                }
                tracing::info!(
                    batch = index,
                    size = batch.len(),
                    updated = outcome.total_updated,
                    "Applied update batch"
                );
                total.merge(outcome);
            }
            Err(source) => {
                tracing::error!(
                    batch = index,
                    applied = total.total_updated,
                    error = %source,
                    "Update batch failed"
                );
                return Err(ExecutionError::Persistence {
                    applied: total.total_updated,
                    source,
                });
            }
        }
    }
    Ok(total)
}

#[allow(clippy::too_many_arguments)]
async fn run_pass<S, T, F>(
    store: &S,
    kind: RuleKind,
    rules: &[CompiledRule<T>],
    records: &[CargoRecord],
    outcome: &MatchOutcome,
    stage: F,
    options: &ExecutionOptions,
    limits: &EngineLimits,
    now: Timestamp,
) -> Result<PassResult, ExecutionError>
where
    S: EngineStore,
    F: Fn(&CargoRecord, &CompiledRule<T>, Timestamp) -> Option<StagedUpdate>,
{
    let mut per_rule: Vec<RulePass> = outcome
        .match_counts
        .iter()
        .map(|&matches| RulePass {
            matches,
            staged: 0,
            samples: Vec::new(),
        })
        .collect();

    let mut staged = Vec::with_capacity(outcome.matches.len());
    let mut invalid_records = 0usize;
    for m in &outcome.matches {
        let record = &records[m.record_index];
        let rule = &rules[m.rule_index];
        let Some(update) = stage(record, rule, now) else {
            invalid_records += 1;
            continue;
        };
        let pass = &mut per_rule[m.rule_index];
        pass.staged += 1;
        if pass.samples.len() < MAX_ASSIGNMENT_SAMPLES {
            pass.samples.push(AssignmentSample {
                record_id: record.id,
                rec_id: record.rec_id.clone(),
                fields: update.fields.clone(),
            });
        }
        staged.push(update);
    }

    let mut warnings = Vec::new();
    if invalid_records > 0 {
        warnings.push(format!(
            "{invalid_records} matched records were missing identifiers and were not updated"
        ));
    }

    if options.dry_run {
        tracing::info!(kind = kind.as_str(), staged = staged.len(), "Dry run, skipping writes");
        return Ok(PassResult {
            per_rule,
            write: BulkWriteOutcome::default(),
            staged_total: staged.len(),
            invalid_records,
            warnings,
        });
    }

    let write = write_in_batches(store, &staged, limits.write_batch_size).await?;
    if write.total_failed > 0 {
        warnings.push(format!("{} updates were rejected by the store", write.total_failed));
    }

    let runs: Vec<RuleRunTelemetry> = rules
        .iter()
        .zip(&outcome.match_counts)
        .map(|(rule, &count)| RuleRunTelemetry {
            rule_id: rule.id,
            matches: count as i64,
            last_run: now,
        })
        .collect();
    if let Err(err) = store.record_rule_runs(kind, &runs).await {
        tracing::warn!(error = %err, kind = kind.as_str(), "Failed to record rule telemetry");
        warnings.push(format!("Rule statistics were not updated: {err}"));
    }

    Ok(PassResult {
        per_rule,
        write,
        staged_total: staged.len(),
        invalid_records,
        warnings,
    })
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Customer engine
// ---------------------------------------------------------------------------

/// Assign customers to cargo records using the active customer rules.
pub async fn execute_customer_rules<S: EngineStore>(
    store: &S,
    options: &ExecutionOptions,
    limits: &EngineLimits,
) -> Result<CustomerExecutionReport, ExecutionError> {
    let start = Instant::now();
    let rule_ids = options.rule_ids();

    let rules = store.active_customer_rules(rule_ids).await?;
    if rules.is_empty() {
        return Err(ExecutionError::NoActiveRules);
    }

    let codes = store.active_customer_codes().await?;
    let index = CustomerCodeIndex::from_codes(&codes);
    if index.is_empty() {
        return Err(ExecutionError::NoCustomerCodes);
    }

    let compilation = compile_customer_rules(rules, &index, rule_ids);
    if compilation.rules.is_empty() {
        return Err(ExecutionError::NoValidRules {
            skipped: compilation.skipped,
        });
    }
    tracing::info!(
        valid = compilation.rules.len(),
        skipped = compilation.skipped.len(),
        customer_codes = index.len(),
        "Compiled customer rules"
    );

    let filter = if options.process_all_data {
        RecordFilter::All
    } else {
        RecordFilter::WithoutCustomer
    };
    let records = load_candidates(store, filter, limits.page_size).await?;
    let outcome = match_records(&compilation.rules, &records, |r| r.assigned_customer.is_some());

    let pass = run_pass(
        store,
        RuleKind::Customer,
        &compilation.rules,
        &records,
        &outcome,
        stage_customer_update,
        options,
        limits,
        Utc::now(),
    )
    .await?;

    let total_assigned = pass.staged_total - pass.write.total_failed;
    let mut warnings = compilation.warnings;
    warnings.extend(pass.warnings);

    let rule_results = compilation
        .rules
        .iter()
        .zip(pass.per_rule)
        .map(|(rule, p)| CustomerRuleResult {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            matches: p.matches,
            assignments: p.samples,
        })
        .collect();

    let report = CustomerExecutionReport {
        dry_run: options.dry_run,
        total_processed: records.len(),
        total_assigned,
        total_skipped: records.len() - total_assigned,
        total_failed: pass.write.total_failed,
        invalid_records: pass.invalid_records,
        rule_results,
        valid_rules_processed: compilation.rules.len(),
        invalid_rules_skipped: compilation.skipped.len(),
        skipped_rules: compilation.skipped,
        warnings,
        execution_time_ms: elapsed_ms(start),
    };

    tracing::info!(
        dry_run = report.dry_run,
        processed = report.total_processed,
        assigned = report.total_assigned,
        already_assigned = outcome.already_assigned,
        elapsed_ms = report.execution_time_ms,
        "Customer rule execution finished"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Rate engine
// ---------------------------------------------------------------------------

/// Assign billing rates to cargo records that have none.
pub async fn execute_rate_rules<S: EngineStore>(
    store: &S,
    options: &ExecutionOptions,
    limits: &EngineLimits,
) -> Result<RateExecutionReport, ExecutionError> {
    let start = Instant::now();
    let rule_ids = options.rule_ids();

    let rows = store.active_rate_rules(rule_ids).await?;
    if rows.is_empty() {
        return Err(ExecutionError::NoActiveRules);
    }

    let compilation = compile_rate_rules(rows, rule_ids);
    if compilation.rules.is_empty() {
        return Err(ExecutionError::NoValidRules {
            skipped: compilation.skipped,
        });
    }
    tracing::info!(
        valid = compilation.rules.len(),
        skipped = compilation.skipped.len(),
        "Compiled rate rules"
    );

    let records = load_candidates(store, RecordFilter::WithoutRate, limits.page_size).await?;
    let outcome = match_records(&compilation.rules, &records, |r| r.rate_id.is_some());

    let pass = run_pass(
        store,
        RuleKind::Rate,
        &compilation.rules,
        &records,
        &outcome,
        stage_rate_update,
        options,
        limits,
        Utc::now(),
    )
    .await?;

    let execution_time_ms = elapsed_ms(start);
    let seconds = start.elapsed().as_secs_f64();
    let performance_records_per_second = if seconds > 0.0 {
        round_to_cents(records.len() as f64 / seconds)
    } else {
        records.len() as f64
    };

    let rule_results = compilation
        .rules
        .iter()
        .zip(pass.per_rule)
        .map(|(rule, p)| RateRuleResult {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            matches: p.matches,
            assignments: p.staged,
            samples: p.samples,
        })
        .collect();

    let mut warnings = compilation.warnings;
    warnings.extend(pass.warnings);

    let report = RateExecutionReport {
        dry_run: options.dry_run,
        total_processed: records.len(),
        total_assigned: pass.staged_total - pass.write.total_failed,
        total_failed: pass.write.total_failed,
        invalid_records: pass.invalid_records,
        execution_time_ms,
        performance_records_per_second,
        rule_results,
        skipped_rules: compilation.skipped,
        warnings,
    };

    tracing::info!(
        dry_run = report.dry_run,
        processed = report.total_processed,
        assigned = report.total_assigned,
        elapsed_ms = report.execution_time_ms,
        records_per_second = report.performance_records_per_second,
        "Rate rule execution finished"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
