//! Integration tests for the Postgres engine store.
//!
//! Runs both engines end to end against a real database:
//! - Rate assignment with rounding and default currency
//! - Customer assignment through customer codes
//! - Idempotent re-runs
//! - Dry runs leaving the database untouched
//! - Rule telemetry, including overlapping runs

use airmail_core::condition::RuleCondition;
use airmail_core::execution::{
    execute_customer_rules, execute_rate_rules, EngineLimits, ExecutionError, ExecutionOptions,
};
use airmail_core::store::{RecordFilter, RuleRunTelemetry};
use airmail_db::models::cargo_record::CreateCargoRecord;
use airmail_db::models::customer::CreateCustomer;
use airmail_db::models::customer_code::CreateCustomerCode;
use airmail_db::models::rate::CreateRate;
use airmail_db::models::rate_rule::CreateRateRule;
use airmail_db::models::rule::CreateRule;
use airmail_db::repositories::{
    CargoRecordRepo, CustomerCodeRepo, CustomerRepo, RateRepo, RateRuleRepo, RuleRepo,
};
use airmail_db::PgEngineStore;
use assert_matches::assert_matches;
use chrono::Utc;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_record(rec_id: &str, mail_cat: &str, total_kg: f64) -> CreateCargoRecord {
    CreateCargoRecord {
        rec_id: Some(rec_id.to_string()),
        mail_cat: Some(mail_cat.to_string()),
        orig_oe: Some("DEFRAA".to_string()),
        total_kg: Some(total_kg),
        ..Default::default()
    }
}

fn new_rate(name: &str, rate_type: &str, base_rate: f64) -> CreateRate {
    CreateRate {
        name: name.to_string(),
        rate_type: rate_type.to_string(),
        base_rate,
        multiplier: None,
        currency: None,
    }
}

fn mail_cat_equals(value: &str) -> Vec<RuleCondition> {
    vec![RuleCondition::new("mail_cat", "equals", value)]
}

async fn seed_records(pool: &PgPool) -> Vec<i64> {
    let mut ids = Vec::new();
    for (rec_id, cat) in [("R1", "A"), ("R2", "B"), ("R3", "C")] {
        let row = CargoRecordRepo::create(pool, &new_record(rec_id, cat, 10.333))
            .await
            .unwrap();
        ids.push(row.id);
    }
    ids
}

// ---------------------------------------------------------------------------
// Rate engine
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rate_engine_assigns_matching_records(pool: PgPool) {
    let ids = seed_records(&pool).await;
    let rate = RateRepo::create(&pool, &new_rate("Per kg", "per_kg", 2.5))
        .await
        .unwrap();
    let rule = RateRuleRepo::create(
        &pool,
        &CreateRateRule {
            name: "A or B".to_string(),
            description: None,
            priority: Some(1),
            conditions: mail_cat_equals("A,B"),
            rate_id: rate.id,
        },
    )
    .await
    .unwrap();

    let store = PgEngineStore::new(pool.clone());
    let report = execute_rate_rules(&store, &ExecutionOptions::default(), &EngineLimits::default())
        .await
        .unwrap();

    assert_eq!(report.total_processed, 3);
    assert_eq!(report.total_assigned, 2);

    let first = CargoRecordRepo::find_by_id(&pool, ids[0]).await.unwrap().unwrap();
    assert_eq!(first.rate_id, Some(rate.id));
    assert_eq!(first.assigned_rate, Some(25.83));
    assert_eq!(first.rate_currency.as_deref(), Some("EUR"));
    assert!(first.assigned_at.is_some());

    let third = CargoRecordRepo::find_by_id(&pool, ids[2]).await.unwrap().unwrap();
    assert_eq!(third.rate_id, None);

    let stored = RateRuleRepo::find_by_id(&pool, rule.id).await.unwrap().unwrap();
    assert_eq!(stored.match_count, 2);
    assert!(stored.last_run.is_some());

    // Second run finds nothing left to rate and never rewrites.
    let rerun = execute_rate_rules(&store, &ExecutionOptions::default(), &EngineLimits::default())
        .await
        .unwrap();
    assert_eq!(rerun.total_processed, 1);
    assert_eq!(rerun.total_assigned, 0);
    let after = CargoRecordRepo::find_by_id(&pool, ids[0]).await.unwrap().unwrap();
    assert_eq!(after.assigned_at, first.assigned_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dry_run_leaves_database_untouched(pool: PgPool) {
    seed_records(&pool).await;
    let rate = RateRepo::create(&pool, &new_rate("Flat", "fixed", 10.0))
        .await
        .unwrap();
    let rule = RateRuleRepo::create(
        &pool,
        &CreateRateRule {
            name: "Everything".to_string(),
            description: None,
            priority: None,
            conditions: vec![RuleCondition::new("mail_cat", "not_empty", "")],
            rate_id: rate.id,
        },
    )
    .await
    .unwrap();

    let store = PgEngineStore::new(pool.clone());
    let options = ExecutionOptions {
        dry_run: true,
        ..Default::default()
    };
    let report = execute_rate_rules(&store, &options, &EngineLimits::default())
        .await
        .unwrap();

    assert_eq!(report.total_assigned, 3);
    let remaining = CargoRecordRepo::count(&pool, RecordFilter::WithoutRate)
        .await
        .unwrap();
    assert_eq!(remaining, 3);
    let stored = RateRuleRepo::find_by_id(&pool, rule.id).await.unwrap().unwrap();
    assert_eq!(stored.match_count, 0);
    assert!(stored.last_run.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rate_rule_with_deleted_rate_is_skipped(pool: PgPool) {
    seed_records(&pool).await;
    let rate = RateRepo::create(&pool, &new_rate("Gone", "fixed", 1.0))
        .await
        .unwrap();
    RateRuleRepo::create(
        &pool,
        &CreateRateRule {
            name: "Orphan".to_string(),
            description: None,
            priority: Some(1),
            conditions: mail_cat_equals("A"),
            rate_id: rate.id,
        },
    )
    .await
    .unwrap();
    sqlx::query("DELETE FROM rates WHERE id = $1")
        .bind(rate.id)
        .execute(&pool)
        .await
        .unwrap();

    let rows = RateRuleRepo::list_active_with_rate(&pool, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].rate_id, None);
    assert_eq!(rows[0].joined_rate_id, None);

    let store = PgEngineStore::new(pool.clone());
    let err = execute_rate_rules(&store, &ExecutionOptions::default(), &EngineLimits::default())
        .await
        .unwrap_err();
    assert_matches!(err, ExecutionError::NoValidRules { ref skipped } if skipped.len() == 1);
}

// ---------------------------------------------------------------------------
// Customer engine
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_customer_engine_resolves_through_codes(pool: PgPool) {
    let ids = seed_records(&pool).await;
    let customer = CustomerRepo::create(
        &pool,
        &CreateCustomer {
            name: "Deutsche Post".to_string(),
        },
    )
    .await
    .unwrap();
    let code = CustomerCodeRepo::create(
        &pool,
        &CreateCustomerCode {
            code: "DPAG".to_string(),
            customer_id: customer.id,
            is_active: None,
        },
    )
    .await
    .unwrap();
    let rule = RuleRepo::create(
        &pool,
        &CreateRule {
            name: "Category C or origin USJFKA".to_string(),
            description: None,
            priority: Some(1),
            conditions: vec![
                RuleCondition::new("mail_cat", "equals", "C"),
                RuleCondition::new("orig_oe", "equals", "USJFKA"),
            ],
            assign_to: code.id,
        },
    )
    .await
    .unwrap();

    let store = PgEngineStore::new(pool.clone());
    let report =
        execute_customer_rules(&store, &ExecutionOptions::default(), &EngineLimits::default())
            .await
            .unwrap();

    assert_eq!(report.total_processed, 3);
    assert_eq!(report.total_assigned, 1);
    assert_eq!(report.total_skipped, 2);
    assert!(report.warnings.is_empty());

    let third = CargoRecordRepo::find_by_id(&pool, ids[2]).await.unwrap().unwrap();
    assert_eq!(third.assigned_customer, Some(customer.id));
    assert_eq!(third.customer_code_id, Some(code.id));

    let stored = RuleRepo::find_by_id(&pool, rule.id).await.unwrap().unwrap();
    assert_eq!(stored.match_count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deactivated_rules_are_not_loaded(pool: PgPool) {
    let rule = RuleRepo::create(
        &pool,
        &CreateRule {
            name: "Old".to_string(),
            description: None,
            priority: None,
            conditions: mail_cat_equals("A"),
            assign_to: 1,
        },
    )
    .await
    .unwrap();
    assert_eq!(rule.priority, 100);

    let deactivated = RuleRepo::deactivate(&pool, rule.id).await.unwrap().unwrap();
    assert!(!deactivated.is_active);
    assert!(RuleRepo::list_active(&pool, None).await.unwrap().is_empty());
    assert!(RuleRepo::deactivate(&pool, 9_999).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_active_honours_rule_id_filter(pool: PgPool) {
    let mut ids = Vec::new();
    for name in ["one", "two", "three"] {
        let rule = RuleRepo::create(
            &pool,
            &CreateRule {
                name: name.to_string(),
                description: None,
                priority: None,
                conditions: mail_cat_equals("A"),
                assign_to: 1,
            },
        )
        .await
        .unwrap();
        ids.push(rule.id);
    }

    let selected = RuleRepo::list_active(&pool, Some(&ids[1..2])).await.unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].name, "two");
    assert_eq!(RuleRepo::list_active(&pool, None).await.unwrap().len(), 3);
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

fn run(rule_id: i64, matches: i64) -> RuleRunTelemetry {
    RuleRunTelemetry {
        rule_id,
        matches,
        last_run: Utc::now(),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_overlapping_runs_accumulate_match_counts(pool: PgPool) {
    let rate = RateRepo::create(&pool, &new_rate("Flat", "fixed", 10.0))
        .await
        .unwrap();
    let rate_rule = RateRuleRepo::create(
        &pool,
        &CreateRateRule {
            name: "Flat A".to_string(),
            description: None,
            priority: None,
            conditions: mail_cat_equals("A"),
            rate_id: rate.id,
        },
    )
    .await
    .unwrap();
    let rule = RuleRepo::create(
        &pool,
        &CreateRule {
            name: "Customer A".to_string(),
            description: None,
            priority: None,
            conditions: mail_cat_equals("A"),
            assign_to: 1,
        },
    )
    .await
    .unwrap();

    // Both writers start from the same stored count.
    let runs_a = [run(rate_rule.id, 2)];
    let runs_b = [run(rate_rule.id, 3)];
    let (first, second) = tokio::join!(
        RateRuleRepo::record_runs(&pool, &runs_a),
        RateRuleRepo::record_runs(&pool, &runs_b),
    );
    assert_eq!(first.unwrap(), 1);
    assert_eq!(second.unwrap(), 1);

    let runs_c = [run(rule.id, 4)];
    let runs_d = [run(rule.id, 1)];
    let (first, second) = tokio::join!(
        RuleRepo::record_runs(&pool, &runs_c),
        RuleRepo::record_runs(&pool, &runs_d),
    );
    first.unwrap();
    second.unwrap();

    let stored = RateRuleRepo::find_by_id(&pool, rate_rule.id).await.unwrap().unwrap();
    assert_eq!(stored.match_count, 5);
    assert!(stored.last_run.is_some());
    let stored = RuleRepo::find_by_id(&pool, rule.id).await.unwrap().unwrap();
    assert_eq!(stored.match_count, 5);
}
