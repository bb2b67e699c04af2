//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod cargo_record_repo;
pub mod customer_code_repo;
pub mod customer_repo;
pub mod rate_repo;
pub mod rate_rule_repo;
pub mod rule_repo;

pub use cargo_record_repo::CargoRecordRepo;
pub use customer_code_repo::CustomerCodeRepo;
pub use customer_repo::CustomerRepo;
pub use rate_repo::RateRepo;
pub use rate_rule_repo::RateRuleRepo;
pub use rule_repo::RuleRepo;
