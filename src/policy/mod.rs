//! Expiration and list policy.
//!
//! - [`listfilter`]: blacklist / whitelist evaluation and per-domain overrides
//! - [`resolver`]: picks the governing [`rule::Rule`] for a domain
//! - [`rule`]: rule records and the ordered [`rule::RuleSet`]

pub mod listfilter;
pub mod resolver;
pub mod rule;

pub use listfilter::{DomainOverride, ListDecision, ListFilter, ListKind};
pub use resolver::{resolve, MatchedBy, Resolution};
pub use rule::{Rule, RulePattern, RulePriority, RuleSet, DEFAULT_RULE_KEY};
