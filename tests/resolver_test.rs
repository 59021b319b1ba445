//! Rule resolver integration tests.

use cookieguard::base::policyerror::PolicyError;
use cookieguard::cookies::Cookie;
use cookieguard::policy::resolver::{apply_expiration, expiration_for};
use cookieguard::policy::{resolve, MatchedBy, Rule, RulePattern, RuleSet};

fn bank_rules() -> RuleSet {
    let mut rules = RuleSet::with_default(Rule::new(30));
    rules
        .save(
            "bank",
            Rule::new(15)
                .encrypted()
                .with_pattern(RulePattern::parse("/bank/i").unwrap()),
        )
        .unwrap();
    rules
}

#[test]
fn test_bank_scenario_resolution() {
    let rules = bank_rules();

    let res = resolve("mybank.com", &rules);
    assert_eq!(res.key, "bank");
    assert_eq!(res.matched_by, MatchedBy::Pattern);
    assert_eq!(res.rule.expiration_minutes, 15);
    assert!(res.rule.encrypt);

    // The `i` flag makes the pattern case-insensitive.
    assert_eq!(resolve("MyBANK.com", &rules).key, "bank");

    let res = resolve("news.example.com", &rules);
    assert_eq!(res.key, "*");
    assert_eq!(res.matched_by, MatchedBy::Default);
    assert_eq!(res.rule.expiration_minutes, 30);
}

#[test]
fn test_substring_keys_in_insertion_order() {
    let mut rules = RuleSet::new();
    rules.save("shop", Rule::new(10)).unwrap();
    rules.save("example", Rule::new(20)).unwrap();

    let res = resolve("shop.example.com", &rules);
    assert_eq!(res.key, "shop");
    assert_eq!(res.matched_by, MatchedBy::Substring);

    // Re-saving keeps the original position.
    rules.save("shop", Rule::new(11)).unwrap();
    assert_eq!(resolve("shop.example.com", &rules).rule.expiration_minutes, 11);

    rules.delete("shop").unwrap();
    assert_eq!(resolve("shop.example.com", &rules).key, "example");
}

#[test]
fn test_default_rule_always_resolves() {
    let mut rules = RuleSet::new();
    assert!(matches!(rules.delete("*"), Err(PolicyError::DefaultRuleRequired)));
    let res = resolve("", &rules);
    assert_eq!(res.key, "*");
    assert_eq!(res.rule.expiration_minutes, 60);
}

#[test]
fn test_expiration_written_only_for_session_cookies() {
    let rules = bank_rules();
    let now = 1_700_000_000;
    let rule = resolve("mybank.com", &rules).rule;

    let session = Cookie::new("sess", "mybank.com", "abc");
    let updated = apply_expiration(&session, &rule, now).unwrap();
    assert_eq!(updated.expiration_date, Some(now + 15 * 60));
    assert_eq!(updated.expiration_date, Some(expiration_for(&rule, now)));
    assert!(!updated.session_only);
    assert_eq!(updated.value, "abc");

    let persistent = session.with_expiration(now + 5);
    assert!(apply_expiration(&persistent, &rule, now).is_none());
}
