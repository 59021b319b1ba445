//! List filter integration tests.

use cookieguard::policy::{ListDecision, ListFilter};

#[test]
fn test_blacklist_wins_for_every_listed_domain() {
    let blacklist = ["tracker.net", "*.ads.example.com", "evil.org"];
    // Every blacklisted domain is also whitelisted, one way or another.
    let whitelist = ["tracker.net", "example.com", "*.org"];
    let filter = ListFilter::new(blacklist, whitelist);

    let domains = [
        ("tracker.net", "tracker.net"),
        ("cdn.tracker.net", "tracker.net"),
        ("x.ads.example.com", "*.ads.example.com"),
        (".y.ads.example.com", "*.ads.example.com"),
        ("evil.org", "evil.org"),
    ];
    for (domain, pattern) in domains {
        assert_eq!(
            filter.evaluate(domain),
            ListDecision::Blocked { pattern: pattern.to_string() },
            "{}",
            domain
        );
    }
}

#[test]
fn test_whitelist_and_undecided() {
    let filter = ListFilter::new(["ads.net"], ["example.com", "*.org"]);

    assert_eq!(
        filter.evaluate("www.example.com"),
        ListDecision::Allowed { pattern: "example.com".into() }
    );
    assert_eq!(
        filter.evaluate("wiki.org"),
        ListDecision::Allowed { pattern: "*.org".into() }
    );
    assert_eq!(filter.evaluate("mybank.com"), ListDecision::Undecided);
}

#[test]
fn test_matching_is_case_sensitive() {
    let filter = ListFilter::new(["Tracker.net"], Vec::<String>::new());
    assert!(!filter.is_blocked("tracker.net"));
    assert!(filter.is_blocked("Tracker.net"));
}

#[test]
fn test_malformed_patterns_do_not_abort_the_pass() {
    let filter = ListFilter::new(["", "  ", "tracker.net"], [""]);
    assert_eq!(filter.malformed_count(), 3);
    assert!(filter.is_blocked("tracker.net"));
    assert_eq!(filter.evaluate("example.com"), ListDecision::Undecided);
}

#[test]
fn test_dots_are_literal() {
    let filter = ListFilter::new(["a.b"], Vec::<String>::new());
    assert!(filter.is_blocked("a.b"));
    assert!(!filter.is_blocked("axb"));
}

#[test]
fn test_empty_lists_decide_nothing() {
    let filter = ListFilter::default();
    assert_eq!(filter.evaluate("anything.com"), ListDecision::Undecided);
}
