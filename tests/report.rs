//! Run-report properties: exit status and serialized shape

use crypto_smoke::checks::{self, Outcome};
use crypto_smoke::runner::{CheckReport, RunReport};
use test_case::test_case;

fn fail(msg: &str) -> Outcome {
    Outcome::Fail(msg.to_string())
}

fn report(outcomes: [Outcome; 4]) -> RunReport {
    let names = [
        checks::HOMEPAGE_ELEMENTS,
        checks::PRICES_LOAD,
        checks::THEME_TOGGLE,
        checks::COIN_SELECTOR,
    ];
    let checks = names
        .iter()
        .zip(outcomes)
        .map(|(name, outcome)| CheckReport {
            name: name.to_string(),
            outcome,
            duration_ms: 5,
        })
        .collect();
    RunReport::new(checks, 20, Vec::new())
}

#[test_case([Outcome::Pass, Outcome::Pass, Outcome::Pass, Outcome::Pass], true; "all pass")]
#[test_case([Outcome::Pass, Outcome::Pass, Outcome::Pass, Outcome::Skip], true; "skip does not fail")]
#[test_case([fail("nav timeout"), Outcome::Pass, Outcome::Pass, Outcome::Skip], false; "first check fail still counted")]
#[test_case([Outcome::Pass, fail("no cells"), fail("no change"), fail("gone")], false; "multiple fails")]
fn success_iff_no_fail(outcomes: [Outcome; 4], expected: bool) {
    assert_eq!(report(outcomes).success(), expected);
}

#[test]
fn four_checks_in_fixed_order() {
    let report = report([Outcome::Pass, Outcome::Pass, Outcome::Pass, Outcome::Skip]);
    let names: Vec<&str> = report.checks.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Homepage Elements",
            "Prices Load",
            "Theme Toggle",
            "Coin Selector"
        ]
    );
    assert_eq!(report.total, 4);
}

#[test]
fn totals_match_check_tally() {
    let report = report([Outcome::Pass, fail("no cells"), Outcome::Pass, Outcome::Skip]);
    assert_eq!(report.passed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(
        report.passed + report.failed + report.skipped,
        report.checks.len()
    );
}

#[test]
fn report_serializes_with_check_outcomes() {
    let report = report([Outcome::Pass, fail("no cells"), Outcome::Pass, Outcome::Skip]);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["total"], 4);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["checks"][0]["outcome"]["status"], "pass");
    assert_eq!(json["checks"][1]["outcome"]["status"], "fail");
    assert_eq!(json["checks"][1]["outcome"]["message"], "no cells");
    assert_eq!(json["checks"][3]["outcome"]["status"], "skip");
}

#[test]
fn report_round_trips_through_json() {
    let report = report([Outcome::Pass, fail("boom"), Outcome::Pass, Outcome::Skip]);
    let json = serde_json::to_string(&report).unwrap();
    let parsed: RunReport = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.failed, report.failed);
    assert_eq!(parsed.checks.len(), 4);
    assert_eq!(parsed.checks[1].outcome, Outcome::Fail("boom".to_string()));
}
