mod helpers;

use helpers::{case, eval, rule};
use rdetect_eval::{FieldCatalog, Recommendation, Stage, TestKind, Validator};
use rdetect_parser::Query;
use serde_json::json;

#[test]
fn parse_and_match_are_idempotent() {
    let input = "event.code:1 AND process.name:*vssadmin* OR NOT file.name:x";
    let a = Query::parse(input).unwrap();
    let b = Query::parse(input).unwrap();
    assert_eq!(a, b);

    let event = json!({"event": {"code": "1"}, "process": {"name": "vssadmin.exe"}});
    assert_eq!(eval(input, event.clone()), eval(input, event));
}

#[test]
fn escaped_literals_survive_to_matching() {
    let m = eval(
        r"process.command_line:C\:\\Windows\\System32\\vssadmin.exe",
        json!({"process": {"command_line": r"C:\Windows\System32\vssadmin.exe"}}),
    );
    assert!(m.matched);
}

#[test]
fn wildcard_semantics_on_real_paths() {
    assert!(
        eval(
            "process.name:*vssadmin*",
            json!({"process": {"name": r"C:\Windows\System32\vssadmin.exe"}}),
        )
        .matched
    );
    assert!(
        !eval(
            "process.name:vssadmin*",
            json!({"process": {"name": "notvssadmin.exe"}}),
        )
        .matched
    );
}

#[test]
fn negation_matches_document_lacking_the_field() {
    let m = eval(
        "NOT process.parent.name:explorer.exe",
        json!({"process": {"name": "cmd.exe"}}),
    );
    assert!(m.matched);
}

#[test]
fn coverage_gate_blocks_approval_without_fn_cases() {
    let hit = json!({"process": {"name": "vssadmin.exe"}});
    let miss = json!({"process": {"name": "explorer.exe"}});
    let r = rule(
        "no-evasion-documented",
        "process.name:vssadmin.exe",
        vec![
            case(TestKind::TruePositive, "direct hit", hit.clone(), true),
            case(TestKind::TruePositive, "second hit", hit, true),
            case(TestKind::FalsePositive, "benign lookalike", miss.clone(), false),
            case(TestKind::TrueNegative, "unrelated process", miss, false),
        ],
    );

    let verdict = Validator::new(FieldCatalog::ecs_subset()).validate(&r);
    // every case executes correctly, but the suite documents no evasion
    assert_eq!(verdict.scores.logic, 1.0);
    assert_eq!(verdict.failures_at(Stage::Coverage).count(), 1);
    assert_ne!(verdict.recommendation, Recommendation::Approve);
}

#[test]
fn vssadmin_shadow_delete_end_to_end() {
    let query = "event.code:1 AND process.name:*vssadmin* AND \
                 process.command_line:(*delete*shadows* OR *shadowcopy*delete*)";
    let r = rule(
        "vssadmin-shadow-delete",
        query,
        vec![
            case(
                TestKind::TruePositive,
                "vssadmin deletes all shadow copies",
                json!({
                    "event": {"code": "1"},
                    "process": {
                        "name": "vssadmin.exe",
                        "command_line": "vssadmin delete shadows /all /quiet"
                    }
                }),
                true,
            ),
            case(
                TestKind::FalsePositive,
                "vssadmin only lists shadows",
                json!({
                    "event": {"code": "1"},
                    "process": {
                        "name": "vssadmin.exe",
                        "command_line": "vssadmin list shadows"
                    }
                }),
                false,
            ),
            case(
                TestKind::FalseNegative,
                "WMI-based deletion evades the rule",
                json!({
                    "event": {"code": "1"},
                    "process": {
                        "name": "powershell.exe",
                        "command_line":
                            "Get-WmiObject Win32_ShadowCopy | ForEach-Object {$_.Delete()}"
                    }
                }),
                false,
            ),
            case(
                TestKind::TrueNegative,
                "ordinary desktop activity",
                json!({
                    "event": {"code": "1"},
                    "process": {"name": "explorer.exe", "command_line": "explorer.exe"}
                }),
                false,
            ),
        ],
    );

    let verdict = Validator::new(FieldCatalog::ecs_subset()).validate(&r);

    assert!(verdict.syntax_valid);
    assert!(verdict.fields_valid);
    assert_eq!(verdict.scores.logic, 1.0);
    assert_eq!(verdict.scores.field_mapping, 1.0);
    // three double-ended wildcards cost 0.08 each
    assert!((verdict.scores.syntax - 0.76).abs() < 1e-9);
    assert_eq!(verdict.warnings.len(), 3);
    assert!(verdict.scores.overall >= 0.75);
    assert_eq!(verdict.recommendation, Recommendation::Approve);

    // confusion metrics from expected vs actual
    assert_eq!(verdict.metrics.true_positives, 1);
    assert_eq!(verdict.metrics.true_negatives, 3);
    assert_eq!(verdict.metrics.accuracy, 1.0);
}

#[test]
fn grouped_value_alternatives_both_fire() {
    let event = json!({
        "event": {"code": "1"},
        "process": {
            "name": "vssadmin.exe",
            "command_line": "wmic shadowcopy delete /nointeractive"
        }
    });
    let m = eval(
        "process.command_line:(*delete*shadows* OR *shadowcopy*delete*)",
        event,
    );
    assert!(m.matched);
    assert_eq!(m.trace[0].pattern, "*shadowcopy*delete*");
}

#[test]
fn one_mismatch_is_recorded_but_absorbed() {
    // the 0.75 bar tolerates a single failing case in a five-case suite;
    // the defect still lands in the verdict for the feedback loop
    let r = rule(
        "one-bad-expectation",
        "process.name:vssadmin.exe",
        vec![
            case(TestKind::TruePositive, "hit",
                json!({"process": {"name": "vssadmin.exe"}}), true),
            case(TestKind::TruePositive, "claims hit on wrong name",
                json!({"process": {"name": "wmic.exe"}}), true),
            case(TestKind::FalseNegative, "evasion", json!({"process": {"name": "pwsh"}}), false),
            case(TestKind::FalsePositive, "benign", json!({"process": {"name": "calc"}}), false),
            case(TestKind::TrueNegative, "unrelated", json!({"process": {"name": "ssh"}}), false),
        ],
    );
    let verdict = Validator::new(FieldCatalog::ecs_subset()).validate(&r);
    assert_eq!(verdict.failures_at(Stage::Match).count(), 1);
    assert_eq!(verdict.scores.logic, 0.8);
    assert_eq!(verdict.recommendation, Recommendation::Approve);
}

#[test]
fn mostly_failing_suite_downgrades_to_revise() {
    let hit = json!({"process": {"name": "vssadmin.exe"}});
    let r = rule(
        "broken-expectations",
        "process.name:vssadmin.exe",
        vec![
            case(TestKind::TruePositive, "hit", hit.clone(), true),
            case(TestKind::TruePositive, "claims hit on wrong name",
                json!({"process": {"name": "wmic.exe"}}), true),
            case(TestKind::FalseNegative, "matches despite claim", hit.clone(), false),
            case(TestKind::FalsePositive, "matches despite claim", hit.clone(), false),
            case(TestKind::TrueNegative, "matches despite claim", hit, false),
        ],
    );
    let verdict = Validator::new(FieldCatalog::ecs_subset()).validate(&r);
    assert_eq!(verdict.failures_at(Stage::Match).count(), 4);
    assert!((verdict.scores.logic - 0.2).abs() < 1e-9);
    assert_eq!(verdict.recommendation, Recommendation::Revise);
}
