use rdetect_eval::{
    CandidateRule, Document, FieldCatalog, MatchOutcome, TestCase, TestKind, match_query,
};
use rdetect_parser::Query;
use serde_json::Value;

pub fn eval(query: &str, event: Value) -> MatchOutcome {
    let q = Query::parse(query).unwrap();
    let doc = Document::from_json(&event);
    match_query(&q, &doc, &FieldCatalog::ecs_subset()).unwrap()
}

pub fn case(kind: TestKind, description: &str, log_entry: Value, expected: bool) -> TestCase {
    TestCase {
        kind,
        description: description.to_string(),
        log_entry,
        expected_match: expected,
        evasion_technique: None,
    }
}

pub fn rule(name: &str, query: &str, test_cases: Vec<TestCase>) -> CandidateRule {
    CandidateRule {
        name: name.to_string(),
        description: None,
        query: query.to_string(),
        severity: None,
        risk_score: None,
        references: Vec::new(),
        false_positives: Vec::new(),
        note: None,
        test_cases,
    }
}
