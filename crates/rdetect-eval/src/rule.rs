//! Candidate detection rules and their attached test cases.
//!
//! Rules arrive as YAML or JSON files. The engine interprets `query` and
//! `test_cases`; the remaining metadata (`severity`, `risk_score`,
//! `references`, `false_positives`, `note`) is carried through to reports
//! untouched.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EvalError, Result};

/// A candidate detection rule awaiting validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The detection query in the Lucene-style language.
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub false_positives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// Coverage category a test case claims to exercise.
///
/// The label is advisory: the runner judges each case on
/// `expected_match` alone and builds the confusion matrix from expected
/// versus actual outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestKind {
    #[serde(rename = "TP")]
    TruePositive,
    #[serde(rename = "FN")]
    FalseNegative,
    #[serde(rename = "FP")]
    FalsePositive,
    #[serde(rename = "TN")]
    TrueNegative,
}

impl std::fmt::Display for TestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TestKind::TruePositive => "TP",
            TestKind::FalseNegative => "FN",
            TestKind::FalsePositive => "FP",
            TestKind::TrueNegative => "TN",
        };
        write!(f, "{s}")
    }
}

/// One test case: a log entry and the outcome the rule author expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub kind: TestKind,
    pub description: String,
    /// The raw log document the case matches against.
    pub log_entry: Value,
    pub expected_match: bool,
    /// For FN cases: the documented evasion this case demonstrates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evasion_technique: Option<String>,
}

/// Load one rule from a YAML or JSON file, keyed on the extension.
pub fn load_rule_file(path: &Path) -> Result<CandidateRule> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path.extension().is_some_and(|e| e == "json");
    let parsed = if is_json {
        serde_json::from_str(&text).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&text).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| EvalError::Rule {
        path: path.display().to_string(),
        message,
    })
}

/// Load every `*.yml` / `*.yaml` / `*.json` rule in a directory, sorted by
/// file name so batch order is stable.
pub fn load_rule_dir(dir: &Path) -> Result<Vec<CandidateRule>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension()
                .is_some_and(|e| e == "yml" || e == "yaml" || e == "json")
        })
        .collect();
    paths.sort();

    paths.iter().map(|p| load_rule_file(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE_YAML: &str = r#"
name: vssadmin-shadow-delete
description: Shadow copy deletion via vssadmin
query: 'event.code:1 AND process.name:*vssadmin*'
severity: high
risk_score: 73
references:
  - https://attack.mitre.org/techniques/T1490/
test_cases:
  - kind: TP
    description: vssadmin deletes shadows
    log_entry:
      event:
        code: "1"
      process:
        name: vssadmin.exe
    expected_match: true
  - kind: FN
    description: WMI-based deletion evades the rule
    log_entry:
      event:
        code: "1"
      process:
        name: powershell.exe
    expected_match: false
    evasion_technique: WMI Win32_ShadowCopy deletion
"#;

    #[test]
    fn yaml_rule_deserializes() {
        let rule: CandidateRule = serde_yaml::from_str(RULE_YAML).unwrap();
        assert_eq!(rule.name, "vssadmin-shadow-delete");
        assert_eq!(rule.risk_score, Some(73));
        assert_eq!(rule.test_cases.len(), 2);
        assert_eq!(rule.test_cases[0].kind, TestKind::TruePositive);
        assert_eq!(
            rule.test_cases[1].evasion_technique.as_deref(),
            Some("WMI Win32_ShadowCopy deletion")
        );
    }

    #[test]
    fn kind_serializes_as_short_label() {
        assert_eq!(
            serde_json::to_string(&TestKind::TruePositive).unwrap(),
            "\"TP\""
        );
        assert_eq!(TestKind::FalseNegative.to_string(), "FN");
    }

    #[test]
    fn metadata_defaults_are_empty() {
        let rule: CandidateRule =
            serde_yaml::from_str("name: minimal\nquery: 'a:1'\n").unwrap();
        assert!(rule.test_cases.is_empty());
        assert!(rule.references.is_empty());
        assert!(rule.note.is_none());
    }

    #[test]
    fn directory_load_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.yml"), "name: b\nquery: 'x:2'\n").unwrap();
        std::fs::write(dir.path().join("a.yaml"), "name: a\nquery: 'x:1'\n").unwrap();
        std::fs::write(dir.path().join("ignore.txt"), "not a rule").unwrap();
        let rules = load_rule_dir(dir.path()).unwrap();
        assert_eq!(
            rules.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }
}
