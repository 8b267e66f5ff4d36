use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;

use chrono::Utc;
use clap::{Parser, Subcommand};

use rdetect_eval::{
    CandidateRule, ConfusionMetrics, Document, FieldCatalog, Recommendation, ValidationVerdict,
    Validator, load_rule_dir, load_rule_file, match_query,
};
use rdetect_parser::Query;

#[derive(Parser)]
#[command(name = "rdetect")]
#[command(about = "Parse, match, and validate Lucene-style detection rules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a query expression and print the AST as JSON
    Query {
        /// The query expression to parse
        expr: String,

        /// Pretty-print JSON output
        #[arg(short, long, default_value_t = true)]
        pretty: bool,
    },

    /// Match a query against log events
    ///
    /// Events can be provided as a single JSON string (--event) or as
    /// NDJSON (newline-delimited JSON) from stdin. Prints one
    /// `{matched, trace}` outcome per event.
    Match {
        /// The query expression to evaluate
        #[arg(short, long)]
        query: String,

        /// A single event as a JSON string (if omitted, reads NDJSON from stdin)
        #[arg(short, long)]
        event: Option<String>,

        /// Field catalog file (YAML or JSON); defaults to the built-in ECS subset
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Validate rule files and print per-rule verdicts
    ///
    /// Accepts a single rule file or a directory of `*.yml` / `*.yaml` /
    /// `*.json` rules. Exits 1 when any rule falls short of APPROVE.
    Validate {
        /// Path to a rule file or directory of rules
        path: PathBuf,

        /// Field catalog file (YAML or JSON); defaults to the built-in ECS subset
        #[arg(short, long)]
        catalog: Option<PathBuf>,

        /// Print the full verdicts as JSON instead of summary lines
        #[arg(short, long)]
        json: bool,

        /// Show failures and warnings for each rule
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate rules and write the verdict set as a JSON report artifact
    Report {
        /// Path to a rule file or directory of rules
        path: PathBuf,

        /// Where to write the report
        #[arg(short, long)]
        out: PathBuf,

        /// Field catalog file (YAML or JSON); defaults to the built-in ECS subset
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Query { expr, pretty } => cmd_query(&expr, pretty),
        Commands::Match {
            query,
            event,
            catalog,
            pretty,
        } => cmd_match(&query, event, catalog, pretty),
        Commands::Validate {
            path,
            catalog,
            json,
            verbose,
        } => cmd_validate(&path, catalog, json, verbose),
        Commands::Report { path, out, catalog } => cmd_report(&path, &out, catalog),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_query(expr: &str, pretty: bool) {
    match Query::parse(expr) {
        Ok(query) => print_json(&query, pretty),
        Err(e) => {
            eprintln!("Query error: {e}");
            process::exit(1);
        }
    }
}

fn cmd_match(expr: &str, event_json: Option<String>, catalog: Option<PathBuf>, pretty: bool) {
    let catalog = load_catalog(catalog);
    let query = match Query::parse(expr) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("Query error: {e}");
            process::exit(1);
        }
    };

    if let Some(json_str) = event_json {
        match_one(&query, &json_str, &catalog, pretty, None);
    } else {
        let stdin = io::stdin();
        let mut line_num = 0u64;
        for line in stdin.lock().lines() {
            line_num += 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("Error reading line {line_num}: {e}");
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match_one(&query, &line, &catalog, pretty, Some(line_num));
        }
    }
}

fn match_one(
    query: &Query,
    event_json: &str,
    catalog: &FieldCatalog,
    pretty: bool,
    line: Option<u64>,
) {
    let value: serde_json::Value = match serde_json::from_str(event_json) {
        Ok(v) => v,
        Err(e) => match line {
            Some(n) => {
                eprintln!("Invalid JSON on line {n}: {e}");
                return;
            }
            None => {
                eprintln!("Invalid JSON event: {e}");
                process::exit(1);
            }
        },
    };

    let doc = Document::from_json(&value);
    match match_query(query, &doc, catalog) {
        Ok(outcome) => print_json(&outcome, pretty),
        Err(e) => {
            eprintln!("Match error: {e}");
            process::exit(1);
        }
    }
}

fn cmd_validate(path: &Path, catalog: Option<PathBuf>, json: bool, verbose: bool) {
    let catalog = load_catalog(catalog);
    let rules = load_rules(path);
    let validator = Validator::new(catalog);

    let verdicts: Vec<ValidationVerdict> =
        rules.iter().map(|rule| validator.validate(rule)).collect();

    if json {
        print_json(&verdicts, true);
    } else {
        for verdict in &verdicts {
            println!(
                "{}: {} (overall {:.2}, syntax {:.2}, fields {:.2}, logic {:.2}, coverage {:.2})",
                verdict.rule_name,
                recommendation_label(verdict.recommendation),
                verdict.scores.overall,
                verdict.scores.syntax,
                verdict.scores.field_mapping,
                verdict.scores.logic,
                verdict.scores.coverage,
            );
            if verbose {
                for failure in &verdict.failures {
                    println!("  - {failure}");
                }
                for warning in &verdict.warnings {
                    println!("  ! {warning}");
                }
            }
        }
        print_summary(&verdicts);
    }

    if verdicts.iter().any(|v| !v.is_approved()) {
        process::exit(1);
    }
}

fn cmd_report(path: &Path, out: &Path, catalog: Option<PathBuf>) {
    let catalog = load_catalog(catalog);
    let rules = load_rules(path);
    let validator = Validator::new(catalog);

    let verdicts: Vec<ValidationVerdict> =
        rules.iter().map(|rule| validator.validate(rule)).collect();
    let approved = verdicts.iter().filter(|v| v.is_approved()).count();

    let report = serde_json::json!({
        "generated_at": Utc::now(),
        "total_rules": verdicts.len(),
        "approved": approved,
        "aggregate_metrics": aggregate_metrics(&verdicts),
        "results": verdicts,
    });

    let json = match serde_json::to_string_pretty(&report) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("JSON serialization error: {e}");
            process::exit(1);
        }
    };
    if let Err(e) = std::fs::write(out, json) {
        eprintln!("Error writing {}: {e}", out.display());
        process::exit(1);
    }
    eprintln!(
        "Wrote report for {} rule(s) ({approved} approved) to {}",
        verdicts.len(),
        out.display()
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_catalog(path: Option<PathBuf>) -> FieldCatalog {
    match path {
        Some(p) => match FieldCatalog::load(&p) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        None => FieldCatalog::ecs_subset(),
    }
}

fn load_rules(path: &Path) -> Vec<CandidateRule> {
    let loaded = if path.is_dir() {
        load_rule_dir(path)
    } else {
        load_rule_file(path).map(|rule| vec![rule])
    };
    match loaded {
        Ok(rules) if rules.is_empty() => {
            eprintln!("No rules found in {}", path.display());
            process::exit(1);
        }
        Ok(rules) => rules,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn aggregate_metrics(verdicts: &[ValidationVerdict]) -> ConfusionMetrics {
    let (mut tp, mut fn_, mut fp, mut tn) = (0u32, 0u32, 0u32, 0u32);
    for v in verdicts {
        tp += v.metrics.true_positives;
        fn_ += v.metrics.false_negatives;
        fp += v.metrics.false_positives;
        tn += v.metrics.true_negatives;
    }
    ConfusionMetrics::from_counts(tp, fn_, fp, tn)
}

fn print_summary(verdicts: &[ValidationVerdict]) {
    let approved = verdicts.iter().filter(|v| v.is_approved()).count();
    let m = aggregate_metrics(verdicts);

    println!();
    println!("{} rule(s), {approved} approved", verdicts.len());
    println!(
        "Test cases: {} (TP {} / FN {} / FP {} / TN {})",
        m.total, m.true_positives, m.false_negatives, m.false_positives, m.true_negatives
    );
    println!(
        "Precision {:.3}  Recall {:.3}  F1 {:.3}  Accuracy {:.3}",
        m.precision, m.recall, m.f1_score, m.accuracy
    );
}

fn recommendation_label(recommendation: Recommendation) -> &'static str {
    match recommendation {
        Recommendation::Approve => "APPROVE",
        Recommendation::Revise => "REVISE",
        Recommendation::Reject => "REJECT",
    }
}

fn print_json(value: &impl serde::Serialize, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(j) => println!("{j}"),
        Err(e) => {
            eprintln!("JSON serialization error: {e}");
            process::exit(1);
        }
    }
}
