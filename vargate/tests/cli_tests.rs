use anyhow::Result;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// A scratch project directory with a small SQLite warehouse.
struct VargateTestEnv {
    _tmp: TempDir,
    root: PathBuf,
    db: PathBuf,
}

impl VargateTestEnv {
    fn new() -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().to_path_buf();
        let db = root.join("warehouse.db");

        let conn = rusqlite::Connection::open(&db)?;
        conn.execute_batch(
            "CREATE TABLE mart_pnl_report (
                 department TEXT, account_type TEXT, period TEXT,
                 actual_usd REAL, budget_usd REAL, variance_usd REAL, variance_pct REAL
             );
             INSERT INTO mart_pnl_report VALUES
                 ('Operations', 'COGS', '2024-03', 200000, 120000, 80000, 66.67),
                 ('Sales', 'Revenue', '2024-06', 0, 150000, -150000, -100.0),
                 ('Finance', 'OpEx', '2024-07', 50000, 100000, -50000, -50.0);",
        )?;

        Ok(Self {
            _tmp: tmp,
            root,
            db,
        })
    }

    fn vargate(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vargate"));
        cmd.current_dir(&self.root)
            .arg("--dir")
            .arg(&self.root)
            .arg("--db-path")
            .arg(&self.db);
        for key in [
            "VARGATE_ENGINE",
            "VARGATE_DB_PATH",
            "VARGATE_MAX_ROWS",
            "VARGATE_QUERY_TIMEOUT",
            "RUST_LOG",
        ] {
            cmd.env_remove(key);
        }
        cmd
    }
}

#[test]
fn test_query_prints_rows() -> Result<()> {
    let env = VargateTestEnv::new()?;
    env.vargate()
        .args([
            "query",
            "SELECT department, variance_usd FROM mart_pnl_report WHERE period = :period",
            "-p",
            "period=2024-06",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sales"))
        .stdout(predicate::str::contains("1 row(s)"));
    Ok(())
}

#[test]
fn test_query_json_and_audit_file() -> Result<()> {
    let env = VargateTestEnv::new()?;
    let audit = env.root.join("audit.json");
    let output = env
        .vargate()
        .args(["query", "SELECT count(*) AS n FROM mart_pnl_report", "--format", "json"])
        .arg("--audit-out")
        .arg(&audit)
        .output()?;
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(result["row_count"], 1);

    let trail: serde_json::Value = serde_json::from_str(&fs::read_to_string(&audit)?)?;
    assert_eq!(trail[0]["outcome"], "success");
    Ok(())
}

#[test]
fn test_mutation_is_rejected_and_data_survives() -> Result<()> {
    let env = VargateTestEnv::new()?;
    env.vargate()
        .args(["query", "DELETE FROM mart_pnl_report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Rejected"));

    env.vargate()
        .args(["query", "SELECT count(*) AS n FROM mart_pnl_report", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));
    Ok(())
}

#[test]
fn test_template_list_and_run() -> Result<()> {
    let env = VargateTestEnv::new()?;
    env.vargate()
        .args(["template", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("variance_summary"))
        .stdout(predicate::str::contains("fx_rate_history"));

    env.vargate()
        .args(["template", "run", "variance_summary", "-p", "period=2024-07"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Finance"));

    env.vargate()
        .args(["template", "run", "variance_summary", "-p", "period=July"])
        .assert()
        .failure();

    let audit = env.root.join("template_audit.json");
    env.vargate()
        .args(["template", "run", "variance_summary", "-p", "period=2024-06"])
        .arg("--audit-out")
        .arg(&audit)
        .assert()
        .success();
    let trail: serde_json::Value = serde_json::from_str(&fs::read_to_string(&audit)?)?;
    assert_eq!(trail[0]["outcome"], "success");
    assert_eq!(trail[0]["params"][0]["name"], "period");
    Ok(())
}

#[test]
fn test_variance_decomposition() -> Result<()> {
    let env = VargateTestEnv::new()?;
    let output = env
        .vargate()
        .args([
            "variance",
            "--sql",
            "SELECT * FROM mart_pnl_report",
            "--by",
            "department",
            "--format",
            "json",
        ])
        .output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["variance_amount"], -120000.0);
    assert_eq!(report["abs_threshold"], 18500.0);
    assert_eq!(report["decomposition"]["drivers"][0]["value"], "Sales");
    assert_eq!(report["decomposition"]["pareto_drivers"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["material_drivers"].as_array().map(Vec::len), Some(3));

    env.vargate()
        .args(["variance", "--sql", "DROP TABLE mart_pnl_report", "--by", "department"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Rejected"));
    Ok(())
}

#[test]
fn test_lineage_json() -> Result<()> {
    let env = VargateTestEnv::new()?;
    let output = env.vargate().args(["lineage", "--format", "json"]).output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["nodes"].as_array().map(Vec::len), Some(8));

    env.vargate()
        .args(["lineage", "-t", "raw_ledger_entries", "--downstream"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stg_account_mapping"));
    Ok(())
}

#[test]
fn test_score() -> Result<()> {
    let env = VargateTestEnv::new()?;
    env.vargate()
        .args([
            "score",
            "--breadth",
            "0.67",
            "--depth",
            "1",
            "--explanation",
            "0.8",
            "--exclusion",
            "0.33",
            "--quality",
            "1",
            "--temporal",
            "1",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.767 (HIGH)"));

    env.vargate()
        .args(["score", "--breadth", "1.5"])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn test_evaluate_runs() -> Result<()> {
    let env = VargateTestEnv::new()?;
    let run = r#"{
        "findings": [{
            "id": "F-1",
            "title": "COGS spike in CC-300",
            "category": "COGS_ANOMALY",
            "direction": "UNFAVORABLE",
            "variance_amount": 80000.0,
            "variance_pct": 66.67,
            "root_cause": "Freight surcharge booked to CC-300 in 2024-03",
            "evidence": ["ledger drill", "cost center drill", "period compare"],
            "affected_tables": ["raw_ledger_entries"],
            "confidence": "HIGH"
        }]
    }"#;
    let first = env.root.join("run1.json");
    let second = env.root.join("run2.json");
    fs::write(&first, run)?;
    fs::write(&second, "[]")?;

    let output = env
        .vargate()
        .args(["evaluate", "--format", "json"])
        .arg(&first)
        .arg(&second)
        .output()?;
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["runs"][0]["matched_rules"][0], "A-001");
    assert_eq!(report["runs"][1]["findings_count"], 0);
    assert_eq!(report["summary"]["runs"], 2);

    fs::write(&second, "not json")?;
    env.vargate()
        .arg("evaluate")
        .arg(&second)
        .assert()
        .failure();
    Ok(())
}
