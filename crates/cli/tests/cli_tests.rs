// End-to-end tests for the `ordercash` binary.
// Run with: cargo test -p ordercash-cli --test cli_tests -- --nocapture
//
// Each test copies the engine fixtures into a temp dir so outputs never land in the tree.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn ordercash() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ordercash"))
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for entry in std::fs::read_dir(fixtures_dir()).unwrap() {
        let path = entry.unwrap().path();
        if path.is_file() {
            std::fs::copy(&path, dir.path().join(path.file_name().unwrap())).unwrap();
        }
    }
    dir
}

fn run_ok(cmd: &mut Command) -> Output {
    let output = cmd.output().expect("spawn ordercash");
    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn exit_code(cmd: &mut Command) -> i32 {
    let output = cmd.output().expect("spawn ordercash");
    output.status.code().unwrap_or(-1)
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
        .lines()
        .map(String::from)
        .collect()
}

// ===========================================================================
// run
// ===========================================================================

#[test]
fn run_writes_one_file_per_provider() {
    let dir = workspace();
    let config = dir.path().join("november.toml");
    run_ok(ordercash().arg("run").arg(&config));

    let out = dir.path().join("out");
    let braintree = read_lines(&out.join("01 Braintree/03 DWH/25.11 - Braintree DWH data.csv"));
    assert_eq!(braintree.len(), 5, "header + O1 x3 + O7");
    assert!(braintree[0].starts_with("ORDER_ID,ORDER_ID_OBFUSCATED,MP_ORDER_ID,"));
    assert!(braintree[1].starts_with("O1,obf1,,braintree,1,5,"));

    let paypal = read_lines(&out.join("02 Paypal/03 DWH/25.11 - PayPal DWH data.csv"));
    assert_eq!(paypal.len(), 2);
    assert!(paypal[1].starts_with("O2,"));

    let deliveroo = read_lines(&out.join("04 Deliveroo/03 DWH/25.11 - Deliveroo DWH data.csv"));
    assert!(deliveroo[1].starts_with("O3,obf3,DR-1003,"));

    assert!(out.join("05 Just Eat/03 DWH/25.11 - Just Eat DWH data.csv").exists());

    // No Uber or Amazon orders in the window: no file
    assert!(!out.join("03 Uber Eats").exists());
    assert!(!out.join("06 Amazon").exists());
}

#[test]
fn run_out_flag_overrides_config_dir() {
    let dir = workspace();
    let target = dir.path().join("elsewhere");
    run_ok(
        ordercash()
            .arg("run")
            .arg(dir.path().join("november.toml"))
            .arg("--out")
            .arg(&target),
    );
    assert!(target.join("02 Paypal/03 DWH/25.11 - PayPal DWH data.csv").exists());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn run_single_file_contains_every_row() {
    let dir = workspace();
    let all = dir.path().join("all.csv");
    run_ok(
        ordercash()
            .arg("run")
            .arg(dir.path().join("november.toml"))
            .arg("--single-file")
            .arg(&all),
    );

    let lines = read_lines(&all);
    assert_eq!(lines.len(), 8, "header + 7 rows");
    let ids: Vec<&str> = lines[1..].iter().map(|l| l.split(',').next().unwrap()).collect();
    assert_eq!(ids, vec!["O1", "O1", "O1", "O2", "O3", "O6", "O7"]);
}

#[test]
fn run_json_reports_meta_summary_and_files() {
    let dir = workspace();
    let output = run_ok(
        ordercash()
            .arg("run")
            .arg(dir.path().join("november.toml"))
            .arg("--json"),
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let val: serde_json::Value = serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be valid JSON: {e}\n{stdout}"));

    assert_eq!(val["meta"]["config_name"], "Orders to Cash - November");
    assert_eq!(val["meta"]["window"]["start"], "2025-11-01");
    assert_eq!(val["summary"]["orders_selected"], 5);
    assert_eq!(val["summary"]["rows"], 7);
    let bands = val["summary"]["band_totals_exc_vat"].as_object().expect("bands keyed by label");
    assert!(bands.contains_key("20% VAT Band"));
    assert_eq!(bands.len(), 4);

    let files = val["files"].as_array().expect("files must be array");
    let providers: Vec<&str> = files.iter().map(|f| f["provider"].as_str().unwrap()).collect();
    assert_eq!(providers, vec!["Braintree", "PayPal", "Deliveroo", "Just Eat"]);
    assert_eq!(files[0]["rows"], 4);
}

#[test]
fn run_month_flag_overrides_config_period() {
    let dir = workspace();
    let all = dir.path().join("october.csv");
    run_ok(
        ordercash()
            .arg("run")
            .arg(dir.path().join("november.toml"))
            .args(["--month", "2025-10", "--single-file"])
            .arg(&all),
    );
    // O8 straddles the month boundary, so October selects nothing
    assert_eq!(read_lines(&all).len(), 1);
}

// ===========================================================================
// items / validate
// ===========================================================================

#[test]
fn items_to_stdout() {
    let dir = workspace();
    let output = run_ok(ordercash().arg("items").arg(dir.path().join("november.toml")));
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some("ORDER_ID,VAT_BAND,ITEM_QUANTITY_COUNT,TOTAL_PRICE_INC_VAT,TOTAL_PRICE_EXC_VAT")
    );
    assert!(stdout.contains("O1,20% VAT Band,2.00,12.00,10.00\n"));
    assert!(!stdout.contains("O4,"));
}

#[test]
fn items_json_to_file() {
    let dir = workspace();
    let path = dir.path().join("items.json");
    run_ok(
        ordercash()
            .arg("items")
            .arg(dir.path().join("november.toml"))
            .arg("--json")
            .arg("--output")
            .arg(&path),
    );
    let val: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let aggs = val.as_array().expect("array of aggregates");
    assert_eq!(aggs.len(), 6);
    assert!(aggs.iter().any(|a| a["vat_band"] == "Other/Unknown VAT Band"));
}

#[test]
fn validate_accepts_fixture_config() {
    let dir = workspace();
    let output = run_ok(ordercash().arg("validate").arg(dir.path().join("november.toml")));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("valid: 'Orders to Cash - November' with 6 provider(s)"), "{stderr}");
}

// ===========================================================================
// Exit codes
// ===========================================================================

#[test]
fn unreadable_config_is_usage_error() {
    let dir = workspace();
    assert_eq!(exit_code(ordercash().arg("run").arg(dir.path().join("nope.toml"))), 2);
}

#[test]
fn invalid_config_exits_3() {
    let dir = workspace();
    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "name = \"\"\n[sources]\norders = \"orders.csv\"\n").unwrap();
    assert_eq!(exit_code(ordercash().arg("validate").arg(&bad)), 3);

    std::fs::write(&bad, "this is not toml [").unwrap();
    assert_eq!(exit_code(ordercash().arg("run").arg(&bad)), 3);
}

#[test]
fn missing_source_exits_4() {
    let dir = workspace();
    let config = dir.path().join("november.toml");
    std::fs::remove_file(dir.path().join("items.csv")).unwrap();

    let output = ordercash().arg("run").arg(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("items.csv"), "{stderr}");
}

#[test]
fn amounts_past_decimal_range_exit_4() {
    let dir = workspace();
    let config = dir.path().join("november.toml");
    std::fs::write(
        dir.path().join("pnl_uk.csv"),
        "order_id,blended_vat_rate,post_promo_sales_exc_vat,delivery_fee_exc_vat,priority_fee_exc_vat,small_order_fee_exc_vat,mp_bag_fee_exc_vat,tips_amount,cost_of_goods\n\
         O1,0.2,,,40000000000000000000000000000,40000000000000000000000000000,,,\n",
    )
    .unwrap();

    let output = ordercash().arg("run").arg(&config).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: decimal overflow: order 'O1'"), "{stderr}");
    assert!(!dir.path().join("out").exists(), "nothing written on failure");
}

#[test]
fn empty_window_with_fail_on_empty_exits_6() {
    let dir = workspace();
    let config = dir.path().join("november.toml");
    assert_eq!(
        exit_code(ordercash().arg("run").arg(&config).args(["--month", "2025-10", "--fail-on-empty"])),
        6
    );
    // Without the flag an empty window still succeeds
    assert_eq!(exit_code(ordercash().arg("run").arg(&config).args(["--month", "2025-10"])), 0);
}

#[test]
fn bad_month_is_usage_error() {
    let dir = workspace();
    let config = dir.path().join("november.toml");
    assert_eq!(exit_code(ordercash().arg("run").arg(&config).args(["--month", "2025-13"])), 2);
}
