use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use aquabill_cli::commands::{
    bill::{self, BillCommand},
    config,
    customer::{self, CustomerCommand},
    doctor,
    export::{self, ExportCommand},
    invoice::{self, InvoiceArgs},
    migrate,
    report::{self, ReportArgs},
    statement::{self, StatementArgs},
    supply::{self, SupplyCommand},
    CommandResult,
};
use aquabill_core::config::LoadOptions;
use chrono::NaiveDate;
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("AQUABILL_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "applied 1 pending migration(s)");
    });
}

#[test]
fn migrate_reports_up_to_date_schema_on_second_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    with_store(dir.path(), &[], || {
        assert_eq!(migrate::run(LoadOptions::default()).exit_code, 0);

        let payload = parse_payload(&migrate::run(LoadOptions::default()).output);
        assert_eq!(payload["message"], "database schema is up to date");
    });
}

#[test]
fn commands_return_config_failure_for_invalid_rate() {
    with_env(
        &[("AQUABILL_DATABASE_URL", "sqlite::memory:"), ("AQUABILL_BILLING_RATE_PER_HOUR", "0")],
        || {
            let result = customer::run(LoadOptions::default(), CustomerCommand::List);
            assert_eq!(result.exit_code, 2, "expected config validation failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "customer list");
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
}

#[test]
fn customer_commands_report_conflicts_and_missing_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    with_store(dir.path(), &[], || {
        let added = add_customer("C-001", "Ramesh Kumar");
        assert_eq!(added.exit_code, 0, "{}", added.output);
        let payload = parse_payload(&added.output);
        assert_eq!(payload["data"]["id"], "C-001");
        assert_eq!(payload["data"]["name"], "Ramesh Kumar");

        let duplicate = add_customer("C-001", "Someone Else");
        assert_eq!(duplicate.exit_code, 8);
        assert_eq!(parse_payload(&duplicate.output)["error_class"], "conflict");

        let missing = customer::run(
            LoadOptions::default(),
            CustomerCommand::Show(customer::IdArgs { id: "C-404".to_string() }),
        );
        assert_eq!(missing.exit_code, 7);
        assert_eq!(parse_payload(&missing.output)["error_class"], "not_found");

        let blank_name = add_customer("C-002", "   ");
        assert_eq!(blank_name.exit_code, 6);
        assert_eq!(parse_payload(&blank_name.output)["error_class"], "validation");

        let updated = customer::run(
            LoadOptions::default(),
            CustomerCommand::Update(customer::UpdateArgs {
                id: "C-001".to_string(),
                name: None,
                address: Some("Rampur".to_string()),
                phone: None,
                connected_on: None,
            }),
        );
        assert_eq!(updated.exit_code, 0, "{}", updated.output);
        assert_eq!(parse_payload(&updated.output)["data"]["address"], "Rampur");

        add_customer("C-000", "Anita Devi");
        let listed = customer::run(LoadOptions::default(), CustomerCommand::List);
        let payload = parse_payload(&listed.output);
        assert_eq!(payload["message"], "2 customer(s)");
        assert_eq!(payload["data"][0]["name"], "Anita Devi");
        assert_eq!(payload["data"][1]["name"], "Ramesh Kumar");
    });
}

#[test]
fn supply_and_bill_lifecycle_enforces_settlement_rules() {
    let dir = tempfile::tempdir().expect("tempdir");
    with_store(dir.path(), &[], || {
        add_customer("C-001", "Ramesh Kumar");

        let recorded = add_supply("C-001", date(2026, 6, 1), "06:00", "08:30");
        assert_eq!(recorded.exit_code, 0, "{}", recorded.output);
        let payload = parse_payload(&recorded.output);
        assert_eq!(decimal_field(&payload["data"]["bill"]["amount"]), 312.5);
        assert_eq!(payload["data"]["bill"]["status"], "outstanding");
        let supply_id = payload["data"]["record"]["id"].as_str().expect("supply id").to_string();
        let bill_id = payload["data"]["bill"]["id"].as_str().expect("bill id").to_string();

        let corrected = supply::run(
            LoadOptions::default(),
            SupplyCommand::Update(supply::UpdateArgs {
                id: supply_id.clone(),
                date: None,
                start: None,
                end: Some("07:00".to_string()),
                crop: Some("Wheat".to_string()),
                notes: None,
            }),
        );
        assert_eq!(corrected.exit_code, 0, "{}", corrected.output);
        let payload = parse_payload(&corrected.output);
        assert_eq!(decimal_field(&payload["data"]["bill"]["amount"]), 125.0);
        assert_eq!(payload["data"]["record"]["crop"], "Wheat");

        let blocked_delete = customer::run(
            LoadOptions::default(),
            CustomerCommand::Delete(customer::IdArgs { id: "C-001".to_string() }),
        );
        assert_eq!(blocked_delete.exit_code, 8, "{}", blocked_delete.output);

        let blocked_supply_delete = supply::run(
            LoadOptions::default(),
            SupplyCommand::Delete(supply::IdArgs { id: supply_id.clone() }),
        );
        assert_eq!(blocked_supply_delete.exit_code, 8);

        let settled = settle(&bill_id);
        assert_eq!(settled.exit_code, 0, "{}", settled.output);
        assert_eq!(parse_payload(&settled.output)["data"]["status"], "settled");

        let settled_again = settle(&bill_id);
        assert_eq!(settled_again.exit_code, 8);
        assert_eq!(parse_payload(&settled_again.output)["error_class"], "conflict");

        let locked = supply::run(
            LoadOptions::default(),
            SupplyCommand::Update(supply::UpdateArgs {
                id: supply_id,
                date: None,
                start: None,
                end: None,
                crop: None,
                notes: Some("late entry".to_string()),
            }),
        );
        assert_eq!(locked.exit_code, 8);

        let outstanding = bill::run(
            LoadOptions::default(),
            BillCommand::List(bill::ListArgs {
                customer: Some("C-001".to_string()),
                status: Some("outstanding".parse().expect("status")),
            }),
        );
        assert_eq!(parse_payload(&outstanding.output)["message"], "0 bill(s)");

        let deleted = customer::run(
            LoadOptions::default(),
            CustomerCommand::Delete(customer::IdArgs { id: "C-001".to_string() }),
        );
        assert_eq!(deleted.exit_code, 0, "{}", deleted.output);

        let gone = bill::run(
            LoadOptions::default(),
            BillCommand::Show(bill::IdArgs { id: bill_id }),
        );
        assert_eq!(gone.exit_code, 7);
    });
}

#[test]
fn supply_add_rejects_bad_clock_and_unknown_customer() {
    let dir = tempfile::tempdir().expect("tempdir");
    with_store(dir.path(), &[], || {
        add_customer("C-001", "Ramesh Kumar");

        let bad_clock = add_supply("C-001", date(2026, 6, 1), "25:00", "08:00");
        assert_eq!(bad_clock.exit_code, 6);
        assert_eq!(parse_payload(&bad_clock.output)["error_class"], "validation");

        let unknown = add_supply("C-404", date(2026, 6, 1), "06:00", "07:00");
        assert_eq!(unknown.exit_code, 7);
    });
}

#[test]
fn statement_report_invoice_and_export_cover_the_period() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output_dir = dir.path().join("out");
    let output_dir_value = output_dir.display().to_string();
    with_store(dir.path(), &[("AQUABILL_INVOICE_OUTPUT_DIR", &output_dir_value)], || {
        add_customer("C-001", "Ramesh Kumar");
        add_customer("C-002", "Anita Devi");
        let first = parse_payload(&add_supply("C-001", date(2026, 6, 2), "06:00", "08:30").output);
        add_supply("C-001", date(2026, 6, 3), "22:00", "00:20");
        add_supply("C-002", date(2026, 6, 3), "06:00", "07:00");
        add_supply("C-001", date(2026, 7, 1), "06:00", "07:00");
        let first_bill = first["data"]["bill"]["id"].as_str().expect("bill id").to_string();
        settle(&first_bill);

        let statement_result =
            statement::run(LoadOptions::default(), statement_args("C-001"));
        assert_eq!(statement_result.exit_code, 0, "{}", statement_result.output);
        let payload = parse_payload(&statement_result.output);
        assert_eq!(payload["data"]["lines"].as_array().expect("lines").len(), 2);
        assert_eq!(decimal_field(&payload["data"]["total"]), 603.75);
        assert_eq!(decimal_field(&payload["data"]["outstanding"]), 291.25);

        let report_result = report::run(LoadOptions::default(), june_report(None));
        let payload = parse_payload(&report_result.output);
        assert_eq!(payload["data"]["lines"].as_array().expect("lines").len(), 3);
        assert_eq!(decimal_field(&payload["data"]["total"]), 728.75);

        let invoice_result = invoice::run(
            LoadOptions::default(),
            InvoiceArgs {
                bill: None,
                customer: Some("C-001".to_string()),
                from: Some(date(2026, 6, 1)),
                to: Some(date(2026, 6, 30)),
                output: None,
            },
        );
        assert_eq!(invoice_result.exit_code, 0, "{}", invoice_result.output);
        let payload = parse_payload(&invoice_result.output);
        assert_eq!(payload["data"]["format"], "html");
        let invoice_path = output_dir.join("statement-C-001-20260601-20260630.html");
        assert_eq!(payload["data"]["path"], invoice_path.display().to_string());
        let html = std::fs::read_to_string(&invoice_path).expect("read invoice");
        assert!(html.contains("Ramesh Kumar"));
        assert!(html.contains("603.75"));

        let bill_invoice = invoice::run(
            LoadOptions::default(),
            InvoiceArgs {
                bill: Some(first_bill.clone()),
                customer: None,
                from: None,
                to: None,
                output: Some(output_dir.join("single.html")),
            },
        );
        assert_eq!(bill_invoice.exit_code, 0, "{}", bill_invoice.output);
        assert!(std::fs::read_to_string(output_dir.join("single.html"))
            .expect("read bill")
            .contains(&first_bill));

        let exported = export::run(
            LoadOptions::default(),
            ExportCommand::Statement {
                args: statement_args("C-001"),
                output: Some(output_dir.join("june")),
            },
        );
        assert_eq!(exported.exit_code, 0, "{}", exported.output);
        let csv = std::fs::read_to_string(output_dir.join("june.csv")).expect("read csv");
        assert_eq!(csv.lines().count(), 3);

        let crop_report = export::run(
            LoadOptions::default(),
            ExportCommand::Report { args: june_report(Some("C-002")), output: None },
        );
        assert_eq!(crop_report.exit_code, 0, "{}", crop_report.output);
        let payload = parse_payload(&crop_report.output);
        assert_eq!(payload["data"]["rows"], 1);
        assert!(output_dir.join("report-20260601-20260630.csv").exists());
    });
}

#[test]
fn default_statement_file_names_stay_in_output_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output_dir = dir.path().join("out");
    let output_dir_value = output_dir.display().to_string();
    with_store(dir.path(), &[("AQUABILL_INVOICE_OUTPUT_DIR", &output_dir_value)], || {
        add_customer("../escape", "Ramesh Kumar");
        add_supply("../escape", date(2026, 6, 2), "06:00", "07:00");

        let invoice_result = invoice::run(
            LoadOptions::default(),
            InvoiceArgs {
                bill: None,
                customer: Some("../escape".to_string()),
                from: Some(date(2026, 6, 1)),
                to: Some(date(2026, 6, 30)),
                output: None,
            },
        );
        assert_eq!(invoice_result.exit_code, 0, "{}", invoice_result.output);
        assert!(output_dir.join("statement-___escape-20260601-20260630.html").exists());

        let exported = export::run(
            LoadOptions::default(),
            ExportCommand::Statement { args: statement_args("../escape"), output: None },
        );
        assert_eq!(exported.exit_code, 0, "{}", exported.output);
        assert!(output_dir.join("statement-___escape-20260601-20260630.csv").exists());
    });
}

#[test]
fn statement_rejects_reversed_period() {
    let dir = tempfile::tempdir().expect("tempdir");
    with_store(dir.path(), &[], || {
        add_customer("C-001", "Ramesh Kumar");

        let result = statement::run(
            LoadOptions::default(),
            StatementArgs {
                customer: "C-001".to_string(),
                from: date(2026, 6, 30),
                to: date(2026, 6, 1),
            },
        );
        assert_eq!(result.exit_code, 6);
    });
}

#[test]
fn config_reports_env_source() {
    with_env(
        &[
            ("AQUABILL_DATABASE_URL", "sqlite::memory:"),
            ("AQUABILL_BILLING_RATE_PER_HOUR", "150"),
        ],
        || {
            let result = config::run(LoadOptions::default());
            assert_eq!(result.exit_code, 0);
            assert!(result.output.contains(
                "- billing.rate_per_hour = 150 (source: env (AQUABILL_BILLING_RATE_PER_HOUR))"
            ));
            assert!(result.output.contains("- billing.currency_code = INR (source: default)"));
        },
    );
}

#[test]
fn doctor_json_lists_readiness_checks() {
    with_env(&[("AQUABILL_DATABASE_URL", "sqlite::memory:")], || {
        let result = doctor::run(LoadOptions::default(), true);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        let checks = payload["checks"].as_array().expect("checks");
        let names: Vec<&str> = checks.iter().filter_map(|check| check["name"].as_str()).collect();
        assert_eq!(
            names,
            vec!["config_validation", "database_connectivity", "invoice_templates", "pdf_converter"]
        );
        assert_eq!(checks[0]["status"], "pass");
        assert_eq!(checks[2]["status"], "pass");
    });
}

fn add_customer(id: &str, name: &str) -> CommandResult {
    customer::run(
        LoadOptions::default(),
        CustomerCommand::Add(customer::AddArgs {
            id: id.to_string(),
            name: name.to_string(),
            address: None,
            phone: None,
            connected_on: None,
        }),
    )
}

fn add_supply(customer_id: &str, date: NaiveDate, start: &str, end: &str) -> CommandResult {
    supply::run(
        LoadOptions::default(),
        SupplyCommand::Add(supply::AddArgs {
            customer: customer_id.to_string(),
            date,
            start: start.to_string(),
            end: end.to_string(),
            crop: None,
            notes: None,
        }),
    )
}

fn settle(bill_id: &str) -> CommandResult {
    bill::run(LoadOptions::default(), BillCommand::Settle(bill::IdArgs { id: bill_id.to_string() }))
}

fn statement_args(customer_id: &str) -> StatementArgs {
    StatementArgs {
        customer: customer_id.to_string(),
        from: date(2026, 6, 1),
        to: date(2026, 6, 30),
    }
}

fn june_report(customer_id: Option<&str>) -> ReportArgs {
    ReportArgs {
        from: date(2026, 6, 1),
        to: date(2026, 6, 30),
        customer: customer_id.map(str::to_string),
        crop: None,
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn decimal_field(value: &Value) -> f64 {
    value.as_str().expect("decimal serialized as string").parse().expect("decimal")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

/// Runs `test_fn` against a file-backed store inside `dir`.
fn with_store(dir: &Path, extra: &[(&str, &str)], test_fn: impl FnOnce()) {
    let url = format!("sqlite://{}?mode=rwc", dir.join("aquabill.db").display());
    let mut vars = vec![("AQUABILL_DATABASE_URL", url.as_str())];
    vars.extend_from_slice(extra);
    with_env(&vars, test_fn);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "AQUABILL_DATABASE_URL",
        "AQUABILL_DATABASE_MAX_CONNECTIONS",
        "AQUABILL_DATABASE_TIMEOUT_SECS",
        "AQUABILL_BILLING_RATE_PER_HOUR",
        "AQUABILL_BILLING_CURRENCY_CODE",
        "AQUABILL_BILLING_CURRENCY_SYMBOL",
        "AQUABILL_INVOICE_ISSUER_NAME",
        "AQUABILL_INVOICE_TEMPLATE_DIR",
        "AQUABILL_INVOICE_OUTPUT_DIR",
        "AQUABILL_LOGGING_LEVEL",
        "AQUABILL_LOGGING_FORMAT",
        "AQUABILL_LOG_LEVEL",
        "AQUABILL_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
