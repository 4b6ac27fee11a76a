use aquabill_core::config::{AppConfig, LoadOptions};
use aquabill_db::{connect_with_config, migrations};
use aquabill_invoice::{DocumentWriter, InvoiceFormatter};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_database(&config));
            checks.push(check_templates(&config));
            checks.push(check_pdf_converter(&DocumentWriter::detect()));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["database_connectivity", "invoice_templates"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
            checks.push(check_pdf_converter(&DocumentWriter::detect()));
        }
    }

    let failed = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped));
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = match (failed, warned) {
        (true, _) => (CheckStatus::Fail, "doctor: one or more readiness checks failed"),
        (false, true) => (CheckStatus::Warn, "doctor: ready, with warnings"),
        (false, false) => (CheckStatus::Pass, "doctor: all readiness checks passed"),
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_database(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;
        let pending = migrations::pending_count(&pool)
            .await
            .map_err(|error| format!("failed to read migration state: {error}"));
        pool.close().await;
        pending
    });

    match result {
        Ok(0) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`, schema up to date", config.database.url),
        },
        Ok(pending) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Warn,
            details: format!(
                "connected using `{}`, {pending} migration(s) pending (run `aquabill migrate`)",
                config.database.url
            ),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn check_templates(config: &AppConfig) -> DoctorCheck {
    let source = match &config.invoice.template_dir {
        Some(dir) => format!("templates from `{}`", dir.display()),
        None => "embedded templates".to_string(),
    };
    match InvoiceFormatter::from_config(config) {
        Ok(_) => DoctorCheck {
            name: "invoice_templates",
            status: CheckStatus::Pass,
            details: format!("{source} loaded"),
        },
        Err(error) => DoctorCheck {
            name: "invoice_templates",
            status: CheckStatus::Fail,
            details: format!("{source} failed to load: {error}"),
        },
    }
}

fn check_pdf_converter(writer: &DocumentWriter) -> DoctorCheck {
    if writer.can_convert() {
        DoctorCheck {
            name: "pdf_converter",
            status: CheckStatus::Pass,
            details: "wkhtmltopdf found in PATH".to_string(),
        }
    } else {
        DoctorCheck {
            name: "pdf_converter",
            status: CheckStatus::Warn,
            details: "wkhtmltopdf not found in PATH; PDF targets are written as HTML".to_string(),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
