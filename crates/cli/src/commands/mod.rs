pub mod bill;
pub mod config;
pub mod customer;
pub mod doctor;
pub mod export;
pub mod invoice;
pub mod migrate;
pub mod report;
pub mod statement;
pub mod supply;

use std::future::Future;
use std::path::PathBuf;

use aquabill_core::config::{AppConfig, LoadOptions};
use aquabill_db::RepositoryError;
use aquabill_invoice::InvoiceError;
use serde::Serialize;
use serde_json::Value;

use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Successful result of a data command: a summary line plus its payload.
#[derive(Debug)]
pub struct Outcome {
    pub message: String,
    pub data: Option<Value>,
}

impl Outcome {
    pub fn new(message: impl Into<String>, data: &impl Serialize) -> Result<Self, CommandError> {
        let data = serde_json::to_value(data).map_err(|error| CommandError {
            error_class: "serialization",
            message: error.to_string(),
            exit_code: 1,
        })?;
        Ok(Self { message: message.into(), data: Some(data) })
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self { message: message.into(), data: None }
    }
}

/// Failure of a command, carrying the class and exit code reported to the caller.
///
/// Exit codes: 2 config, 3 runtime, 4 database, 5 migration, 6 validation,
/// 7 not found, 8 conflict, 9 document output.
#[derive(Debug)]
pub struct CommandError {
    pub error_class: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl From<RepositoryError> for CommandError {
    fn from(error: RepositoryError) -> Self {
        let error_class = error.error_class();
        let exit_code = match error_class {
            "validation" => 6,
            "not_found" => 7,
            "conflict" => 8,
            _ => 4,
        };
        Self { error_class, message: error.to_string(), exit_code }
    }
}

impl From<aquabill_core::DomainError> for CommandError {
    fn from(error: aquabill_core::DomainError) -> Self {
        RepositoryError::from(error).into()
    }
}

impl From<InvoiceError> for CommandError {
    fn from(error: InvoiceError) -> Self {
        let error_class = match error {
            InvoiceError::Template(_) => "render",
            InvoiceError::Conversion(_) | InvoiceError::Csv(_) | InvoiceError::Io(_) => "output",
        };
        Self { error_class, message: error.to_string(), exit_code: 9 }
    }
}

impl From<BootstrapError> for CommandError {
    fn from(error: BootstrapError) -> Self {
        Self {
            error_class: error.error_class(),
            exit_code: error.exit_code(),
            message: error.to_string(),
        }
    }
}

/// Loads config, opens an up-to-date store and runs `action` against it on a
/// single-threaded runtime.
pub fn run_with_application<F, Fut>(
    command: &str,
    options: LoadOptions,
    action: F,
) -> CommandResult
where
    F: FnOnce(Application) -> Fut,
    Fut: Future<Output = Result<Outcome, CommandError>>,
{
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let app = bootstrap_with_config(config).await?;
        let pool = app.db_pool.clone();
        let outcome = action(app).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(outcome) => CommandResult::success_with_data(command, outcome.message, outcome.data),
        Err(error) => {
            CommandResult::failure(command, error.error_class, error.message, error.exit_code)
        }
    }
}

/// `path` if given, otherwise `file_name` inside the configured output directory.
pub(crate) fn output_path(config: &AppConfig, path: Option<PathBuf>, file_name: String) -> PathBuf {
    path.unwrap_or_else(|| config.invoice.output_dir.join(file_name))
}

/// `value` reduced to characters that are safe inside a single file name.
pub(crate) fn file_name_part(value: &str) -> String {
    let part: String = value
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    if part.is_empty() {
        "unnamed".to_string()
    } else {
        part
    }
}

#[cfg(test)]
mod tests {
    use aquabill_core::domain::customer::CustomerId;
    use aquabill_core::DomainError;
    use aquabill_invoice::InvoiceError;
    use serde_json::Value;

    use super::{file_name_part, CommandError, CommandResult};

    #[test]
    fn failure_payload_carries_error_class() {
        let result = CommandResult::failure("bill settle", "conflict", "already settled", 8);

        assert_eq!(result.exit_code, 8);
        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "conflict");
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn domain_errors_map_to_exit_codes() {
        let not_found: CommandError = DomainError::CustomerNotFound(CustomerId::from("C-9")).into();
        assert_eq!((not_found.error_class, not_found.exit_code), ("not_found", 7));

        let conflict: CommandError =
            DomainError::DuplicateCustomer(CustomerId::from("C-1")).into();
        assert_eq!((conflict.error_class, conflict.exit_code), ("conflict", 8));

        let invalid: CommandError = DomainError::InvalidSupplyWindow("bad".to_string()).into();
        assert_eq!((invalid.error_class, invalid.exit_code), ("validation", 6));

        let render: CommandError = InvoiceError::Template("boom".to_string()).into();
        assert_eq!((render.error_class, render.exit_code), ("render", 9));
    }

    #[test]
    fn file_name_part_strips_path_separators() {
        assert_eq!(file_name_part("C-001"), "C-001");
        assert_eq!(file_name_part("../north/farm"), "___north_farm");
        assert_eq!(file_name_part("a\\b c"), "a_b_c");
        assert_eq!(file_name_part(""), "unnamed");
    }
}
