use std::env;
use std::fs;
use std::path::Path;

use aquabill_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

struct Field<'a> {
    key: &'static str,
    env_keys: &'static [&'static str],
    flag: Option<&'static str>,
    value: &'a str,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let flag_database_url = options.overrides.database_url.is_some();
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let max_connections = config.database.max_connections.to_string();
    let timeout_secs = config.database.timeout_secs.to_string();
    let rate_per_hour = config.billing.rate_per_hour.normalize().to_string();
    let template_dir = config
        .invoice
        .template_dir
        .as_ref()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "<embedded>".to_string());
    let output_dir = config.invoice.output_dir.display().to_string();
    let log_format = format!("{:?}", config.logging.format).to_ascii_lowercase();

    let fields = [
        Field {
            key: "database.url",
            env_keys: &["AQUABILL_DATABASE_URL"],
            flag: flag_database_url.then_some("--database-url"),
            value: &config.database.url,
        },
        Field {
            key: "database.max_connections",
            env_keys: &["AQUABILL_DATABASE_MAX_CONNECTIONS"],
            flag: None,
            value: &max_connections,
        },
        Field {
            key: "database.timeout_secs",
            env_keys: &["AQUABILL_DATABASE_TIMEOUT_SECS"],
            flag: None,
            value: &timeout_secs,
        },
        Field {
            key: "billing.rate_per_hour",
            env_keys: &["AQUABILL_BILLING_RATE_PER_HOUR"],
            flag: None,
            value: &rate_per_hour,
        },
        Field {
            key: "billing.currency_code",
            env_keys: &["AQUABILL_BILLING_CURRENCY_CODE"],
            flag: None,
            value: &config.billing.currency_code,
        },
        Field {
            key: "billing.currency_symbol",
            env_keys: &["AQUABILL_BILLING_CURRENCY_SYMBOL"],
            flag: None,
            value: &config.billing.currency_symbol,
        },
        Field {
            key: "invoice.issuer_name",
            env_keys: &["AQUABILL_INVOICE_ISSUER_NAME"],
            flag: None,
            value: &config.invoice.issuer_name,
        },
        Field {
            key: "invoice.template_dir",
            env_keys: &["AQUABILL_INVOICE_TEMPLATE_DIR"],
            flag: None,
            value: &template_dir,
        },
        Field {
            key: "invoice.output_dir",
            env_keys: &["AQUABILL_INVOICE_OUTPUT_DIR"],
            flag: None,
            value: &output_dir,
        },
        Field {
            key: "logging.level",
            env_keys: &["AQUABILL_LOGGING_LEVEL", "AQUABILL_LOG_LEVEL"],
            flag: None,
            value: &config.logging.level,
        },
        Field {
            key: "logging.format",
            env_keys: &["AQUABILL_LOGGING_FORMAT", "AQUABILL_LOG_FORMAT"],
            flag: None,
            value: &log_format,
        },
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(field.key, field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field<'_>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(flag) = field.flag {
        return format!("flag ({flag})");
    }

    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
