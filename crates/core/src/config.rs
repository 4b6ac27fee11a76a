use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "aquabill.toml";
pub const NESTED_CONFIG_FILE: &str = "config/aquabill.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub billing: BillingConfig,
    pub invoice: InvoiceConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct BillingConfig {
    pub rate_per_hour: Decimal,
    pub currency_code: String,
    pub currency_symbol: String,
}

#[derive(Clone, Debug)]
pub struct InvoiceConfig {
    pub issuer_name: String,
    pub template_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub rate_per_hour: Option<Decimal>,
    pub invoice_output_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://aquabill.db?mode=rwc".to_string(),
                max_connections: 1,
                timeout_secs: 30,
            },
            billing: BillingConfig {
                rate_per_hour: Decimal::from(125),
                currency_code: "INR".to_string(),
                currency_symbol: "₹".to_string(),
            },
            invoice: InvoiceConfig {
                issuer_name: "Water Supply Manager".to_string(),
                template_dir: None,
                output_dir: PathBuf::from("invoices"),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(billing) = patch.billing {
            if let Some(rate_per_hour) = billing.rate_per_hour {
                self.billing.rate_per_hour = rate_per_hour;
            }
            if let Some(currency_code) = billing.currency_code {
                self.billing.currency_code = currency_code;
            }
            if let Some(currency_symbol) = billing.currency_symbol {
                self.billing.currency_symbol = currency_symbol;
            }
        }

        if let Some(invoice) = patch.invoice {
            if let Some(issuer_name) = invoice.issuer_name {
                self.invoice.issuer_name = issuer_name;
            }
            if let Some(template_dir) = invoice.template_dir {
                self.invoice.template_dir = Some(template_dir);
            }
            if let Some(output_dir) = invoice.output_dir {
                self.invoice.output_dir = output_dir;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("AQUABILL_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("AQUABILL_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_env("AQUABILL_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("AQUABILL_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("AQUABILL_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("AQUABILL_BILLING_RATE_PER_HOUR") {
            self.billing.rate_per_hour = parse_env("AQUABILL_BILLING_RATE_PER_HOUR", &value)?;
        }
        if let Some(value) = read_env("AQUABILL_BILLING_CURRENCY_CODE") {
            self.billing.currency_code = value;
        }
        if let Some(value) = read_env("AQUABILL_BILLING_CURRENCY_SYMBOL") {
            self.billing.currency_symbol = value;
        }

        if let Some(value) = read_env("AQUABILL_INVOICE_ISSUER_NAME") {
            self.invoice.issuer_name = value;
        }
        if let Some(value) = read_env("AQUABILL_INVOICE_TEMPLATE_DIR") {
            self.invoice.template_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("AQUABILL_INVOICE_OUTPUT_DIR") {
            self.invoice.output_dir = PathBuf::from(value);
        }

        let log_level =
            read_env("AQUABILL_LOGGING_LEVEL").or_else(|| read_env("AQUABILL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("AQUABILL_LOGGING_FORMAT").or_else(|| read_env("AQUABILL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(rate_per_hour) = overrides.rate_per_hour {
            self.billing.rate_per_hour = rate_per_hour;
        }
        if let Some(output_dir) = overrides.invoice_output_dir {
            self.invoice.output_dir = output_dir;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_billing(&self.billing)?;
        validate_invoice(&self.invoice)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file `load` would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_billing(billing: &BillingConfig) -> Result<(), ConfigError> {
    if billing.rate_per_hour <= Decimal::ZERO {
        return Err(ConfigError::Validation(format!(
            "billing.rate_per_hour must be greater than zero (got {})",
            billing.rate_per_hour
        )));
    }

    let code = billing.currency_code.as_str();
    if code.len() != 3 || !code.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(format!(
            "billing.currency_code must be a 3-letter uppercase ISO code (got `{code}`)"
        )));
    }

    if billing.currency_symbol.trim().is_empty() {
        return Err(ConfigError::Validation(
            "billing.currency_symbol must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_invoice(invoice: &InvoiceConfig) -> Result<(), ConfigError> {
    if invoice.issuer_name.trim().is_empty() {
        return Err(ConfigError::Validation("invoice.issuer_name must not be empty".to_string()));
    }
    if invoice.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation("invoice.output_dir must not be empty".to_string()));
    }
    if let Some(template_dir) = &invoice.template_dir {
        if !template_dir.is_dir() {
            return Err(ConfigError::Validation(format!(
                "invoice.template_dir `{}` is not a directory",
                template_dir.display()
            )));
        }
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    billing: Option<BillingPatch>,
    invoice: Option<InvoicePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BillingPatch {
    rate_per_hour: Option<Decimal>,
    currency_code: Option<String>,
    currency_symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct InvoicePatch {
    issuer_name: Option<String>,
    template_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
