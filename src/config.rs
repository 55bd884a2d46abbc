use crate::complex_logic::{PricingTables, ReorderPolicy};
use crate::constructor_side_effects::ServiceSettings;
use crate::demo::{Pattern, Variant};
use crate::non_deterministic::BusinessHours;
use crate::providers::TimeProvider;
use crate::tight_coupling::OrderSettings;
use anyhow::{Context, Result};
use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_DATA_DIR: &str = "user_data";
const DEFAULT_DB_PATH: &str = "app.db";
const DEFAULT_ORDERS_DB_PATH: &str = "orders.db";
const DEFAULT_EXPORT_DIR: &str = "exports";
const DEFAULT_CACHE_DIR: &str = "cache";
const DEFAULT_SETTINGS_PATH: &str = "config.json";
const DEFAULT_CACHE_MAX_AGE_SECS: i64 = 3600;
const MAX_CACHE_MAX_AGE_SECS: i64 = 365 * 24 * 3600;
const MAX_REORDER_COOLDOWN_DAYS: i64 = 100 * 365;

/// Mail server credentials shared by the examples that send mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            server: "smtp.gmail.com".to_string(),
            port: 587,
            username: "app@example.com".to_string(),
            password: "password123".to_string(),
        }
    }
}

/// Inventory reorder knobs: reorder at or below `threshold`, `quantity` units
/// at a time, no more than once per `cooldown_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderSettings {
    pub threshold: i64,
    pub quantity: i64,
    pub cooldown_days: i64,
}

impl Default for ReorderSettings {
    fn default() -> Self {
        Self {
            threshold: 10,
            quantity: 50,
            cooldown_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub workspace_root: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub orders_db_path: PathBuf,
    pub export_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub settings_path: PathBuf,
    pub smtp: SmtpSettings,
    pub business_hours: BusinessHours,
    pub cache_max_age_secs: i64,
    pub reorder: ReorderSettings,
    pub pricing: PricingTables,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            orders_db_path: PathBuf::from(DEFAULT_ORDERS_DB_PATH),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            smtp: SmtpSettings::default(),
            business_hours: BusinessHours::default(),
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
            reorder: ReorderSettings::default(),
            pricing: PricingTables::default(),
        }
    }
}

impl AppConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            workspace_root: cli_workspace_root,
            opening_hour: cli_opening_hour,
            closing_hour: cli_closing_hour,
            cache_max_age_secs: cli_cache_max_age_secs,
            smtp_server: cli_smtp_server,
            smtp_password: cli_smtp_password,
            command: _,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            workspace_root: file_workspace_root,
            data_dir,
            db_path,
            orders_db_path,
            export_dir,
            cache_dir,
            settings_path,
            smtp: file_smtp,
            business_hours: file_business_hours,
            cache_max_age_secs: file_cache_max_age_secs,
            reorder,
            pricing,
        } = file_config;

        let workspace_root = cli_workspace_root
            .or(file_workspace_root)
            .unwrap_or_else(|| PathBuf::from("."));

        let file_hours = file_business_hours.unwrap_or_default();
        let business_hours = BusinessHours::new(
            cli_opening_hour.unwrap_or(file_hours.start),
            cli_closing_hour.unwrap_or(file_hours.end),
        );

        let mut smtp = file_smtp.unwrap_or_default();
        if let Some(server) = cli_smtp_server {
            smtp.server = server;
        }
        if let Some(password) = cli_smtp_password {
            smtp.password = password;
        }

        Ok(Self {
            workspace_root,
            data_dir: data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            db_path: db_path.unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            orders_db_path: orders_db_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ORDERS_DB_PATH)),
            export_dir: export_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR)),
            cache_dir: cache_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            settings_path: settings_path.unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH)),
            smtp,
            business_hours,
            cache_max_age_secs: cli_cache_max_age_secs
                .or(file_cache_max_age_secs)
                .unwrap_or(DEFAULT_CACHE_MAX_AGE_SECS),
            reorder: reorder.unwrap_or_default(),
            pricing: pricing.unwrap_or_default(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        let BusinessHours { start, end } = self.business_hours;
        anyhow::ensure!(
            start <= end && end <= 23,
            "business hours {start}..{end} must satisfy start <= end <= 23"
        );
        anyhow::ensure!(
            (1..=MAX_CACHE_MAX_AGE_SECS).contains(&self.cache_max_age_secs),
            "cache max age must be between 1 and {MAX_CACHE_MAX_AGE_SECS} seconds, got {}",
            self.cache_max_age_secs
        );
        anyhow::ensure!(
            self.reorder.quantity > 0,
            "reorder quantity must be positive, got {}",
            self.reorder.quantity
        );
        anyhow::ensure!(
            self.reorder.threshold >= 0,
            "reorder threshold must not be negative"
        );
        anyhow::ensure!(
            (0..=MAX_REORDER_COOLDOWN_DAYS).contains(&self.reorder.cooldown_days),
            "reorder cooldown must be between 0 and {MAX_REORDER_COOLDOWN_DAYS} days, got {}",
            self.reorder.cooldown_days
        );
        anyhow::ensure!(self.smtp.port != 0, "smtp port must not be zero");
        anyhow::ensure!(
            !self.pricing.shipping_rates.is_empty(),
            "at least one shipping rate must be configured"
        );
        Ok(())
    }

    pub fn ensure_workspace_root(&self) -> Result<()> {
        anyhow::ensure!(
            self.workspace_root.exists(),
            "workspace root {:?} does not exist",
            self.workspace_root
        );
        anyhow::ensure!(
            self.workspace_root.is_dir(),
            "workspace root {:?} is not a directory",
            self.workspace_root
        );
        Ok(())
    }

    pub fn resolve_path<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.workspace_root.join(relative)
        }
    }

    /// Saturates for ages `validate()` would reject.
    pub fn cache_max_age(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.cache_max_age_secs).unwrap_or(TimeDelta::MAX)
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            db_path: self.resolve_path(&self.db_path),
            smtp: self.smtp.clone(),
            config_path: self.resolve_path(&self.settings_path),
            cache_dir: self.resolve_path(&self.cache_dir),
        }
    }

    pub fn order_settings(&self) -> OrderSettings {
        OrderSettings {
            db_path: self.resolve_path(&self.orders_db_path),
            export_dir: self.resolve_path(&self.export_dir),
            smtp: self.smtp.clone(),
        }
    }

    pub fn reorder_policy(&self, clock: Arc<dyn TimeProvider>) -> ReorderPolicy {
        ReorderPolicy::new(
            self.reorder.threshold,
            self.reorder.quantity,
            self.reorder.cooldown_days,
            clock,
        )
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "testability-patterns",
    about = "Untestable code next to its testable refactor",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "TESTABILITY_WORKSPACE",
        value_name = "DIR",
        help = "Directory the demos read and write files in",
        global = true
    )]
    pub workspace_root: Option<PathBuf>,

    #[arg(
        long,
        env = "TESTABILITY_OPENING_HOUR",
        value_name = "HOUR",
        help = "First hour orders are accepted",
        global = true
    )]
    pub opening_hour: Option<u32>,

    #[arg(
        long,
        env = "TESTABILITY_CLOSING_HOUR",
        value_name = "HOUR",
        help = "Last hour orders are accepted",
        global = true
    )]
    pub closing_hour: Option<u32>,

    #[arg(
        long,
        env = "TESTABILITY_CACHE_MAX_AGE",
        value_name = "SECONDS",
        help = "Age after which cached entries expire",
        global = true
    )]
    pub cache_max_age_secs: Option<i64>,

    #[arg(
        long,
        env = "TESTABILITY_SMTP_SERVER",
        value_name = "HOST",
        help = "SMTP server used by the mail stand-ins",
        global = true
    )]
    pub smtp_server: Option<String>,

    #[arg(
        long,
        env = "TESTABILITY_SMTP_PASSWORD",
        value_name = "PASSWORD",
        hide_env_values = true,
        global = true
    )]
    pub smtp_password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run one example and print a JSON report
    Demo {
        #[arg(value_enum)]
        pattern: Pattern,

        #[arg(long, value_enum, default_value_t = Variant::Testable)]
        variant: Variant,
    },
    /// Price an order document with the configured rate tables
    Price {
        #[arg(value_name = "ORDER_JSON")]
        order: PathBuf,
    },
    /// Validate a user document with the default rule set
    ValidateUser {
        #[arg(value_name = "USER_JSON")]
        user: PathBuf,
    },
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    workspace_root: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    db_path: Option<PathBuf>,
    orders_db_path: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    settings_path: Option<PathBuf>,
    smtp: Option<SmtpSettings>,
    business_hours: Option<BusinessHours>,
    cache_max_age_secs: Option<i64>,
    reorder: Option<ReorderSettings>,
    pricing: Option<PricingTables>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
