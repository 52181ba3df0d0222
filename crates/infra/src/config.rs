//! Engine configuration.
//!
//! Hierarchical loading:
//! 1. Default values in code
//! 2. Optional configuration file (`config/stockwise.toml`)
//! 3. Environment variable overrides with the `STOCKWISE_` prefix, nested
//!    keys separated by `__` (e.g. `STOCKWISE_RECONCILIATION__MAX_COMMIT_ATTEMPTS=3`)

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use stockwise_core::{DomainError, NumberingScheme};
use stockwise_views::screens::StockLevel;

const DEFAULT_FILE: &str = "config/stockwise";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<DomainError> for ConfigError {
    fn from(value: DomainError) -> Self {
        ConfigError::Invalid(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockwiseConfig {
    pub reconciliation: ReconciliationConfig,
    pub views: ViewsConfig,
    pub numbering: NumberingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconciliationConfig {
    /// Read-plan-commit attempts before a conflict is surfaced. At least 1.
    pub max_commit_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewsConfig {
    /// Products at or below this quantity (but above zero) count as low stock.
    pub low_stock_threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NumberingConfig {
    pub incoming_prefix: String,
    pub outgoing_prefix: String,
    pub purchase_order_prefix: String,
}

/// Validated numbering schemes for the three document kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingSchemes {
    pub incoming: NumberingScheme,
    pub outgoing: NumberingScheme,
    pub purchase_order: NumberingScheme,
}

impl Default for StockwiseConfig {
    fn default() -> Self {
        Self {
            reconciliation: ReconciliationConfig {
                max_commit_attempts: 5,
            },
            views: ViewsConfig {
                low_stock_threshold: 5,
            },
            numbering: NumberingConfig {
                incoming_prefix: "ENT".to_string(),
                outgoing_prefix: "SRT".to_string(),
                purchase_order_prefix: "PO".to_string(),
            },
        }
    }
}

impl StockwiseConfig {
    /// Load from `config/stockwise.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_FILE)
    }

    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("STOCKWISE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(config)
    }

    /// Defaults overlaid with a TOML document; the environment is ignored.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        Self::finish(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reconciliation.max_commit_attempts == 0 {
            return Err(ConfigError::Invalid(
                "reconciliation.max_commit_attempts must be at least 1".to_string(),
            ));
        }
        if self.views.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "views.low_stock_threshold cannot be negative".to_string(),
            ));
        }
        self.numbering_schemes()?;
        Ok(())
    }

    pub fn numbering_schemes(&self) -> Result<NumberingSchemes, ConfigError> {
        Ok(NumberingSchemes {
            incoming: NumberingScheme::daily(self.numbering.incoming_prefix.as_str())?,
            outgoing: NumberingScheme::daily(self.numbering.outgoing_prefix.as_str())?,
            purchase_order: NumberingScheme::monthly(
                self.numbering.purchase_order_prefix.as_str(),
            )?,
        })
    }

    pub fn low_stock(&self) -> StockLevel {
        StockLevel::Low {
            threshold: self.views.low_stock_threshold,
        }
    }

    pub fn in_stock(&self) -> StockLevel {
        StockLevel::InStock {
            threshold: self.views.low_stock_threshold,
        }
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Self::default();
        Ok(config::Config::builder()
            .set_default(
                "reconciliation.max_commit_attempts",
                i64::from(defaults.reconciliation.max_commit_attempts),
            )?
            .set_default("views.low_stock_threshold", defaults.views.low_stock_threshold)?
            .set_default("numbering.incoming_prefix", defaults.numbering.incoming_prefix)?
            .set_default("numbering.outgoing_prefix", defaults.numbering.outgoing_prefix)?
            .set_default(
                "numbering.purchase_order_prefix",
                defaults.numbering.purchase_order_prefix,
            )?)
    }

    fn finish(config: config::Config) -> Result<Self, ConfigError> {
        let parsed: Self = config.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }
}
