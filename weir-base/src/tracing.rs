use std::str::FromStr as _;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use weir::StdError;

use crate::{Config, ConfigSection};

/// Installs the process-wide tracing subscriber.
pub struct Tracing;

impl Tracing {
    /// Installs a subscriber with an [`EnvFilter`] built from `config` and the
    /// `fmt` layer.
    ///
    /// Fails if a directive cannot be parsed or a global subscriber is already set.
    pub fn init(config: &TracingConfig) -> Result<(), StdError> {
        let filter = config.env_filter()?;
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::Layer::default())
            .try_init()?;
        tracing::debug!(level = %config.level, "Tracing initialized");
        Ok(())
    }

    /// Installs a subscriber from the `tracing` section of `config`, using the
    /// defaults when the section is absent.
    pub fn init_from(config: &Config) -> Result<(), StdError> {
        let config = config.section::<TracingConfig>()?.unwrap_or_default();
        Self::init(&config)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(
        serialize_with = "serialize_level",
        deserialize_with = "deserialize_level",
        default = "default_level"
    )]
    pub level: tracing::Level,
    /// Extra `EnvFilter` directives, e.g. `weir_http=debug`.
    #[serde(default)]
    pub directives: Vec<String>,
}

impl TracingConfig {
    pub fn env_filter(&self) -> Result<EnvFilter, StdError> {
        let mut filter = EnvFilter::default();
        for directive in &self.directives {
            let directive: Directive = directive.parse().map_err(Box::new)?;
            filter = filter.add_directive(directive);
        }
        Ok(filter.add_directive(self.level.into()))
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directives: Vec::new(),
        }
    }
}

impl ConfigSection for TracingConfig {
    fn key() -> &'static str {
        "tracing"
    }
}

fn serialize_level<S>(v: &tracing::Level, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(v.as_str())
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<tracing::Level, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    String::deserialize(deserializer)
        .and_then(|v| tracing::Level::from_str(&v).map_err(|v| Error::custom(format!("{v}"))))
}

fn default_level() -> tracing::Level {
    tracing::Level::INFO
}
