//! [`Config`]-related definitions.

use std::time;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::{Display, Error};
use serde::Deserialize;
use service::domain::{property::Nights, reservation::availability};
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Service {
    /// Reservation rules configuration.
    pub reservation: Reservation,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl TryFrom<Service> for service::Config {
    type Error = InvalidServiceConfig;

    fn try_from(value: Service) -> Result<Self, Self::Error> {
        let Service {
            reservation:
                Reservation {
                    booking_horizon_months,
                    default_min_nights,
                    default_max_nights,
                    code_attempts,
                },
            tasks: Tasks {
                complete_past_reservations,
            },
        } = value;

        let nights = |n| Nights::new(n).ok_or(InvalidServiceConfig::ZeroNights);
        let default_min_nights = nights(default_min_nights)?;
        let default_max_nights =
            default_max_nights.map(nights).transpose()?;
        if default_max_nights.is_some_and(|max| max < default_min_nights) {
            return Err(InvalidServiceConfig::MinNightsExceedMax);
        }
        if code_attempts == 0 {
            return Err(InvalidServiceConfig::ZeroCodeAttempts);
        }

        Ok(Self {
            availability: availability::Config {
                booking_horizon_months,
                default_min_nights,
                default_max_nights,
            },
            code_attempts,
            complete_past_reservations:
                service::task::complete_past_reservations::Config {
                    interval: complete_past_reservations.interval,
                },
        })
    }
}

/// Error of converting a [`Service`] configuration into a
/// [`service::Config`].
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum InvalidServiceConfig {
    /// Number of nights is zero.
    #[display("`service.reservation` nights must be positive")]
    ZeroNights,

    /// Default minimum nights exceed default maximum ones.
    #[display(
        "`service.reservation.default_min_nights` exceeds \
         `service.reservation.default_max_nights`"
    )]
    MinNightsExceedMax,

    /// No attempts to generate a reservation code.
    #[display("`service.reservation.code_attempts` must be positive")]
    ZeroCodeAttempts,
}

/// Reservation rules configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Reservation {
    /// Number of calendar months ahead of today a stay may start in.
    #[default(12)]
    pub booking_horizon_months: u16,

    /// Minimum nights of a stay for properties not restricting it.
    #[default(1)]
    pub default_min_nights: u16,

    /// Maximum nights of a stay for properties not restricting it.
    pub default_max_nights: Option<u16>,

    /// Number of attempts to generate an unused reservation code.
    #[default(5)]
    pub code_attempts: u8,
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Tasks {
    /// `CompletePastReservations` task configuration.
    pub complete_past_reservations: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::{InvalidServiceConfig, Reservation, Service};

    #[test]
    fn defaults_convert_into_service_config() {
        let config = service::Config::try_from(Service::default()).unwrap();

        assert_eq!(config.availability.booking_horizon_months, 12);
        assert_eq!(config.availability.default_min_nights.get(), 1);
        assert!(config.availability.default_max_nights.is_none());
        assert_eq!(config.code_attempts, 5);
        assert_eq!(
            config.complete_past_reservations.interval,
            Duration::from_secs(60 * 60),
        );
    }

    #[test]
    fn rejects_inconsistent_nights() {
        let err = service::Config::try_from(Service {
            reservation: Reservation {
                default_min_nights: 3,
                default_max_nights: Some(2),
                ..Reservation::default()
            },
            ..Service::default()
        })
        .unwrap_err();
        assert!(matches!(err, InvalidServiceConfig::MinNightsExceedMax));

        let err = service::Config::try_from(Service {
            reservation: Reservation {
                default_min_nights: 0,
                ..Reservation::default()
            },
            ..Service::default()
        })
        .unwrap_err();
        assert!(matches!(err, InvalidServiceConfig::ZeroNights));
    }

    #[test]
    fn parses_reservation_rules() {
        let reservation: Reservation = from_toml(
            "booking_horizon_months = 6\ndefault_max_nights = 14",
        );

        assert_eq!(reservation.booking_horizon_months, 6);
        assert_eq!(reservation.default_max_nights, Some(14));
        assert_eq!(reservation.code_attempts, 5);
    }

    fn from_toml(toml: &str) -> Reservation {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
