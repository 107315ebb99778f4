use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::entities::VehicleKind;
use crate::error::{configuration_error, Error};
use crate::pricing::MAX_PASSENGERS;

/// Multipliers applied to fuel cost per vehicle kind. Each must be > 0.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleFactors {
    pub standard: Decimal,
    pub hybrid: Decimal,
    pub electric: Decimal,
}

impl VehicleFactors {
    pub fn factor(&self, vehicle: VehicleKind) -> Decimal {
        match vehicle {
            VehicleKind::Standard => self.standard,
            VehicleKind::Hybrid => self.hybrid,
            VehicleKind::Electric => self.electric,
        }
    }
}

/// Pricing parameters.
///
/// Valid ranges:
/// - `default_fuel_rate_per_km` >= 0
/// - every vehicle factor > 0
/// - `min_partial_factor` in (0, 1]
/// - `max_seats` in 1..=3
#[derive(Clone, Debug, PartialEq)]
pub struct PricingConfig {
    pub default_fuel_rate_per_km: Decimal,
    pub vehicle_factors: VehicleFactors,
    pub min_partial_factor: Decimal,
    pub max_seats: u8,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_fuel_rate_per_km: dec!(25),
            vehicle_factors: VehicleFactors {
                standard: dec!(1.0),
                hybrid: dec!(0.8),
                electric: dec!(0.6),
            },
            min_partial_factor: dec!(0.1),
            max_seats: MAX_PASSENGERS,
        }
    }
}

impl PricingConfig {
    pub fn validate(self) -> Result<Self, Error> {
        let factors = &self.vehicle_factors;

        if self.default_fuel_rate_per_km < Decimal::ZERO
            || factors.standard <= Decimal::ZERO
            || factors.hybrid <= Decimal::ZERO
            || factors.electric <= Decimal::ZERO
            || self.min_partial_factor <= Decimal::ZERO
            || self.min_partial_factor > Decimal::ONE
            || self.max_seats == 0
            || self.max_seats > MAX_PASSENGERS
        {
            return Err(configuration_error());
        }

        Ok(self)
    }

    /// Clamps a provider factor into `[min_partial_factor, 1]`.
    pub fn clamp_partial_factor(&self, factor: Decimal) -> Decimal {
        factor.max(self.min_partial_factor).min(Decimal::ONE)
    }
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub pricing: PricingConfig,
    pub route_timeout: Duration,
    pub trip_lock_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig::default(),
            route_timeout: Duration::from_millis(5000),
            trip_lock_timeout: Duration::from_millis(2000),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub listen_addr: SocketAddr,
    pub google_maps_api_base: String,
    pub google_maps_api_key: String,
    pub engine: EngineConfig,
}

impl Config {
    #[tracing::instrument(name = "Config::from_env")]
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();

        let defaults = PricingConfig::default();

        let pricing = PricingConfig {
            default_fuel_rate_per_km: var_or(
                "DEFAULT_FUEL_RATE_PER_KM",
                defaults.default_fuel_rate_per_km,
            )?,
            vehicle_factors: VehicleFactors {
                standard: var_or("VEHICLE_FACTOR_STANDARD", defaults.vehicle_factors.standard)?,
                hybrid: var_or("VEHICLE_FACTOR_HYBRID", defaults.vehicle_factors.hybrid)?,
                electric: var_or("VEHICLE_FACTOR_ELECTRIC", defaults.vehicle_factors.electric)?,
            },
            min_partial_factor: var_or("MIN_PARTIAL_FACTOR", defaults.min_partial_factor)?,
            max_seats: var_or("MAX_SEATS", defaults.max_seats)?,
        }
        .validate()?;

        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: var_or("DATABASE_MAX_CONNECTIONS", 5)?,
            listen_addr: var_or("LISTEN_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            google_maps_api_base: var_or(
                "GOOGLE_MAPS_API_BASE",
                "maps.googleapis.com".to_string(),
            )?,
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY")?,
            engine: EngineConfig {
                pricing,
                route_timeout: Duration::from_millis(var_or("ROUTE_TIMEOUT_MS", 5000)?),
                trip_lock_timeout: Duration::from_millis(var_or("TRIP_LOCK_TIMEOUT_MS", 2000)?),
            },
        })
    }
}

fn var_or<T: FromStr>(name: &str, default: T) -> Result<T, Error> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| {
            tracing::error!("could not parse {}", name);
            configuration_error()
        }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pricing_is_valid() {
        assert!(PricingConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = PricingConfig::default();
        config.vehicle_factors.electric = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = PricingConfig::default();
        config.max_seats = 4;
        assert!(config.validate().is_err());

        let mut config = PricingConfig::default();
        config.min_partial_factor = dec!(1.2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn clamps_partial_factor() {
        let config = PricingConfig::default();

        assert_eq!(config.clamp_partial_factor(dec!(0.02)), dec!(0.1));
        assert_eq!(config.clamp_partial_factor(dec!(0.45)), dec!(0.45));
        assert_eq!(config.clamp_partial_factor(dec!(1.3)), dec!(1));
    }

    #[test]
    fn vehicle_factor_lookup() {
        let factors = PricingConfig::default().vehicle_factors;

        assert_eq!(factors.factor(VehicleKind::Electric), dec!(0.6));
        assert_eq!(factors.factor(VehicleKind::Standard), dec!(1.0));
    }
}
