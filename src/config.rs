//! Configuration loading from TOML files
//!
//! Every field has a default, so an empty or missing file yields the stock
//! Phoenix Mall setup: 500 m geofence, first hour free, 60/hour after that.

use crate::application::mall::{DEFAULT_LOW_BALANCE, DEMO_OTP, MallSettings};
use crate::domain::billing::BillingPolicy;
use crate::domain::geofence::{Coordinate, DEFAULT_CENTER, DEFAULT_RADIUS_METERS, Geofence};
use crate::error::{MallError, Result};
use crate::interfaces::payment::Payee;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            latitude: DEFAULT_CENTER.latitude,
            longitude: DEFAULT_CENTER.longitude,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub free_minutes: u32,
    pub hourly_rate: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            free_minutes: 60,
            hourly_rate: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    #[serde(with = "rust_decimal::serde::float")]
    pub low_balance: Decimal,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            low_balance: DEFAULT_LOW_BALANCE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub otp: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            otp: DEMO_OTP.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    pub payee: String,
    pub payee_name: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        let payee = Payee::default();
        Self {
            payee: payee.address,
            payee_name: payee.name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the JSON collections.
    pub data_dir: PathBuf,
    pub geofence: GeofenceConfig,
    pub billing: BillingConfig,
    pub alerts: AlertsConfig,
    pub auth: AuthConfig,
    pub payment: PaymentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            geofence: GeofenceConfig::default(),
            billing: BillingConfig::default(),
            alerts: AlertsConfig::default(),
            auth: AuthConfig::default(),
            payment: PaymentConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let GeofenceConfig {
            latitude,
            longitude,
            radius_meters,
        } = self.geofence;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(MallError::ValidationError(format!(
                "geofence center ({latitude}, {longitude}) is out of range"
            )));
        }
        if !radius_meters.is_finite() || radius_meters < 0.0 {
            return Err(MallError::ValidationError(
                "geofence radius must be a non-negative number of meters".to_string(),
            ));
        }
        if self.alerts.low_balance < Decimal::ZERO {
            return Err(MallError::ValidationError(
                "low balance threshold cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn mall_settings(&self) -> MallSettings {
        MallSettings {
            geofence: Geofence::new(
                Coordinate::new(self.geofence.latitude, self.geofence.longitude),
                self.geofence.radius_meters,
            ),
            billing: BillingPolicy::new(self.billing.free_minutes, self.billing.hourly_rate),
            low_balance: self.alerts.low_balance,
            otp: self.auth.otp.clone(),
        }
    }

    pub fn payee(&self) -> Payee {
        Payee {
            address: self.payment.payee.clone(),
            name: self.payment.payee_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));

        let settings = config.mall_settings();
        assert_eq!(settings.geofence, Geofence::default());
        assert_eq!(settings.billing, BillingPolicy::default());
        assert_eq!(settings.low_balance, dec!(50));
        assert_eq!(settings.otp, "123456");
        assert_eq!(config.payee().address, "mall@upi");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        let content = r#"
data_dir = "/var/lib/mallpass"

[geofence]
latitude = 12.905112
longitude = 80.150624
radius_meters = 300

[billing]
free_minutes = 30
hourly_rate = 100

[alerts]
low_balance = 75

[payment]
payee = "shop@upi"
"#;
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/mallpass"));
        let settings = config.mall_settings();
        assert_eq!(settings.geofence.radius_meters, 300.0);
        assert_eq!(settings.geofence.center.latitude, 12.905112);
        assert_eq!(settings.billing, BillingPolicy::new(30, 100));
        assert_eq!(settings.low_balance, dec!(75));
        assert_eq!(config.payee().address, "shop@upi");
        assert_eq!(config.payee().name, "MallEntrySystem");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            Config::from_toml("[geofence]\nlatitude = 123.0"),
            Err(MallError::ValidationError(_))
        ));
        assert!(matches!(
            Config::from_toml("[billing]\nhourly_rate = \"lots\""),
            Err(MallError::ConfigError(_))
        ));
    }
}
