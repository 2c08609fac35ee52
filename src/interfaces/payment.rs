//! Recharge requests and UPI payment intents.

use crate::domain::money::Amount;
use crate::error::{MallError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const MIN_RECHARGE: Decimal = dec!(10);
pub const MAX_RECHARGE: Decimal = dec!(1000);
pub const RECHARGE_STEP: Decimal = dec!(10);

/// A top-up the counter accepts: 10 to 1000 in steps of 10.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RechargeRequest(Amount);

impl RechargeRequest {
    pub fn new(amount: Amount) -> Result<Self> {
        let value = amount.value();
        if value < MIN_RECHARGE || value > MAX_RECHARGE {
            return Err(MallError::ValidationError(format!(
                "Recharge must be between {MIN_RECHARGE} and {MAX_RECHARGE}"
            )));
        }
        if !(value % RECHARGE_STEP).is_zero() {
            return Err(MallError::ValidationError(format!(
                "Recharge must be a multiple of {RECHARGE_STEP}"
            )));
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Amount {
        self.0
    }
}

/// Payee details for the UPI intent.
#[derive(Debug, Clone)]
pub struct Payee {
    pub address: String,
    pub name: String,
}

impl Default for Payee {
    fn default() -> Self {
        Self {
            address: "mall@upi".to_string(),
            name: "MallEntrySystem".to_string(),
        }
    }
}

/// Builds the `upi://pay` intent a payment app (or QR code) carries.
pub fn upi_intent(payee: &Payee, request: &RechargeRequest) -> String {
    format!(
        "upi://pay?pa={}&pn={}&am={}&cu=INR",
        payee.address,
        payee.name,
        request.amount()
    )
}
