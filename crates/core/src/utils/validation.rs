use rust_decimal::Decimal;

use crate::error::{Result, TriArbError};
use crate::types::{Currency, CurrencyPair};

pub fn validate_currency(currency: &Currency) -> Result<()> {
    if !is_valid_asset_name(currency.as_str()) {
        return Err(TriArbError::InvalidData(format!("Invalid currency code: {}", currency)));
    }

    Ok(())
}

pub fn validate_pair(pair: &CurrencyPair) -> Result<()> {
    validate_currency(&pair.base)?;
    validate_currency(&pair.quote)?;

    if pair.base == pair.quote {
        return Err(TriArbError::InvalidData(format!(
            "Base and quote currencies cannot be the same: {}",
            pair
        )));
    }

    Ok(())
}

pub fn validate_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(TriArbError::InvalidPrice(price));
    }

    Ok(())
}

pub fn validate_volume(volume: Decimal) -> Result<()> {
    if volume < Decimal::ZERO {
        return Err(TriArbError::InvalidData(format!("Volume cannot be negative: {}", volume)));
    }

    Ok(())
}

pub fn validate_fee_rate(fee_rate: Decimal) -> Result<()> {
    if fee_rate < Decimal::ZERO || fee_rate >= Decimal::ONE {
        return Err(TriArbError::InvalidData(format!(
            "Fee rate must be in [0, 1): {}",
            fee_rate
        )));
    }

    Ok(())
}

pub fn is_valid_asset_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 20 {
        return false;
    }

    name.chars().all(|c| c.is_ascii_alphanumeric())
}
