use super::error::ParameterError;
use crate::core::units::Charge;

/// The net charge handed to charge-fitting tool-chains.
///
/// Callers may supply the charge in several shapes; [`NetCharge::resolve`]
/// coerces them all to a whole number of elementary charges.
#[derive(Debug, Clone, PartialEq)]
pub enum NetCharge {
    Integer(i64),
    Real(f64),
    Quantity(Charge),
    /// A quantity string such as `"-1 e"`.
    Text(String),
}

impl NetCharge {
    pub fn resolve(&self) -> Result<i64, ParameterError> {
        match self {
            Self::Integer(value) => Ok(*value),
            Self::Real(value) => whole(*value),
            Self::Quantity(charge) => whole(charge.value()),
            Self::Text(text) => {
                let charge: Charge = text.parse().map_err(|e| ParameterError::InvalidType {
                    argument: "net_charge",
                    message: format!("{e}"),
                })?;
                whole(charge.value())
            }
        }
    }
}

fn whole(value: f64) -> Result<i64, ParameterError> {
    if !value.is_finite() {
        return Err(ParameterError::InvalidType {
            argument: "net_charge",
            message: format!("'{value}' is not a finite number"),
        });
    }
    if value.fract() != 0.0 {
        return Err(ParameterError::InvalidValue {
            argument: "net_charge",
            message: format!("'{value}' must be integer valued"),
        });
    }
    // 2^63 is exact as f64; i64::MAX is not.
    if !(-(2f64.powi(63))..2f64.powi(63)).contains(&value) {
        return Err(ParameterError::InvalidValue {
            argument: "net_charge",
            message: format!("'{value}' is out of range"),
        });
    }
    Ok(value as i64)
}

impl From<i64> for NetCharge {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for NetCharge {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<Charge> for NetCharge {
    fn from(value: Charge) -> Self {
        Self::Quantity(value)
    }
}

impl From<&str> for NetCharge {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_and_whole_reals_resolve() {
        assert_eq!(NetCharge::Integer(-2).resolve().unwrap(), -2);
        assert_eq!(NetCharge::Real(1.0).resolve().unwrap(), 1);
        assert_eq!(NetCharge::from(Charge::elementary(-1.0)).resolve().unwrap(), -1);
        assert_eq!(NetCharge::from("2 e").resolve().unwrap(), 2);
    }

    #[test]
    fn fractional_charge_is_invalid_value() {
        assert!(matches!(
            NetCharge::Real(0.5).resolve(),
            Err(ParameterError::InvalidValue { argument: "net_charge", .. })
        ));
        assert!(matches!(
            NetCharge::from(Charge::elementary(1.25)).resolve(),
            Err(ParameterError::InvalidValue { .. })
        ));
    }

    #[test]
    fn huge_whole_charge_is_invalid_value() {
        for value in [1e30, -1e30, 2f64.powi(63)] {
            assert!(
                matches!(
                    NetCharge::Real(value).resolve(),
                    Err(ParameterError::InvalidValue { argument: "net_charge", .. })
                ),
                "{value}"
            );
        }
        assert_eq!(NetCharge::Real(-(2f64.powi(63))).resolve().unwrap(), i64::MIN);
    }

    #[test]
    fn non_numeric_charge_is_invalid_type() {
        assert!(matches!(
            NetCharge::Real(f64::NAN).resolve(),
            Err(ParameterError::InvalidType { .. })
        ));
        assert!(matches!(
            NetCharge::from("lots").resolve(),
            Err(ParameterError::InvalidType { .. })
        ));
    }
}
