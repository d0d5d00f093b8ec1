use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::Product;
use crate::error::EvmError;
use crate::types::Quantity;
use crate::EvmResult;

/// Unit an axis counts its planned and earned quantity in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitOfMeasure {
    #[serde(alias = "u")]
    Unit,
    #[serde(alias = "kg")]
    Kilogram,
    #[serde(alias = "m")]
    Meter,
    #[serde(alias = "cm")]
    Centimeter,
    #[serde(alias = "m2", alias = "m²")]
    SquareMeter,
    /// Flat amount ("forfait"); progress is entered by hand
    #[serde(alias = "forfait")]
    LumpSum,
}

impl UnitOfMeasure {
    /// Whether quantities moved in stock can be expressed in this unit.
    pub fn counts_stock(self) -> bool {
        !matches!(self, UnitOfMeasure::LumpSum)
    }

    /// Express `quantity` units of `product` in this unit.
    pub fn convert(self, quantity: Quantity, product: &Product, axis: &str) -> EvmResult<Quantity> {
        let dimension = |value: Option<Decimal>, what: &str| {
            value
                .filter(|v| !v.is_zero())
                .ok_or_else(|| EvmError::InvalidInput {
                    field: format!("product '{}'", product.name),
                    reason: format!("no {what} defined, axis '{axis}' counts in {self}"),
                })
        };
        match self {
            UnitOfMeasure::Unit => Ok(quantity),
            UnitOfMeasure::Kilogram => Ok(quantity * dimension(product.weight, "weight")?),
            UnitOfMeasure::Meter => Ok(quantity * dimension(product.length, "length")?),
            UnitOfMeasure::Centimeter => {
                Ok(quantity * dimension(product.length, "length")? * Decimal::ONE_HUNDRED)
            }
            UnitOfMeasure::SquareMeter => Ok(quantity * dimension(product.area, "area")?),
            UnitOfMeasure::LumpSum => Err(EvmError::InvalidInput {
                field: format!("axis '{axis}'"),
                reason: format!("unit {self} cannot count stock quantities"),
            }),
        }
    }
}

impl fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitOfMeasure::Unit => "units",
            UnitOfMeasure::Kilogram => "kg",
            UnitOfMeasure::Meter => "m",
            UnitOfMeasure::Centimeter => "cm",
            UnitOfMeasure::SquareMeter => "m²",
            UnitOfMeasure::LumpSum => "lump sum",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CategoryId, ProductId};
    use rust_decimal_macros::dec;

    fn beam() -> Product {
        Product {
            id: ProductId(1),
            name: "IPE 200".into(),
            category: Some(CategoryId(1)),
            standard_price: dec!(50),
            weight: Some(dec!(22.4)),
            length: Some(dec!(6)),
            area: None,
        }
    }

    #[test]
    fn test_each_unit_converts_from_product_dimensions() {
        let p = beam();
        assert_eq!(UnitOfMeasure::Unit.convert(dec!(10), &p, "Toles").unwrap(), dec!(10));
        assert_eq!(UnitOfMeasure::Kilogram.convert(dec!(10), &p, "Toles").unwrap(), dec!(224));
        assert_eq!(UnitOfMeasure::Meter.convert(dec!(10), &p, "Toles").unwrap(), dec!(60));
        assert_eq!(UnitOfMeasure::Centimeter.convert(dec!(10), &p, "Toles").unwrap(), dec!(6000));

        let mut sheet = beam();
        sheet.area = Some(dec!(2.5));
        assert_eq!(UnitOfMeasure::SquareMeter.convert(dec!(4), &sheet, "Bardage").unwrap(), dec!(10));
    }

    #[test]
    fn test_missing_dimension_is_an_error() {
        let err = UnitOfMeasure::SquareMeter
            .convert(dec!(4), &beam(), "Bardage")
            .unwrap_err();
        assert!(err.to_string().contains("no area defined"));

        let mut bare = beam();
        bare.weight = Some(Decimal::ZERO);
        assert!(UnitOfMeasure::Kilogram.convert(dec!(1), &bare, "Toles").is_err());
    }

    #[test]
    fn test_lump_sum_never_counts_stock() {
        assert!(!UnitOfMeasure::LumpSum.counts_stock());
        assert!(UnitOfMeasure::LumpSum.convert(dec!(1), &beam(), "Etudes").is_err());
    }

    #[test]
    fn test_unit_codes_deserialize() {
        let units: Vec<UnitOfMeasure> = serde_json::from_str(r#"["kg", "m2", "forfait", "unit"]"#).unwrap();
        assert_eq!(
            units,
            vec![
                UnitOfMeasure::Kilogram,
                UnitOfMeasure::SquareMeter,
                UnitOfMeasure::LumpSum,
                UnitOfMeasure::Unit
            ]
        );
        assert!(serde_json::from_str::<UnitOfMeasure>(r#""litre""#).is_err());
    }
}
