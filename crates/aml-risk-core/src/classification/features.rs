use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;
use crate::{AmlRiskError, AmlRiskResult};

/// Enriched transaction row, produced once by the upstream enrichment stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionFeatures {
    pub transaction_id: String,
    pub amount: Money,
    #[serde(default)]
    pub is_cash: bool,
    #[serde(default)]
    pub is_international: bool,
    #[serde(default)]
    pub is_round_amount: bool,
    #[serde(default)]
    pub sector_risk: bool,
    #[serde(default)]
    pub is_nocturnal: bool,
    #[serde(default)]
    pub is_weekend: bool,
    #[serde(default)]
    pub monthly_frequency: u32,
    #[serde(default)]
    pub six_month: SixMonthAggregates,
    #[serde(default)]
    pub is_burst: bool,
    /// Regulatory activity classification code.
    #[serde(default)]
    pub fraction: String,
    /// Free-form activity sector used only for the legal narrative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SixMonthAggregates {
    pub count: u32,
    pub sum: Money,
    pub max: Money,
    pub std_dev: Money,
    /// Amount divided by the customer's personal six-month average.
    pub ratio_vs_average: Decimal,
}

impl SixMonthAggregates {
    pub fn mean(&self) -> Option<Money> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / Decimal::from(self.count))
    }

    /// Coefficient of variation of six-month amounts, when defined.
    pub fn coefficient_of_variation(&self) -> Option<Decimal> {
        match self.mean() {
            Some(mean) if mean > Decimal::ZERO => self.std_dev.checked_div(mean),
            _ => None,
        }
    }
}

fn malformed(index: usize, reason: impl Into<String>) -> AmlRiskError {
    AmlRiskError::MalformedRow {
        index,
        reason: reason.into(),
    }
}

impl TransactionFeatures {
    pub fn is_off_hours(&self) -> bool {
        self.is_nocturnal || self.is_weekend
    }

    /// Reject rows the enrichment stage could never have produced.
    pub fn validate(&self, index: usize) -> AmlRiskResult<()> {
        if self.transaction_id.trim().is_empty() {
            return Err(malformed(index, "transaction_id must not be empty"));
        }
        if self.amount < Decimal::ZERO {
            return Err(malformed(
                index,
                format!("amount must be non-negative, got {}", self.amount),
            ));
        }
        let agg = &self.six_month;
        for (field, value) in [
            ("six_month.sum", agg.sum),
            ("six_month.max", agg.max),
            ("six_month.std_dev", agg.std_dev),
            ("six_month.ratio_vs_average", agg.ratio_vs_average),
        ] {
            if value < Decimal::ZERO {
                return Err(malformed(
                    index,
                    format!("{} must be non-negative, got {}", field, value),
                ));
            }
        }
        if agg.count == 0 && agg.sum > Decimal::ZERO {
            return Err(malformed(
                index,
                "six_month.sum is positive but six_month.count is zero",
            ));
        }
        if let Some(mean) = agg.mean().filter(|m| *m > Decimal::ZERO) {
            if agg.std_dev.checked_div(mean).is_none() {
                return Err(malformed(
                    index,
                    format!(
                        "six_month.std_dev {} is out of range for a mean of {}",
                        agg.std_dev, mean
                    ),
                ));
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::routine_row;
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_row() {
        assert!(routine_row("t1").validate(0).is_ok());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut row = routine_row("t1");
        row.amount = dec!(-1);
        match row.validate(3).unwrap_err() {
            AmlRiskError::MalformedRow { index, .. } => assert_eq!(index, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_id_rejected() {
        let row = routine_row("  ");
        assert!(row.validate(0).is_err());
    }

    #[test]
    fn test_inconsistent_aggregates_rejected() {
        let mut row = routine_row("t1");
        row.six_month.count = 0;
        assert!(row.validate(0).is_err());
    }

    #[test]
    fn test_coefficient_of_variation() {
        let row = routine_row("t1");
        // mean = 1500, std = 300
        assert_eq!(row.six_month.coefficient_of_variation(), Some(dec!(0.2)));
        assert_eq!(SixMonthAggregates::default().coefficient_of_variation(), None);
    }

    #[test]
    fn test_unrepresentable_variation_rejected() {
        let mut row = routine_row("t1");
        row.six_month.count = 1;
        row.six_month.sum = dec!(0.0000000000000000000001);
        row.six_month.std_dev = dec!(100_000_000_000);
        assert_eq!(row.six_month.coefficient_of_variation(), None);
        let err = row.validate(4).unwrap_err();
        assert!(err.to_string().contains("six_month.std_dev"));
    }

    #[test]
    fn test_missing_flags_default_false() {
        let json = r#"{ "transaction_id": "x", "amount": "10" }"#;
        let row: TransactionFeatures = serde_json::from_str(json).unwrap();
        assert!(!row.is_cash);
        assert_eq!(row.fraction, "");
        assert_eq!(row.six_month.count, 0);
    }
}
