mod common;

use std::sync::Arc;

use aml_risk_core::classification::features::TransactionFeatures;
use aml_risk_core::classification::strategy::{select_strategy, StrategyMode};
use aml_risk_core::classification::triggers::RiskLabel;
use aml_risk_core::config::StrategyParams;
use common::{engine, evaluated_at, quiet_batch, quiet_row, StubClassifier};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Every combination of boolean flags across a spread of amounts.
fn flag_grid() -> Vec<TransactionFeatures> {
    let amounts = [
        dec!(0),
        dec!(9_999.99),
        dec!(60_000),
        dec!(150_000),
        dec!(299_999.99),
        dec!(2_500_000),
    ];
    let mut rows = Vec::new();
    for (a, amount) in amounts.iter().enumerate() {
        for mask in 0u8..64 {
            let mut row = quiet_row(&format!("g-{}-{}", a, mask));
            row.amount = *amount;
            row.is_cash = mask & 1 != 0;
            row.is_international = mask & 2 != 0;
            row.is_round_amount = mask & 4 != 0;
            row.sector_risk = mask & 8 != 0;
            row.is_nocturnal = mask & 16 != 0;
            row.is_weekend = mask & 32 != 0;
            row.monthly_frequency = u32::from(mask % 15);
            row.six_month.ratio_vs_average = Decimal::from(mask % 7);
            row.six_month.count = if mask % 9 == 0 { 1 } else { 6 };
            row.fraction = if mask % 4 == 0 { "XIX".into() } else { "VIII".into() };
            rows.push(row);
        }
    }
    rows
}

#[test]
fn test_scores_stay_within_unit_interval() {
    let out = engine().assess_batch_at(&flag_grid(), evaluated_at());
    assert!(out.errors.is_empty());
    for a in out.results.iter().flatten() {
        let score = a.classification.score;
        assert!(score >= Decimal::ZERO && score <= Decimal::ONE, "{}", score);
        assert!(a.risk_level.risk_score <= 100);
    }
}

#[test]
fn test_explanations_always_have_three_reasons() {
    let out = engine().assess_batch_at(&flag_grid(), evaluated_at());
    for a in out.results.iter().flatten() {
        assert_eq!(a.explanation.reasons.len(), 3);
        assert!(a.explanation.reasons.iter().all(|r| !r.trim().is_empty()));
    }
}

#[test]
fn test_guardrail_is_reportable_for_every_batch_size() {
    for size in [1usize, 150, 1_200] {
        let mut rows = quiet_batch(size);
        rows[0].amount = dec!(750_000);
        let stub = Arc::new(StubClassifier::returning([0.99, 0.005, 0.005]));
        let out = engine()
            .with_classifier(stub)
            .assess_batch_at(&rows, evaluated_at());
        let a = out.results[0].as_ref().unwrap();
        assert_eq!(a.classification.label, RiskLabel::Reportable, "batch {}", size);
        if size > 1 {
            let other = out.results[1].as_ref().unwrap();
            assert_eq!(other.classification.label, RiskLabel::Routine, "batch {}", size);
        }
    }
}

#[test]
fn test_strategy_boundaries() {
    let params = StrategyParams::default();
    assert_eq!(select_strategy(99, &params).mode, StrategyMode::RuleBased);
    assert_eq!(select_strategy(100, &params).mode, StrategyMode::Hybrid);
    assert_eq!(select_strategy(999, &params).mode, StrategyMode::Hybrid);
    assert_eq!(select_strategy(1_000, &params).mode, StrategyMode::ModelDriven);
    assert_eq!(engine().strategy_for(100).mode, StrategyMode::Hybrid);
}

#[test]
fn test_reevaluation_is_identical_except_timestamps() {
    let rows = flag_grid();
    let engine = engine();
    let first = engine.assess_batch_at(&rows, evaluated_at());
    let later = evaluated_at() + chrono::Duration::hours(3);
    let second = engine.assess_batch_at(&rows, later);

    for (a, b) in first.results.iter().flatten().zip(second.results.iter().flatten()) {
        assert_eq!(a.classification, b.classification);
        assert_eq!(a.explanation.reasons, b.explanation.reasons);
        assert_eq!(a.explanation.legal_basis, b.explanation.legal_basis);
        assert_eq!(a.risk_level.level, b.risk_level.level);
        assert_eq!(a.risk_level.risk_score, b.risk_level.risk_score);
        assert_eq!(b.explanation.appendix.evaluated_at, later);
    }
}

#[test]
fn test_amount_equal_to_notice_threshold_triggers() {
    let mut at = quiet_row("edge-at");
    at.amount = dec!(300_000);
    let mut below = quiet_row("edge-below");
    below.amount = dec!(299_999.99);

    let out = engine().assess_batch_at(&[at, below], evaluated_at());
    let at = out.results[0].as_ref().unwrap();
    let below = out.results[1].as_ref().unwrap();

    assert!(at.classification.triggers.codes().contains(&"R1_NOTICE_THRESHOLD"));
    assert_eq!(at.classification.label, RiskLabel::Reportable);
    assert!(!below.classification.triggers.has_guardrail());
}

#[test]
fn test_unmapped_fraction_never_triggers_guardrails() {
    let rows: Vec<TransactionFeatures> = [dec!(1), dec!(300_000), dec!(50_000_000)]
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            let mut row = quiet_row(&format!("u-{}", i));
            row.amount = *amount;
            row.is_cash = true;
            row.fraction = "XIX".into();
            row.six_month.sum = dec!(90_000_000);
            row
        })
        .collect();

    let out = engine().assess_batch_at(&rows, evaluated_at());
    for a in out.results.iter().flatten() {
        assert!(!a.classification.triggers.has_guardrail());
        assert!(!a.explanation.forced_by_law);
    }
    assert_eq!(out.metadata.unmapped_fraction_rows, 3);
}
