//! Batch evaluation engine.
//!
//! Configuration is injected at construction: the regulatory profile and
//! legal-basis catalog are fixed for the engine's lifetime, while the
//! `EngineConfig` can be swapped atomically between batches. Each batch
//! reads one configuration snapshot and evaluates rows independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::classification::classifier::{
    ClassProbabilities, ClassifierAdapter, ClassifierOutput, RiskClassifier,
};
use crate::classification::explanation::{build_explanation, Explanation, ExplanationInput};
use crate::classification::features::TransactionFeatures;
use crate::classification::fusion::{fuse, rule_based_label, FusionPath};
use crate::classification::guardrail::evaluate_guardrails;
use crate::classification::risk_level::{consolidate, AlertLevel, ConsolidationInput, RiskLevel};
use crate::classification::scoring::{score_transaction, RiskScore};
use crate::classification::strategy::{select_strategy, StrategySelection};
use crate::classification::triggers::{detect_heuristic_triggers, RiskLabel, TriggerList};
use crate::config::EngineConfig;
use crate::regulatory::legal_basis::LegalBasisCatalog;
use crate::regulatory::profile::{RegulatoryProfile, ResolvedThresholds};
use crate::types::{with_metadata, ComputationOutput, Probability, Score};
use crate::{AmlRiskError, AmlRiskResult};

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: RiskLabel,
    pub triggers: TriggerList,
    pub score: Score,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<ClassProbabilities>,
    /// Classifier max-class probability, or 1 for purely deterministic outcomes.
    pub confidence: Probability,
    pub rule_label: RiskLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier_label: Option<RiskLabel>,
    pub fusion_path: FusionPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAssessment {
    pub transaction_id: String,
    pub classification: ClassificationResult,
    pub risk_level: RiskLevel,
    pub explanation: Explanation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassifierStatus {
    NotConsulted,
    Available { name: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub strategy: StrategySelection,
    pub config_version: String,
    pub classifier: ClassifierStatus,
    /// True when the strategy wanted the classifier but could not use it.
    pub degraded: bool,
    pub evaluated_at: DateTime<Utc>,
    pub total_rows: usize,
    pub assessed_rows: usize,
    pub rejected_rows: usize,
    pub unmapped_fraction_rows: usize,
    pub label_counts: BTreeMap<RiskLabel, usize>,
    pub level_counts: BTreeMap<AlertLevel, usize>,
}

/// Results aligned one-to-one with the input rows; rejected rows are `None`
/// and described in `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAssessment {
    pub results: Vec<Option<TransactionAssessment>>,
    pub errors: Vec<RowError>,
    pub metadata: BatchMetadata,
}

// ---------------------------------------------------------------------------
// Row-parallel helpers
// ---------------------------------------------------------------------------

#[cfg(feature = "parallel")]
fn map_rows<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    use rayon::prelude::*;
    items.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_rows<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    items.iter().map(f).collect()
}

/// A row as handed to the pipeline: parsed features or the parse failure.
type RowInput<'a> = Result<&'a TransactionFeatures, &'a AmlRiskError>;

/// Intermediate state of a row that passed validation.
struct PreparedRow<'a> {
    index: usize,
    features: &'a TransactionFeatures,
    thresholds: ResolvedThresholds,
    triggers: TriggerList,
    guardrail: bool,
    score: RiskScore,
    rule_label: RiskLabel,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct RiskEngine {
    regulatory: Arc<RegulatoryProfile>,
    legal_basis: Arc<LegalBasisCatalog>,
    classifier: ClassifierAdapter,
    config: RwLock<Arc<EngineConfig>>,
}

impl RiskEngine {
    pub fn new(regulatory: RegulatoryProfile, config: EngineConfig) -> AmlRiskResult<Self> {
        config.validate()?;
        info!(version = %config.version, "engine configuration loaded");
        Ok(RiskEngine {
            regulatory: Arc::new(regulatory),
            legal_basis: Arc::new(LegalBasisCatalog::default()),
            classifier: ClassifierAdapter::disabled(),
            config: RwLock::new(Arc::new(config)),
        })
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn RiskClassifier>) -> Self {
        info!(classifier = classifier.name(), "classifier attached");
        self.classifier = ClassifierAdapter::new(classifier);
        self
    }

    pub fn with_legal_basis(mut self, catalog: LegalBasisCatalog) -> Self {
        self.legal_basis = Arc::new(catalog);
        self
    }

    pub fn regulatory(&self) -> &RegulatoryProfile {
        &self.regulatory
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<EngineConfig> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validate and swap in a new configuration. In-flight batches keep the
    /// snapshot they started with.
    pub fn reconfigure(&self, config: EngineConfig) -> AmlRiskResult<()> {
        config.validate()?;
        let version = config.version.clone();
        let mut slot = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *slot, Arc::new(config));
        info!(from = %previous.version, to = %version, "engine configuration replaced");
        Ok(())
    }

    /// Which strategy a batch of `batch_size` rows would run under.
    pub fn strategy_for(&self, batch_size: usize) -> StrategySelection {
        select_strategy(batch_size, &self.config().strategy)
    }

    pub fn assess_batch(&self, rows: &[TransactionFeatures]) -> BatchAssessment {
        self.assess_batch_at(rows, Utc::now())
    }

    /// Evaluate with an explicit evaluation timestamp.
    pub fn assess_batch_at(
        &self,
        rows: &[TransactionFeatures],
        evaluated_at: DateTime<Utc>,
    ) -> BatchAssessment {
        let inputs: Vec<RowInput<'_>> = rows.iter().map(Ok).collect();
        self.run(&inputs, evaluated_at, &self.config())
    }

    /// Deserialize each row independently so one bad row cannot sink the batch.
    pub fn assess_json_rows(&self, rows: &[serde_json::Value]) -> BatchAssessment {
        self.assess_json_rows_at(rows, Utc::now())
    }

    pub fn assess_json_rows_at(
        &self,
        rows: &[serde_json::Value],
        evaluated_at: DateTime<Utc>,
    ) -> BatchAssessment {
        let parsed = parse_rows(rows);
        let inputs: Vec<RowInput<'_>> = parsed.iter().map(Result::as_ref).collect();
        self.run(&inputs, evaluated_at, &self.config())
    }

    /// Evaluate a batch and wrap it in the standard computation envelope.
    pub fn classify(&self, rows: &[TransactionFeatures]) -> ComputationOutput<BatchAssessment> {
        let start = Instant::now();
        let config = self.config();
        let inputs: Vec<RowInput<'_>> = rows.iter().map(Ok).collect();
        let batch = self.run(&inputs, Utc::now(), &config);
        envelope(batch, &config, start)
    }

    /// As [`RiskEngine::classify`], for rows that have not been deserialized yet.
    pub fn classify_json_rows(
        &self,
        rows: &[serde_json::Value],
    ) -> ComputationOutput<BatchAssessment> {
        let start = Instant::now();
        let config = self.config();
        let parsed = parse_rows(rows);
        let inputs: Vec<RowInput<'_>> = parsed.iter().map(Result::as_ref).collect();
        let batch = self.run(&inputs, Utc::now(), &config);
        envelope(batch, &config, start)
    }

    fn prepare<'a>(
        &self,
        index: usize,
        features: &'a TransactionFeatures,
        config: &EngineConfig,
    ) -> AmlRiskResult<PreparedRow<'a>> {
        features.validate(index)?;

        let thresholds = self.regulatory.resolve(&features.fraction);
        if !thresholds.mapped {
            debug!(
                index,
                fraction = %thresholds.fraction,
                "unmapped fraction; guardrails not applicable"
            );
        }

        let guardrail = evaluate_guardrails(features, &thresholds);
        let mut triggers = TriggerList::new();
        triggers.extend(guardrail.triggers);
        triggers.extend(detect_heuristic_triggers(
            features,
            &thresholds,
            &config.heuristics,
        ));

        let score = score_transaction(features, &thresholds, &triggers, config);
        let rule_label = rule_based_label(&triggers, features.amount, &config.heuristics);

        Ok(PreparedRow {
            index,
            features,
            thresholds,
            triggers,
            guardrail: guardrail.triggered,
            score,
            rule_label,
        })
    }

    fn finish(
        &self,
        row: &PreparedRow<'_>,
        classifier: Option<&ClassifierOutput>,
        selection: &StrategySelection,
        config: &EngineConfig,
        evaluated_at: DateTime<Utc>,
    ) -> TransactionAssessment {
        let fusion = fuse(row.guardrail, row.rule_label, classifier, &config.fusion);

        let risk_level = consolidate(
            &ConsolidationInput {
                guardrail_triggered: row.guardrail,
                label: fusion.label,
                score: row.score.value,
                discrepancy: fusion.discrepancy,
                classifier_confidence: classifier.map(|c| c.confidence),
            },
            &config.consolidation,
            evaluated_at,
        );

        let explanation = build_explanation(
            &ExplanationInput {
                features: row.features,
                thresholds: &row.thresholds,
                label: fusion.label,
                triggers: &row.triggers,
                score: &row.score,
                classifier,
                fusion: &fusion,
                strategy: selection.mode,
                config_version: &config.version,
            },
            &self.legal_basis,
            evaluated_at,
        );

        debug!(
            index = row.index,
            transaction_id = %row.features.transaction_id,
            label = %fusion.label,
            level = %risk_level.level,
            score = %row.score.value,
            "transaction assessed"
        );

        TransactionAssessment {
            transaction_id: row.features.transaction_id.clone(),
            classification: ClassificationResult {
                label: fusion.label,
                triggers: row.triggers.clone(),
                score: row.score.value,
                probabilities: classifier.map(|c| c.probabilities.clone()),
                confidence: classifier
                    .map(|c| c.confidence)
                    .unwrap_or(Probability::ONE),
                rule_label: fusion.rule_label,
                classifier_label: fusion.classifier_label,
                fusion_path: fusion.path,
            },
            risk_level,
            explanation,
        }
    }

    fn run(
        &self,
        inputs: &[RowInput<'_>],
        evaluated_at: DateTime<Utc>,
        config: &EngineConfig,
    ) -> BatchAssessment {
        let total = inputs.len();
        let selection = select_strategy(total, &config.strategy);

        let indexed: Vec<(usize, RowInput<'_>)> = inputs.iter().copied().enumerate().collect();
        let stage: Vec<Result<PreparedRow<'_>, RowError>> =
            map_rows(&indexed, |&(index, input)| match input {
                Ok(features) => self.prepare(index, features, config).map_err(|e| RowError {
                    index,
                    transaction_id: Some(features.transaction_id.clone())
                        .filter(|id| !id.trim().is_empty()),
                    reason: e.to_string(),
                }),
                Err(e) => Err(RowError {
                    index,
                    transaction_id: None,
                    reason: e.to_string(),
                }),
            });

        let mut prepared = Vec::with_capacity(total);
        let mut errors = Vec::new();
        for outcome in stage {
            match outcome {
                Ok(row) => prepared.push(row),
                Err(e) => {
                    warn!(index = e.index, reason = %e.reason, "row rejected");
                    errors.push(e);
                }
            }
        }

        // One vectorised classifier call for every row not already settled by a guardrail.
        let mut classifier_outputs: HashMap<usize, ClassifierOutput> = HashMap::new();
        let pending: Vec<&PreparedRow<'_>> = prepared.iter().filter(|r| !r.guardrail).collect();
        let consult = selection.mode.consults_classifier() && !pending.is_empty();
        let (classifier_status, degraded) = if !consult {
            (ClassifierStatus::NotConsulted, false)
        } else {
            let features: Vec<&TransactionFeatures> = pending.iter().map(|r| r.features).collect();
            match self
                .classifier
                .score_batch(&features, &config.classifier_thresholds)
            {
                Ok(outputs) => {
                    for (row, output) in pending.iter().zip(outputs) {
                        classifier_outputs.insert(row.index, output);
                    }
                    let name = self.classifier.name().unwrap_or("classifier").to_string();
                    (ClassifierStatus::Available { name }, false)
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        strategy = %selection.mode,
                        "classifier unavailable; degrading to rule/score-only"
                    );
                    (
                        ClassifierStatus::Unavailable {
                            reason: e.to_string(),
                        },
                        true,
                    )
                }
            }
        };

        let assessed: Vec<(usize, TransactionAssessment)> = map_rows(&prepared, |row| {
            let output = classifier_outputs.get(&row.index);
            (
                row.index,
                self.finish(row, output, &selection, config, evaluated_at),
            )
        });

        let unmapped_fraction_rows = prepared.iter().filter(|r| !r.thresholds.mapped).count();
        if unmapped_fraction_rows > 0 {
            info!(
                rows = unmapped_fraction_rows,
                "rows with unmapped fractions evaluated without guardrails"
            );
        }

        let mut label_counts = BTreeMap::new();
        let mut level_counts = BTreeMap::new();
        let mut results: Vec<Option<TransactionAssessment>> = vec![None; total];
        let assessed_rows = assessed.len();
        for (index, assessment) in assessed {
            *label_counts
                .entry(assessment.classification.label)
                .or_insert(0) += 1;
            *level_counts.entry(assessment.risk_level.level).or_insert(0) += 1;
            results[index] = Some(assessment);
        }
        errors.sort_by_key(|e| e.index);

        info!(
            rows = total,
            assessed = assessed_rows,
            rejected = errors.len(),
            strategy = %selection.mode,
            degraded,
            "batch assessed"
        );

        BatchAssessment {
            results,
            metadata: BatchMetadata {
                strategy: selection,
                config_version: config.version.clone(),
                classifier: classifier_status,
                degraded,
                evaluated_at,
                total_rows: total,
                assessed_rows,
                rejected_rows: errors.len(),
                unmapped_fraction_rows,
                label_counts,
                level_counts,
            },
            errors,
        }
    }
}

fn parse_rows(rows: &[serde_json::Value]) -> Vec<AmlRiskResult<TransactionFeatures>> {
    rows.iter()
        .enumerate()
        .map(|(index, value)| {
            TransactionFeatures::deserialize(value).map_err(|e| AmlRiskError::MalformedRow {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

fn envelope(
    batch: BatchAssessment,
    config: &EngineConfig,
    start: Instant,
) -> ComputationOutput<BatchAssessment> {
    let warnings = batch_warnings(&batch);
    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Adaptive AML risk classification: regulatory guardrails, weighted EBR score, \
         classifier fusion",
        config,
        warnings,
        elapsed,
        batch,
    )
}

fn batch_warnings(batch: &BatchAssessment) -> Vec<String> {
    let mut warnings = Vec::new();
    let meta = &batch.metadata;
    if let ClassifierStatus::Unavailable { reason } = &meta.classifier {
        warnings.push(format!(
            "Classifier unavailable ({}); {} batch evaluated in rule/score-only mode",
            reason, meta.strategy.mode
        ));
    }
    if meta.rejected_rows > 0 {
        warnings.push(format!(
            "{} of {} rows rejected as malformed",
            meta.rejected_rows, meta.total_rows
        ));
    }
    if meta.unmapped_fraction_rows > 0 {
        warnings.push(format!(
            "{} rows have no configured regulatory thresholds; guardrails were not applied to them",
            meta.unmapped_fraction_rows
        ));
    }
    warnings
}
