//! Ensemble Trainer - Main Training Logic
//!
//! Orchestrates a training run:
//! 1. Carve a stratified validation set from the training samples
//! 2. Fit one transform on the training (not validation) and test samples
//! 3. Optionally shrink the universe with one automatic pre-selection pass
//! 4. Train every member on its stratified fold in the `cv` pool
//! 5. Assemble one ensemble per λ target and keep the best on validation
//! 6. Report generation
//!
//! [`EnsembleTrainer::cross_validate`] repeats this per fold and collects
//! out-of-fold predictions.

use std::io::{self, Write};
use std::iter;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    CandidateEntry, DataSplitter, MemberEntry, TrainError, TrainOutcome, TrainedClassifier,
    Trainer, TrainerConfig, TrainingContext, TrainingReport,
};
use crate::encoder::CountEncoder;
use crate::features::{Feature, FeatureCatalog, FeatureIndices};
use crate::io::DataError;
use crate::metrics::roc_auc;
use crate::model::{Ensemble, Summary};
use crate::pair_index::PairIndex;
use crate::selector::SelectionMode;
use crate::sparse::{subset, SparseSample};
use crate::trace::{PathRecorder, Trace};
use crate::transform::StandardTransform;

fn full_index(feature: Feature, pairs: Option<&PairIndex>) -> usize {
    match pairs {
        Some(p) => feature.full_index(p),
        None => feature.0 + 1,
    }
}

fn labels_of(data: &[SparseSample]) -> Result<Vec<bool>, DataError> {
    data.iter()
        .enumerate()
        .map(|(i, x)| x.label().ok_or(DataError::MissingLabel(i)))
        .collect()
}

/// Base features the members train over
struct Universe {
    n_base: usize,
    cooccurrence: bool,
    transform: StandardTransform,
    /// Original coefficient of every local base feature after pre-selection
    origin: Option<Vec<Feature>>,
}

impl Universe {
    fn original(&self, feature: Feature) -> Feature {
        match &self.origin {
            Some(origin) => origin[feature.0],
            None => feature,
        }
    }
}

struct MemberRun {
    samples: usize,
    outcome: TrainOutcome,
    time_secs: f64,
}

/// Ensemble trained for one selection mode
#[derive(Debug, Clone)]
pub struct Candidate {
    pub mode: SelectionMode,
    pub model: Ensemble,
    /// Mean λ over members
    pub lambda: f64,
    /// Mean validation loss per sample of every member (empty without a
    /// validation set)
    pub validation_losses: Vec<f64>,
}

impl Candidate {
    pub fn validation_loss(&self) -> Option<f64> {
        if self.validation_losses.is_empty() {
            None
        } else {
            Some(self.validation_losses.iter().sum::<f64>() / self.validation_losses.len() as f64)
        }
    }
}

/// Result of ensemble training
#[derive(Debug, Clone)]
pub struct EnsembleResult {
    /// One candidate per selection mode, in training order
    pub candidates: Vec<Candidate>,
    /// Index of the returned candidate
    pub selected: usize,
    pub report: TrainingReport,
    /// Estimator iterations of all members (empty unless `save_trace`)
    pub trace: Trace,
    /// Regularisation path over the original universe (empty unless `save_trace`)
    pub path: PathRecorder<Feature>,
}

impl EnsembleResult {
    /// The selected ensemble, over the full training catalog.
    pub fn model(&self) -> &Ensemble {
        &self.candidates[self.selected].model
    }

    pub fn into_model(mut self) -> Ensemble {
        self.candidates.swap_remove(self.selected).model
    }
}

/// Out-of-fold prediction of one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvPrediction {
    pub fold: usize,
    pub sample: usize,
    pub label: bool,
    pub prediction: f64,
}

/// Result of K-fold cross-validation
#[derive(Debug, Clone)]
pub struct CrossValidation {
    /// Sorted by fold, then sample
    pub predictions: Vec<CvPrediction>,
    pub reports: Vec<TrainingReport>,
}

impl CrossValidation {
    /// ROC AUC of the pooled out-of-fold predictions.
    pub fn auc(&self) -> f64 {
        let scores: Vec<f64> = self.predictions.iter().map(|p| p.prediction).collect();
        let labels: Vec<bool> = self.predictions.iter().map(|p| p.label).collect();
        roc_auc(&scores, &labels)
    }

    /// Write a `fold label prediction` table.
    pub fn write<W: Write>(&self, mut w: W) -> io::Result<()> {
        writeln!(w, "fold label prediction")?;
        for p in &self.predictions {
            writeln!(w, "{} {} {}", p.fold, u8::from(p.label), p.prediction)?;
        }
        w.flush()
    }
}

/// Ensemble Trainer
///
/// Trains one or more classifiers per λ target over a feature catalog.
pub struct EnsembleTrainer {
    config: TrainerConfig,
    ctx: TrainingContext,
}

impl EnsembleTrainer {
    pub fn new(config: TrainerConfig, ctx: TrainingContext) -> Result<Self, TrainError> {
        config.validate()?;
        Ok(Self { config, ctx })
    }

    /// Trainer with thread pools sized from `config`.
    pub fn from_config(config: TrainerConfig) -> Result<Self, TrainError> {
        let ctx = TrainingContext::new(config.threads_cv, config.threads_saga, config.threads_lr)?;
        Self::new(config, ctx)
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn context(&self) -> &TrainingContext {
        &self.ctx
    }

    /// Train on labelled samples over `catalog` (base feature `i` at
    /// position `i + 1`).
    ///
    /// `test` samples only contribute to the transform statistics; their
    /// labels, if any, are ignored.
    pub fn train(
        &self,
        catalog: &FeatureCatalog,
        data: &[SparseSample],
        test: &[SparseSample],
    ) -> Result<EnsembleResult, TrainError> {
        let start_time = Instant::now();
        let config = &self.config;

        if data.is_empty() {
            return Err(TrainError::EmptyData("no training samples".to_string()));
        }
        let n_base = catalog.len();
        for x in data.iter().chain(test) {
            if x.n_features() != n_base {
                return Err(DataError::DimensionMismatch {
                    expected: n_base,
                    got: x.n_features(),
                }
                .into());
            }
        }
        let labels = labels_of(data)?;

        // Step 1: validation split
        let splitter = DataSplitter::new()
            .with_validation_fraction(config.validation_fraction)
            .with_seed(config.seed);
        let split = splitter.split_indices(&labels);
        let train = subset(data, &split.train);
        let validation = subset(data, &split.validation);
        let train_labels: Vec<bool> = split.train.iter().map(|&i| labels[i]).collect();
        if config.ensemble_size > train.len() {
            return Err(TrainError::InvalidConfig(format!(
                "ensemble of {} members needs at least as many training samples, got {}",
                config.ensemble_size,
                train.len()
            )));
        }
        log::info!(
            "data split: {} train, {} validation, {} test",
            train.len(),
            validation.len(),
            test.len()
        );

        // Step 2: transform over the full coefficient space, validation
        // samples excluded
        let pairs = config.cooccurrence.then(|| PairIndex::new(n_base));
        let transform = if !config.normalize {
            StandardTransform::identity()
        } else if test.is_empty() {
            StandardTransform::fit(&train, pairs.as_ref())
        } else {
            let all: Vec<SparseSample> = train.iter().chain(test).cloned().collect();
            StandardTransform::fit(&all, pairs.as_ref())
        };

        // Step 3: pre-selection
        let mut universe = Universe {
            n_base,
            cooccurrence: config.cooccurrence,
            transform: transform.clone(),
            origin: None,
        };
        let mut member_data = train.clone();
        if let Some(target) = config.preselect {
            let outcome = Trainer::new(config, &self.ctx).fit(
                &train,
                n_base,
                config.cooccurrence,
                &transform,
                &[SelectionMode::Auto { target }],
            )?;
            let kept = FeatureIndices::new(
                outcome
                    .classifiers
                    .first()
                    .map(|c| c.coefficients().map(|(f, _)| f).collect())
                    .unwrap_or_default(),
            );
            if kept.is_empty() {
                log::warn!("pre-selection kept no features, training over the full universe");
            } else {
                log::info!("pre-selected {} coefficients", kept.len());
                let slots: Vec<usize> = iter::once(0)
                    .chain(kept.iter().map(|f| full_index(*f, pairs.as_ref())))
                    .collect();
                let encoder = CountEncoder::new(kept.clone(), n_base)?;
                member_data = train
                    .iter()
                    .map(|x| encoder.encode(&x.counts(), x.label()))
                    .collect::<Result<Vec<_>, _>>()?;
                universe = Universe {
                    n_base: kept.len(),
                    cooccurrence: false,
                    transform: transform.gather(&slots),
                    origin: Some(kept.as_slice().to_vec()),
                };
            }
        }

        // Step 4: members
        let size = config.ensemble_size;
        let folds: Vec<Vec<usize>> = if size > 1 {
            splitter.fold_indices(&train_labels, size)
        } else {
            vec![(0..member_data.len()).collect()]
        };
        let modes = config.selection_modes();
        let runs: Vec<MemberRun> = self.ctx.pool_cv().install(|| {
            folds
                .par_iter()
                .enumerate()
                .map(|(member, indices)| {
                    let started = Instant::now();
                    let part = subset(&member_data, indices);
                    log::info!("training member {} on {} samples", member, part.len());
                    let outcome = Trainer::new(config, &self.ctx).fit(
                        &part,
                        universe.n_base,
                        universe.cooccurrence,
                        &universe.transform,
                        &modes,
                    )?;
                    Ok(MemberRun {
                        samples: part.len(),
                        outcome,
                        time_secs: started.elapsed().as_secs_f64(),
                    })
                })
                .collect::<Result<Vec<_>, TrainError>>()
        })?;

        // Step 5: one ensemble per mode, chosen on validation
        let summary = if size > 1 { config.summary } else { Summary::None };
        let mut candidates = Vec::with_capacity(modes.len());
        for (k, &mode) in modes.iter().enumerate() {
            let classifiers: Vec<&TrainedClassifier> =
                runs.iter().map(|r| &r.outcome.classifiers[k]).collect();
            let model = assemble(catalog, &universe, &transform, pairs.as_ref(), &classifiers, summary)?;
            let validation_losses = if validation.is_empty() {
                Vec::new()
            } else {
                let encoder = model.encoder()?;
                let encoded = validation
                    .iter()
                    .map(|x| encoder.encode(&x.counts(), x.label()))
                    .collect::<Result<Vec<_>, _>>()?;
                let n = encoded.len() as f64;
                model.member_losses(&encoded)?.into_iter().map(|l| l / n).collect()
            };
            let lambda =
                classifiers.iter().map(|c| c.lambda).sum::<f64>() / classifiers.len() as f64;
            candidates.push(Candidate {
                mode,
                model,
                lambda,
                validation_losses,
            });
        }
        let selected = if validation.is_empty() {
            candidates.len() - 1
        } else {
            let mut best = 0;
            for (k, candidate) in candidates.iter().enumerate() {
                if candidate.validation_loss() < candidates[best].validation_loss() {
                    best = k;
                }
            }
            best
        };

        // Step 6: report, trace and path
        let kind = if catalog.is_kmer() { "kmerLr" } else { "scoresLr" };
        let mut report =
            TrainingReport::new(kind, n_base, data.len(), train.len(), validation.len(), size);
        for (member, run) in runs.iter().enumerate() {
            let c = &run.outcome.classifiers[selected];
            report.add_member(MemberEntry {
                member,
                samples: run.samples,
                nonzero: c.nonzero(),
                lambda: c.lambda,
                target: c.mode.target(),
                epochs: c.epochs,
                iterations: c.iterations,
                stop: c.stop,
                train_loss: c.loss,
                validation_loss: candidates[selected].validation_losses.get(member).copied(),
                time_secs: run.time_secs,
            });
        }
        for candidate in &candidates {
            report.add_candidate(CandidateEntry {
                target: candidate.mode.target(),
                lambda: candidate.lambda,
                features: candidate.model.features().len(),
                validation_loss: candidate.validation_loss(),
            });
        }

        let mut trace = Trace::new();
        let mut path = PathRecorder::new();
        for (member, run) in runs.iter().enumerate() {
            trace.extend(&run.outcome.trace);
            let id = (size > 1).then_some(member);
            for point in &run.outcome.path {
                path.record(
                    id,
                    point.lambda,
                    point
                        .coefficients
                        .iter()
                        .map(|(f, t)| (universe.original(*f), *t)),
                );
            }
        }

        report.finalize(candidates[selected].mode.target(), start_time.elapsed().as_secs_f64());
        log::info!("{}", report.summary());

        Ok(EnsembleResult {
            candidates,
            selected,
            report,
            trace,
            path,
        })
    }

    /// Stratified `k`-fold cross-validation.
    ///
    /// Fold `f` trains with seed `seed + f` on the other folds; its own
    /// samples serve as the test set.
    pub fn cross_validate(
        &self,
        catalog: &FeatureCatalog,
        data: &[SparseSample],
        k: usize,
    ) -> Result<CrossValidation, TrainError> {
        if k < 2 {
            return Err(TrainError::InvalidConfig(
                "cross-validation needs at least 2 folds".to_string(),
            ));
        }
        if data.len() < k {
            return Err(TrainError::InvalidConfig(format!(
                "{} samples cannot fill {} folds",
                data.len(),
                k
            )));
        }
        let labels = labels_of(data)?;
        let folds = DataSplitter::new()
            .with_seed(self.config.seed)
            .fold_indices(&labels, k);

        let results = self.ctx.pool_cv().install(|| {
            folds
                .par_iter()
                .enumerate()
                .map(|(fold, test_indices)| {
                    let mut in_test = vec![false; data.len()];
                    for &i in test_indices {
                        in_test[i] = true;
                    }
                    let train_indices: Vec<usize> =
                        (0..data.len()).filter(|&i| !in_test[i]).collect();
                    let train = subset(data, &train_indices);
                    let test: Vec<SparseSample> =
                        test_indices.iter().map(|&i| data[i].with_label(None)).collect();
                    log::info!(
                        "cross-validation fold {}: {} train, {} test",
                        fold,
                        train.len(),
                        test.len()
                    );

                    let config = TrainerConfig {
                        seed: self.config.seed.wrapping_add(fold as u64),
                        ..self.config.clone()
                    };
                    let trainer = EnsembleTrainer {
                        config,
                        ctx: self.ctx.clone(),
                    };
                    let result = trainer.train(catalog, &train, &test)?;
                    let model = result.model();
                    let encoder = model.encoder()?;
                    let predictions = test_indices
                        .iter()
                        .zip(&test)
                        .map(|(&i, x)| {
                            let z = encoder.encode(&x.counts(), None)?;
                            Ok(CvPrediction {
                                fold,
                                sample: i,
                                label: labels[i],
                                prediction: model.predict_probability(&z),
                            })
                        })
                        .collect::<Result<Vec<_>, DataError>>()?;
                    Ok((predictions, result.report))
                })
                .collect::<Result<Vec<_>, TrainError>>()
        })?;

        let mut cv = CrossValidation {
            predictions: Vec::with_capacity(data.len()),
            reports: Vec::with_capacity(k),
        };
        for (predictions, report) in results {
            cv.predictions.extend(predictions);
            cv.reports.push(report);
        }
        log::info!("cross-validation AUC {:.4}", cv.auc());
        Ok(cv)
    }
}

/// Ensemble over the union of the members' non-zero coefficients, mapped
/// back to the original universe.
fn assemble(
    catalog: &FeatureCatalog,
    universe: &Universe,
    transform: &StandardTransform,
    pairs: Option<&PairIndex>,
    classifiers: &[&TrainedClassifier],
    summary: Summary,
) -> Result<Ensemble, DataError> {
    let mapped: Vec<Vec<(Feature, f64)>> = classifiers
        .iter()
        .map(|c| {
            c.coefficients()
                .map(|(f, t)| (universe.original(f), t))
                .collect()
        })
        .collect();
    let mut union: Vec<Feature> = mapped.iter().flatten().map(|(f, _)| *f).collect();
    union.sort_unstable();
    union.dedup();
    let features = FeatureIndices::new(union);

    let members = classifiers
        .iter()
        .zip(&mapped)
        .map(|(c, coefficients)| {
            let mut theta = vec![0.0; features.len() + 1];
            theta[0] = c.theta[0];
            for (f, t) in coefficients {
                if let Some(p) = features.position(*f) {
                    theta[p] = *t;
                }
            }
            theta
        })
        .collect();
    let slots: Vec<usize> = iter::once(0)
        .chain(features.iter().map(|f| full_index(*f, pairs)))
        .collect();
    Ensemble::new(catalog.clone(), features, transform.gather(&slots), summary, members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::CountEncoder;
    use crate::kmer::{Alphabet, KmerConfig, KmerCounter};
    use crate::test_data::{background_sequences, planted_sequences, score_rows};

    fn ctx() -> TrainingContext {
        TrainingContext::single_threaded().unwrap()
    }

    /// Foreground rows shifted in columns 1 and 4.
    fn score_samples(n: usize, n_columns: usize, seed: u64) -> Vec<SparseSample> {
        let encoder = CountEncoder::generating(n_columns);
        let fg = score_rows(n, n_columns, &[1, 4], 1.5, seed);
        let bg = score_rows(n, n_columns, &[], 0.0, seed + 1);
        fg.iter()
            .map(|r| encoder.encode_dense(r, Some(true)).unwrap())
            .chain(bg.iter().map(|r| encoder.encode_dense(r, Some(false)).unwrap()))
            .collect()
    }

    fn trainer(config: TrainerConfig) -> EnsembleTrainer {
        EnsembleTrainer::new(config, ctx()).unwrap()
    }

    #[test]
    fn test_single_classifier_on_scores() {
        let data = score_samples(60, 6, 3);
        let catalog = FeatureCatalog::Scores { n_columns: 6 };
        let result = trainer(TrainerConfig::default().with_lambda_auto(vec![2]))
            .train(&catalog, &data, &[])
            .unwrap();
        let model = result.model();
        assert_eq!(model.len(), 1);
        assert_eq!(model.summary(), Summary::None);
        assert!(!model.features().is_empty());
        assert!(model.features().len() <= 2);
        for f in model.features() {
            assert!(*f == Feature::single(1) || *f == Feature::single(4), "{}", f);
        }
        assert_eq!(result.report.members.len(), 1);
        assert_eq!(result.report.selected_target, Some(2));
        assert_eq!(result.report.model_kind, "scoresLr");
    }

    #[test]
    fn test_ensemble_with_validation() {
        let data = score_samples(60, 6, 11);
        let catalog = FeatureCatalog::Scores { n_columns: 6 };
        let config = TrainerConfig::default()
            .with_lambda_auto(vec![1, 3])
            .with_ensemble_size(3)
            .with_validation_fraction(0.25);
        let result = trainer(config).train(&catalog, &data, &[]).unwrap();
        assert_eq!(result.candidates.len(), 2);
        for candidate in &result.candidates {
            assert_eq!(candidate.model.len(), 3);
            assert_eq!(candidate.model.summary(), Summary::Mean);
            assert_eq!(candidate.validation_losses.len(), 3);
        }
        let best = result.candidates[result.selected].validation_loss().unwrap();
        assert!(result
            .candidates
            .iter()
            .all(|c| c.validation_loss().unwrap() >= best));
        assert_eq!(result.report.validation_samples, 30);
        assert_eq!(result.report.members.len(), 3);
        assert_eq!(
            result.report.members.iter().map(|m| m.samples).sum::<usize>(),
            90
        );
    }

    #[test]
    fn test_transform_ignores_validation_samples() {
        let data = score_samples(40, 4, 17);
        let catalog = FeatureCatalog::Scores { n_columns: 4 };
        let config = TrainerConfig::default()
            .with_lambda_auto(vec![4])
            .with_validation_fraction(0.25);
        let result = trainer(config.clone()).train(&catalog, &data, &[]).unwrap();
        let model = result.model();
        assert!(!model.features().is_empty());

        let labels: Vec<bool> = data.iter().map(|x| x.label().unwrap()).collect();
        let split = DataSplitter::new()
            .with_validation_fraction(config.validation_fraction)
            .with_seed(config.seed)
            .split_indices(&labels);
        let slots: Vec<usize> = iter::once(0)
            .chain(model.features().iter().map(|f| f.0 + 1))
            .collect();
        let train_only = StandardTransform::fit(&subset(&data, &split.train), None).gather(&slots);
        let all_data = StandardTransform::fit(&data, None).gather(&slots);

        assert!(model.transform().approx_eq(&train_only, 1e-12));
        assert!(!model.transform().approx_eq(&all_data, 1e-12));
    }

    #[test]
    fn test_preselection_maps_back_to_universe() {
        let data = score_samples(50, 8, 5);
        let catalog = FeatureCatalog::Scores { n_columns: 8 };
        let config = TrainerConfig {
            preselect: Some(3),
            save_trace: true,
            ..TrainerConfig::default().with_lambda_auto(vec![2])
        };
        let result = trainer(config).train(&catalog, &data, &[]).unwrap();
        let model = result.model();
        assert!(model.features().len() <= 2);
        assert!(model.features().max_id().unwrap() < 8);
        assert!(model.features().position(Feature::single(1)).is_some()
            || model.features().position(Feature::single(4)).is_some());
        assert_eq!(model.transform().len(), model.features().len() + 1);
        // path columns use original features
        assert!(!result.path.is_empty());
        assert!(result.path.keys().iter().all(|f| f.1 < 8));
    }

    #[test]
    fn test_cross_validation_predictions() {
        let data = score_samples(30, 5, 21);
        let catalog = FeatureCatalog::Scores { n_columns: 5 };
        let cv = trainer(TrainerConfig::default().with_lambda_auto(vec![2]))
            .cross_validate(&catalog, &data, 3)
            .unwrap();
        assert_eq!(cv.predictions.len(), data.len());
        assert_eq!(cv.reports.len(), 3);
        let mut samples: Vec<usize> = cv.predictions.iter().map(|p| p.sample).collect();
        samples.sort_unstable();
        assert_eq!(samples, (0..data.len()).collect::<Vec<_>>());
        assert!(cv.predictions.iter().all(|p| (0.0..=1.0).contains(&p.prediction)));
        assert!(cv.auc() > 0.7);

        let mut out = Vec::new();
        cv.write(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().next(), Some("fold label prediction"));
        assert_eq!(text.lines().count(), data.len() + 1);
    }

    #[test]
    fn test_kmer_training_with_loss_plateau() {
        let counter = KmerCounter::new(KmerConfig::new(Alphabet::Nucleotide, 3, 3).with_revcomp(true)).unwrap();
        let fg: Vec<_> = planted_sequences(30, 40, b"gattaca", 7)
            .iter()
            .map(|s| counter.count(s))
            .collect();
        let bg: Vec<_> = background_sequences(30, 40, 8).iter().map(|s| counter.count(s)).collect();
        let all: Vec<_> = fg.iter().chain(&bg).cloned().collect();
        let catalog = FeatureCatalog::from_kmer_counts(&counter, &all);
        let encoder = CountEncoder::generating(catalog.len());
        let data: Vec<SparseSample> = all
            .iter()
            .enumerate()
            .map(|(i, c)| encoder.encode(&catalog.counts_from_kmers(c), Some(i < fg.len())).unwrap())
            .collect();
        assert!(data.iter().all(|x| x.feature_slices().1.iter().all(|v| *v != 0.0)));

        let config = TrainerConfig::default()
            .with_lambda_auto(vec![8])
            .with_eval_loss(true)
            .with_epsilon_loss(1e-6)
            .with_max_iterations(100);
        let result = trainer(config).train(&catalog, &data, &[]).unwrap();
        let model = result.model();
        assert_eq!(model.kind_name(), "kmerLr");
        assert!(model.features().len() <= 8);
        assert!(result.report.members[0].nonzero <= 8);
        assert!(result.report.members[0].train_loss.is_some());
    }

    #[test]
    fn test_rejects_oversized_ensemble_and_bad_folds() {
        let data = score_samples(2, 3, 1);
        let catalog = FeatureCatalog::Scores { n_columns: 3 };
        let big = trainer(TrainerConfig::default().with_ensemble_size(5));
        assert!(matches!(
            big.train(&catalog, &data, &[]),
            Err(TrainError::InvalidConfig(_))
        ));
        let small = trainer(TrainerConfig::default());
        assert!(small.cross_validate(&catalog, &data, 1).is_err());
        assert!(small.cross_validate(&catalog, &data, 10).is_err());
        let wrong = FeatureCatalog::Scores { n_columns: 4 };
        assert!(matches!(
            small.train(&wrong, &data, &[]),
            Err(TrainError::Data(DataError::DimensionMismatch { .. }))
        ));
    }
}
