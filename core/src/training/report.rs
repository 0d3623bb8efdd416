//! Training Report Generation
//!
//! Summarises an ensemble training run: one entry per member, one per λ
//! target considered, and recommendations derived from how the estimators
//! stopped.

use crate::estimator::StopReason;
use serde::{Deserialize, Serialize};

/// One ensemble member of the selected target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEntry {
    pub member: usize,
    /// Training samples seen by this member
    pub samples: usize,
    pub nonzero: usize,
    pub lambda: f64,
    pub target: Option<usize>,
    pub epochs: usize,
    pub iterations: usize,
    pub stop: Option<StopReason>,
    /// Regularised training loss, if evaluated
    pub train_loss: Option<f64>,
    /// Mean validation loss per sample
    pub validation_loss: Option<f64>,
    pub time_secs: f64,
}

/// One λ target considered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub target: Option<usize>,
    /// Mean λ over members
    pub lambda: f64,
    /// Features used by any member
    pub features: usize,
    pub validation_loss: Option<f64>,
}

/// Training recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Recommendation type (info, warning, error)
    pub level: String,
    /// Recommendation message
    pub message: String,
}

impl Recommendation {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: "info".to_string(), message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: "warning".to_string(), message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: "error".to_string(), message: message.into() }
    }
}

/// Complete training report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Training status (success, warning, failed)
    pub status: String,

    /// `kmerLr` or `scoresLr`
    pub model_kind: String,

    /// Size of the base feature universe
    pub base_features: usize,

    /// Samples handed to the trainer
    pub total_samples: usize,

    /// Samples used for fitting
    pub train_samples: usize,

    /// Samples held out to choose λ
    pub validation_samples: usize,

    pub ensemble_size: usize,

    /// Target of the returned model
    pub selected_target: Option<usize>,

    pub members: Vec<MemberEntry>,

    pub candidates: Vec<CandidateEntry>,

    /// Total training time (seconds)
    pub total_time_secs: f64,

    /// Recommendations and observations
    pub recommendations: Vec<Recommendation>,
}

impl TrainingReport {
    /// Create a new empty report
    pub fn new(
        model_kind: &str,
        base_features: usize,
        total_samples: usize,
        train_samples: usize,
        validation_samples: usize,
        ensemble_size: usize,
    ) -> Self {
        Self {
            status: "in_progress".to_string(),
            model_kind: model_kind.to_string(),
            base_features,
            total_samples,
            train_samples,
            validation_samples,
            ensemble_size,
            selected_target: None,
            members: Vec::new(),
            candidates: Vec::new(),
            total_time_secs: 0.0,
            recommendations: Vec::new(),
        }
    }

    pub fn add_member(&mut self, entry: MemberEntry) {
        self.members.push(entry);
    }

    pub fn add_candidate(&mut self, entry: CandidateEntry) {
        self.candidates.push(entry);
    }

    /// Finalize the report
    pub fn finalize(&mut self, selected_target: Option<usize>, total_time_secs: f64) {
        self.selected_target = selected_target;
        self.total_time_secs = total_time_secs;

        let stops: Vec<StopReason> = self.members.iter().filter_map(|m| m.stop).collect();
        self.status = if stops.iter().any(|s| *s == StopReason::NumericalFailure) {
            "failed".to_string()
        } else if stops.iter().any(|s| *s == StopReason::MaxIterations) {
            "warning".to_string()
        } else {
            "success".to_string()
        };

        self.generate_recommendations();
    }

    /// Generate recommendations based on training results
    fn generate_recommendations(&mut self) {
        self.recommendations.clear();

        let failed = self
            .members
            .iter()
            .filter(|m| m.stop == Some(StopReason::NumericalFailure))
            .count();
        if failed > 0 {
            self.recommendations.push(Recommendation::error(format!(
                "{} member(s) hit non-finite parameters. Lower the step size scale.",
                failed
            )));
        }

        let capped = self
            .members
            .iter()
            .filter(|m| m.stop == Some(StopReason::MaxIterations))
            .count();
        if capped > 0 {
            self.recommendations.push(Recommendation::warning(format!(
                "{} member(s) reached the iteration limit. Consider more iterations.",
                capped
            )));
        }

        if let Some(target) = self.selected_target {
            let short = self.members.iter().filter(|m| m.nonzero < target).count();
            if short > 0 {
                self.recommendations.push(Recommendation::info(format!(
                    "{} member(s) have fewer than {} non-zero coefficients",
                    short, target
                )));
            }
        }

        if self.candidates.len() > 1 && self.validation_samples == 0 {
            self.recommendations.push(Recommendation::info(
                "No validation set: the largest target was kept",
            ));
        }

        if self.recommendations.is_empty() {
            self.recommendations
                .push(Recommendation::info("Training completed successfully"));
        }
    }

    /// Mean non-zero count over members
    pub fn mean_nonzero(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.members.iter().map(|m| m.nonzero as f64).sum::<f64>() / self.members.len() as f64
    }

    /// Get summary line
    pub fn summary(&self) -> String {
        let target = self
            .selected_target
            .map(|t| t.to_string())
            .unwrap_or_else(|| "fixed".to_string());
        format!(
            "{}: {} x {} members, target {}, {:.1} non-zeros, {} samples",
            self.status.to_uppercase(),
            self.model_kind,
            self.members.len(),
            target,
            self.mean_nonzero(),
            self.train_samples
        )
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Convert to compact JSON string
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Print human-readable report
    pub fn print(&self) {
        let na = |v: Option<f64>| v.map(|x| format!("{:.5}", x)).unwrap_or_else(|| "-".to_string());
        println!("╔══════════════════════════════════════════════════════════════════════════════╗");
        println!("║                           TRAINING REPORT                                    ║");
        println!("╠══════════════════════════════════════════════════════════════════════════════╣");
        println!("║ Status: {:<68} ║", self.status.to_uppercase());
        println!("║ Model: {:<69} ║", self.model_kind);
        println!("║ Base features: {:>61} ║", self.base_features);
        println!("║ Samples (train/validation): {:>48} ║",
            format!("{}/{}", self.train_samples, self.validation_samples));
        println!("║ Total Time: {:>63.1}s ║", self.total_time_secs);
        println!("╠══════════════════════════════════════════════════════════════════════════════╣");
        println!("║ Members:                                                                     ║");
        for m in &self.members {
            let stop = m.stop.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
            let line = format!(
                "#{} n={} nz={} lambda={:.3e} iter={} {} val={}",
                m.member, m.samples, m.nonzero, m.lambda, m.iterations, stop,
                na(m.validation_loss)
            );
            println!("║   {:<74} ║", line);
        }
        if self.candidates.len() > 1 {
            println!("╠══════════════════════════════════════════════════════════════════════════════╣");
            println!("║ Targets:                                                                     ║");
            for c in &self.candidates {
                let target = c.target.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string());
                let mark = if c.target == self.selected_target { "*" } else { " " };
                let line = format!(
                    "{} target={} lambda={:.3e} features={} val={}",
                    mark, target, c.lambda, c.features, na(c.validation_loss)
                );
                println!("║   {:<74} ║", line);
            }
        }
        println!("╠══════════════════════════════════════════════════════════════════════════════╣");
        println!("║ Recommendations:                                                             ║");
        for rec in &self.recommendations {
            let icon = match rec.level.as_str() {
                "info" => "✓",
                "warning" => "⚠",
                "error" => "✗",
                _ => "•",
            };
            // Truncate message if too long
            let msg = if rec.message.chars().count() > 70 {
                format!("{}...", rec.message.chars().take(67).collect::<String>())
            } else {
                rec.message.clone()
            };
            println!("║   {} {:<72} ║", icon, msg);
        }
        println!("╚══════════════════════════════════════════════════════════════════════════════╝");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(i: usize, nonzero: usize, stop: StopReason) -> MemberEntry {
        MemberEntry {
            member: i,
            samples: 50,
            nonzero,
            lambda: 0.5,
            target: Some(4),
            epochs: 3,
            iterations: 120,
            stop: Some(stop),
            train_loss: None,
            validation_loss: Some(0.6),
            time_secs: 0.1,
        }
    }

    #[test]
    fn test_report_creation() {
        let report = TrainingReport::new("kmerLr", 136, 100, 80, 20, 3);
        assert_eq!(report.base_features, 136);
        assert_eq!(report.validation_samples, 20);
        assert_eq!(report.status, "in_progress");
    }

    #[test]
    fn test_finalize_success() {
        let mut report = TrainingReport::new("scoresLr", 9, 100, 100, 0, 2);
        report.add_member(member(0, 4, StopReason::Converged));
        report.add_member(member(1, 2, StopReason::LossPlateau));
        report.finalize(Some(4), 1.5);

        assert_eq!(report.status, "success");
        assert_eq!(report.mean_nonzero(), 3.0);
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.message.contains("fewer than 4")));
    }

    #[test]
    fn test_finalize_warning_and_failure() {
        let mut report = TrainingReport::new("scoresLr", 9, 10, 10, 0, 1);
        report.add_member(member(0, 4, StopReason::MaxIterations));
        report.finalize(Some(4), 0.1);
        assert_eq!(report.status, "warning");

        report.add_member(member(1, 4, StopReason::NumericalFailure));
        report.finalize(Some(4), 0.1);
        assert_eq!(report.status, "failed");
        assert_eq!(report.recommendations[0].level, "error");
    }

    #[test]
    fn test_to_json() {
        let mut report = TrainingReport::new("kmerLr", 10, 10, 10, 0, 1);
        report.add_member(member(0, 1, StopReason::Converged));
        let json = report.to_json().unwrap();
        assert!(json.contains("\"base_features\": 10"));
        assert!(json.contains("\"stop\": \"converged\""));
    }

    #[test]
    fn test_summary() {
        let mut report = TrainingReport::new("kmerLr", 10, 10, 10, 0, 1);
        report.add_member(member(0, 4, StopReason::Converged));
        report.finalize(Some(4), 0.2);
        let summary = report.summary();
        assert!(summary.contains("SUCCESS"));
        assert!(summary.contains("target 4"));
    }
}
