//! JSON model documents
//!
//! A model file names its distribution (`kmerLr`, `kmerLr [mean]`,
//! `scoresLr`, ...), lists one `logistic regression` sub-distribution per
//! member followed by the `transform`, and carries the feature universe
//! in `Parameters`:
//!
//! ```json
//! {
//!   "Name": "kmerLr",
//!   "Distributions": [
//!     { "Name": "logistic regression", "Parameters": { "Theta": [0.1, 2.0] } },
//!     { "Name": "transform", "Parameters": { "Mu": [0.0, 1.5], "Sigma": [1.0, 0.5] } }
//!   ],
//!   "Parameters": {
//!     "M": 1, "N": 6, "Binarize": false, "Complement": false,
//!     "Cooccurrence": false, "Reverse": false, "Revcomp": true,
//!     "MaxAmbiguous": [], "Alphabet": "nucleotide",
//!     "Kmers": ["acg|cgt"], "Features": [[0, 0]]
//!   }
//! }
//! ```
//!
//! Score models carry only `Features` and, optionally, `Columns`.

use crate::features::{FeatureCatalog, FeatureIndices};
use crate::io::DataError;
use crate::kmer::{Alphabet, KmerConfig, KmerCounter};
use crate::model::{Ensemble, Summary};
use crate::transform::StandardTransform;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MEMBER_NAME: &str = "logistic regression";
const TRANSFORM_NAME: &str = "transform";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ModelDocument {
    name: String,
    distributions: Vec<Distribution>,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Distribution {
    name: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ThetaParameters {
    theta: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KmerParameters {
    #[serde(rename = "M")]
    m: usize,
    #[serde(rename = "N")]
    n: usize,
    binarize: bool,
    complement: bool,
    #[serde(default)]
    cooccurrence: bool,
    reverse: bool,
    revcomp: bool,
    #[serde(default)]
    max_ambiguous: Vec<i64>,
    alphabet: Alphabet,
    kmers: Vec<String>,
    features: FeatureIndices,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScoreParameters {
    features: FeatureIndices,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    columns: Option<usize>,
}

/// Split `kmerLr [mean]` into the kind and the summary.
fn parse_name(name: &str) -> Result<(&str, Summary), DataError> {
    let name = name.trim();
    let (kind, summary) = match name.find('[') {
        Some(open) => {
            let inner = name[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| DataError::InvalidFormat(format!("invalid model name `{}`", name)))?;
            let summary = inner
                .trim()
                .parse::<Summary>()
                .map_err(DataError::InvalidFormat)?;
            (name[..open].trim(), summary)
        }
        None => (name, Summary::None),
    };
    match kind {
        "kmerLr" | "scoresLr" => Ok((kind, summary)),
        _ => Err(DataError::InvalidFormat(format!(
            "unknown model type `{}`",
            kind
        ))),
    }
}

fn to_document(model: &Ensemble) -> Result<ModelDocument, DataError> {
    let mut distributions: Vec<Distribution> = model
        .members()
        .iter()
        .map(|theta| {
            Ok(Distribution {
                name: MEMBER_NAME.to_string(),
                parameters: serde_json::to_value(ThetaParameters {
                    theta: theta.clone(),
                })?,
            })
        })
        .collect::<Result<_, serde_json::Error>>()?;
    distributions.push(Distribution {
        name: TRANSFORM_NAME.to_string(),
        parameters: serde_json::to_value(model.transform())?,
    });

    let parameters = match model.catalog() {
        FeatureCatalog::Kmers { config, classes } => serde_json::to_value(KmerParameters {
            m: config.m,
            n: config.n,
            binarize: config.binarize,
            complement: config.complement,
            cooccurrence: config.cooccurrence || model.features().contains_pairs(),
            reverse: config.reverse,
            revcomp: config.revcomp,
            max_ambiguous: config.max_ambiguous.clone(),
            alphabet: config.alphabet,
            kmers: classes.iter().map(|c| c.to_string()).collect(),
            features: model.features().clone(),
        })?,
        FeatureCatalog::Scores { n_columns } => serde_json::to_value(ScoreParameters {
            features: model.features().clone(),
            columns: Some(*n_columns),
        })?,
    };

    Ok(ModelDocument {
        name: model.name(),
        distributions,
        parameters,
    })
}

fn from_document(doc: ModelDocument) -> Result<Ensemble, DataError> {
    let (kind, summary) = parse_name(&doc.name)?;

    let mut members = Vec::new();
    let mut transform = StandardTransform::identity();
    for d in doc.distributions {
        match d.name.as_str() {
            MEMBER_NAME => {
                let p: ThetaParameters = serde_json::from_value(d.parameters)?;
                members.push(p.theta);
            }
            TRANSFORM_NAME => transform = serde_json::from_value(d.parameters)?,
            other => {
                return Err(DataError::InvalidFormat(format!(
                    "unknown distribution `{}`",
                    other
                )))
            }
        }
    }

    let (catalog, features) = if kind == "kmerLr" {
        let p: KmerParameters = serde_json::from_value(doc.parameters)?;
        let config = KmerConfig {
            alphabet: p.alphabet,
            m: p.m,
            n: p.n,
            complement: p.complement,
            reverse: p.reverse,
            revcomp: p.revcomp,
            max_ambiguous: p.max_ambiguous,
            binarize: p.binarize,
            cooccurrence: p.cooccurrence,
        };
        let counter = KmerCounter::new(config.clone())?;
        let classes = p
            .kmers
            .iter()
            .map(|s| counter.parse_class(s))
            .collect::<Result<Vec<_>, _>>()?;
        if classes.windows(2).any(|w| w[0].id >= w[1].id) {
            return Err(DataError::InvalidFormat(
                "k-mers must be listed in class order without duplicates".to_string(),
            ));
        }
        (FeatureCatalog::from_kmer_classes(config, classes), p.features)
    } else {
        let p: ScoreParameters = serde_json::from_value(doc.parameters)?;
        let n_columns = p
            .columns
            .unwrap_or_else(|| p.features.max_id().map_or(0, |id| id + 1));
        (FeatureCatalog::Scores { n_columns }, p.features)
    };
    features.check_order()?;

    Ensemble::new(catalog, features, transform, summary, members)
}

/// Serialise `model` as pretty-printed JSON.
pub fn write_model<W: Write>(writer: W, model: &Ensemble) -> Result<(), DataError> {
    let mut writer = writer;
    serde_json::to_writer_pretty(&mut writer, &to_document(model)?)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn read_model<R: Read>(reader: R) -> Result<Ensemble, DataError> {
    let doc: ModelDocument = serde_json::from_reader(reader)?;
    from_document(doc)
}

pub fn save_model<P: AsRef<Path>>(path: P, model: &Ensemble) -> Result<(), DataError> {
    let file = File::create(path)?;
    write_model(BufWriter::new(file), model)
}

pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Ensemble, DataError> {
    let file = File::open(path)?;
    read_model(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Feature;

    fn kmer_ensemble() -> Ensemble {
        let config = KmerConfig::new(Alphabet::Nucleotide, 2, 3).with_revcomp(true);
        let counter = KmerCounter::new(config.clone()).unwrap();
        let classes = vec![
            counter.parse_class("ac").unwrap(),
            counter.parse_class("aag").unwrap(),
            counter.parse_class("cg").unwrap(),
        ];
        Ensemble::new(
            FeatureCatalog::from_kmer_classes(config, classes),
            FeatureIndices::new(vec![Feature(0, 0), Feature(0, 2), Feature(1, 1)]),
            StandardTransform::from_parts(vec![0.0, 1.0, 2.0, 0.5], vec![1.0, 0.5, 2.0, 1.5]),
            Summary::Mean,
            vec![vec![0.1, 1.0, -2.0, 0.5], vec![0.2, 0.0, 1.0, 0.25]],
        )
        .unwrap()
    }

    #[test]
    fn test_parse_name() {
        assert_eq!(parse_name("kmerLr").unwrap(), ("kmerLr", Summary::None));
        assert_eq!(parse_name("scoresLr [max]").unwrap(), ("scoresLr", Summary::Max));
        assert!(parse_name("kmerLr [median]").is_err());
        assert!(parse_name("mixture").is_err());
    }

    #[test]
    fn test_kmer_model_file() {
        let model = kmer_ensemble();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save_model(&path, &model).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["Name"], "kmerLr [mean]");
        assert_eq!(value["Distributions"].as_array().unwrap().len(), 3);
        assert_eq!(value["Distributions"][2]["Name"], "transform");
        assert_eq!(value["Parameters"]["Cooccurrence"], true);
        assert_eq!(value["Parameters"]["Alphabet"], "nucleotide");
        assert_eq!(value["Parameters"]["Features"][1], serde_json::json!([0, 2]));

        let loaded = load_model(&path).unwrap();
        assert_eq!(loaded.summary(), Summary::Mean);
        assert_eq!(loaded.members(), model.members());
        assert_eq!(loaded.features(), model.features());
        assert_eq!(loaded.transform(), model.transform());
        assert_eq!(loaded.feature_keys(), model.feature_keys());
    }

    #[test]
    fn test_missing_cooccurrence_reads_false() {
        let text = r#"{
            "Name": "kmerLr",
            "Distributions": [
                {"Name": "logistic regression", "Parameters": {"Theta": [0.5, 1.0]}},
                {"Name": "transform", "Parameters": {"Mu": [], "Sigma": []}}
            ],
            "Parameters": {
                "M": 2, "N": 2, "Binarize": false, "Complement": false,
                "Reverse": false, "Revcomp": false, "Alphabet": "nucleotide",
                "Kmers": ["ac"], "Features": [[0, 0]]
            }
        }"#;
        let model = read_model(text.as_bytes()).unwrap();
        assert!(!model.catalog().kmer_config().unwrap().cooccurrence);
        assert!(model.transform().is_identity());
        assert_eq!(model.members(), &[vec![0.5, 1.0]]);
    }

    #[test]
    fn test_score_model_without_columns() {
        let text = r#"{
            "Name": "scoresLr",
            "Distributions": [
                {"Name": "logistic regression", "Parameters": {"Theta": [0.0, 1.0, 2.0]}},
                {"Name": "transform", "Parameters": {"Mu": [], "Sigma": []}}
            ],
            "Parameters": {"Features": [[1, 1], [6, 6]]}
        }"#;
        let model = read_model(text.as_bytes()).unwrap();
        assert_eq!(model.catalog().len(), 7);
        assert_eq!(model.kind_name(), "scoresLr");
    }

    #[test]
    fn test_unsorted_features_rejected() {
        let text = r#"{
            "Name": "scoresLr",
            "Distributions": [
                {"Name": "logistic regression", "Parameters": {"Theta": [0.0, 1.0, 2.0]}}
            ],
            "Parameters": {"Features": [[6, 6], [1, 1]], "Columns": 9}
        }"#;
        assert!(matches!(
            read_model(text.as_bytes()),
            Err(DataError::InvalidFormat(_))
        ));

        let pair_reversed = text.replace("[[6, 6], [1, 1]]", "[[1, 1], [6, 1]]");
        assert!(matches!(
            read_model(pair_reversed.as_bytes()),
            Err(DataError::InvalidFormat(_))
        ));

        let sorted = text.replace("[[6, 6], [1, 1]]", "[[1, 1], [6, 6]]");
        let model = read_model(sorted.as_bytes()).unwrap();
        let x = model
            .encoder()
            .unwrap()
            .encode_dense(&[0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0], None)
            .unwrap();
        assert_eq!(x.features().collect::<Vec<_>>(), vec![(1, 3.0), (2, 5.0)]);
    }

    #[test]
    fn test_misaligned_theta_rejected() {
        let text = r#"{
            "Name": "scoresLr",
            "Distributions": [
                {"Name": "logistic regression", "Parameters": {"Theta": [0.0]}}
            ],
            "Parameters": {"Features": [[0, 0]], "Columns": 1}
        }"#;
        assert!(matches!(
            read_model(text.as_bytes()),
            Err(DataError::DimensionMismatch { .. })
        ));
    }
}
