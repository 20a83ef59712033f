//! Modeling task naming conventions.
//!
//! The preprocessing pipeline saves each task variant under a directory name
//! that encodes the split proportions and options. The launcher never creates
//! these, it only has to reconstruct the exact names to find the data.

use serde::{Deserialize, Serialize};

use crate::error::{BartizanError, Result};

/// The task variants the preprocessing pipeline can produce.
pub const KNOWN_TASKS: &[&str] = &[
    "context_free",
    "context_free_same_type",
    "context_dependent",
    "context_dependent_same_type",
    "full_hybrid",
    "hybrid",
    "hybrid_same_type",
];

/// A validated modeling task plus the options that select one saved variant
/// of its dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Snake-case task name, e.g. `context_free_same_type`.
    pub name: String,
    /// Proportion of the data held out for validation.
    pub valid_proportion: f64,
    /// Proportion of the data held out for testing.
    pub test_proportion: f64,
    /// Candidates per ranking instance, when the task was built with one.
    pub ranking_size: Option<u32>,
    /// Batch size the task was preprocessed with.
    pub batch_size: u32,
    /// Whether the task was built for cross-validation.
    pub cross_validation: bool,
    /// Whether this is the shortened debug variant.
    pub short: bool,
}

impl TaskSpec {
    /// Validate the task name and build a spec with the pipeline's default
    /// split (25% valid, 25% test).
    pub fn new(name: &str, batch_size: u32) -> Result<Self> {
        if !KNOWN_TASKS.contains(&name) {
            return Err(BartizanError::UnknownTask { name: name.into() });
        }
        Ok(Self {
            name: name.to_string(),
            valid_proportion: 0.25,
            test_proportion: 0.25,
            ranking_size: None,
            batch_size,
            cross_validation: false,
            short: false,
        })
    }

    /// CamelCase class name of the task, e.g. `ContextFreeSameTypeTask`.
    pub fn class_name(&self) -> String {
        let camel: String = self
            .name
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect();
        camel + "Task"
    }

    /// Base name of the saved dataset: the compact task name followed by the
    /// split/option suffix, e.g. `contextfree_50-25-25_bs32`.
    pub fn dataset_name(&self) -> String {
        let compact: String = self.name.split('_').collect();

        let train = proportion_digits(1.0 - self.valid_proportion - self.test_proportion);
        let valid = proportion_digits(self.valid_proportion);
        let test = proportion_digits(self.test_proportion);

        let mut name = format!("{compact}_{train}-{valid}-{test}");
        if let Some(rs) = self.ranking_size {
            name.push_str(&format!("_rs{rs}"));
        }
        name.push_str(&format!("_bs{}", self.batch_size));
        if self.cross_validation {
            name.push_str("_cv");
        }
        if self.short {
            name.push_str("_short");
        }
        name
    }

    /// Name of the binarized data directory fairseq reads from.
    pub fn binarized_name(&self) -> String {
        format!("{}-bin", self.dataset_name())
    }

    /// Name of the dataset archive staged to scratch.
    pub fn archive_name(&self) -> String {
        format!("{}.tar.gz", self.dataset_name())
    }
}

/// The two digits after the decimal point of a `%.2f` rendering, which is how
/// the preprocessing pipeline encodes proportions in file names.
fn proportion_digits(p: f64) -> String {
    let formatted = format!("{p:.2}");
    formatted
        .split('.')
        .nth(1)
        .unwrap_or("00")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_name_matches_pipeline_convention() {
        let spec = TaskSpec::new("context_free", 32).unwrap();
        assert_eq!(spec.class_name(), "ContextFreeTask");

        let spec = TaskSpec::new("context_dependent_same_type", 32).unwrap();
        assert_eq!(spec.class_name(), "ContextDependentSameTypeTask");
    }

    #[test]
    fn dataset_name_default_split() {
        let spec = TaskSpec::new("context_free", 32).unwrap();
        assert_eq!(spec.dataset_name(), "contextfree_50-25-25_bs32");
        assert_eq!(spec.binarized_name(), "contextfree_50-25-25_bs32-bin");
        assert_eq!(spec.archive_name(), "contextfree_50-25-25_bs32.tar.gz");
    }

    #[test]
    fn dataset_name_with_all_options() {
        let mut spec = TaskSpec::new("hybrid", 4).unwrap();
        spec.valid_proportion = 0.5;
        spec.test_proportion = 0.5;
        spec.ranking_size = Some(24);
        spec.cross_validation = true;
        spec.short = true;

        assert_eq!(spec.dataset_name(), "hybrid_00-50-50_rs24_bs4_cv_short");
    }

    #[test]
    fn unknown_task_is_rejected() {
        let err = TaskSpec::new("freeform", 32).unwrap_err();
        assert!(err.to_string().contains("freeform"));
    }

    #[test]
    fn every_known_task_resolves() {
        for name in KNOWN_TASKS {
            assert!(TaskSpec::new(name, 32).is_ok());
        }
    }

    #[test]
    fn proportion_digits_rendering() {
        assert_eq!(proportion_digits(0.25), "25");
        assert_eq!(proportion_digits(0.5), "50");
        assert_eq!(proportion_digits(0.0), "00");
    }
}
