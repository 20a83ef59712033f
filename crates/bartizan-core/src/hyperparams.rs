//! Fine-tuning hyperparameters and the derived update schedule.

use serde::{Deserialize, Serialize};

use crate::error::{BartizanError, Result};

/// The kind of fine-tuning objective, which selects the fairseq task,
/// criterion and the flags that only make sense for one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Sentence-pair relevance classification (fairseq `sentence_prediction`).
    Classification,
    /// Sequence-to-sequence generation (fairseq `translation`).
    Generation,
}

impl TaskKind {
    /// The `--task` value fairseq expects.
    pub fn fairseq_task(&self) -> &'static str {
        match self {
            Self::Classification => "sentence_prediction",
            Self::Generation => "translation",
        }
    }

    /// The `--criterion` value fairseq expects.
    pub fn criterion(&self) -> &'static str {
        match self {
            Self::Classification => "sentence_prediction",
            Self::Generation => "label_smoothed_cross_entropy",
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = BartizanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "classification" => Ok(Self::Classification),
            "generation" => Ok(Self::Generation),
            other => Err(BartizanError::InvalidHyperparam(format!(
                "task kind must be 'classification' or 'generation', got {other:?}"
            ))),
        }
    }
}

/// Everything fairseq needs to fine-tune BART on one experiment, minus the
/// paths. Defaults mirror the published BART fine-tuning recipes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparams {
    pub kind: TaskKind,
    /// Peak learning rate for the polynomial decay scheduler.
    pub lr: f64,
    pub max_epochs: u32,
    /// Optimizer steps per epoch, as measured on the preprocessed dataset.
    pub updates_per_epoch: u32,
    /// Share of total updates spent ramping the learning rate up, in percent.
    pub warmup_percent: u32,
    /// Sentences per batch (`--batch-size`).
    pub batch_size: u32,
    /// Gradient accumulation factor (`--update-freq`).
    pub update_freq: u32,
    pub max_tokens: u32,
    pub dropout: f64,
    pub attention_dropout: f64,
    pub weight_decay: f64,
    pub clip_norm: f64,
    pub adam_betas: (f64, f64),
    pub adam_eps: f64,
    /// Number of target classes; classification only.
    pub num_classes: Option<u32>,
    pub seed: u64,
}

impl Hyperparams {
    /// Defaults for relevance classification (the RTE-style recipe).
    pub fn classification() -> Self {
        Self {
            kind: TaskKind::Classification,
            lr: 1e-5,
            max_epochs: 5,
            updates_per_epoch: 210,
            warmup_percent: 6,
            batch_size: 32,
            update_freq: 1,
            max_tokens: 4400,
            dropout: 0.1,
            attention_dropout: 0.1,
            weight_decay: 0.01,
            clip_norm: 0.0,
            adam_betas: (0.9, 0.98),
            adam_eps: 1e-8,
            num_classes: Some(2),
            seed: 1,
        }
    }

    /// Defaults for generation (the summarization recipe).
    pub fn generation() -> Self {
        Self {
            kind: TaskKind::Generation,
            lr: 3e-5,
            max_epochs: 5,
            updates_per_epoch: 210,
            warmup_percent: 6,
            batch_size: 8,
            update_freq: 4,
            max_tokens: 2048,
            dropout: 0.1,
            attention_dropout: 0.1,
            weight_decay: 0.01,
            clip_norm: 0.1,
            adam_betas: (0.9, 0.999),
            adam_eps: 1e-8,
            num_classes: None,
            seed: 1,
        }
    }

    /// Defaults for a task kind.
    pub fn for_kind(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Classification => Self::classification(),
            TaskKind::Generation => Self::generation(),
        }
    }

    /// The `--adam-betas` value, formatted the way fairseq parses it.
    pub fn adam_betas_flag(&self) -> String {
        format!("({}, {})", self.adam_betas.0, self.adam_betas.1)
    }
}

/// The update counts derived from epoch arithmetic: fairseq wants absolute
/// numbers, the experiment configs speak in epochs and percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// `--total-num-update`: updates_per_epoch * max_epochs.
    pub total_updates: u32,
    /// `--warmup-updates`: warmup_percent of the total, floored.
    pub warmup_updates: u32,
}

impl Schedule {
    /// Derive the schedule, validating the inputs first.
    pub fn derive(hp: &Hyperparams) -> Result<Self> {
        if hp.max_epochs == 0 {
            return Err(BartizanError::InvalidHyperparam(
                "max_epochs must be at least 1".into(),
            ));
        }
        if hp.updates_per_epoch == 0 {
            return Err(BartizanError::InvalidHyperparam(
                "updates_per_epoch must be at least 1".into(),
            ));
        }
        if hp.warmup_percent > 100 {
            return Err(BartizanError::InvalidHyperparam(format!(
                "warmup_percent must be at most 100, got {}",
                hp.warmup_percent
            )));
        }
        if hp.kind == TaskKind::Classification && hp.num_classes.is_none() {
            return Err(BartizanError::InvalidHyperparam(
                "classification requires num_classes".into(),
            ));
        }

        let total_updates = hp
            .updates_per_epoch
            .checked_mul(hp.max_epochs)
            .ok_or_else(|| {
                BartizanError::InvalidHyperparam(format!(
                    "total updates overflow: {} updates/epoch x {} epochs",
                    hp.updates_per_epoch, hp.max_epochs
                ))
            })?;
        // Shell-style integer arithmetic: floor, never round up.
        let warmup_updates = (u64::from(hp.warmup_percent) * u64::from(total_updates) / 100) as u32;

        Ok(Self {
            total_updates,
            warmup_updates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_matches_the_shell_arithmetic() {
        // 5 epochs x 210 updates at 6% warmup, the reference experiment.
        let mut hp = Hyperparams::classification();
        hp.max_epochs = 5;
        hp.updates_per_epoch = 210;
        hp.warmup_percent = 6;

        let schedule = Schedule::derive(&hp).unwrap();
        assert_eq!(schedule.total_updates, 1050);
        assert_eq!(schedule.warmup_updates, 63);
    }

    #[test]
    fn warmup_is_floored() {
        let mut hp = Hyperparams::classification();
        hp.max_epochs = 1;
        hp.updates_per_epoch = 333;
        hp.warmup_percent = 6;

        // 6% of 333 is 19.98; shell arithmetic gives 19.
        let schedule = Schedule::derive(&hp).unwrap();
        assert_eq!(schedule.warmup_updates, 19);
    }

    #[test]
    fn zero_warmup_is_valid() {
        let mut hp = Hyperparams::generation();
        hp.warmup_percent = 0;

        let schedule = Schedule::derive(&hp).unwrap();
        assert_eq!(schedule.warmup_updates, 0);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let mut hp = Hyperparams::classification();
        hp.max_epochs = 0;
        assert!(Schedule::derive(&hp).is_err());

        let mut hp = Hyperparams::classification();
        hp.updates_per_epoch = 0;
        assert!(Schedule::derive(&hp).is_err());

        let mut hp = Hyperparams::classification();
        hp.warmup_percent = 101;
        assert!(Schedule::derive(&hp).is_err());

        let mut hp = Hyperparams::classification();
        hp.num_classes = None;
        assert!(Schedule::derive(&hp).is_err());
    }

    #[test]
    fn total_updates_overflow_is_rejected() {
        let mut hp = Hyperparams::classification();
        hp.max_epochs = 100_000;
        hp.updates_per_epoch = 100_000;

        let err = Schedule::derive(&hp).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn warmup_never_exceeds_total() {
        let mut hp = Hyperparams::generation();
        hp.warmup_percent = 100;

        let schedule = Schedule::derive(&hp).unwrap();
        assert_eq!(schedule.warmup_updates, schedule.total_updates);
    }

    #[test]
    fn adam_betas_flag_format() {
        let hp = Hyperparams::classification();
        assert_eq!(hp.adam_betas_flag(), "(0.9, 0.98)");

        let hp = Hyperparams::generation();
        assert_eq!(hp.adam_betas_flag(), "(0.9, 0.999)");
    }

    #[test]
    fn hyperparams_serialization_roundtrip() {
        let hp = Hyperparams::generation();
        let json = serde_json::to_string(&hp).unwrap();
        let back: Hyperparams = serde_json::from_str(&json).unwrap();
        assert_eq!(hp, back);
    }

    #[test]
    fn task_kind_from_str() {
        assert_eq!(
            "classification".parse::<TaskKind>().unwrap(),
            TaskKind::Classification
        );
        assert_eq!(
            "generation".parse::<TaskKind>().unwrap(),
            TaskKind::Generation
        );
        assert!("translation".parse::<TaskKind>().is_err());
    }
}
