//! Strongly typed configuration record.

use std::collections::BTreeMap;

use config_primitives::{Batching, Chunking, Task};
use serde::Serialize;
use serde_json::Value;

use crate::network::Network;
use crate::template::ModelPathTemplate;

/// Frames per batch when `batch_size` is not given.
pub const DEFAULT_BATCH_SIZE: usize = 1;
/// Learning rate when `learning_rate` is not given.
pub const DEFAULT_LEARNING_RATE: f64 = 1.0;
/// Training epochs when `num_epochs` is not given.
pub const DEFAULT_NUM_EPOCHS: usize = 5;
/// Checkpoint interval when `save_interval` is not given.
pub const DEFAULT_SAVE_INTERVAL: usize = 1;
/// Log verbosity when `log_verbosity` is not given.
pub const DEFAULT_LOG_VERBOSITY: usize = 4;

/// Dataset declaration for `train` or `dev`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatasetSpec {
    pub(crate) class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) num_seqs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) fixed_random_seed: Option<u64>,
    #[serde(flatten)]
    pub(crate) options: BTreeMap<String, Value>,
}

impl DatasetSpec {
    /// Dataset implementation tag, e.g. `Task12AXDataset`.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Number of sequences the dataset generates.
    #[must_use]
    pub const fn num_seqs(&self) -> Option<usize> {
        self.num_seqs
    }

    /// Seed pinning the generated sequences, if any.
    #[must_use]
    pub const fn fixed_random_seed(&self) -> Option<u64> {
        self.fixed_random_seed
    }

    /// Dataset-specific options.
    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }
}

/// Optimizer hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizerSettings {
    /// Use Nesterov-accelerated Adam.
    pub nadam: bool,
    /// Base learning rate.
    pub learning_rate: f64,
    /// Number of model copies updated independently; `0` or `1` disables.
    pub update_multiple_models: usize,
    /// Average the model copies every this many updates; `0` disables.
    pub update_multiple_models_average_step: usize,
    /// Reset optimizer state at the start of each epoch.
    pub reset_update_params: bool,
    /// Gradient norm clipping threshold; `0` disables.
    pub gradient_clip: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            nadam: false,
            learning_rate: DEFAULT_LEARNING_RATE,
            update_multiple_models: 0,
            update_multiple_models_average_step: 0,
            reset_update_params: false,
            gradient_clip: 0.0,
        }
    }
}

impl OptimizerSettings {
    /// Whether multiple model copies are trained.
    #[must_use]
    pub const fn multiple_models(&self) -> bool {
        self.update_multiple_models > 1
    }
}

/// A loaded, validated configuration document. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfigRecord {
    #[serde(skip)]
    pub(crate) name: String,
    pub(crate) task: Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) train: Option<DatasetSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) dev: Option<DatasetSpec>,
    pub(crate) num_inputs: usize,
    pub(crate) num_outputs: usize,
    pub(crate) batching: Batching,
    pub(crate) batch_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) max_seqs: Option<usize>,
    pub(crate) chunking: Chunking,
    pub(crate) network: Network,
    #[serde(flatten)]
    pub(crate) optimizer: OptimizerSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) model: Option<ModelPathTemplate>,
    pub(crate) num_epochs: usize,
    pub(crate) save_interval: usize,
    pub(crate) log_verbosity: usize,
    #[serde(flatten)]
    pub(crate) extra: BTreeMap<String, Value>,
}

impl ConfigRecord {
    /// Identifying name of the document (file name without `.config`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execution mode.
    #[must_use]
    pub const fn task(&self) -> Task {
        self.task
    }

    /// Training dataset.
    #[must_use]
    pub const fn train(&self) -> Option<&DatasetSpec> {
        self.train.as_ref()
    }

    /// Development dataset.
    #[must_use]
    pub const fn dev(&self) -> Option<&DatasetSpec> {
        self.dev.as_ref()
    }

    /// Input feature dimension.
    #[must_use]
    pub const fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Output label dimension.
    #[must_use]
    pub const fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Minibatch assembly policy.
    #[must_use]
    pub const fn batching(&self) -> Batching {
        self.batching
    }

    /// Frames per batch.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Maximum sequences per batch; `None` is unlimited.
    #[must_use]
    pub const fn max_seqs(&self) -> Option<usize> {
        self.max_seqs
    }

    /// Sequence chunking.
    #[must_use]
    pub const fn chunking(&self) -> Chunking {
        self.chunking
    }

    /// Declared network graph.
    #[must_use]
    pub const fn network(&self) -> &Network {
        &self.network
    }

    /// Optimizer hyperparameters.
    #[must_use]
    pub const fn optimizer(&self) -> &OptimizerSettings {
        &self.optimizer
    }

    /// Checkpoint path template as written in the document.
    #[must_use]
    pub const fn model(&self) -> Option<&ModelPathTemplate> {
        self.model.as_ref()
    }

    /// Checkpoint path with the document name substituted.
    #[must_use]
    pub fn model_path(&self) -> Option<String> {
        self.model.as_ref().map(|t| t.render(&self.name))
    }

    /// Checkpoint path for the given epoch.
    #[must_use]
    pub fn epoch_model_path(&self, epoch: usize) -> Option<String> {
        self.model.as_ref().map(|t| t.render_epoch(&self.name, epoch))
    }

    /// Number of training epochs.
    #[must_use]
    pub const fn num_epochs(&self) -> usize {
        self.num_epochs
    }

    /// Epochs between checkpoints.
    #[must_use]
    pub const fn save_interval(&self) -> usize {
        self.save_interval
    }

    /// Epochs after which a checkpoint is written: every `save_interval`
    /// epochs, plus the final epoch.
    pub fn checkpoint_epochs(&self) -> impl Iterator<Item = usize> + '_ {
        (1..=self.num_epochs)
            .filter(|epoch| epoch % self.save_interval == 0 || *epoch == self.num_epochs)
    }

    /// Logging verbosity.
    #[must_use]
    pub const fn log_verbosity(&self) -> usize {
        self.log_verbosity
    }

    /// Options the loader does not interpret, kept verbatim.
    #[must_use]
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }
}
