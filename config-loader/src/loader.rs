//! Turns document text into a validated [`ConfigRecord`].

use std::collections::BTreeMap;
use std::path::Path;

use config_primitives::{
    Batching, Chunking, ConfigError, ConfigTypeError, LayerName, LayerSpec, Result, Task,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::fields::{Fields, kind};
use crate::network::{
    KNOWN_LAYER_CLASSES, KNOWN_REC_UNITS, Network, OUTPUT_LAYER, rec_unit_key,
};
use crate::schema::{
    ConfigRecord, DEFAULT_BATCH_SIZE, DEFAULT_LEARNING_RATE, DEFAULT_LOG_VERBOSITY,
    DEFAULT_NUM_EPOCHS, DEFAULT_SAVE_INTERVAL, DatasetSpec, OptimizerSettings,
};
use crate::syntax::{Document, parse_document};
use crate::template::ModelPathTemplate;

/// Extension stripped from file names to form the document name.
pub const CONFIG_EXTENSION: &str = ".config";

/// Identifying name of a document: its file name without `.config`.
#[must_use]
pub fn document_name(file_name: &str) -> &str {
    file_name
        .strip_suffix(CONFIG_EXTENSION)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(file_name)
}

/// Reads and parses the document at `path` without validating it. Returns
/// the file name and the option tree, ready for
/// [`ConfigLoader::load_document`].
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::Syntax`] when it is malformed.
pub fn read_path(path: impl AsRef<Path>) -> Result<(String, Document)> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (syntax, doc) = parse_document(&text)?;
    debug!(document = %file_name, ?syntax, options = doc.len(), "parsed configuration document");
    Ok((file_name, doc))
}

/// The `log_verbosity` a parsed document asks for, read before validation so
/// logging can be set up first. Absent or malformed values give the default;
/// validation reports them later.
#[must_use]
pub fn declared_log_verbosity(doc: &Document) -> usize {
    doc.get("log_verbosity")
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(DEFAULT_LOG_VERBOSITY)
}

/// Loads configuration documents.
///
/// # Examples
///
/// ```
/// use config_loader::ConfigLoader;
///
/// let record = ConfigLoader::new()
///     .load_str(
///         "demo.config",
///         r#"{
///             "task": "train",
///             "train": {"class": "Task12AXDataset", "num_seqs": 1000},
///             "num_inputs": 9,
///             "num_outputs": 2,
///             "network": {"output": {"class": "softmax", "loss": "ce"}},
///             "model": "/tmp/returnn.%s.network"
///         }"#,
///     )
///     .unwrap();
///
/// assert_eq!(record.name(), "demo");
/// assert_eq!(record.model_path().as_deref(), Some("/tmp/returnn.demo.network"));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfigLoader {
    strict: bool,
}

impl ConfigLoader {
    /// Creates a loader that keeps unrecognized options.
    #[must_use]
    pub const fn new() -> Self {
        Self { strict: false }
    }

    /// Rejects unrecognized options instead of keeping them.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Reads and loads the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise
    /// the same errors as [`ConfigLoader::load_str`].
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<ConfigRecord> {
        let (name, doc) = read_path(path)?;
        self.load_document(&name, doc)
    }

    /// Loads a document from text. `name` may carry the `.config` extension.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Syntax`] for malformed text, and
    /// [`ConfigError::Missing`], [`ConfigError::Type`], or
    /// [`ConfigError::InvalidValue`] naming the offending option.
    pub fn load_str(&self, name: &str, text: &str) -> Result<ConfigRecord> {
        let (syntax, doc) = parse_document(text)?;
        debug!(document = name, ?syntax, options = doc.len(), "parsed configuration document");
        self.load_document(name, doc)
    }

    /// Loads an already parsed option tree.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigLoader::load_str`], minus syntax errors.
    pub fn load_document(&self, name: &str, doc: Document) -> Result<ConfigRecord> {
        let name = document_name(name).to_owned();
        let mut f = Fields::root(doc);

        let task = f.string("task")?;
        let task: Task = f.require("task", task)?.parse()?;
        let num_inputs = f.positive("num_inputs")?;
        let num_inputs = f.require("num_inputs", num_inputs)?;
        let num_outputs = f.positive("num_outputs")?;
        let num_outputs = f.require("num_outputs", num_outputs)?;
        let network = f.mapping("network")?;
        let network = build_network(f.require("network", network)?, num_outputs)?;

        let train = f
            .mapping("train")?
            .map(|map| dataset("train", map))
            .transpose()?;
        let dev = f.mapping("dev")?.map(|map| dataset("dev", map)).transpose()?;
        if task == Task::Train && train.is_none() {
            return Err(ConfigError::missing("train"));
        }

        let batching = f
            .string("batching")?
            .map(|s| s.parse::<Batching>())
            .transpose()?
            .unwrap_or_default();
        let batch_size = f.positive("batch_size")?.unwrap_or(DEFAULT_BATCH_SIZE);
        let max_seqs = max_seqs(&mut f)?;
        let chunking = chunking(&mut f)?;
        let optimizer = optimizer(&mut f)?;
        let model = f
            .string("model")?
            .map(ModelPathTemplate::parse)
            .transpose()?;
        let num_epochs = f.positive("num_epochs")?.unwrap_or(DEFAULT_NUM_EPOCHS);
        let save_interval = f.positive("save_interval")?.unwrap_or(DEFAULT_SAVE_INTERVAL);
        let log_verbosity = f
            .non_negative("log_verbosity")?
            .unwrap_or(DEFAULT_LOG_VERBOSITY);

        let extra = f.into_rest();
        for key in extra.keys() {
            if self.strict {
                return Err(ConfigError::invalid(key.as_str(), "unrecognized option"));
            }
            warn!(document = %name, option = %key, "unrecognized option kept verbatim");
        }

        if optimizer.update_multiple_models_average_step > 0 && !optimizer.multiple_models() {
            warn!(
                document = %name,
                average_step = optimizer.update_multiple_models_average_step,
                "update_multiple_models_average_step has no effect without update_multiple_models > 1"
            );
        }

        debug!(
            document = %name,
            %task,
            layers = network.len(),
            epochs = num_epochs,
            "configuration loaded"
        );

        Ok(ConfigRecord {
            name,
            task,
            train,
            dev,
            num_inputs,
            num_outputs,
            batching,
            batch_size,
            max_seqs,
            chunking,
            network,
            optimizer,
            model,
            num_epochs,
            save_interval,
            log_verbosity,
            extra,
        })
    }
}

/// Rewrites the bare key of a primitive validation error to its dotted path.
fn scoped(f: &Fields, key: &str, err: ConfigError) -> ConfigError {
    match err {
        ConfigError::InvalidValue { reason, .. } => ConfigError::invalid(f.path(key), reason),
        other => other,
    }
}

fn build_network(map: Map<String, Value>, num_outputs: usize) -> Result<Network> {
    let mut layers = BTreeMap::new();
    for (raw_name, value) in map {
        let name = LayerName::new(raw_name.as_str())?;
        let scope = format!("network.{raw_name}");
        let spec = match value {
            Value::Object(spec) => spec,
            other => return Err(ConfigTypeError::new(scope, "a mapping", kind(&other)).into()),
        };
        let layer = layer_spec(&name, Fields::nested(scope, spec), num_outputs)?;
        layers.insert(name, layer);
    }
    Network::new(layers)
}

fn layer_spec(name: &LayerName, mut f: Fields, num_outputs: usize) -> Result<LayerSpec> {
    let class = f.string("class")?;
    let class = f.require("class", class)?;
    if !KNOWN_LAYER_CLASSES.contains(&class.as_str()) {
        warn!(layer = %name, class = %class, "unknown layer class; options passed through unchecked");
    }
    if class == "rec" {
        match f.get("unit") {
            None | Some(Value::String(_) | Value::Object(_)) => {}
            Some(other) => return Err(f.type_error("unit", "a cell name or a mapping", other)),
        }
        if let Some(Value::String(unit)) = f.get("unit") {
            if !KNOWN_REC_UNITS.contains(&rec_unit_key(unit).as_str()) {
                warn!(layer = %name, unit = %unit, "unknown recurrent unit; passed through unchecked");
            }
        }
    }

    let mut builder = LayerSpec::builder(class);
    if let Some(n_out) = f.positive("n_out")? {
        builder = builder.n_out(n_out).map_err(|err| scoped(&f, "n_out", err))?;
    }
    if let Some(loss) = f.string("loss")? {
        builder = builder.loss(loss).map_err(|err| scoped(&f, "loss", err))?;
    }
    if let Some(sources) = f.strings("from")? {
        builder = builder.from(Vec::new());
        for source in &sources {
            builder = builder
                .add_source(source)
                .map_err(|err| scoped(&f, "from", err))?;
        }
    }
    if *name == OUTPUT_LAYER && builder.has_loss() {
        builder = builder.default_n_out(num_outputs);
    }

    let class_key = f.path("class");
    for (key, value) in f.into_rest() {
        builder = builder.option(key, value);
    }
    builder.build().map_err(|err| match err {
        ConfigError::InvalidValue { reason, .. } => ConfigError::invalid(class_key, reason),
        other => other,
    })
}

fn dataset(scope: &str, map: Map<String, Value>) -> Result<DatasetSpec> {
    let mut f = Fields::nested(scope, map);
    let class = f.string("class")?;
    let class = f.require("class", class)?;
    let num_seqs = f.positive("num_seqs")?;
    let fixed_random_seed = f
        .non_negative("fixed_random_seed")?
        .map(|seed| seed as u64);
    Ok(DatasetSpec {
        class,
        num_seqs,
        fixed_random_seed,
        options: f.into_rest(),
    })
}

/// `max_seqs`: a positive limit, or `-1` for unlimited.
fn max_seqs(f: &mut Fields) -> Result<Option<usize>> {
    match f.int("max_seqs")? {
        None | Some(-1) => Ok(None),
        Some(n) => usize::try_from(n)
            .ok()
            .filter(|&n| n > 0)
            .map(Some)
            .ok_or_else(|| {
                ConfigError::invalid(
                    f.path("max_seqs"),
                    format!("must be a positive integer or -1, got {n}"),
                )
            }),
    }
}

/// `chunking`: `"size:step"`, `"size"`, or a bare integer size.
fn chunking(f: &mut Fields) -> Result<Chunking> {
    match f.take("chunking") {
        None => Ok(Chunking::disabled()),
        Some(Value::String(s)) => s.parse(),
        Some(Value::Number(n)) if n.is_u64() => {
            let size = n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| ConfigError::invalid(f.path("chunking"), "size is out of range"))?;
            Chunking::new(size, size)
        }
        Some(other) => Err(f.type_error("chunking", "a string \"size:step\"", &other)),
    }
}

fn optimizer(f: &mut Fields) -> Result<OptimizerSettings> {
    let learning_rate = f.float("learning_rate")?.unwrap_or(DEFAULT_LEARNING_RATE);
    if learning_rate <= 0.0 || !learning_rate.is_finite() {
        return Err(ConfigError::invalid(
            "learning_rate",
            format!("must be a positive number, got {learning_rate}"),
        ));
    }
    let gradient_clip = f.float("gradient_clip")?.unwrap_or(0.0);
    if gradient_clip < 0.0 || !gradient_clip.is_finite() {
        return Err(ConfigError::invalid(
            "gradient_clip",
            format!("must not be negative, got {gradient_clip}"),
        ));
    }

    Ok(OptimizerSettings {
        nadam: f.bool("nadam")?.unwrap_or(false),
        learning_rate,
        update_multiple_models: f.non_negative("update_multiple_models")?.unwrap_or(0),
        update_multiple_models_average_step: f
            .non_negative("update_multiple_models_average_step")?
            .unwrap_or(0),
        reset_update_params: f.bool("reset_update_params")?.unwrap_or(false),
        gradient_clip,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn load(value: Value) -> Result<ConfigRecord> {
        let Value::Object(doc) = value else {
            panic!("test input must be an object");
        };
        ConfigLoader::new().load_document("demo-upd-mult-model.lstm.12ax.config", doc)
    }

    fn minimal() -> Value {
        json!({
            "task": "train",
            "train": {"class": "Task12AXDataset", "num_seqs": 1000},
            "num_inputs": 9,
            "num_outputs": 2,
            "network": {
                "fw0": {"class": "lstm2", "n_out": 10},
                "output": {"class": "softmax", "loss": "ce", "from": ["fw0"]}
            }
        })
    }

    fn with(key: &str, value: Value) -> Value {
        let mut doc = minimal();
        doc[key] = value;
        doc
    }

    fn without(key: &str) -> Value {
        let mut doc = minimal();
        doc.as_object_mut().unwrap().remove(key);
        doc
    }

    #[test]
    fn strips_config_extension() {
        assert_eq!(
            document_name("demo-upd-mult-model.lstm.12ax.config"),
            "demo-upd-mult-model.lstm.12ax"
        );
        assert_eq!(document_name("plain"), "plain");
        assert_eq!(document_name(".config"), ".config");
    }

    #[test]
    fn declared_verbosity_is_read_before_validation() {
        let Value::Object(doc) = json!({"log_verbosity": 5, "task": "dance"}) else {
            unreachable!()
        };
        assert_eq!(declared_log_verbosity(&doc), 5);

        for value in [json!(null), json!(-1), json!("loud"), json!(2.5)] {
            let Value::Object(doc) = json!({ "log_verbosity": value.clone() }) else {
                unreachable!()
            };
            assert_eq!(declared_log_verbosity(&doc), DEFAULT_LOG_VERBOSITY, "{value}");
        }
        assert_eq!(declared_log_verbosity(&Document::new()), DEFAULT_LOG_VERBOSITY);
    }

    #[test]
    fn applies_defaults() {
        let record = load(minimal()).unwrap();
        assert_eq!(record.batching(), Batching::Default);
        assert_eq!(record.batch_size(), DEFAULT_BATCH_SIZE);
        assert_eq!(record.max_seqs(), None);
        assert!(!record.chunking().is_enabled());
        assert_eq!(record.optimizer(), &OptimizerSettings::default());
        assert_eq!(record.num_epochs(), DEFAULT_NUM_EPOCHS);
        assert_eq!(record.save_interval(), DEFAULT_SAVE_INTERVAL);
        assert_eq!(record.log_verbosity(), DEFAULT_LOG_VERBOSITY);
        assert!(record.model().is_none());
        assert!(record.extra().is_empty());
    }

    #[test]
    fn required_fields_are_named() {
        for key in ["task", "num_inputs", "num_outputs", "network"] {
            let err = load(without(key)).expect_err(key);
            assert!(matches!(err, ConfigError::Missing { .. }), "{key}: {err}");
            assert_eq!(err.key(), Some(key));
        }
    }

    #[test]
    fn train_task_needs_train_dataset() {
        let err = load(without("train")).expect_err("train");
        assert_eq!(err.key(), Some("train"));

        let mut doc = without("train");
        doc["task"] = json!("forward");
        assert!(load(doc).is_ok());
    }

    #[test]
    fn non_integer_dimensions_are_type_errors() {
        for value in [json!("9"), json!(9.5), json!(true)] {
            let err = load(with("num_inputs", value)).expect_err("type");
            let ConfigError::Type(err) = err else {
                panic!("expected type error, got {err}");
            };
            assert_eq!(err.key(), "num_inputs");
            assert_eq!(err.expected(), "an integer");
        }
    }

    #[test]
    fn non_positive_dimensions_are_rejected() {
        for value in [json!(0), json!(-2)] {
            let err = load(with("num_outputs", value)).expect_err("value");
            assert!(matches!(err, ConfigError::InvalidValue { .. }));
            assert_eq!(err.key(), Some("num_outputs"));
        }
    }

    #[test]
    fn network_must_be_a_mapping() {
        let err = load(with("network", json!(["fw0"]))).expect_err("type");
        assert!(matches!(err, ConfigError::Type(_)));
        assert_eq!(err.key(), Some("network"));

        let err = load(with("network", json!({"fw0": "lstm2"}))).expect_err("layer type");
        assert_eq!(err.key(), Some("network.fw0"));
    }

    #[test]
    fn layer_errors_carry_layer_path() {
        let err = load(with(
            "network",
            json!({"output": {"class": "softmax", "loss": "ce", "n_out": 0}}),
        ))
        .expect_err("n_out");
        assert_eq!(err.key(), Some("network.output.n_out"));

        let err = load(with("network", json!({"output": {"loss": "ce"}}))).expect_err("class");
        assert_eq!(err.key(), Some("network.output.class"));

        let err = load(with(
            "network",
            json!({"output": {"class": "softmax", "loss": "ce", "from": [1]}}),
        ))
        .expect_err("from");
        assert_eq!(err.key(), Some("network.output.from"));
    }

    #[test]
    fn output_inherits_num_outputs() {
        let record = load(minimal()).unwrap();
        assert_eq!(record.network().get("output").unwrap().n_out(), Some(2));
        assert_eq!(record.network().get("fw0").unwrap().n_out(), Some(10));
    }

    #[test]
    fn single_source_string_is_accepted() {
        let record = load(with(
            "network",
            json!({
                "fw0": {"class": "lstm2", "n_out": 10},
                "output": {"class": "softmax", "loss": "ce", "from": "fw0"}
            }),
        ))
        .unwrap();
        let from = record.network().get("output").unwrap().from();
        assert_eq!(from.len(), 1);
        assert_eq!(from[0].to_string(), "fw0");
    }

    #[test]
    fn rec_units_use_engine_cell_names() {
        let network = |unit: Value| {
            json!({
                "lstm": {"class": "rec", "unit": unit, "n_out": 10},
                "output": {"class": "softmax", "loss": "ce", "from": ["lstm"]}
            })
        };
        for unit in [
            "NativeLSTM",
            "StandardLSTM",
            "BasicLSTM",
            "BasicLSTMCell",
            "GRUBlock",
            "NativeLSTM2",
            "BasicRNN",
        ] {
            let record = load(with("network", network(json!(unit)))).expect(unit);
            let lstm = record.network().get("lstm").expect("lstm");
            assert_eq!(lstm.option("unit"), Some(&json!(unit)));
        }

        let record = load(with("network", network(json!("transformer")))).expect("unknown unit");
        assert_eq!(record.network().get("lstm").unwrap().option("unit"), Some(&json!("transformer")));

        assert!(load(with("network", network(json!({"fw": {"class": "linear"}})))).is_ok());

        let err = load(with("network", network(json!(3)))).expect_err("unit type");
        assert!(matches!(err, ConfigError::Type(_)));
        assert_eq!(err.key(), Some("network.lstm.unit"));
    }

    #[test]
    fn unknown_layer_class_is_not_fatal() {
        let record = load(with(
            "network",
            json!({
                "fw0": {"class": "conv2d", "n_out": 10, "filter_size": [3, 3]},
                "output": {"class": "softmax", "loss": "ce", "from": ["fw0"]}
            }),
        ))
        .expect("unknown class loads");
        let fw0 = record.network().get("fw0").unwrap();
        assert_eq!(fw0.class(), "conv2d");
        assert_eq!(fw0.option("filter_size"), Some(&json!([3, 3])));
    }

    #[test]
    fn average_step_without_multiple_models_is_not_fatal() {
        let mut doc = with("update_multiple_models_average_step", json!(2));
        doc["update_multiple_models"] = json!(1);
        let record = load(doc).expect("warning only");
        assert_eq!(record.optimizer().update_multiple_models_average_step, 2);
        assert!(!record.optimizer().multiple_models());
    }

    #[test]
    fn max_seqs_accepts_unlimited_marker() {
        assert_eq!(load(with("max_seqs", json!(-1))).unwrap().max_seqs(), None);
        assert_eq!(load(with("max_seqs", json!(10))).unwrap().max_seqs(), Some(10));
        assert!(load(with("max_seqs", json!(0))).is_err());
    }

    #[test]
    fn chunking_forms() {
        let record = load(with("chunking", json!("200:200"))).unwrap();
        assert_eq!((record.chunking().size(), record.chunking().step()), (200, 200));

        let record = load(with("chunking", json!(0))).unwrap();
        assert!(!record.chunking().is_enabled());

        let err = load(with("chunking", json!("A:B"))).expect_err("components");
        assert_eq!(err.key(), Some("chunking"));

        let err = load(with("chunking", json!([200, 200]))).expect_err("type");
        assert!(matches!(err, ConfigError::Type(_)));
    }

    #[test]
    fn optimizer_bounds() {
        assert!(load(with("learning_rate", json!(0))).is_err());
        assert!(load(with("gradient_clip", json!(-1.0))).is_err());
        let err = load(with("nadam", json!("yes"))).expect_err("bool");
        assert!(matches!(err, ConfigError::Type(_)));
    }

    #[test]
    fn unknown_options_are_kept_or_rejected() {
        let doc = with("device", json!("gpu"));
        let record = load(doc.clone()).unwrap();
        assert_eq!(record.extra()["device"], json!("gpu"));

        let Value::Object(doc) = doc else {
            unreachable!()
        };
        let err = ConfigLoader::new()
            .strict(true)
            .load_document("demo", doc)
            .expect_err("strict");
        assert_eq!(err.key(), Some("device"));
    }

    #[test]
    fn unknown_task_is_rejected() {
        let err = load(with("task", json!("dance"))).expect_err("task");
        assert_eq!(err.key(), Some("task"));
    }
}
