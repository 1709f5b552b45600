//! The declared computation graph and its structural validation.

use std::collections::{BTreeMap, BTreeSet};

use config_primitives::{ConfigError, LayerName, LayerSpec, Result};
use serde::Serialize;

/// Name of the conventional output layer.
pub const OUTPUT_LAYER: &str = "output";

/// Layer classes the training engine is known to provide.
pub const KNOWN_LAYER_CLASSES: &[&str] = &[
    "linear",
    "softmax",
    "lstm",
    "lstm2",
    "rec",
    "rnn_cell",
    "get_last_hidden_state",
    "choice",
    "decide",
    "dot_attention",
    "concat_attention",
    "gauss_window_attention",
    "copy",
    "dropout",
];

/// Cell implementations accepted as the `unit` of a `rec` layer, in the
/// normalised form produced by [`rec_unit_key`].
pub const KNOWN_REC_UNITS: &[&str] = &[
    "lstm",
    "standardlstm",
    "basiclstm",
    "layernormbasiclstm",
    "coupledinputforgetgatelstm",
    "timefreqlstm",
    "gridlstm",
    "bidirectionalgridlstm",
    "glstm",
    "phasedlstm",
    "lstmblock",
    "lstmblockfused",
    "lstmblockwrapper",
    "fusedrnncelladaptor",
    "timereversedfusedrnn",
    "nativelstm",
    "nativelstm2",
    "twodlstm",
    "cudnnlstm",
    "cudnngru",
    "gru",
    "grublock",
    "ugrnn",
    "intersectionrnn",
    "nas",
    "basicrnn",
    "rnn",
];

/// Normalises a cell name: lowercased, with a trailing `Cell` dropped, so
/// `BasicLSTMCell`, `BasicLSTM`, and `basiclstm` all name the same unit.
#[must_use]
pub fn rec_unit_key(unit: &str) -> String {
    let unit = unit.strip_suffix("Cell").unwrap_or(unit);
    unit.to_lowercase()
}

/// Validated network graph: every `from` reference resolves, the graph is
/// acyclic, and at least one sink acts as an output.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Network {
    #[serde(flatten)]
    layers: BTreeMap<LayerName, LayerSpec>,
    #[serde(skip)]
    order: Vec<LayerName>,
}

impl Network {
    /// Validates `layers` and computes their construction order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the network is empty, a
    /// `from` entry names an unknown layer, the graph has a cycle, or no
    /// layer qualifies as an output.
    pub fn new(layers: BTreeMap<LayerName, LayerSpec>) -> Result<Self> {
        if layers.is_empty() {
            return Err(ConfigError::invalid(
                "network",
                "must declare at least one layer",
            ));
        }

        let order = construction_order(&layers)?;
        let network = Self { layers, order };
        if network.outputs().is_empty() {
            return Err(ConfigError::invalid(
                "network",
                format!(
                    "no output layer: expected a layer named `{OUTPUT_LAYER}` or declaring a `loss` that no other layer consumes"
                ),
            ));
        }
        Ok(network)
    }

    /// Number of declared layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Always `false` for a validated network.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Looks up a layer by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LayerSpec> {
        self.layers.get(name)
    }

    /// All layers keyed by name.
    #[must_use]
    pub fn layers(&self) -> &BTreeMap<LayerName, LayerSpec> {
        &self.layers
    }

    /// Layers ordered so every layer follows the layers it reads from.
    pub fn construction_order(&self) -> impl Iterator<Item = (&LayerName, &LayerSpec)> {
        self.order.iter().map(|name| (name, &self.layers[name]))
    }

    /// Layers no other layer reads from.
    #[must_use]
    pub fn sinks(&self) -> Vec<&LayerName> {
        let consumed: BTreeSet<&LayerName> = self
            .layers
            .values()
            .flat_map(|layer| layer.from().iter().filter_map(|r| r.layer()))
            .collect();
        self.layers
            .keys()
            .filter(|name| !consumed.contains(name))
            .collect()
    }

    /// Sinks that produce the network output: named `output` or carrying a
    /// loss.
    #[must_use]
    pub fn outputs(&self) -> Vec<&LayerName> {
        self.sinks()
            .into_iter()
            .filter(|name| *name == OUTPUT_LAYER || self.layers[*name].loss().is_some())
            .collect()
    }
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first post-order over `from` edges. The walk keeps its own stack of
/// `(layer, next source index)` frames so chain length is bounded by memory,
/// not by the call stack.
struct Walk<'a> {
    layers: &'a BTreeMap<LayerName, LayerSpec>,
    marks: BTreeMap<&'a LayerName, Mark>,
    stack: Vec<(&'a LayerName, usize)>,
    order: Vec<LayerName>,
}

fn construction_order(layers: &BTreeMap<LayerName, LayerSpec>) -> Result<Vec<LayerName>> {
    let mut walk = Walk {
        layers,
        marks: BTreeMap::new(),
        stack: Vec::new(),
        order: Vec::with_capacity(layers.len()),
    };
    for name in layers.keys() {
        walk.visit(name)?;
    }
    Ok(walk.order)
}

impl<'a> Walk<'a> {
    fn visit(&mut self, root: &'a LayerName) -> Result<()> {
        if self.marks.contains_key(root) {
            return Ok(());
        }
        self.marks.insert(root, Mark::Visiting);
        self.stack.push((root, 0));

        let layers = self.layers;
        while let Some(frame) = self.stack.last_mut() {
            let (name, index) = *frame;
            frame.1 += 1;
            let Some(source) = layers[name].from().get(index) else {
                self.stack.pop();
                self.marks.insert(name, Mark::Done);
                self.order.push(name.clone());
                continue;
            };

            let Some(dep) = source.layer() else {
                continue;
            };
            let Some((dep, _)) = layers.get_key_value(dep) else {
                return Err(ConfigError::invalid(
                    format!("network.{name}.from"),
                    format!("unknown layer `{dep}`"),
                ));
            };
            match self.marks.get(dep) {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => return Err(self.cycle(dep)),
                None => {
                    self.marks.insert(dep, Mark::Visiting);
                    self.stack.push((dep, 0));
                }
            }
        }
        Ok(())
    }

    /// Reports the cycle closed by an edge back to `dep`, which is on the stack.
    fn cycle(&self, dep: &LayerName) -> ConfigError {
        let start = self
            .stack
            .iter()
            .position(|(n, _)| *n == dep)
            .unwrap_or(0);
        let cycle: Vec<&str> = self.stack[start..]
            .iter()
            .map(|(n, _)| n.as_str())
            .chain([dep.as_str()])
            .collect();
        ConfigError::invalid(
            format!("network.{dep}.from"),
            format!("dependency cycle {}", cycle.join(" -> ")),
        )
    }
}
