//! Loads a training configuration document and reports what the training
//! engine would see.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use config_loader::syntax::Document;
use config_loader::{ConfigLoader, declared_log_verbosity, read_path};
use tracing::info;

#[derive(Debug, Parser)]
#[command(about = "Validate a training configuration document")]
struct Args {
    /// Path to the configuration document.
    path: PathBuf,

    /// Also print the checkpoint path for this epoch.
    #[arg(long)]
    epoch: Option<usize>,

    /// Print the resolved record as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Reject options the loader does not recognize.
    #[arg(long)]
    strict: bool,

    /// Overrides the document's `log_verbosity`.
    #[arg(long)]
    log_verbosity: Option<usize>,
}

/// Logging level: the command-line override, else the document's own.
fn verbosity(flag: Option<usize>, doc: &Document) -> usize {
    flag.unwrap_or_else(|| declared_log_verbosity(doc))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let (name, doc) = read_path(&args.path)
        .with_context(|| format!("cannot read configuration {}", args.path.display()))?;
    config_telemetry::init(verbosity(args.log_verbosity, &doc))?;

    let record = ConfigLoader::new()
        .strict(args.strict)
        .load_document(&name, doc)
        .with_context(|| format!("invalid configuration {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    info!(
        document = record.name(),
        task = %record.task(),
        num_inputs = record.num_inputs(),
        num_outputs = record.num_outputs(),
        log_verbosity = record.log_verbosity(),
        "configuration ok"
    );
    info!(
        batching = %record.batching(),
        batch_size = record.batch_size(),
        max_seqs = ?record.max_seqs(),
        chunking = %record.chunking(),
        "batching"
    );
    for (name, layer) in record.network().construction_order() {
        let from: Vec<String> = layer.from().iter().map(ToString::to_string).collect();
        info!(
            layer = %name,
            class = layer.class(),
            n_out = ?layer.n_out(),
            loss = ?layer.loss(),
            from = %from.join(","),
            "layer"
        );
    }
    if let Some(path) = record.model_path() {
        info!(model = %path, epochs = record.num_epochs(), "checkpoints");
    }
    if let Some(path) = args.epoch.and_then(|epoch| record.epoch_model_path(epoch)) {
        info!(model = %path, "checkpoint for requested epoch");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(verbosity: usize) -> Document {
        let mut doc = Document::new();
        doc.insert("log_verbosity".to_owned(), json!(verbosity));
        doc
    }

    #[test]
    fn document_sets_verbosity() {
        assert_eq!(verbosity(None, &doc(5)), 5);
        assert_eq!(verbosity(None, &Document::new()), 4);
    }

    #[test]
    fn flag_overrides_document() {
        assert_eq!(verbosity(Some(1), &doc(5)), 1);
    }

    #[test]
    fn parses_arguments() {
        let args = Args::try_parse_from(["config-check", "demo.config", "--log-verbosity", "2"])
            .expect("args");
        assert_eq!(args.log_verbosity, Some(2));
        let args = Args::try_parse_from(["config-check", "demo.config"]).expect("args");
        assert_eq!(args.log_verbosity, None);
    }
}
