//! opinion-args CLI: train and run holder/target extractors.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use opinion_args::document::{Document, TermId};
use opinion_args::pipeline::{
    AnnotatedDocument, ArgumentExtractor, CONFIG_FILE, PipelineConfig, PipelineTrainer, Role,
};

#[derive(Parser)]
#[command(name = "opinion-args", version, about = "Opinion holder/target extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Holder,
    Target,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Holder => Role::Holder,
            RoleArg::Target => Role::Target,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Train an extractor from a JSON corpus of annotated documents.
    Train {
        /// JSON array of `{document, opinions}` objects.
        #[arg(long)]
        corpus: PathBuf,

        /// Output extractor directory.
        #[arg(long)]
        output: PathBuf,

        /// Pipeline config (TOML); defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Roles to train.
        #[arg(long, value_enum, value_delimiter = ',', default_value = "holder,target")]
        roles: Vec<RoleArg>,

        /// Skip feature analysis and cross-validation reports.
        #[arg(long)]
        no_analyze: bool,
    },

    /// Extract holders and targets for opinion expressions of a document.
    Extract {
        /// Extractor directory written by `train`.
        #[arg(long)]
        model: PathBuf,

        /// Document JSON file.
        #[arg(long)]
        document: PathBuf,

        /// Expression head term indexes.
        #[arg(long, value_delimiter = ',', required = true)]
        heads: Vec<usize>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            corpus,
            output,
            config,
            roles,
            no_analyze,
        } => {
            let mut config = match config {
                Some(path) => PipelineConfig::load(&path)?,
                None => PipelineConfig::default(),
            };
            if no_analyze {
                config.analyze = false;
            }
            let roles: Vec<Role> = roles.into_iter().map(Role::from).collect();
            if roles.is_empty() {
                miette::bail!("no roles selected for training");
            }

            let documents = AnnotatedDocument::read_corpus(&corpus)?;
            let mut trainer = PipelineTrainer::new(config, &roles);
            for annotated in &documents {
                trainer.add(&annotated.document, &annotated.opinions);
            }
            let extractor: ArgumentExtractor = trainer.finish()?;
            extractor.write_to(&output)?;
            println!(
                "Trained extractor on {} documents, written to {} ({})",
                documents.len(),
                output.display(),
                CONFIG_FILE
            );
        }

        Commands::Extract {
            model,
            document,
            heads,
        } => {
            let extractor: ArgumentExtractor = ArgumentExtractor::read_from(&model)?;
            let doc = Document::read_from(&document)?;
            let mut results = Vec::with_capacity(heads.len());
            for index in heads {
                let head = TermId(index);
                if doc.get(head).is_none() {
                    miette::bail!(
                        "expression head {index} out of range (document has {} terms)",
                        doc.len()
                    );
                }
                let arguments = extractor.extract(&doc, head);
                results.push(serde_json::json!({
                    "expression_head": head,
                    "holder": arguments.holder,
                    "target": arguments.target,
                }));
            }
            extractor.release(&doc);
            let json = serde_json::to_string_pretty(&results).into_diagnostic()?;
            println!("{json}");
        }
    }

    Ok(())
}
