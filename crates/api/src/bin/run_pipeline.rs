use anyhow::Result;
use api::pipeline::{self, Pipeline, PipelineSummary, PolicyChoice};
use api::{init_tracing, AppConfig};
use clap::{Parser, ValueEnum};
use index::{GraphStore, LoadReport, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// Every alphabetic token of five or more characters
    Naive,
    /// Glossary or term-file matches, linked within sentences
    Gazetteer,
}

#[derive(Parser)]
#[command(name = "run_pipeline")]
#[command(about = "Turn a directory of PDF, DOCX and text files into graph artifacts")]
#[command(version)]
struct Cli {
    /// Directory to ingest (walked recursively)
    input: PathBuf,

    /// Output directory for artifacts (overrides OUTPUT_DIR)
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Policy::Naive)]
    policy: Policy,

    /// term<TAB>label file for the gazetteer policy (overrides GAZETTEER_TERMS)
    #[arg(long)]
    terms: Option<PathBuf>,

    /// Skip glossary generation
    #[arg(long)]
    no_glossary: bool,

    /// Load the artifacts into Neo4j afterwards
    #[arg(long)]
    load: bool,

    /// Load into an in-memory graph instead of Neo4j
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    if let Some(out) = cli.out {
        config.output_dir = out;
    }
    if cli.no_glossary {
        config.glossary_enabled = false;
    }

    let policy = match cli.policy {
        Policy::Naive => PolicyChoice::Naive,
        Policy::Gazetteer => PolicyChoice::Gazetteer {
            terms: cli.terms.or_else(|| config.gazetteer_terms.clone()),
        },
    };

    let pipeline = Pipeline::from_config(&config, policy)?;
    let summary = pipeline.process_directory(&cli.input).await?;
    print_summary(&summary, &config);

    if cli.dry_run {
        let store = Arc::new(MemoryStore::new());
        let report = pipeline::load_artifacts(Arc::clone(&store), &config, &config.output_dir).await?;
        let stats = store.stats().await?;
        print_load(&report);
        println!(
            "In-memory graph: {} entities, {} relationships",
            stats.entity_count, stats.relation_count
        );
    } else if cli.load {
        // Artifacts are already on disk; a missing password only fails this step.
        let store = pipeline::connect_graph(&config).await?;
        let report = pipeline::load_artifacts(store, &config, &config.output_dir).await?;
        print_load(&report);
    }

    Ok(())
}

fn print_summary(summary: &PipelineSummary, config: &AppConfig) {
    println!("=== Pipeline run ===\n");
    println!("Files:          {}", summary.files);
    for degraded in &summary.degraded {
        println!("  degraded:     {} ({})", degraded.name, degraded.reason);
    }
    println!("Sections:       {}", summary.sections);
    println!("Citations:      {}", summary.citations);
    println!("Glossary terms: {}", summary.glossary_terms);
    if let Some(error) = &summary.glossary.generation_error {
        println!("  glossary generation failed: {}", error);
    }
    println!("Policy:         {}", summary.policy);
    println!("Entities:       {}", summary.entities);
    println!("Edges:          {}", summary.edges);
    println!("\nArtifacts written to {}", config.output_dir.display());
    for name in pipeline::ARTIFACTS {
        println!("  {}", name);
    }
}

fn print_load(report: &LoadReport) {
    println!("\n=== Graph load ===\n");
    println!(
        "Nodes:   {} written in {} batches",
        report.nodes_written, report.node_batches
    );
    println!(
        "Edges:   {} attached in {} batches, {} skipped",
        report.edges_attached, report.edge_batches, report.edges_skipped
    );
}
