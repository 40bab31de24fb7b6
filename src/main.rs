use clap::{Args, Parser, Subcommand, ValueEnum};
use phylo_splits::distances::{pairwise_kf, pairwise_rf, pairwise_weighted_rf};
use phylo_splits::error::PhyloError;
use phylo_splits::io::{read_beast_trees, read_newick_file, write_matrix_tsv};
use phylo_splits::newick::NewickOptions;
use phylo_splits::reroot::RerootOptions;
use phylo_splits::snapshot::TreeSnapshot;
use phylo_splits::tree_list::TreeList;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Split-encoded phylogenetic trees: pairwise distances, rerooting and
/// split listings.
#[derive(Parser, Debug)]
#[command(name = "phylo-splits", version, about = "Split bitmask tools for phylogenetic trees")]
struct Cli {
    /// Only log warnings and errors
    #[arg(short = 'q', long = "quiet", global = true, default_value_t = false)]
    quiet: bool,

    /// Log debug output
    #[arg(short = 'v', long = "verbose", global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pairwise distance matrix (TSV) for the trees of a BEAST/NEXUS file
    Distances(DistancesArgs),
    /// Reroot Newick trees at the parent of an outgroup taxon
    Reroot(RerootArgs),
    /// Print every tree with the split of each edge
    Splits(SplitsArgs),
}

#[derive(Args, Debug)]
struct DistancesArgs {
    /// Path to BEAST .trees (NEXUS) file, optionally gzipped
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Burn-in by number of trees (drop first N trees)
    #[arg(short = 't', long = "burnin-trees", default_value_t = 0)]
    burnin_trees: usize,

    /// Burn-in by state (keep trees with STATE_ > value)
    #[arg(short = 's', long = "burnin-states", default_value_t = 0)]
    burnin_states: usize,

    /// Output path for TSV distance matrix (`-` for stdout, `.gz` to compress)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Use TRANSLATE block to map taxon IDs to labels when available
    #[arg(long = "use-real-taxa", default_value_t = false)]
    use_real_taxa: bool,

    /// Distance metric to compute
    #[arg(long = "metric", value_enum, default_value_t = MetricArg::Rf)]
    metric: MetricArg,
}

#[derive(Args, Debug)]
struct RerootArgs {
    /// File of `;`-terminated Newick trees
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Taxon label to move to the outgroup position
    #[arg(long = "outgroup")]
    outgroup: String,

    /// Keep degree-two nodes left behind at the old root
    #[arg(long = "keep-degree-two", default_value_t = false)]
    keep_degree_two: bool,
}

#[derive(Args, Debug)]
struct SplitsArgs {
    /// File of `;`-terminated Newick trees
    #[arg(short = 'i', long = "input")]
    input: PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MetricArg {
    Rf,
    Weighted,
    Kf,
}

/// Exit codes: 2 no trees, 3 tree processing failed, 4 output failed.
#[derive(Debug)]
struct Failure(u8);

fn init_tracing(quiet: bool, verbose: bool) {
    let default = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_env("PHYLO_SPLITS_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let result = match cli.command {
        Command::Distances(args) => distances(args),
        Command::Reroot(args) => reroot(args),
        Command::Splits(args) => splits(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure(code)) => ExitCode::from(code),
    }
}

fn processing_failed(context: &str, err: PhyloError) -> Failure {
    error!(error = %err, "{context}");
    Failure(3)
}

fn distances(args: DistancesArgs) -> Result<(), Failure> {
    let t0 = Instant::now();
    let read = read_beast_trees(&args.input, args.burnin_trees, args.burnin_states, args.use_real_taxa)
        .map_err(|e| processing_failed("failed to read trees", e))?;
    let (names, mut trees) = (read.names, read.trees);
    if trees.is_empty() {
        error!(input = %args.input.display(), "no trees parsed");
        return Err(Failure(2));
    }
    info!(
        taxa = trees.namespace().borrow().len(),
        trees = trees.len(),
        secs = t0.elapsed().as_secs_f64(),
        "read beast trees"
    );

    let t1 = Instant::now();
    let snaps: Vec<TreeSnapshot> = trees
        .snapshots()
        .map_err(|e| processing_failed("failed to build snapshots", e))?;
    info!(secs = t1.elapsed().as_secs_f64(), "built split snapshots");

    let t2 = Instant::now();
    let written = match args.metric {
        MetricArg::Rf => write_matrix_tsv(&args.output, &names, &pairwise_rf(&snaps)),
        MetricArg::Weighted => write_matrix_tsv(&args.output, &names, &pairwise_weighted_rf(&snaps)),
        MetricArg::Kf => write_matrix_tsv(&args.output, &names, &pairwise_kf(&snaps)),
    };
    if let Err(e) = written {
        error!(output = %args.output.display(), error = %e, "failed to write output");
        return Err(Failure(4));
    }
    info!(
        metric = ?args.metric,
        pairs = names.len() * (names.len() - 1) / 2,
        secs = t2.elapsed().as_secs_f64(),
        "wrote distance matrix"
    );
    Ok(())
}

fn read_newick_trees(input: &Path) -> Result<TreeList, Failure> {
    let trees = read_newick_file(input).map_err(|e| processing_failed("failed to read trees", e))?;
    if trees.is_empty() {
        error!(input = %input.display(), "no trees parsed");
        return Err(Failure(2));
    }
    Ok(trees)
}

fn reroot(args: RerootArgs) -> Result<(), Failure> {
    let mut trees = read_newick_trees(&args.input)?;
    let options = RerootOptions {
        update_splits: false,
        suppress_degree_two: !args.keep_degree_two,
    };
    for index in 0..trees.len() {
        let Some(tree) = trees.get_mut(index) else { continue };
        let Some(outgroup) = tree.find_node_with_taxon_label(&args.outgroup) else {
            error!(tree = index, outgroup = %args.outgroup, "outgroup taxon not found");
            return Err(Failure(3));
        };
        tree.to_outgroup_position(outgroup, options)
            .map_err(|e| processing_failed("failed to reroot", e))?;
        println!("{}", tree.as_newick_string(&NewickOptions::default()));
    }
    Ok(())
}

fn splits(args: SplitsArgs) -> Result<(), Failure> {
    let mut trees = read_newick_trees(&args.input)?;
    trees
        .encode_all_splits()
        .map_err(|e| processing_failed("failed to encode splits", e))?;
    for tree in &trees {
        print!("{}", tree.indented_form(true));
        println!();
    }
    Ok(())
}
