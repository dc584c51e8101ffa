use std::{fs::File, io::Write, path::PathBuf, process::ExitCode};

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use roottools::errors::PlanError;
use roottools::planner::{default_by, default_under, enumerate_paths, fill, BasketData, BranchSelection, ManifestTreeSource, PartitionSet, PathSpec, TreeSource};
use roottools::writer::object::TObjString;
use roottools::writer::Writer;

#[derive(clap::Args)]
/// Creates a new ROOT archive, optionally inserting one or more named strings into it
struct Create {
    path: PathBuf,

    #[arg(short = 'i', long = "insert", value_name = "NAME=VALUE")]
    /// A `name=value` pair to insert as a TObjString; may be repeated
    inserts: Vec<String>,
}

#[derive(clap::Args)]
/// Plans partitions across one or more basket-geometry manifests standing in for ROOT files
struct Plan {
    /// Manifest file(s) or glob pattern(s) describing basket geometry for a tree
    manifests: Vec<String>,

    #[arg(long)]
    /// Path through TDirectories to the tree of interest; carried through to the PartitionSet
    treepath: String,

    #[arg(short = 'b', long = "branch")]
    /// Restrict planning to these branches (default: every branch in the manifest)
    branches: Vec<String>,

    #[arg(long)]
    /// Stop growing a partition once its baskets would exceed this many bytes (default: 10 MiB)
    under_bytes: Option<u64>,

    #[arg(short, long)]
    /// Write the resulting PartitionSet JSON here instead of stdout
    output: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Command {
    Create(Create),
    Plan(Plan),
}

#[derive(Parser)]
#[command(author, version, about)]
struct Opts {
    #[command(subcommand)]
    command: Command,
}

fn open_manifest(path: &str) -> Result<Box<dyn TreeSource>, PlanError> {
    let content = std::fs::read_to_string(path).map_err(PlanError::IOFault)?;
    let source = ManifestTreeSource::from_json(&content).map_err(|e| PlanError::InternalInvariant(format!("{path}: {e}")))?;
    Ok(Box::new(source))
}

fn real_main() -> Result<ExitCode, anyhow::Error> {
    let opts = Opts::parse();

    let spinner_style = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")?.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

    match opts.command {
        Command::Create(create_opts) => {
            let file = File::options()
                .read(true)
                .write(true)
                .create_new(true)
                .open(&create_opts.path)
                .context("Could not create archive file")?;

            let filename = create_opts
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .context("Archive path has no valid file name")?;

            let mut writer = Writer::create(filename, file).context("Could not write new archive")?;

            let bar = ProgressBar::new_spinner().with_style(spinner_style).with_prefix("Inserting");

            for pair in &create_opts.inserts {
                let (name, value) = pair.split_once('=').with_context(|| format!("{pair:?} is not a NAME=VALUE pair"))?;

                bar.set_message(name.to_string());
                writer
                    .insert(name, &TObjString::new(value))
                    .with_context(|| format!("Could not insert {name:?}"))?;
                bar.inc(1);
            }

            bar.finish_with_message("done");
        }
        Command::Plan(plan_opts) => {
            if plan_opts.manifests.is_empty() {
                bail!("at least one manifest path or glob pattern is required");
            }

            let paths = enumerate_paths(PathSpec::Many(plan_opts.manifests)).context("Could not expand input paths")?;
            if paths.is_empty() {
                bail!("no files matched the given manifest paths");
            }

            let selection = if plan_opts.branches.is_empty() {
                BranchSelection::All
            } else {
                BranchSelection::Names(plan_opts.branches)
            };

            let under: Box<dyn Fn(&[BasketData]) -> bool> = match plan_opts.under_bytes {
                Some(limit) => Box::new(move |baskets: &[BasketData]| baskets.iter().map(|b| b.numbytes).sum::<u64>() < limit),
                None => Box::new(default_under),
            };

            let bar = ProgressBar::new_spinner().with_style(spinner_style).with_prefix("Planning");
            bar.set_message(format!("{} file(s)", paths.len()));

            let partitionset: PartitionSet = fill(&paths, &plan_opts.treepath, open_manifest, &selection, default_by, under)
                .context("Could not plan partitions")?;

            bar.finish_with_message(format!("{} partition(s)", partitionset.numpartitions));

            let json = partitionset.to_json().context("Could not serialize partition set")?;
            match plan_opts.output {
                Some(path) => std::fs::write(&path, json).with_context(|| format!("Could not write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    env_logger::builder()
        .format(|f, record| {
            for line in record.args().to_string().split('\n') {
                write!(
                    f,
                    "{}",
                    match record.level() {
                        log::Level::Error => console::style("error").red(),
                        log::Level::Warn => console::style(" warn").yellow(),
                        log::Level::Info => console::style(" info").blue(),
                        log::Level::Debug => console::style("debug").magenta(),
                        log::Level::Trace => console::style("trace").white(),
                    }
                    .bold()
                )?;
                write!(f, "({})", record.target())?;
                writeln!(f, ": {line}")?;
            }

            Ok(())
        })
        .filter_level({
            #[cfg(debug_assertions)]
            let v = log::LevelFilter::Debug;
            #[cfg(not(debug_assertions))]
            let v = log::LevelFilter::Info;
            v
        })
        .parse_env("ROOTTOOLS_LOG")
        .init();

    match real_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("\x1b[31;1merror\x1b[0m: {err}");

            for (i, cause) in err.chain().skip(1).enumerate() {
                eprintln!("  #{i}: {cause}");
            }

            ExitCode::FAILURE
        }
    }
}
