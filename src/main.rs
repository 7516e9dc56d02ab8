//! `raid5ctl` — forensic CLI driving the RAID5 reconstruction core: page
//! size, membership, and order inference, parity verification, and
//! restore-to-raw-file.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use serde_json::json;

use raid5ctl::error::{Error, Result};
use raid5ctl::{membership, order, pagesize, range, restore, scanner, worker};

#[derive(Parser)]
#[command(
    name = "raid5ctl",
    version,
    about = "Read-only RAID5 geometry recovery and forensic parity analysis"
)]
struct Cli {
    /// A candidate member image, repeatable. Mutually exclusive with --image-file-pattern.
    #[arg(long = "image-file", action = ArgAction::Append, conflicts_with = "image_file_pattern")]
    image_file: Vec<PathBuf>,

    /// A glob expanding to candidate member images. Mutually exclusive with --image-file.
    #[arg(long = "image-file-pattern", conflicts_with = "image_file")]
    image_file_pattern: Option<String>,

    /// Comma-separated page indices, `a-b` ranges, or `all`.
    #[arg(long = "page-range", default_value = "all")]
    page_range: String,

    /// Worker pool size.
    #[arg(long, default_value_t = 1)]
    nproc: usize,

    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Emit machine-readable JSON results instead of colored text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Infer the stripe-unit (page) size of a candidate image.
    Pagesize {
        #[arg(long = "array-size", value_parser = clap::value_parser!(u64).range(3..))]
        array_size: u64,
    },
    /// Verify parity over a page range for an already-ordered candidate set.
    Paritycheck {
        #[arg(long = "page-size")]
        page_size_kb: u64,
    },
    /// Search candidate images for an `N`-member RAID5 set.
    Raidset {
        #[arg(long = "array-size", value_parser = clap::value_parser!(u64).range(3..))]
        array_size: u64,
        #[arg(long = "page-size")]
        page_size_kb: u64,
        #[arg(long = "test-all")]
        test_all: bool,
    },
    /// Recover member rotational order for an already-identified set.
    Order {
        #[arg(long = "page-size")]
        page_size_kb: u64,
    },
    /// Reassemble the logical volume into a raw output file.
    Restore {
        #[arg(long = "page-size")]
        page_size_kb: u64,
        #[arg(long = "output-filename")]
        output_filename: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn resolve_candidates(cli: &Cli) -> Result<Vec<PathBuf>> {
    if !cli.image_file.is_empty() {
        return Ok(cli.image_file.clone());
    }
    let pattern = cli
        .image_file_pattern
        .as_ref()
        .ok_or_else(|| Error::Argument("exactly one of --image-file or --image-file-pattern is required".into()))?;

    let mut paths = Vec::new();
    for entry in glob::glob(pattern).map_err(|e| Error::Argument(format!("invalid glob pattern: {e}")))? {
        paths.push(entry.map_err(|e| Error::Argument(format!("glob expansion failed: {e}")))?);
    }
    if paths.is_empty() {
        return Err(Error::Argument(format!("pattern '{pattern}' matched no files")));
    }
    paths.sort();
    Ok(paths)
}

/// Validates `--page-size` (given in KiB) and converts it to bytes.
///
/// Spec §3: `P` is a positive, power-of-two multiple of 1 KiB. `--page-size`
/// feeds the forensic subcommands directly, which never construct an
/// [`raid5ctl::geometry::ArrayGeometry`] (that validation lives there, for
/// `geometryfile`-driven serving); without this check `--page-size 0` would
/// divide by zero computing `total_pages` below instead of failing with the
/// argument error spec §7 requires.
fn page_size_bytes(page_size_kb: u64) -> Result<u64> {
    if page_size_kb == 0 || !page_size_kb.is_power_of_two() {
        return Err(Error::Argument(format!(
            "--page-size {page_size_kb} KiB is not a positive power-of-two number of KiB"
        )));
    }
    Ok(page_size_kb * 1024)
}

fn min_len(paths: &[PathBuf]) -> Result<u64> {
    paths
        .iter()
        .map(std::fs::metadata)
        .map(|m| m.map(|m| m.len()))
        .collect::<std::io::Result<Vec<u64>>>()?
        .into_iter()
        .min()
        .ok_or_else(|| Error::Argument("no candidate images given".into()))
}

fn run(cli: &Cli) -> Result<()> {
    let candidates = resolve_candidates(cli)?;
    let cancel = worker::install_cancel_handler();
    let pool = worker::build_pool(cli.nproc)?;

    match &cli.command {
        Command::Pagesize { array_size } => {
            let path = candidates.first().ok_or_else(|| Error::Argument("no candidate images given".into()))?;
            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_message(format!("searching for stripe-unit size in {}", path.display()));
            let found = pagesize::guess_pagesize(path, *array_size as usize, &pool, &cancel)?;
            pb.finish_and_clear();
            match found {
                Some(bytes) => {
                    if cli.json {
                        println!("{}", json!({"status": "detected", "page_size_kb": bytes / 1024}));
                    } else {
                        println!("{} page size: {} KiB", "detected".green().bold(), bytes / 1024);
                    }
                    Ok(())
                }
                None => {
                    if cli.json {
                        println!("{}", json!({"status": "failed"}));
                    } else {
                        println!("{} no plausible page size found", "failed".red().bold());
                    }
                    Err(Error::Argument("no candidate page size matched".into()))
                }
            }
        }

        Command::Paritycheck { page_size_kb } => {
            if candidates.len() < 3 {
                return Err(Error::Argument(format!(
                    "paritycheck requires at least 3 images, got {}",
                    candidates.len()
                )));
            }
            let page_size = page_size_bytes(*page_size_kb)?;
            let total_pages = min_len(&candidates)? / page_size;
            let pages = range::parse_page_range(&cli.page_range, total_pages)?;

            let pb = indicatif::ProgressBar::new(pages.len() as u64);
            pb.set_message("checking parity");
            let verdict = scanner::test_parity(&candidates, page_size, &pages)?;
            pb.finish_and_clear();

            match verdict {
                scanner::Verdict::Passed => {
                    if cli.json {
                        println!("{}", json!({"status": "passed", "pages_checked": pages.len()}));
                    } else {
                        println!("{} parity holds on all {} pages", "passed".green().bold(), pages.len());
                    }
                    Ok(())
                }
                scanner::Verdict::Failed(failing) => {
                    if cli.json {
                        println!("{}", json!({"status": "failed", "failing_pages": failing}));
                    } else {
                        println!(
                            "{} parity failed on {} of {} pages: {:?}",
                            "FAILED".red().bold(),
                            failing.len(),
                            pages.len(),
                            failing
                        );
                    }
                    Err(Error::ParityMismatch(failing[0]))
                }
            }
        }

        Command::Raidset { array_size, page_size_kb, test_all } => {
            let page_size = page_size_bytes(*page_size_kb)?;
            let total_pages = min_len(&candidates)? / page_size;
            let pages = range::parse_page_range(&cli.page_range, total_pages)?;
            let mode = if *test_all { membership::SearchMode::TestAll } else { membership::SearchMode::FirstMatch };

            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_message(format!("searching {} candidates for a {}-member RAID5 set", candidates.len(), array_size));
            let found = membership::guess_set(&candidates, *array_size as usize, page_size, &pages, mode, &pool, &cancel)?;
            pb.finish_and_clear();

            if found.is_empty() {
                if cli.json {
                    println!("{}", json!({"status": "failed", "sets": []}));
                } else {
                    println!("{} no RAID5 set detected", "failed".red().bold());
                }
                Err(Error::Argument("membership search found no matching set".into()))
            } else {
                if cli.json {
                    let sets: Vec<Vec<String>> = found
                        .iter()
                        .map(|set| set.iter().map(|p| p.display().to_string()).collect())
                        .collect();
                    println!("{}", json!({"status": "found", "sets": sets}));
                } else {
                    println!("{} {} candidate set(s):", "found".green().bold(), found.len());
                    for set in &found {
                        println!("  {}", set.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "));
                    }
                }
                Ok(())
            }
        }

        Command::Order { page_size_kb } => {
            let page_size = page_size_bytes(*page_size_kb)?;
            let total_pages = min_len(&candidates)? / page_size;
            let pages = range::parse_page_range(&cli.page_range, total_pages)?;

            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_message("inferring member order");
            let ordered = order::guess_order(&candidates, page_size, &pages, &pool, &cancel)?;
            pb.finish_and_clear();

            if cli.json {
                let order: Vec<String> = ordered.iter().map(|p| p.display().to_string()).collect();
                println!("{}", json!({"status": "detected", "order": order}));
            } else {
                println!("{} member order:", "detected".green().bold());
                for (i, p) in ordered.iter().enumerate() {
                    println!("  [{i}] {}", p.display());
                }
            }
            Ok(())
        }

        Command::Restore { page_size_kb, output_filename } => {
            let page_size = page_size_bytes(*page_size_kb)?;
            let total_pages = min_len(&candidates)? / page_size;
            let pages = range::parse_page_range(&cli.page_range, total_pages)?;

            let pb = indicatif::ProgressBar::new(pages.len() as u64);
            pb.set_message("restoring image");
            restore::restore(&candidates, page_size, &pages, output_filename, &pool, &cancel)?;
            pb.finish_and_clear();

            if cli.json {
                println!("{}", json!({"status": "restored", "output": output_filename.display().to_string()}));
            } else {
                println!("{} wrote {}", "restored".green().bold(), output_filename.display());
            }
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            std::process::exit(e.exit_code());
        }
    }
}
