//! xopp-merge CLI tool
//!
//! Merges every Xournal++ notebook in a directory into one notebook.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};

use xopp_merge::{merge_notebooks, Error, MergeOptions};

/// xopp-merge - Merge Xournal++ notebooks and their PDF backgrounds
#[derive(Parser)]
#[command(name = "xopp-merge")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge every notebook in the current directory
    xopp-merge

    # Merge lecture notes into a chosen directory
    xopp-merge lectures/ -o lectures/merged

    # Show per-document progress
    xopp-merge -v lectures/")]
struct Cli {
    /// Directory containing the notebook archives, merged in natural order
    #[arg(default_value = ".")]
    input_dir: PathBuf,

    /// Directory receiving the merged notebook and merged PDF
    #[arg(short, long, default_value = "output-xopp-merger")]
    output_dir: PathBuf,

    /// File name of the merged notebook
    #[arg(long, default_value = "merged_output.xopp")]
    archive_name: String,

    /// File name of the merged PDF background
    #[arg(long, default_value = "merged_background.pdf")]
    pdf_name: String,

    /// Extension of the input notebooks
    #[arg(long, default_value = "xopp")]
    extension: String,

    /// Log every document as it is merged
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }

    fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            archive_name: self.archive_name.clone(),
            pdf_name: self.pdf_name.clone(),
            extension: self.extension.trim_start_matches('.').to_string(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the flags
    let default_filter = format!("xopp_merge={}", cli.log_level().as_str());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let options = cli.merge_options();

    let report = match merge_notebooks(&options) {
        Ok(report) => report,
        Err(e) if !e.is_fatal() => {
            warn!("{}", e);
            return Ok(());
        }
        Err(e @ Error::MissingBackground { .. }) => {
            return Err(e).context("Merge aborted, no output was written");
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Failed to merge notebooks from {}", options.input_dir.display())
            });
        }
    };

    info!(
        "Merged {} notebooks ({} background pages)",
        report.inputs.len(),
        report.total_pdf_pages()
    );
    if let Some(pdf) = &report.merged_pdf {
        info!("Background: {}", pdf.display());
    }
    info!("Done: {}", report.archive.display());

    Ok(())
}
