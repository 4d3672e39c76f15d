use std::{path::PathBuf, process::ExitCode};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wikipersist::{
    api::HttpApi,
    config::{start_of_day, Config},
    export::{to_csv, to_xlsx, ExportContext},
    fetcher::fetch_revisions,
    filter::Selection,
    page::PageRef,
    persistency::compute_persistency,
    report::{
        daily_edit_counts, display_name, overview, render_summary, top_editors, SummaryHeader,
    },
};

const EXIT_NO_REVISIONS: u8 = 3;
const EXIT_FILTERED_OUT: u8 = 4;

#[derive(Debug, clap::Parser)]
#[command(version, about = "Measure how long edits to a Wikipedia page persisted")]
struct CommandLine {
    /// JSON config file; defaults to the built-in Project Vox configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Label of a configured page, e.g. "Anne Conway (English)"
    #[arg(long, conflicts_with_all = ["url", "title"])]
    page: Option<String>,
    /// Page URL of the form https://<language>.wikipedia.org/wiki/<title>
    #[arg(long, conflicts_with = "title")]
    url: Option<String>,
    /// Page title, together with --language
    #[arg(long, requires = "language")]
    title: Option<String>,
    #[arg(long, requires = "title")]
    language: Option<String>,
    /// Only consider revisions from this day on (UTC); defaults to the configured start date
    #[arg(long)]
    start: Option<NaiveDate>,
    /// Include all editors instead of only the configured allow-list
    #[arg(long)]
    all_editors: bool,
    /// Print the number of edits per day
    #[arg(long)]
    daily: bool,
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long)]
    xlsx: Option<PathBuf>,
    /// Write the paginated text summary to this file
    #[arg(long)]
    summary: Option<PathBuf>,
    /// List the configured pages and exit
    #[arg(long)]
    list_pages: bool,
}

fn resolve_page(args: &CommandLine, config: &Config) -> Result<(PageRef, String)> {
    if let Some(label) = &args.page {
        let entry = config
            .page(label)
            .with_context(|| format!("no configured page labelled {label:?}"))?;
        return Ok((entry.page_ref(), entry.label.clone()));
    }
    if let Some(url) = &args.url {
        let page = PageRef::from_url(url)
            .with_context(|| format!("{url:?} is not a Wikipedia page URL"))?;
        return Ok((page, url.clone()));
    }
    if let (Some(title), Some(language)) = (&args.title, &args.language) {
        let page = PageRef::new(title.clone(), language.clone());
        let label = page.to_string();
        return Ok((page, label));
    }
    bail!("select a page with --page, --url or --title/--language (see --list-pages)")
}

fn main() -> Result<ExitCode> {
    let args = CommandLine::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if args.list_pages {
        for entry in &config.pages {
            println!("{}\t{}\t{}", entry.label, entry.language, entry.title);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let (page, page_label) = resolve_page(&args, &config)?;
    let start_date = args.start.unwrap_or(config.default_start);
    let start = start_of_day(start_date);

    let mut api = HttpApi::new(&config.api);
    let fetched = match fetch_revisions(&mut api, &page, Some(start)) {
        Ok(revisions) => revisions,
        Err(incomplete) if !incomplete.revisions.is_empty() => {
            tracing::warn!(
                message = "continuing with an incomplete revision history",
                error = %incomplete.source,
                revisions = incomplete.revisions.len()
            );
            incomplete.revisions
        }
        Err(incomplete) => {
            return Err(incomplete).context(format!("failed to fetch revisions of {page}"))
        }
    };

    let revisions = match config.revision_filter(start, args.all_editors).select(&fetched) {
        Selection::Revisions(revisions) => revisions,
        Selection::NoRevisions => {
            eprintln!("No revisions found for {page}.");
            return Ok(ExitCode::from(EXIT_NO_REVISIONS));
        }
        Selection::FilteredOut { fetched } => {
            eprintln!("None of the {fetched} fetched revisions match the date/editor filters.");
            return Ok(ExitCode::from(EXIT_FILTERED_OUT));
        }
    };

    let records = compute_persistency(&revisions);

    if let Some(overview) = overview(&records) {
        println!("Page: {page}");
        println!("Editors: {}", if args.all_editors { "all" } else { "allow-list only" });
        println!("Total edits (filtered): {}", overview.total_edits);
        println!("Distinct editors: {}", overview.distinct_editors);
        println!(
            "Date range: {} -> {}",
            overview.first_edit.date_naive(),
            overview.last_edit.date_naive()
        );
    }
    println!();
    println!("Top editors by mean persistency (hours):");
    for stats in top_editors(&records, config.top_editors) {
        println!(
            "  {:<30} {:>10.2} h  ({} edits)",
            display_name(&stats.name),
            stats.mean_persistency_hours,
            stats.edits
        );
    }

    if args.daily {
        println!();
        println!("Edits per day:");
        for (day, count) in daily_edit_counts(&records) {
            println!("  {day}  {count}");
        }
    }

    let context = ExportContext {
        page_label: &page_label,
        language: &page.language,
    };
    if let Some(path) = &args.csv {
        std::fs::write(path, to_csv(&context, &records)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(message = "wrote CSV export", path = %path.display());
    }
    if let Some(path) = &args.xlsx {
        std::fs::write(path, to_xlsx(&context, &records)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(message = "wrote XLSX export", path = %path.display());
    }
    if let Some(path) = &args.summary {
        let header = SummaryHeader {
            page_label: &page_label,
            language: &page.language,
            start: start_date,
            generated_at: Utc::now(),
        };
        std::fs::write(path, render_summary(&header, &records, config.top_editors))
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(message = "wrote summary report", path = %path.display());
    }

    Ok(ExitCode::SUCCESS)
}
