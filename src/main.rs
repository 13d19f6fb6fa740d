use anyhow::{bail, Context};
use clap::Parser;
use rfhydrate::sections::{Preset, DEFAULT_SERVICE_DOMAIN};
use rfhydrate::{ContentFetcher, Hydrator, MicroCmsFetcher, Outcome, Page, SourceConfig, StaticFetcher};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Hydrate a static HTML page with content from microCMS.
#[derive(Parser, Debug)]
#[command(name = "rfhydrate", version, about)]
struct Cli {
    /// HTML page to hydrate
    page: PathBuf,

    /// Section to run (toppage, recruitment, cost-limits); repeatable, defaults to all
    #[arg(short, long = "section")]
    sections: Vec<Preset>,

    /// microCMS service domain
    #[arg(long, default_value = DEFAULT_SERVICE_DOMAIN)]
    service_domain: String,

    /// microCMS API key
    #[arg(long, env = "MICROCMS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the API origin (e.g. a caching proxy)
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in milliseconds (no timeout by default)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Read `{endpoint}.json` dumps from this directory instead of the network
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Write the hydrated page here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the SHA-256 of the hydrated page to stderr
    #[arg(long)]
    digest: bool,

    /// Write the section reports as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let fetcher: Box<dyn ContentFetcher> = match &cli.content_dir {
        Some(dir) => Box::new(
            StaticFetcher::from_dir(dir)
                .with_context(|| format!("failed to read content dumps from {}", dir.display()))?,
        ),
        None => Box::new(MicroCmsFetcher::new()?),
    };

    // Offline dumps need no key; the source still validates one.
    let api_key = match (&cli.api_key, &cli.content_dir) {
        (Some(key), _) => key.clone(),
        (None, Some(_)) => "offline".to_string(),
        (None, None) => bail!("an API key is required (--api-key or MICROCMS_API_KEY)"),
    };

    let presets = if cli.sections.is_empty() {
        Preset::ALL.to_vec()
    } else {
        cli.sections.clone()
    };

    let mut hydrator = Hydrator::new(fetcher);
    for preset in presets {
        let mut source = SourceConfig::new(&cli.service_domain, preset.endpoint(), &api_key);
        source.base_url = cli.base_url.clone();
        source.timeout_ms = cli.timeout_ms;
        source.validate()?;
        hydrator.add_section(preset.section(source));
    }

    let mut page = Page::from_path(&cli.page)
        .with_context(|| format!("failed to read page {}", cli.page.display()))?;

    let mut reports = Vec::new();
    for result in hydrator.run_all(&mut page) {
        let report = result?;
        match &report.outcome {
            Outcome::Hydrated => log::info!(
                "{}: hydrated {} card(s), {} item(s) skipped",
                report.section,
                report.cards,
                report.skipped_items
            ),
            other => log::warn!("{}: {:?}", report.section, other),
        }
        reports.push(report);
    }

    let html = page.html();
    match &cli.output {
        Some(path) => std::fs::write(path, &html)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", html),
    }
    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }
    if cli.digest {
        eprintln!("{}", page.digest());
    }
    Ok(())
}
