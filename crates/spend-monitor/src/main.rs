mod bootstrap;

use std::process::ExitCode;

use anyhow::Result;
use spend_core::formatting::{format_count, format_currency};
use spend_core::settings::Settings;
use spend_core::SpendError;
use spend_data::fetcher::{Fetcher, HttpTransport};
use spend_data::sources::SourceRegistry;
use spend_runtime::analyzer::Analyzer;
use spend_runtime::collector::{CollectionOutcome, Collector};
use spend_runtime::report::SvgChartRenderer;

/// Exit status when the analyzer finds no processed snapshots.
const EXIT_MISSING_DATA: u8 = 2;

fn main() -> ExitCode {
    let settings = Settings::load();

    if let Err(e) = bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref()) {
        eprintln!("Failed to initialise logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<SpendError>() {
            Some(err) if err.is_missing_prerequisite() => {
                tracing::error!("{}", err);
                eprintln!("No processed data available. Run `spend-monitor collect` first.");
                ExitCode::from(EXIT_MISSING_DATA)
            }
            _ => {
                tracing::error!("{:#}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn run(settings: &Settings) -> Result<()> {
    tracing::info!("Spend Monitor v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Mode: {}, data directory: {}",
        settings.mode,
        settings.data_dir.display()
    );

    bootstrap::ensure_directories(&settings.data_dir)?;

    if settings.runs_collector() {
        collect(settings)?;
    }
    if settings.runs_analyzer() {
        analyze(settings)?;
    }
    Ok(())
}

fn collect(settings: &Settings) -> Result<()> {
    let registry = match &settings.sources {
        Some(path) => SourceRegistry::from_json_file(path)?,
        None => SourceRegistry::builtin(),
    };
    let transport = HttpTransport::new(settings.timeout())?;
    let fetcher = Fetcher::new(transport, &settings.data_dir, settings.request_delay());

    let outcome = Collector::new(registry, fetcher, &settings.data_dir).run()?;
    print_collection(&outcome);
    Ok(())
}

fn analyze(settings: &Settings) -> Result<()> {
    let mut analyzer = Analyzer::new(&settings.data_dir, settings.analysis_dir())
        .with_source_type(settings.source_type.clone());
    if !settings.no_charts {
        analyzer = analyzer.with_renderer(Box::new(SvgChartRenderer::default()));
    }

    let outcome = analyzer.run()?;
    if let Some(err) = &outcome.chart_error {
        eprintln!("Charts were not generated: {err}");
    }

    println!("{}", outcome.report);
    println!();
    println!("Report saved to {}", outcome.report_file.display());
    println!("Analysis saved to {}", outcome.analysis_file.display());
    Ok(())
}

fn print_collection(outcome: &CollectionOutcome) {
    println!();
    println!("Collection summary");
    println!("{}", "=".repeat(18));
    println!("Datasets collected: {}", outcome.datasets.len());
    println!("Failed downloads:   {}", outcome.failures.len());
    for failure in &outcome.failures {
        println!("  - {failure}");
    }
    if !outcome.empty.is_empty() {
        println!("Empty datasets:     {}", outcome.empty.join(", "));
    }

    let Some(aggregation) = &outcome.aggregation else {
        println!("No data collected.");
        return;
    };
    let summary = &aggregation.summary;
    println!("Total records:      {}", format_count(summary.total_records));
    println!(
        "Total spending:     {}",
        format_currency(summary.total_amount)
    );
    if let Some(average) = summary.average_payment {
        println!("Average payment:    {}", format_currency(average));
    }

    if !aggregation.categories.is_empty() {
        println!();
        println!("Top categories:");
        for category in aggregation.categories.iter().take(5) {
            println!("  {:<28} {}", category.key, format_currency(category.sum));
        }
    }
    if let Some(path) = &outcome.summary_file {
        println!();
        println!("Summary saved to {}", path.display());
    }
}
