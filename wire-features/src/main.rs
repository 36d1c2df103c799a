mod parameters;

use anyhow::Result;
use clap::Parser;
use dct_common::{
    WireIndex, init_tracer,
    metrics::{
        component_info_metric, describe_metrics,
        failures::{self, FailureKind},
        names::FAILURES,
    },
    tracer::TracerOptions,
};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use parameters::{AnalysisParameters, CloseMode};
use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf};
use tracing::{error, info, level_filters::LevelFilter};
use wire_features::{
    RunDriver, driver::DEFAULT_COINCIDENCE_WIRES, loader::open_waveform_file,
    save_to_file::SaveToFileFilter,
};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Text file of comma separated ADC samples, one time step per line
    #[clap(long)]
    file_name: PathBuf,

    /// Number of rows to discard before the first event
    #[clap(long, default_value = "0")]
    skip_rows: usize,

    /// Number of events to process, 0 processes the whole file
    #[clap(long, default_value = "0")]
    number_of_events: usize,

    /// If set, events are processed concurrently in chunks of this many frames
    #[clap(long)]
    parallel_chunk: Option<NonZeroUsize>,

    /// Wires which must all be valid for an event to count as a coincidence
    #[clap(long, value_delimiter = ',', default_values_t = DEFAULT_COINCIDENCE_WIRES)]
    coincidence_wires: Vec<WireIndex>,

    /// If set, the features of every wire of every event are written to this file
    #[clap(long)]
    save_file: Option<PathBuf>,

    /// If set, a Prometheus endpoint is served on this address for the duration of the run
    #[clap(long, env)]
    observability_address: Option<SocketAddr>,

    /// Level used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,

    #[clap(flatten)]
    analysis: AnalysisParameters,

    #[command(subcommand)]
    close_mode: Option<CloseMode>,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let tracer = init_tracer!(TracerOptions {
        default_level: args.log_level
    })?;
    info!("Starting {}", tracer.service_name());

    if let Some(address) = args.observability_address {
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()?;
        info!("Serving metrics on {address}");
    }
    describe_metrics();
    component_info_metric("wire-features");

    let config = args.analysis.to_config(args.close_mode.as_ref());
    let driver = RunDriver::new(config)?
        .with_coincidence_wires(args.coincidence_wires.clone())
        .with_parallel_chunk(args.parallel_chunk);

    let reader = open_waveform_file(&args.file_name, driver.config())?.skip_rows(args.skip_rows)?;
    let limit = match args.number_of_events {
        0 => usize::MAX,
        n => n,
    };
    let run = driver.run(reader.take(limit))?;

    for line in run.summary().to_string().lines() {
        info!("{line}");
    }

    if let Some(save_file) = &args.save_file {
        run.events()
            .iter()
            .save_to_file(save_file)
            .inspect_err(|e| {
                error!("Failed to write {}: {e}", save_file.display());
                counter!(FAILURES, &[failures::get_label(FailureKind::FileWriteFailed)])
                    .increment(1);
            })?;
        info!("Saved wire features to {}", save_file.display());
    }
    Ok(())
}
