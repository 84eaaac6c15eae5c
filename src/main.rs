use anyhow::Context;
use clap::Parser;
use siem_rg_report::config::{check_output_dir, Args};
use siem_rg_report::logging::init_tracing;
use siem_rg_report::report::render_table;
use siem_rg_report::{run_report, LaceworkClient, ReportError, XlsxReportWriter};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.logging_config());

    info!("Starting SIEM resource group report v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args).await {
        e.log();
        return Err(e).context("Resource group report failed");
    }

    Ok(())
}

async fn run(args: &Args) -> Result<(), ReportError> {
    let config = args.report_config()?;
    let credentials = args.credentials()?;
    check_output_dir(&args.output_dir)?;

    let client = Arc::new(LaceworkClient::connect(&credentials).await?);
    let sink = XlsxReportWriter::new(&args.output_dir);

    let run = run_report(client, &config, &sink).await?;

    print!("{}", render_table(&run.rows));
    println!("Report written to {}", run.report_path.display());
    Ok(())
}
