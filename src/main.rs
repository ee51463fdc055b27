mod checker;
mod descriptor;
mod ec2_instance_client;
mod ec2_reservation_client;
mod error;
mod reconcile;
mod report;
mod ses_email_client;
mod settings;

use anyhow::Context;
use clap::Parser;
use lambda_runtime::{service_fn, LambdaEvent};
use log::{info, warn};
use rusoto_core::Region;
use serde_json::Value;

use crate::checker::run_check;
use crate::report::{render_report, ReportPayload};
use crate::ses_email_client::{SendReport, SesEmailClient};
use crate::settings::{resolve_region, EventSettings, ReportSection, RunParameters};

/// Checks compliance for reserved instance use.
#[derive(Debug, Parser)]
#[command(name = "reservedinstancecheck", version)]
struct Cli {
    /// AWS region to examine
    #[arg(short = 'r', long)]
    region: Option<String>,

    /// Show active reservations
    #[arg(short = 'R', long)]
    reservations: bool,

    /// Show unused reservations
    #[arg(short = 'u', long)]
    unused: bool,

    /// Show instances launched DAYS or more ago that do not have an active
    /// reservation
    #[arg(short = 'U', long, value_name = "DAYS")]
    unreserved: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    simple_logger::init_with_level(log::Level::Info)?;

    // One binary serves both entry points; the runtime API variable is only
    // set inside the Lambda execution environment.
    if std::env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        return lambda_runtime::run(service_fn(report_handler)).await;
    }

    Ok(run_cli(Cli::parse()).await?)
}

/// Assesses instance reservations and produces a report on them.
async fn report_handler(
    event: LambdaEvent<EventSettings>,
) -> Result<Value, lambda_runtime::Error> {
    let settings = event.payload;

    let params = RunParameters::new(settings.unreserved_days)?;
    let region = resolve_region(settings.region.as_deref())?;
    let outcome = run_check(region, &params).await?;
    let payload = ReportPayload::from_outcome(&outcome);

    if !settings.report_on.is_empty() {
        let body = render_report(&outcome, &settings.report_on);
        info!("{}", body);

        if settings.ses_send {
            info!(
                "Emailing report to {:?}",
                settings.ses.destination.to_addresses
            );
            let mailer = SesEmailClient::new(Region::default());
            // Reconciliation already succeeded; a notification failure must
            // not turn the run into a failure.
            if let Err(error) = mailer.send_report(&settings.ses, &body).await {
                warn!("Report email failed: {}", error);
            }
        }
    }

    Ok(serde_json::to_value(payload)?)
}

async fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let mut sections = Vec::new();
    if cli.reservations {
        sections.push(ReportSection::Reservations);
    }
    if cli.unused {
        sections.push(ReportSection::Unused);
    }
    if cli.unreserved.is_some() {
        sections.push(ReportSection::Unreserved);
    }

    let params = RunParameters::new(cli.unreserved.unwrap_or(0))?;
    let region = resolve_region(cli.region.as_deref())?;
    let outcome = run_check(region, &params)
        .await
        .context("reservation check failed")?;

    for section in &sections {
        print!("{}", report::section_text(&outcome, *section));
    }
    if !outcome.unclassifiable.is_empty() {
        print!("{}", report::unclassifiable_table(&outcome));
    }

    Ok(())
}
