use chrono::{DateTime, Utc};
use log::debug;
use rusoto_core::Region;
use rusoto_ec2::Ec2Client;

use crate::descriptor::{
    normalize_instances, normalize_reservations, InstanceRecord, ReservationRecord, Unclassifiable,
};
use crate::ec2_instance_client::{DescribeRunning, Ec2InstanceClient};
use crate::ec2_reservation_client::{DescribeReservations, Ec2ReservationClient};
use crate::error::ReservationCheckError;
use crate::reconcile::{reconcile, ReconciliationResult};
use crate::settings::RunParameters;

/// Everything a single reconciliation run produced. Built fresh each run and
/// discarded afterwards; nothing is carried between invocations.
#[derive(Debug)]
pub struct CheckOutcome {
    pub region: String,
    /// Active reservations that participated in matching.
    pub reservations: Vec<ReservationRecord>,
    /// Reservations in a non-active state, surfaced informationally.
    pub inactive: Vec<ReservationRecord>,
    /// Running instances that participated in matching.
    pub instances: Vec<InstanceRecord>,
    pub unclassifiable: Vec<Unclassifiable>,
    pub result: ReconciliationResult,
}

pub async fn run_check(
    region: Region,
    params: &RunParameters,
) -> Result<CheckOutcome, ReservationCheckError> {
    let region_name = region.name().to_string();
    let client = Ec2Client::new(region);
    run_check_with_client(client, region_name, params, Utc::now()).await
}

/// Fetches both inventories, normalizes them, and reconciles.
///
/// A fetch failure aborts before the engine runs; the engine is never handed
/// a partial inventory.
pub async fn run_check_with_client(
    client: Ec2Client,
    region: String,
    params: &RunParameters,
    now: DateTime<Utc>,
) -> Result<CheckOutcome, ReservationCheckError> {
    let raw_reservations = Ec2ReservationClient::new_with_client(client.clone())
        .describe_all_reservations()
        .await?;
    let raw_instances = Ec2InstanceClient::new_with_client(client)
        .describe_running_instances()
        .await?;
    debug!(
        "Fetched {} reservations and {} instances from {}",
        raw_reservations.len(),
        raw_instances.len(),
        region
    );

    let reservations = normalize_reservations(&raw_reservations);
    let instances = normalize_instances(&raw_instances);

    let mut unclassifiable = reservations.unclassifiable;
    unclassifiable.extend(instances.unclassifiable);
    if !unclassifiable.is_empty() {
        debug!("{} records failed normalization", unclassifiable.len());
    }

    let result = reconcile(
        &reservations.active,
        &instances.running,
        params.unreserved_threshold_days,
        now,
    );

    Ok(CheckOutcome {
        region,
        reservations: reservations.active,
        inactive: reservations.inactive,
        instances: instances.running,
        unclassifiable,
        result,
    })
}
