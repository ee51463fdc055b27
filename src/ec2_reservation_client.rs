use async_trait::async_trait;
use rusoto_ec2::{DescribeReservedInstancesRequest, Ec2, Ec2Client, ReservedInstances};

use crate::error::ReservationCheckError;

pub struct Ec2ReservationClient {
    client: Ec2Client,
}

#[async_trait]
pub trait DescribeReservations {
    /// Fetches every instance reservation in the region, raw and unfiltered.
    /// State partitioning happens during normalization.
    async fn describe_all_reservations(
        &self,
    ) -> Result<Vec<ReservedInstances>, ReservationCheckError>;
}

#[async_trait]
impl DescribeReservations for Ec2ReservationClient {
    async fn describe_all_reservations(
        &self,
    ) -> Result<Vec<ReservedInstances>, ReservationCheckError> {
        let request = DescribeReservedInstancesRequest::default();

        let result = self
            .client
            .describe_reserved_instances(request)
            .await
            .map_err(ReservationCheckError::DescribeReservationsFailed)?;

        Ok(result.reserved_instances.unwrap_or_default())
    }
}

impl Ec2ReservationClient {
    pub fn new_with_client(client: Ec2Client) -> Self {
        Ec2ReservationClient { client }
    }
}
