use async_trait::async_trait;
use rusoto_ec2::{DescribeInstancesRequest, Ec2, Ec2Client, Filter, Instance};

use crate::error::ReservationCheckError;

pub struct Ec2InstanceClient {
    client: Ec2Client,
}

#[async_trait]
pub trait DescribeRunning {
    /// Fetches every running instance in the region with pagination fully
    /// drained, flattened out of their launch groupings.
    async fn describe_running_instances(&self) -> Result<Vec<Instance>, ReservationCheckError>;
}

#[async_trait]
impl DescribeRunning for Ec2InstanceClient {
    async fn describe_running_instances(&self) -> Result<Vec<Instance>, ReservationCheckError> {
        let mut instances = Vec::<Instance>::new();
        let mut next_token: Option<String> = None;

        loop {
            let request = DescribeInstancesRequest {
                filters: Some(vec![Filter {
                    name: Some("instance-state-name".to_string()),
                    values: Some(vec!["running".to_string()]),
                }]),
                next_token: next_token.clone(),
                ..DescribeInstancesRequest::default()
            };

            let result = self
                .client
                .describe_instances(request)
                .await
                .map_err(ReservationCheckError::DescribeInstancesFailed)?;

            for reservation in result.reservations.unwrap_or_default() {
                instances.extend(reservation.instances.unwrap_or_default());
            }

            next_token = result.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(instances)
    }
}

impl Ec2InstanceClient {
    pub fn new_with_client(client: Ec2Client) -> Self {
        Ec2InstanceClient { client }
    }
}
