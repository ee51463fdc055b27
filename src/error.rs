use std::error::Error;

use rusoto_core::RusotoError;
use rusoto_ec2::{DescribeInstancesError, DescribeReservedInstancesError};
use rusoto_ses::SendEmailError;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};

#[derive(Debug, PartialEq)]
pub enum ReservationCheckError {
    DescribeReservationsFailed(RusotoError<DescribeReservedInstancesError>),
    DescribeInstancesFailed(RusotoError<DescribeInstancesError>),
    SendReportFailed(RusotoError<SendEmailError>),
    MalformedRecord { id: String, reason: String },
    InvalidParameter(String),
}

impl Display for ReservationCheckError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            ReservationCheckError::DescribeReservationsFailed(ref error) => {
                write!(f, "Failed to describe reserved instances: {}", error)
            }
            ReservationCheckError::DescribeInstancesFailed(ref error) => {
                write!(f, "Failed to describe instances: {}", error)
            }
            ReservationCheckError::SendReportFailed(ref error) => {
                write!(f, "Failed to send report email: {}", error)
            }
            ReservationCheckError::MalformedRecord { ref id, ref reason } => {
                write!(f, "Malformed record {}: {}", id, reason)
            }
            ReservationCheckError::InvalidParameter(ref reason) => {
                write!(f, "Invalid parameter: {}", reason)
            }
        }
    }
}

impl Error for ReservationCheckError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            ReservationCheckError::DescribeReservationsFailed(ref error) => Some(error),
            ReservationCheckError::DescribeInstancesFailed(ref error) => Some(error),
            ReservationCheckError::SendReportFailed(ref error) => Some(error),
            _ => None,
        }
    }
}

impl From<RusotoError<DescribeReservedInstancesError>> for ReservationCheckError {
    fn from(e: RusotoError<DescribeReservedInstancesError>) -> ReservationCheckError {
        ReservationCheckError::DescribeReservationsFailed(e)
    }
}

impl From<RusotoError<DescribeInstancesError>> for ReservationCheckError {
    fn from(e: RusotoError<DescribeInstancesError>) -> ReservationCheckError {
        ReservationCheckError::DescribeInstancesFailed(e)
    }
}

impl From<RusotoError<SendEmailError>> for ReservationCheckError {
    fn from(e: RusotoError<SendEmailError>) -> ReservationCheckError {
        ReservationCheckError::SendReportFailed(e)
    }
}
