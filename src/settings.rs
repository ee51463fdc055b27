use std::str::FromStr;

use rusoto_core::Region;
use serde::Deserialize;

use crate::error::ReservationCheckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSection {
    Reservations,
    Unused,
    Unreserved,
}

impl ReportSection {
    pub fn name(self) -> &'static str {
        match self {
            ReportSection::Reservations => "reservations",
            ReportSection::Unused => "unused",
            ReportSection::Unreserved => "unreserved",
        }
    }
}

impl FromStr for ReportSection {
    type Err = ReservationCheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reservations" => Ok(ReportSection::Reservations),
            "unused" => Ok(ReportSection::Unused),
            "unreserved" => Ok(ReportSection::Unreserved),
            other => Err(ReservationCheckError::InvalidParameter(format!(
                "unknown report section: {}",
                other
            ))),
        }
    }
}

/// Per-run invocation parameters, validated before any matching begins.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    pub unreserved_threshold_days: i64,
}

impl RunParameters {
    pub fn new(unreserved_threshold_days: i64) -> Result<Self, ReservationCheckError> {
        if unreserved_threshold_days < 0 {
            return Err(ReservationCheckError::InvalidParameter(format!(
                "unreserved threshold must be non-negative, got {}",
                unreserved_threshold_days
            )));
        }
        Ok(RunParameters {
            unreserved_threshold_days,
        })
    }
}

/// Resolves an explicit region name, or infers one from the execution
/// environment when absent.
pub fn resolve_region(region: Option<&str>) -> Result<Region, ReservationCheckError> {
    match region {
        Some(name) => Region::from_str(name).map_err(|_| {
            ReservationCheckError::InvalidParameter(format!("unknown region: {}", name))
        }),
        None => Ok(Region::default()),
    }
}

/// Lambda invocation settings. Fields missing from the event payload fall
/// back to the defaults below, so a partial event overrides selectively.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    #[serde(rename = "Region")]
    pub region: Option<String>,
    #[serde(rename = "ReportOn")]
    pub report_on: Vec<ReportSection>,
    #[serde(rename = "UnreservedDays")]
    pub unreserved_days: i64,
    #[serde(rename = "SES_Send")]
    pub ses_send: bool,
    #[serde(rename = "SES")]
    pub ses: SesSettings,
}

impl Default for EventSettings {
    fn default() -> Self {
        EventSettings {
            region: None,
            report_on: vec![ReportSection::Unused, ReportSection::Unreserved],
            unreserved_days: 90,
            ses_send: true,
            ses: SesSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SesSettings {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Destination")]
    pub destination: SesDestination,
    #[serde(rename = "Subject")]
    pub subject: String,
}

impl Default for SesSettings {
    fn default() -> Self {
        SesSettings {
            source: "no-reply@your.ses.domain.com".to_string(),
            destination: SesDestination::default(),
            subject: "EC2 Instance Reservation Report".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SesDestination {
    #[serde(rename = "ToAddresses")]
    pub to_addresses: Vec<String>,
}

impl Default for SesDestination {
    fn default() -> Self {
        SesDestination {
            to_addresses: vec!["awsops@your.domain.com".to_string()],
        }
    }
}
