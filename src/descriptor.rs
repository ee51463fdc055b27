use chrono::{DateTime, Utc};
use rusoto_ec2::{Instance, ReservedInstances};
use serde::Serialize;
use std::fmt;

use crate::error::ReservationCheckError;

/// Platform assumed when the provider omits the field. EC2 leaves the
/// platform unset for Linux/UNIX instances and reservations.
pub const DEFAULT_PLATFORM: &str = "linux/unix";

/// Grouping key for matching reservations against instances. Exact size
/// match is required; size flexibility within a family is not honored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchKey {
    pub family: String,
    pub size: String,
    pub platform: String,
}

impl MatchKey {
    pub fn instance_type(&self) -> String {
        format!("{}.{}", self.family, self.size)
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{} ({})", self.family, self.size, self.platform)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Regional,
    Zonal(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scope::Regional => write!(f, "regional"),
            Scope::Zonal(zone) => write!(f, "{}", zone),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationState {
    Active,
    Retired,
    PaymentPending,
    Other(String),
}

impl ReservationState {
    fn parse(raw: &str) -> Self {
        match raw {
            "active" => ReservationState::Active,
            "retired" => ReservationState::Retired,
            "payment-pending" => ReservationState::PaymentPending,
            other => ReservationState::Other(other.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        *self == ReservationState::Active
    }
}

impl fmt::Display for ReservationState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReservationState::Active => write!(f, "active"),
            ReservationState::Retired => write!(f, "retired"),
            ReservationState::PaymentPending => write!(f, "payment-pending"),
            ReservationState::Other(state) => write!(f, "{}", state),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReservationRecord {
    pub id: String,
    pub key: MatchKey,
    pub scope: Scope,
    pub count: i64,
    pub state: ReservationState,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    pub id: String,
    pub key: MatchKey,
    pub zone: String,
    pub launch_time: DateTime<Utc>,
}

/// A record that failed normalization. Excluded from matching but always
/// surfaced in the run outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unclassifiable {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct NormalizedReservations {
    pub active: Vec<ReservationRecord>,
    pub inactive: Vec<ReservationRecord>,
    pub unclassifiable: Vec<Unclassifiable>,
}

#[derive(Debug, Default)]
pub struct NormalizedInstances {
    pub running: Vec<InstanceRecord>,
    pub unclassifiable: Vec<Unclassifiable>,
}

fn malformed(id: &str, reason: &str) -> ReservationCheckError {
    ReservationCheckError::MalformedRecord {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn split_instance_type(instance_type: &str) -> Result<(String, String), String> {
    match instance_type.split_once('.') {
        Some((family, size)) if !family.is_empty() && !size.is_empty() => {
            Ok((family.to_string(), size.to_string()))
        }
        _ => Err(format!("unrecognized instance type: {:?}", instance_type)),
    }
}

pub fn normalize_platform(raw: Option<&str>) -> String {
    let platform = raw.unwrap_or("").trim().to_ascii_lowercase();
    // Reservation product descriptions carry a VPC suffix, e.g.
    // "Linux/UNIX (Amazon VPC)".
    let platform = platform.trim_end_matches("(amazon vpc)").trim().to_string();
    if platform.is_empty() {
        DEFAULT_PLATFORM.to_string()
    } else {
        platform
    }
}

pub fn normalize_reservation(
    raw: &ReservedInstances,
) -> Result<ReservationRecord, ReservationCheckError> {
    let id = raw
        .reserved_instances_id
        .clone()
        .unwrap_or_else(|| "<unknown>".to_string());

    let instance_type = raw
        .instance_type
        .as_deref()
        .ok_or_else(|| malformed(&id, "missing instance type"))?;
    let (family, size) =
        split_instance_type(instance_type).map_err(|reason| malformed(&id, &reason))?;

    let scope = match raw.availability_zone.as_deref() {
        Some(zone) if !zone.is_empty() => Scope::Zonal(zone.to_string()),
        _ => Scope::Regional,
    };

    Ok(ReservationRecord {
        key: MatchKey {
            family,
            size,
            platform: normalize_platform(raw.product_description.as_deref()),
        },
        scope,
        count: raw.instance_count.unwrap_or(0),
        state: ReservationState::parse(raw.state.as_deref().unwrap_or("")),
        end: raw
            .end
            .as_deref()
            .and_then(|end| DateTime::parse_from_rfc3339(end).ok())
            .map(|end| end.with_timezone(&Utc)),
        id,
    })
}

/// Returns `Ok(None)` for instances that are not running; they do not
/// participate in matching and are not an error.
pub fn normalize_instance(
    raw: &Instance,
) -> Result<Option<InstanceRecord>, ReservationCheckError> {
    let state = raw
        .state
        .as_ref()
        .and_then(|state| state.name.as_deref())
        .unwrap_or("");
    if state != "running" {
        return Ok(None);
    }

    let id = raw
        .instance_id
        .clone()
        .unwrap_or_else(|| "<unknown>".to_string());

    let instance_type = raw
        .instance_type
        .as_deref()
        .ok_or_else(|| malformed(&id, "missing instance type"))?;
    let (family, size) =
        split_instance_type(instance_type).map_err(|reason| malformed(&id, &reason))?;

    let zone = raw
        .placement
        .as_ref()
        .and_then(|placement| placement.availability_zone.clone())
        .filter(|zone| !zone.is_empty())
        .ok_or_else(|| malformed(&id, "missing availability zone"))?;

    let launch_time = raw
        .launch_time
        .as_deref()
        .and_then(|launch| DateTime::parse_from_rfc3339(launch).ok())
        .map(|launch| launch.with_timezone(&Utc))
        .ok_or_else(|| malformed(&id, "missing or unparseable launch time"))?;

    Ok(Some(InstanceRecord {
        key: MatchKey {
            family,
            size,
            platform: normalize_platform(raw.platform.as_deref()),
        },
        zone,
        launch_time,
        id,
    }))
}

pub fn normalize_reservations(raw: &[ReservedInstances]) -> NormalizedReservations {
    let mut normalized = NormalizedReservations::default();
    for record in raw {
        match normalize_reservation(record) {
            Ok(reservation) if reservation.state.is_active() => {
                normalized.active.push(reservation)
            }
            Ok(reservation) => normalized.inactive.push(reservation),
            Err(ReservationCheckError::MalformedRecord { id, reason }) => {
                normalized.unclassifiable.push(Unclassifiable { id, reason })
            }
            Err(_) => unreachable!("normalization only raises malformed-record errors"),
        }
    }
    normalized
}

pub fn normalize_instances(raw: &[Instance]) -> NormalizedInstances {
    let mut normalized = NormalizedInstances::default();
    for record in raw {
        match normalize_instance(record) {
            Ok(Some(instance)) => normalized.running.push(instance),
            Ok(None) => {}
            Err(ReservationCheckError::MalformedRecord { id, reason }) => {
                normalized.unclassifiable.push(Unclassifiable { id, reason })
            }
            Err(_) => unreachable!("normalization only raises malformed-record errors"),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusoto_ec2::{InstanceState, Placement};

    fn raw_reservation(id: &str, instance_type: &str) -> ReservedInstances {
        ReservedInstances {
            reserved_instances_id: Some(id.to_string()),
            instance_type: Some(instance_type.to_string()),
            availability_zone: Some("us-east-1a".to_string()),
            instance_count: Some(1),
            state: Some("active".to_string()),
            end: Some("2026-01-01T00:00:00.000Z".to_string()),
            ..ReservedInstances::default()
        }
    }

    fn raw_instance(id: &str, instance_type: &str) -> Instance {
        Instance {
            instance_id: Some(id.to_string()),
            instance_type: Some(instance_type.to_string()),
            launch_time: Some("2025-06-01T12:00:00.000Z".to_string()),
            placement: Some(Placement {
                availability_zone: Some("us-east-1a".to_string()),
                ..Placement::default()
            }),
            state: Some(InstanceState {
                code: Some(16),
                name: Some("running".to_string()),
            }),
            ..Instance::default()
        }
    }

    #[test]
    fn test_normalize_platform_defaults() {
        assert_eq!(normalize_platform(None), "linux/unix");
        assert_eq!(normalize_platform(Some("")), "linux/unix");
        assert_eq!(normalize_platform(Some("  ")), "linux/unix");
        assert_eq!(normalize_platform(Some("Windows")), "windows");
        assert_eq!(normalize_platform(Some("Linux/UNIX (Amazon VPC)")), "linux/unix");
    }

    #[test]
    fn test_normalize_reservation_zonal() {
        let record = normalize_reservation(&raw_reservation("r-1", "m5.large")).unwrap();
        assert_eq!(
            record.key,
            MatchKey {
                family: "m5".to_string(),
                size: "large".to_string(),
                platform: "linux/unix".to_string(),
            }
        );
        assert_eq!(record.scope, Scope::Zonal("us-east-1a".to_string()));
        assert_eq!(record.count, 1);
        assert!(record.state.is_active());
        assert!(record.end.is_some());
    }

    #[test]
    fn test_normalize_reservation_regional() {
        let mut raw = raw_reservation("r-1", "m5.large");
        raw.availability_zone = None;
        let record = normalize_reservation(&raw).unwrap();
        assert_eq!(record.scope, Scope::Regional);
    }

    #[test]
    fn test_normalize_reservation_unparseable_type() {
        let result = normalize_reservation(&raw_reservation("r-1", "metal"));
        assert_eq!(
            result,
            Err(ReservationCheckError::MalformedRecord {
                id: "r-1".to_string(),
                reason: "unrecognized instance type: \"metal\"".to_string(),
            })
        );
    }

    #[test]
    fn test_normalize_instance() {
        let record = normalize_instance(&raw_instance("i-1", "m5.large"))
            .unwrap()
            .unwrap();
        assert_eq!(record.zone, "us-east-1a");
        assert_eq!(record.key.platform, "linux/unix");
    }

    #[test]
    fn test_normalize_instance_skips_non_running() {
        let mut raw = raw_instance("i-1", "m5.large");
        raw.state = Some(InstanceState {
            code: Some(80),
            name: Some("stopped".to_string()),
        });
        assert_eq!(normalize_instance(&raw).unwrap(), None);
    }

    #[test]
    fn test_normalize_instance_missing_launch_time() {
        let mut raw = raw_instance("i-1", "m5.large");
        raw.launch_time = None;
        assert!(normalize_instance(&raw).is_err());
    }

    #[test]
    fn test_normalize_reservations_partitions_by_state() {
        let mut retired = raw_reservation("r-2", "m5.large");
        retired.state = Some("retired".to_string());
        let raw = vec![
            raw_reservation("r-1", "m5.large"),
            retired,
            raw_reservation("r-3", "badtype"),
        ];

        let normalized = normalize_reservations(&raw);
        assert_eq!(normalized.active.len(), 1);
        assert_eq!(normalized.inactive.len(), 1);
        assert_eq!(normalized.inactive[0].state, ReservationState::Retired);
        assert_eq!(normalized.unclassifiable.len(), 1);
        assert_eq!(normalized.unclassifiable[0].id, "r-3");
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let raw = raw_instance("i-1", "m5.large");
        let first = normalize_instance(&raw).unwrap();
        let second = normalize_instance(&raw).unwrap();
        assert_eq!(first, second);
    }
}
