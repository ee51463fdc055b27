use std::collections::BTreeMap;

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::checker::CheckOutcome;
use crate::descriptor::Unclassifiable;
use crate::settings::ReportSection;

#[derive(Tabled)]
struct ReservationRow {
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "InstanceType")]
    instance_type: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "InstanceCount")]
    count: i64,
    #[tabled(rename = "End")]
    end: String,
}

#[derive(Tabled)]
struct UnusedRow {
    #[tabled(rename = "ReservedInstancesId")]
    id: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "InstanceType")]
    instance_type: String,
    #[tabled(rename = "UnusedCount")]
    count: i64,
}

#[derive(Tabled)]
struct UnreservedRow {
    #[tabled(rename = "AvailabilityZone")]
    zone: String,
    #[tabled(rename = "InstanceType")]
    instance_type: String,
    #[tabled(rename = "InstanceCount")]
    count: i64,
}

#[derive(Tabled)]
struct UnclassifiableRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

fn titled<R: Tabled>(title: &str, rows: Vec<R>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::ascii());
    format!("\n{}\n{}\n", title, table)
}

pub fn reservations_table(outcome: &CheckOutcome) -> String {
    let mut rows: Vec<ReservationRow> = outcome
        .reservations
        .iter()
        .map(|reservation| ReservationRow {
            scope: reservation.scope.to_string(),
            instance_type: reservation.key.instance_type(),
            platform: reservation.key.platform.clone(),
            count: reservation.count,
            end: reservation
                .end
                .map(|end| end.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        })
        .collect();
    rows.sort_by(|a, b| {
        a.scope
            .cmp(&b.scope)
            .then_with(|| a.instance_type.cmp(&b.instance_type))
    });
    titled(&format!("Reservations ({})", outcome.region), rows)
}

pub fn unused_table(outcome: &CheckOutcome) -> String {
    let by_id: BTreeMap<&str, _> = outcome
        .reservations
        .iter()
        .map(|reservation| (reservation.id.as_str(), reservation))
        .collect();

    let mut rows: Vec<UnusedRow> = outcome
        .result
        .unused
        .iter()
        .map(|(id, count)| {
            let (scope, instance_type) = by_id
                .get(id.as_str())
                .map(|reservation| {
                    (
                        reservation.scope.to_string(),
                        reservation.key.to_string(),
                    )
                })
                .unwrap_or_default();
            UnusedRow {
                id: id.clone(),
                scope,
                instance_type,
                count: *count,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.id.cmp(&b.id)));
    titled(&format!("Unused ({})", outcome.region), rows)
}

pub fn unreserved_table(outcome: &CheckOutcome) -> String {
    let by_id: BTreeMap<&str, _> = outcome
        .instances
        .iter()
        .map(|instance| (instance.id.as_str(), instance))
        .collect();

    let mut grouping: BTreeMap<(String, String), i64> = BTreeMap::new();
    for id in &outcome.result.unreserved {
        if let Some(instance) = by_id.get(id.as_str()) {
            let group = (instance.zone.clone(), instance.key.to_string());
            *grouping.entry(group).or_insert(0) += 1;
        }
    }

    let mut rows: Vec<UnreservedRow> = grouping
        .into_iter()
        .map(|((zone, instance_type), count)| UnreservedRow {
            zone,
            instance_type,
            count,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.zone.cmp(&b.zone))
            .then_with(|| a.instance_type.cmp(&b.instance_type))
    });
    titled(&format!("Unreserved ({})", outcome.region), rows)
}

pub fn unclassifiable_table(outcome: &CheckOutcome) -> String {
    let rows: Vec<UnclassifiableRow> = outcome
        .unclassifiable
        .iter()
        .map(|record| UnclassifiableRow {
            id: record.id.clone(),
            reason: record.reason.clone(),
        })
        .collect();
    titled("Unclassifiable records", rows)
}

pub fn section_text(outcome: &CheckOutcome, section: ReportSection) -> String {
    match section {
        ReportSection::Reservations => reservations_table(outcome),
        ReportSection::Unused => unused_table(outcome),
        ReportSection::Unreserved => unreserved_table(outcome),
    }
}

/// Renders the full text report: the mail body, and what the Lambda handler
/// logs. Formatting only; every decision was made by the engine.
pub fn render_report(outcome: &CheckOutcome, sections: &[ReportSection]) -> String {
    let mut report = String::new();
    report.push_str("###############################\n");
    report.push_str("# Instance Reservation Report #\n");
    report.push_str("###############################\n");

    for section in sections {
        let banner = ":".repeat(4 + section.name().len());
        report.push_str(&format!(
            "\n{}\n: {} :\n{}\n",
            banner,
            section.name(),
            banner
        ));
        report.push_str(&section_text(outcome, *section));
    }

    if !outcome.unclassifiable.is_empty() {
        report.push_str(&unclassifiable_table(outcome));
    }

    report
}

/// Structured payload returned from a handler invocation.
#[derive(Debug, Serialize)]
pub struct ReportPayload {
    pub region: String,
    pub in_use: BTreeMap<String, i64>,
    pub unused: BTreeMap<String, i64>,
    pub unreserved: Vec<String>,
    pub inactive: Vec<InactiveReservation>,
    pub unclassifiable: Vec<Unclassifiable>,
}

#[derive(Debug, Serialize)]
pub struct InactiveReservation {
    pub id: String,
    pub state: String,
}

impl ReportPayload {
    pub fn from_outcome(outcome: &CheckOutcome) -> Self {
        ReportPayload {
            region: outcome.region.clone(),
            in_use: outcome.result.in_use.clone(),
            unused: outcome.result.unused.clone(),
            unreserved: outcome.result.unreserved.clone(),
            inactive: outcome
                .inactive
                .iter()
                .map(|reservation| InactiveReservation {
                    id: reservation.id.clone(),
                    state: reservation.state.to_string(),
                })
                .collect(),
            unclassifiable: outcome.unclassifiable.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        InstanceRecord, MatchKey, ReservationRecord, ReservationState, Scope,
    };
    use crate::reconcile::ReconciliationResult;
    use chrono::{TimeZone, Utc};

    fn key(family: &str, size: &str) -> MatchKey {
        MatchKey {
            family: family.to_string(),
            size: size.to_string(),
            platform: "linux/unix".to_string(),
        }
    }

    fn outcome() -> CheckOutcome {
        let mut result = ReconciliationResult::default();
        result.in_use.insert("r-used".to_string(), 1);
        result.unused.insert("r-idle".to_string(), 2);
        result.unreserved.push("i-2".to_string());

        CheckOutcome {
            region: "us-east-1".to_string(),
            reservations: vec![
                ReservationRecord {
                    id: "r-used".to_string(),
                    key: key("m5", "large"),
                    scope: Scope::Zonal("us-east-1a".to_string()),
                    count: 1,
                    state: ReservationState::Active,
                    end: Some(Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap()),
                },
                ReservationRecord {
                    id: "r-idle".to_string(),
                    key: key("c5", "xlarge"),
                    scope: Scope::Regional,
                    count: 2,
                    state: ReservationState::Active,
                    end: None,
                },
            ],
            inactive: vec![ReservationRecord {
                id: "r-old".to_string(),
                key: key("m5", "large"),
                scope: Scope::Regional,
                count: 1,
                state: ReservationState::Retired,
                end: None,
            }],
            instances: vec![
                InstanceRecord {
                    id: "i-1".to_string(),
                    key: key("m5", "large"),
                    zone: "us-east-1a".to_string(),
                    launch_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                },
                InstanceRecord {
                    id: "i-2".to_string(),
                    key: key("r5", "2xlarge"),
                    zone: "us-east-1b".to_string(),
                    launch_time: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                },
            ],
            unclassifiable: vec![Unclassifiable {
                id: "i-bad".to_string(),
                reason: "unrecognized instance type: \"metal\"".to_string(),
            }],
            result,
        }
    }

    #[test]
    fn test_reservations_table() {
        let text = reservations_table(&outcome());
        assert!(text.contains("Reservations (us-east-1)"));
        assert!(text.contains("us-east-1a"));
        assert!(text.contains("m5.large"));
        assert!(text.contains("2026-12-31"));
    }

    #[test]
    fn test_unused_table_includes_reservation_details() {
        let text = unused_table(&outcome());
        assert!(text.contains("r-idle"));
        assert!(text.contains("regional"));
        assert!(text.contains("c5.xlarge (linux/unix)"));
    }

    #[test]
    fn test_unreserved_table_groups_by_zone_and_type() {
        let text = unreserved_table(&outcome());
        assert!(text.contains("us-east-1b"));
        assert!(text.contains("r5.2xlarge (linux/unix)"));
        // The allocated instance never shows up.
        assert!(!text.contains("us-east-1a"));
    }

    #[test]
    fn test_render_report_sections_and_unclassifiable() {
        let text = render_report(
            &outcome(),
            &[ReportSection::Unused, ReportSection::Unreserved],
        );
        assert!(text.contains("# Instance Reservation Report #"));
        assert!(text.contains(": unused :"));
        assert!(text.contains(": unreserved :"));
        assert!(!text.contains(": reservations :"));
        assert!(text.contains("Unclassifiable records"));
        assert!(text.contains("i-bad"));
    }

    #[test]
    fn test_report_payload_serializes() {
        let payload = ReportPayload::from_outcome(&outcome());
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["region"], "us-east-1");
        assert_eq!(value["in_use"]["r-used"], 1);
        assert_eq!(value["unused"]["r-idle"], 2);
        assert_eq!(value["unreserved"][0], "i-2");
        assert_eq!(value["inactive"][0]["state"], "retired");
        assert_eq!(value["unclassifiable"][0]["id"], "i-bad");
    }
}
