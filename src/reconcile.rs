use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::descriptor::{InstanceRecord, MatchKey, ReservationRecord, Scope};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationResult {
    /// Reservation id to the number of instances it currently covers.
    pub in_use: BTreeMap<String, i64>,
    /// Reservation id to committed capacity left unallocated.
    pub unused: BTreeMap<String, i64>,
    /// Instances past the age threshold with no allocation.
    pub unreserved: Vec<String>,
}

struct Capacity<'a> {
    reservation: &'a ReservationRecord,
    remaining: i64,
}

impl<'a> Capacity<'a> {
    fn new(reservation: &'a ReservationRecord) -> Self {
        Capacity {
            reservation,
            remaining: reservation.count.max(0),
        }
    }
}

/// Allocates committed reservation capacity against running-instance demand,
/// per matching key, and derives the three disjoint result sets.
///
/// Pure and deterministic. `now` is an explicit argument so identical
/// inventories always reconcile identically.
pub fn reconcile(
    reservations: &[ReservationRecord],
    instances: &[InstanceRecord],
    unreserved_threshold_days: i64,
    now: DateTime<Utc>,
) -> ReconciliationResult {
    let mut result = ReconciliationResult::default();
    let threshold = Duration::days(unreserved_threshold_days);

    let mut groups: BTreeMap<&MatchKey, (Vec<&ReservationRecord>, Vec<&InstanceRecord>)> =
        BTreeMap::new();
    for reservation in reservations {
        groups.entry(&reservation.key).or_default().0.push(reservation);
    }
    for instance in instances {
        groups.entry(&instance.key).or_default().1.push(instance);
    }

    for (_, (mut group_reservations, mut group_instances)) in groups {
        // Oldest launch wins allocation priority; instance id breaks exact ties.
        group_instances.sort_by(|a, b| {
            a.launch_time
                .cmp(&b.launch_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        // Soonest-expiring capacity is consumed first; reservation id breaks ties.
        group_reservations.sort_by(|a, b| {
            let end_a = a.end.map(|end| end.timestamp()).unwrap_or(i64::MAX);
            let end_b = b.end.map(|end| end.timestamp()).unwrap_or(i64::MAX);
            end_a.cmp(&end_b).then_with(|| a.id.cmp(&b.id))
        });

        let mut zonal: BTreeMap<&str, Vec<Capacity>> = BTreeMap::new();
        let mut regional: Vec<Capacity> = Vec::new();
        for reservation in group_reservations {
            match &reservation.scope {
                Scope::Zonal(zone) => zonal
                    .entry(zone.as_str())
                    .or_default()
                    .push(Capacity::new(reservation)),
                Scope::Regional => regional.push(Capacity::new(reservation)),
            }
        }

        let mut covered: Vec<Option<&str>> = vec![None; group_instances.len()];

        // Zonal pass: each instance draws from its own zone's reservations.
        for (index, instance) in group_instances.iter().enumerate() {
            if let Some(capacities) = zonal.get_mut(instance.zone.as_str()) {
                if let Some(capacity) = capacities.iter_mut().find(|c| c.remaining > 0) {
                    capacity.remaining -= 1;
                    covered[index] = Some(capacity.reservation.id.as_str());
                }
            }
        }

        // Regional pass: whatever is still uncovered draws from regional
        // capacity regardless of zone.
        for index in 0..group_instances.len() {
            if covered[index].is_some() {
                continue;
            }
            if let Some(capacity) = regional.iter_mut().find(|c| c.remaining > 0) {
                capacity.remaining -= 1;
                covered[index] = Some(capacity.reservation.id.as_str());
            }
        }

        for (index, instance) in group_instances.iter().enumerate() {
            match covered[index] {
                Some(reservation_id) => {
                    *result.in_use.entry(reservation_id.to_string()).or_insert(0) += 1;
                }
                None => {
                    if now.signed_duration_since(instance.launch_time) >= threshold {
                        result.unreserved.push(instance.id.clone());
                    }
                }
            }
        }

        for capacity in zonal.values().flatten().chain(regional.iter()) {
            if capacity.remaining > 0 || capacity.reservation.count <= 0 {
                result
                    .unused
                    .insert(capacity.reservation.id.clone(), capacity.remaining);
            }
        }
    }

    result
}
