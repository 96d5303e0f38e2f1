use chrono::{DateTime, Utc};
use uuid::Uuid;

use stratus_core::checkin::{BoardingGroup, BoardingPass, CheckInRecord};

/// Scannable token: `BP{unix millis}{first 8 hex digits of the passenger id}`.
pub fn generate_barcode(passenger_id: Uuid, now: DateTime<Utc>) -> String {
    let short_id = &passenger_id.simple().to_string()[..8];
    format!("BP{}{}", now.timestamp_millis(), short_id.to_uppercase())
}

/// Human-readable number printed on the pass: seat, group, then the last six
/// digits of the issue time. `XX` stands in for an unassigned seat.
pub fn generate_pass_number(seat_number: Option<&str>, group: BoardingGroup, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(6)..];
    format!("{}{}{}", seat_number.unwrap_or("XX"), group, tail)
}

/// A fresh, valid pass for a check-in record.
pub fn issue_boarding_pass(record: &CheckInRecord, now: DateTime<Utc>) -> BoardingPass {
    BoardingPass {
        id: Uuid::new_v4(),
        check_in_record_id: record.id,
        passenger_id: record.passenger_id,
        flight_id: record.flight_id,
        barcode: generate_barcode(record.passenger_id, now),
        boarding_pass_number: generate_pass_number(record.seat_number.as_deref(), record.boarding_group, now),
        seat_number: record.seat_number.clone(),
        boarding_group: record.boarding_group,
        boarding_time: record.boarding_time,
        gate: record.gate.clone(),
        is_valid: true,
        issued_at: now,
    }
}
