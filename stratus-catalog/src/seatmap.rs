use stratus_core::flight::{Aircraft, CabinClass};
use stratus_core::seat::{SeatMapEntry, SeatType};

/// Surcharge for exit-row seats, in minor units.
pub const EXIT_ROW_SURCHARGE: i64 = 2500;
/// Surcharge for economy window and aisle seats past the front rows.
pub const PREFERRED_SEAT_SURCHARGE: i64 = 1000;
/// Economy rows up to this many rows past the first economy row carry no preferred-seat surcharge.
pub const FRONT_ECONOMY_ROWS: i32 = 3;

const PREMIUM_COLUMNS: [(char, SeatType); 4] = [
    ('A', SeatType::Window),
    ('C', SeatType::Aisle),
    ('D', SeatType::Aisle),
    ('F', SeatType::Window),
];

const ECONOMY_COLUMNS: [(char, SeatType); 6] = [
    ('A', SeatType::Window),
    ('B', SeatType::Middle),
    ('C', SeatType::Aisle),
    ('D', SeatType::Aisle),
    ('E', SeatType::Middle),
    ('F', SeatType::Window),
];

fn rows_for(seats: i32, per_row: usize) -> i32 {
    let per_row = per_row as i32;
    (seats.max(0) + per_row - 1) / per_row
}

/// Lays out every seat of an aircraft: first, then business, then economy rows,
/// numbered from 1 without gaps. Pure; persisting the result is the caller's job.
pub fn generate_seat_map(aircraft: &Aircraft) -> Vec<SeatMapEntry> {
    let mut seats = Vec::new();
    let mut next_row = 1;

    for cabin in [CabinClass::First, CabinClass::Business] {
        let rows = rows_for(*aircraft.seats.get(cabin), PREMIUM_COLUMNS.len());
        for row in next_row..next_row + rows {
            for (column, seat_type) in PREMIUM_COLUMNS {
                seats.push(entry(aircraft, row, column, cabin, seat_type, 0));
            }
        }
        next_row += rows;
    }

    let economy_start = next_row;
    let rows = rows_for(aircraft.seats.economy, ECONOMY_COLUMNS.len());
    for row in economy_start..economy_start + rows {
        let exit_row = row % 10 == 0;
        for (column, seat_type) in ECONOMY_COLUMNS {
            let (seat_type, extra_price) = if exit_row {
                (SeatType::ExitRow, EXIT_ROW_SURCHARGE)
            } else if seat_type != SeatType::Middle && row > economy_start + FRONT_ECONOMY_ROWS {
                (seat_type, PREFERRED_SEAT_SURCHARGE)
            } else {
                (seat_type, 0)
            };
            seats.push(entry(aircraft, row, column, CabinClass::Economy, seat_type, extra_price));
        }
    }

    seats
}

fn entry(
    aircraft: &Aircraft,
    row: i32,
    column: char,
    seat_class: CabinClass,
    seat_type: SeatType,
    extra_price: i64,
) -> SeatMapEntry {
    SeatMapEntry {
        aircraft_id: aircraft.id,
        seat_number: format!("{}{}", row, column),
        row,
        column,
        seat_class,
        seat_type,
        extra_price,
        selectable: true,
    }
}
