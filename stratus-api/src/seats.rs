use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stratus_core::flight::CabinClass;
use stratus_core::seat::{SeatAvailability, SeatSelection, SeatType};

use crate::error::{AppError, AppJson, AppPath};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub seat_number: String,
    pub row: i32,
    pub column: String,
    pub class: CabinClass,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
    pub extra_price: i64,
    pub selectable: bool,
    pub is_selected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passenger_id: Option<Uuid>,
}

impl From<SeatAvailability> for SeatView {
    fn from(seat: SeatAvailability) -> Self {
        Self {
            seat_number: seat.seat_number,
            row: seat.row,
            column: seat.column.to_string(),
            class: seat.seat_class,
            seat_type: seat.seat_type,
            extra_price: seat.extra_price,
            selectable: seat.selectable,
            is_selected: seat.is_selected,
            passenger_id: seat.passenger_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectSeatRequest {
    pub booking_id: Uuid,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub seat_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatSelectionResponse {
    pub seat_selection_id: Uuid,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub seat_number: String,
    pub seat_class: CabinClass,
    pub extra_charge: i64,
    pub selected_at: DateTime<Utc>,
}

impl From<SeatSelection> for SeatSelectionResponse {
    fn from(s: SeatSelection) -> Self {
        Self {
            seat_selection_id: s.id,
            passenger_id: s.passenger_id,
            flight_id: s.flight_id,
            seat_number: s.seat_number,
            seat_class: s.seat_class,
            extra_charge: s.extra_charge,
            selected_at: s.selected_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/{flight_id}/seat-map", get(seat_map))
        .route("/v1/seats/select", post(select_seat))
        .route("/v1/bookings/{reference}/seats", get(booking_seats))
}

async fn seat_map(
    State(state): State<AppState>,
    AppPath(flight_id): AppPath<Uuid>,
) -> Result<Json<Vec<SeatView>>, AppError> {
    let map = state.seats.seat_map_for_flight(flight_id).await?;
    Ok(Json(map.seats.into_iter().map(SeatView::from).collect()))
}

async fn select_seat(
    State(state): State<AppState>,
    AppJson(req): AppJson<SelectSeatRequest>,
) -> Result<Json<SeatSelectionResponse>, AppError> {
    let selection = state
        .seats
        .select_seat(req.booking_id, req.passenger_id, req.flight_id, &req.seat_number)
        .await?;
    Ok(Json(selection.into()))
}

async fn booking_seats(
    State(state): State<AppState>,
    AppPath(booking_id): AppPath<Uuid>,
) -> Result<Json<Vec<SeatSelectionResponse>>, AppError> {
    let selections = state.seats.booking_selections(booking_id).await?;
    Ok(Json(selections.into_iter().map(SeatSelectionResponse::from).collect()))
}
