use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stratus_core::checkin::{BoardingGroup, BoardingPass, BoardingPassView, PassengerCheckIn};

use crate::error::{AppError, AppJson, AppPath};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub booking_id: Uuid,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub check_in_method: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInSummary {
    pub id: Uuid,
    pub boarding_group: BoardingGroup,
    pub boarding_time: DateTime<Utc>,
    pub seat_number: Option<String>,
    pub gate: Option<String>,
    pub terminal: Option<String>,
    pub checked_in_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardingPassRef {
    pub id: Uuid,
    pub boarding_pass_number: String,
    pub barcode: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub checkin: CheckInSummary,
    pub boarding_pass: BoardingPassRef,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardingPassResponse {
    pub id: Uuid,
    pub boarding_pass_number: String,
    pub barcode: String,
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub seat_number: Option<String>,
    pub boarding_group: BoardingGroup,
    pub boarding_time: DateTime<Utc>,
    pub gate: Option<String>,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journey: Option<Journey>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Journey {
    pub pnr: String,
    pub first_name: String,
    pub last_name: String,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub terminal: Option<String>,
}

impl From<BoardingPass> for BoardingPassResponse {
    fn from(pass: BoardingPass) -> Self {
        Self {
            id: pass.id,
            boarding_pass_number: pass.boarding_pass_number,
            barcode: pass.barcode,
            passenger_id: pass.passenger_id,
            flight_id: pass.flight_id,
            seat_number: pass.seat_number,
            boarding_group: pass.boarding_group,
            boarding_time: pass.boarding_time,
            gate: pass.gate,
            issued_at: pass.issued_at,
            journey: None,
        }
    }
}

impl From<BoardingPassView> for BoardingPassResponse {
    fn from(view: BoardingPassView) -> Self {
        let mut response = BoardingPassResponse::from(view.boarding_pass);
        response.journey = Some(Journey {
            pnr: view.pnr,
            first_name: view.first_name,
            last_name: view.last_name,
            flight_number: view.flight_number,
            departure_airport: view.departure_airport,
            arrival_airport: view.arrival_airport,
            departure_time: view.departure_time,
            arrival_time: view.arrival_time,
            terminal: view.terminal,
        });
        response
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerCheckInView {
    pub passenger_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub flight_id: Uuid,
    pub flight_number: String,
    pub departure_time: DateTime<Utc>,
    pub checked_in: bool,
    pub boarding_pass_issued: bool,
    pub boarding_group: Option<BoardingGroup>,
    pub gate: Option<String>,
    pub terminal: Option<String>,
}

impl From<PassengerCheckIn> for PassengerCheckInView {
    fn from(p: PassengerCheckIn) -> Self {
        Self {
            passenger_id: p.passenger_id,
            first_name: p.first_name,
            last_name: p.last_name,
            flight_id: p.flight_id,
            flight_number: p.flight_number,
            departure_time: p.departure_time,
            checked_in: p.checked_in,
            boarding_pass_issued: p.boarding_pass_issued,
            boarding_group: p.boarding_group,
            gate: p.gate,
            terminal: p.terminal,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/check-in", post(perform_check_in))
        .route("/v1/bookings/{reference}/check-in", get(check_in_status))
        .route("/v1/boarding-passes/{passenger_id}/{flight_id}", get(boarding_pass))
        .route("/v1/boarding-passes/{passenger_id}/{flight_id}/reissue", post(reissue_boarding_pass))
}

async fn perform_check_in(
    State(state): State<AppState>,
    AppJson(req): AppJson<CheckInRequest>,
) -> Result<(StatusCode, Json<CheckInResponse>), AppError> {
    let issue = state
        .check_ins
        .perform_check_in(
            req.booking_id,
            req.passenger_id,
            req.flight_id,
            req.check_in_method.as_deref(),
        )
        .await?;

    let (record, pass) = (issue.record, issue.boarding_pass);
    Ok((
        StatusCode::CREATED,
        Json(CheckInResponse {
            checkin: CheckInSummary {
                id: record.id,
                boarding_group: record.boarding_group,
                boarding_time: record.boarding_time,
                seat_number: record.seat_number,
                gate: record.gate,
                terminal: record.terminal,
                checked_in_at: record.checked_in_at,
            },
            boarding_pass: BoardingPassRef {
                id: pass.id,
                boarding_pass_number: pass.boarding_pass_number,
                barcode: pass.barcode,
            },
        }),
    ))
}

async fn check_in_status(
    State(state): State<AppState>,
    AppPath(booking_id): AppPath<Uuid>,
) -> Result<Json<Vec<PassengerCheckInView>>, AppError> {
    let rows = state.check_ins.check_in_status(booking_id).await?;
    Ok(Json(rows.into_iter().map(PassengerCheckInView::from).collect()))
}

async fn boarding_pass(
    State(state): State<AppState>,
    AppPath((passenger_id, flight_id)): AppPath<(Uuid, Uuid)>,
) -> Result<Json<BoardingPassResponse>, AppError> {
    let view = state.check_ins.boarding_pass(passenger_id, flight_id).await?;
    Ok(Json(view.into()))
}

async fn reissue_boarding_pass(
    State(state): State<AppState>,
    AppPath((passenger_id, flight_id)): AppPath<(Uuid, Uuid)>,
) -> Result<Json<BoardingPassResponse>, AppError> {
    let pass = state
        .check_ins
        .reissue_boarding_pass(passenger_id, flight_id)
        .await?;
    Ok(Json(pass.into()))
}
