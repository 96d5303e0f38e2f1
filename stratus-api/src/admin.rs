use axum::{
    extract::State,
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppJson, AppPath};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatMapCreated {
    pub aircraft_id: Uuid,
    pub seats_created: usize,
}

#[derive(Debug, Deserialize)]
pub struct BlockSeatRequest {
    pub blocked: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/aircraft/{aircraft_id}/seat-map", post(initialize_seat_map))
        .route("/v1/admin/aircraft/{aircraft_id}/seats/{seat_number}", put(set_seat_blocked))
}

async fn initialize_seat_map(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppPath(aircraft_id): AppPath<Uuid>,
) -> Result<(StatusCode, Json<SeatMapCreated>), AppError> {
    let seats_created = state.seats.initialize_seat_map(aircraft_id).await?;
    info!("Seat map for aircraft {} initialised by {:?}", aircraft_id, admin.subject);
    Ok((
        StatusCode::CREATED,
        Json(SeatMapCreated {
            aircraft_id,
            seats_created,
        }),
    ))
}

async fn set_seat_blocked(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    AppPath((aircraft_id, seat_number)): AppPath<(Uuid, String)>,
    AppJson(req): AppJson<BlockSeatRequest>,
) -> Result<StatusCode, AppError> {
    state
        .seats
        .set_seat_blocked(aircraft_id, &seat_number, req.blocked)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
