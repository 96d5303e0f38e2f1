use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use stratus_booking::NewBooking;
use stratus_core::booking::{
    AncillaryRequest, AncillaryType, Booking, BookingDetails, BookingRef, BookingStatus, PassengerDetails,
    PassengerType, PaymentStatus,
};
use stratus_core::flight::CabinClass;
use stratus_core::CoreError;
use stratus_shared::Masked;

use crate::error::{AppError, AppJson, AppPath, AppQuery};
use crate::middleware::Authenticated;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub flight_ids: Vec<Uuid>,
    pub passengers: Vec<PassengerInput>,
    #[serde(default)]
    pub ancillaries: Vec<AncillaryInput>,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub payment_method: Option<String>,
    pub promo_code: Option<String>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerInput {
    #[serde(default)]
    pub passenger_type: PassengerType,
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub passport_number: Option<String>,
    pub passport_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub cabin_class: CabinClass,
    pub frequent_flyer_number: Option<String>,
    pub special_assistance: Option<String>,
    pub meal_preference: Option<String>,
    #[serde(default)]
    pub baggage_count: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AncillaryInput {
    pub service_type: AncillaryType,
    pub description: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Minor currency units.
    pub price: i64,
}

fn default_quantity() -> i32 {
    1
}

impl From<CreateBookingRequest> for NewBooking {
    fn from(req: CreateBookingRequest) -> Self {
        NewBooking {
            flight_ids: req.flight_ids,
            passengers: req
                .passengers
                .into_iter()
                .map(|p| PassengerDetails {
                    passenger_type: p.passenger_type,
                    title: p.title,
                    first_name: p.first_name,
                    last_name: p.last_name,
                    date_of_birth: p.date_of_birth,
                    gender: p.gender,
                    nationality: p.nationality,
                    passport_number: p.passport_number.map(Masked),
                    passport_expiry: p.passport_expiry,
                    cabin_class: p.cabin_class,
                    frequent_flyer_number: p.frequent_flyer_number,
                    special_assistance: p.special_assistance,
                    meal_preference: p.meal_preference,
                    baggage_count: p.baggage_count,
                })
                .collect(),
            ancillaries: req
                .ancillaries
                .into_iter()
                .map(|a| AncillaryRequest {
                    service_type: a.service_type,
                    description: a.description,
                    quantity: a.quantity,
                    unit_price: a.price,
                })
                .collect(),
            contact_email: Masked(req.contact_email),
            contact_phone: req.contact_phone.map(Masked),
            payment_method: req.payment_method,
            promo_code: req.promo_code,
            special_requests: req.special_requests,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub booking_id: Uuid,
    pub pnr: String,
    pub total_price: i64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub booking_id: Uuid,
    pub pnr: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub total_price: i64,
    pub discount_amount: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingSummary {
    fn from(b: Booking) -> Self {
        Self {
            booking_id: b.id,
            pnr: b.pnr,
            status: b.status,
            payment_status: b.payment_status,
            total_price: b.total_price,
            discount_amount: b.discount_amount,
            currency: b.currency,
            created_at: b.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerView {
    pub passenger_id: Uuid,
    pub flight_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub passenger_type: PassengerType,
    pub cabin_class: CabinClass,
    pub seat_number: Option<String>,
    pub checked_in: bool,
    pub boarding_pass_issued: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AncillaryView {
    pub service_type: AncillaryType,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    #[serde(flatten)]
    pub summary: BookingSummary,
    pub promo_code: Option<String>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub contact_email: Masked<String>,
    pub contact_phone: Option<Masked<String>>,
    pub special_requests: Option<String>,
    pub flight_ids: Vec<Uuid>,
    pub passengers: Vec<PassengerView>,
    pub ancillaries: Vec<AncillaryView>,
}

impl From<BookingDetails> for BookingResponse {
    fn from(details: BookingDetails) -> Self {
        let booking = details.booking;
        Self {
            promo_code: booking.promo_code.clone(),
            payment_method: booking.payment_method.clone(),
            payment_reference: booking.payment_reference.clone(),
            contact_email: booking.contact_email.clone(),
            contact_phone: booking.contact_phone.clone(),
            special_requests: booking.special_requests.clone(),
            summary: booking.into(),
            flight_ids: details.flight_ids,
            passengers: details
                .passengers
                .into_iter()
                .map(|p| PassengerView {
                    passenger_id: p.id,
                    flight_id: p.flight_id,
                    first_name: p.details.first_name,
                    last_name: p.details.last_name,
                    passenger_type: p.details.passenger_type,
                    cabin_class: p.details.cabin_class,
                    seat_number: p.seat_number,
                    checked_in: p.checked_in,
                    boarding_pass_issued: p.boarding_pass_issued,
                })
                .collect(),
            ancillaries: details
                .ancillaries
                .into_iter()
                .map(|a| AncillaryView {
                    service_type: a.service_type,
                    description: a.description,
                    quantity: a.quantity,
                    unit_price: a.unit_price,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBookingRequest {
    pub payment_reference: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{reference}", get(get_booking))
        .route("/v1/bookings/{reference}/confirm", post(confirm_booking))
        .route("/v1/bookings/{reference}/cancel", post(cancel_booking))
}

async fn create_booking(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppJson(req): AppJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    let details = state.bookings.create_booking(&caller, req.into()).await?;
    let booking = details.booking;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            booking_id: booking.id,
            pnr: booking.pnr,
            total_price: booking.total_price,
            status: booking.status,
            payment_status: booking.payment_status,
        }),
    ))
}

async fn get_booking(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(reference): AppPath<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let details = state
        .bookings
        .get_booking(&caller, &BookingRef::parse(&reference))
        .await?;
    Ok(Json(details.into()))
}

async fn list_bookings(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppQuery(query): AppQuery<ListQuery>,
) -> Result<Json<Vec<BookingSummary>>, AppError> {
    let status = query
        .status
        .map(|s| s.to_lowercase().parse::<BookingStatus>())
        .transpose()
        .map_err(CoreError::ValidationError)?;

    let bookings = state.bookings.list_bookings(&caller, status).await?;
    Ok(Json(bookings.into_iter().map(BookingSummary::from).collect()))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(reference): AppPath<String>,
    AppJson(req): AppJson<ConfirmBookingRequest>,
) -> Result<Json<BookingSummary>, AppError> {
    let booking = state
        .bookings
        .confirm_booking(&caller, &BookingRef::parse(&reference), req.payment_reference.as_deref())
        .await?;
    Ok(Json(booking.into()))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    AppPath(reference): AppPath<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .bookings
        .cancel_booking(&caller, &BookingRef::parse(&reference))
        .await?;
    Ok(Json(json!({})))
}
