use chrono::Utc;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use stratus_shared::events::{BookingCreatedEvent, FlightLegSummary};
use stratus_shared::Masked;
use tracing::{info, warn};
use uuid::Uuid;

use stratus_core::booking::{
    AncillaryRequest, Booking, BookingDetails, BookingDraft, BookingRef, BookingStatus, Caller, PassengerDetails,
};
use stratus_core::flight::Flight;
use stratus_core::notify::BookingNotifier;
use stratus_core::promo::PromoEvaluator;
use stratus_core::repository::{BookingRepository, FlightRepository};
use stratus_core::rules::BookingRules;
use stratus_core::{CoreError, CoreResult};

use crate::pnr::{generate_pnr, PnrGenerator};
use crate::quote::Quote;

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub flight_ids: Vec<Uuid>,
    pub passengers: Vec<PassengerDetails>,
    #[serde(default)]
    pub ancillaries: Vec<AncillaryRequest>,
    pub contact_email: Masked<String>,
    pub contact_phone: Option<Masked<String>>,
    pub payment_method: Option<String>,
    pub promo_code: Option<String>,
    pub special_requests: Option<String>,
}

impl NewBooking {
    fn validate(&self) -> CoreResult<()> {
        if self.flight_ids.is_empty() {
            return Err(CoreError::ValidationError("at least one flight is required".to_string()));
        }
        let unique: HashSet<&Uuid> = self.flight_ids.iter().collect();
        if unique.len() != self.flight_ids.len() {
            return Err(CoreError::ValidationError("flights must not repeat".to_string()));
        }
        if self.passengers.is_empty() {
            return Err(CoreError::ValidationError("at least one passenger is required".to_string()));
        }
        if self
            .passengers
            .iter()
            .any(|p| p.first_name.trim().is_empty() || p.last_name.trim().is_empty())
        {
            return Err(CoreError::ValidationError("passenger first and last name are required".to_string()));
        }
        let email = self.contact_email.expose().trim();
        if email.is_empty() || !email.contains('@') {
            return Err(CoreError::ValidationError("a valid contact email is required".to_string()));
        }
        if self.ancillaries.iter().any(|a| a.quantity <= 0 || a.unit_price < 0) {
            return Err(CoreError::ValidationError(
                "ancillary quantity must be positive and price non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Creates, confirms and cancels bookings as single units of work.
pub struct BookingManager {
    flights: Arc<dyn FlightRepository>,
    bookings: Arc<dyn BookingRepository>,
    promos: Arc<dyn PromoEvaluator>,
    notifier: Arc<dyn BookingNotifier>,
    rules: BookingRules,
    pnr_generator: PnrGenerator,
}

impl BookingManager {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        bookings: Arc<dyn BookingRepository>,
        promos: Arc<dyn PromoEvaluator>,
        notifier: Arc<dyn BookingNotifier>,
        rules: BookingRules,
    ) -> Self {
        Self {
            flights,
            bookings,
            promos,
            notifier,
            rules,
            pnr_generator: Arc::new(generate_pnr),
        }
    }

    pub fn with_pnr_generator(mut self, generator: PnrGenerator) -> Self {
        self.pnr_generator = generator;
        self
    }

    pub async fn create_booking(&self, caller: &Caller, request: NewBooking) -> CoreResult<BookingDetails> {
        request.validate()?;

        let mut flights: Vec<Flight> = Vec::with_capacity(request.flight_ids.len());
        for flight_id in &request.flight_ids {
            let flight = self
                .flights
                .get_flight(*flight_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Flight", flight_id))?;
            flights.push(flight);
        }

        let mut quote = Quote::new(&flights, &request.passengers, &request.ancillaries)?;
        let promo_code = request
            .promo_code
            .as_deref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());
        if let Some(code) = &promo_code {
            let discount = self.promos.discount(code, quote.subtotal()).await?;
            quote = quote.with_discount(discount);
        }

        let mut draft = BookingDraft {
            id: Uuid::new_v4(),
            pnr: String::new(),
            owner: caller.subject.clone(),
            flight_ids: request.flight_ids,
            passengers: request.passengers,
            ancillaries: request.ancillaries,
            total_price: quote.total(),
            discount_amount: quote.discount,
            promo_code,
            currency: self.rules.currency.clone(),
            contact_email: request.contact_email,
            contact_phone: request.contact_phone,
            payment_method: request.payment_method,
            special_requests: request.special_requests,
        };

        let details = self.insert_with_fresh_pnr(&mut draft).await?;
        info!(
            "Booking {} created: {} passengers on {} flights, total {}",
            details.booking.pnr,
            draft.passengers.len(),
            flights.len(),
            details.booking.total_price
        );

        self.dispatch_notification(&details.booking, &draft.passengers[0], &flights);
        Ok(details)
    }

    async fn insert_with_fresh_pnr(&self, draft: &mut BookingDraft) -> CoreResult<BookingDetails> {
        for attempt in 1..=self.rules.pnr_attempts {
            draft.pnr = (self.pnr_generator)();
            match self.bookings.insert_booking(draft).await {
                Err(CoreError::PnrCollision(pnr)) => {
                    warn!("Booking code {} already in use (attempt {})", pnr, attempt);
                }
                result => return result,
            }
        }
        Err(CoreError::DependencyFailure(format!(
            "no free booking code after {} attempts",
            self.rules.pnr_attempts
        )))
    }

    /// Fire-and-forget; the booking is committed whatever happens here.
    fn dispatch_notification(&self, booking: &Booking, lead: &PassengerDetails, flights: &[Flight]) {
        let event = BookingCreatedEvent {
            booking_id: booking.id,
            pnr: booking.pnr.clone(),
            total_price: booking.total_price,
            currency: booking.currency.clone(),
            passenger_name: lead.full_name(),
            contact_email: booking.contact_email.clone(),
            contact_phone: booking.contact_phone.clone(),
            channels: BookingCreatedEvent::channels_for(booking.contact_phone.as_ref().map(|p| p.expose().as_str())),
            flights: flights
                .iter()
                .map(|f| FlightLegSummary {
                    flight_id: f.id,
                    flight_number: f.flight_number.clone(),
                    departure_airport: f.departure_airport.clone(),
                    arrival_airport: f.arrival_airport.clone(),
                    departure_time: f.departure_time,
                    arrival_time: f.arrival_time,
                })
                .collect(),
            timestamp: Utc::now().timestamp(),
        };

        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.booking_created(&event).await {
                warn!("Booking notification for {} failed: {}", event.pnr, e);
            }
        });
    }

    pub async fn get_booking(&self, caller: &Caller, reference: &BookingRef) -> CoreResult<BookingDetails> {
        let booking = self.authorized(caller, reference).await?;
        self.bookings
            .booking_details(booking.id)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", reference))
    }

    pub async fn list_bookings(&self, caller: &Caller, status: Option<BookingStatus>) -> CoreResult<Vec<Booking>> {
        let owner = caller
            .subject
            .as_deref()
            .ok_or_else(|| CoreError::AuthorizationError("listing bookings requires a signed-in caller".to_string()))?;
        self.bookings.list_bookings(owner, status).await
    }

    /// Records a completed payment: `pending -> confirmed`.
    pub async fn confirm_booking(
        &self,
        caller: &Caller,
        reference: &BookingRef,
        payment_reference: Option<&str>,
    ) -> CoreResult<Booking> {
        let booking = self.authorized(caller, reference).await?;
        let confirmed = self.bookings.confirm_booking(booking.id, payment_reference).await?;
        info!("Booking {} confirmed", confirmed.pnr);
        Ok(confirmed)
    }

    pub async fn cancel_booking(&self, caller: &Caller, reference: &BookingRef) -> CoreResult<Booking> {
        let booking = self.authorized(caller, reference).await?;
        if booking.status == BookingStatus::Cancelled {
            return Err(CoreError::AlreadyCancelled(booking.pnr));
        }
        let cancelled = self.bookings.cancel_booking(booking.id).await?;
        info!("Booking {} cancelled", cancelled.pnr);
        Ok(cancelled)
    }

    async fn authorized(&self, caller: &Caller, reference: &BookingRef) -> CoreResult<Booking> {
        let booking = self
            .bookings
            .find_booking(reference)
            .await?
            .ok_or_else(|| CoreError::not_found("Booking", reference))?;
        if !caller.can_manage(&booking) {
            return Err(CoreError::AuthorizationError(format!(
                "not permitted to manage booking {}",
                booking.pnr
            )));
        }
        Ok(booking)
    }
}
