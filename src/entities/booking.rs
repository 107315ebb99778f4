use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Location;
use crate::error::{invalid_invocation_error, invalid_partial_factor_error, Error};
use crate::pricing::PricingResult;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub passenger_id: Uuid,
    pub pickup: Location,
    pub dropoff: Location,
    pub partial_factor: Decimal,
    pub cost: BookingCost,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Status {
    Active,
    Cancelled { timestamp: DateTime<Utc> },
}

/// Snapshot of the pricing a booking was last charged at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingCost {
    pub total_trip_cost: Decimal,
    pub driver_contribution: Decimal,
    pub passenger_cost: Decimal,
    pub cost_per_passenger: Decimal,
    pub passenger_count: u8,
}

impl BookingCost {
    pub fn new(pricing: &PricingResult, passenger_count: u8) -> Self {
        Self {
            total_trip_cost: pricing.total_trip_cost,
            driver_contribution: pricing.driver_contribution,
            passenger_cost: pricing.passenger_cost,
            cost_per_passenger: pricing.cost_per_passenger,
            passenger_count,
        }
    }
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Active => "active".into(),
            Self::Cancelled { timestamp: _ } => "cancelled".into(),
        }
    }
}

impl Booking {
    pub fn new(
        trip_id: Uuid,
        passenger_id: Uuid,
        pickup: Location,
        dropoff: Location,
        partial_factor: Decimal,
        cost: BookingCost,
    ) -> Result<Self, Error> {
        if partial_factor <= Decimal::ZERO || partial_factor > Decimal::ONE {
            return Err(invalid_partial_factor_error());
        }

        Ok(Self {
            id: Uuid::new_v4(),
            trip_id,
            passenger_id,
            pickup,
            dropoff,
            partial_factor,
            cost,
            status: Status::Active,
            created_at: Utc::now(),
        })
    }

    pub fn is_active(&self) -> bool {
        match self.status {
            Status::Active => true,
            _ => false,
        }
    }

    #[tracing::instrument(skip(self), fields(booking_id = %self.id))]
    pub fn cancel(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Active => {
                self.status = Status::Cancelled {
                    timestamp: Utc::now(),
                };
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Coordinates;
    use crate::error::ErrorKind;
    use crate::pricing::compute_pricing;
    use rust_decimal_macros::dec;

    fn location() -> Location {
        Location::new(Coordinates::new(31.52, 74.35).unwrap(), "".into())
    }

    fn cost() -> BookingCost {
        let pricing = compute_pricing(dec!(20), dec!(25), dec!(1), 1, dec!(1)).unwrap();
        BookingCost::new(&pricing, 1)
    }

    #[test]
    fn cancel_once() {
        let mut booking = Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            location(),
            location(),
            dec!(0.5),
            cost(),
        )
        .unwrap();
        assert!(booking.is_active());
        assert_eq!(booking.cost.cost_per_passenger, dec!(250));

        booking.cancel().unwrap();
        assert!(!booking.is_active());
        assert_eq!(booking.status.name(), "cancelled");
        assert_eq!(
            booking.cancel().unwrap_err().kind,
            ErrorKind::InvalidInvocation
        );
    }

    #[test]
    fn rejects_out_of_range_factor() {
        let err = Booking::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            location(),
            location(),
            dec!(1.5),
            cost(),
        )
        .unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidPartialFactor);
    }
}
