use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{Location, VehicleKind};
use crate::error::{
    invalid_distance_error, invalid_input_error, invalid_invocation_error,
    invalid_passenger_count_error, Error,
};
use crate::pricing::{
    compute_pricing, recalculate_after_cancellation, round_money, MAX_PASSENGERS,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub status: Status,
    pub origin: Location,
    pub destination: Location,
    pub distance_km: Decimal,
    pub fuel_rate_per_km: Decimal,
    pub vehicle: VehicleKind,
    pub vehicle_factor: Decimal,
    pub max_seats: u8,
    pub cost: Option<TripCost>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Status {
    Open,
    PartiallyFilled { passengers: u8 },
    Full,
    Cancelled,
    Completed,
}

/// Trip-level split of the full-route cost for the current passenger count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripCost {
    pub total_cost: Decimal,
    pub driver_contribution: Decimal,
    pub cost_per_passenger: Decimal,
    pub passenger_count: u8,
}

impl Status {
    pub fn name(&self) -> String {
        match self {
            Self::Open => "open".into(),
            Self::PartiallyFilled { passengers: _ } => "partially_filled".into(),
            Self::Full => "full".into(),
            Self::Cancelled => "cancelled".into(),
            Self::Completed => "completed".into(),
        }
    }
}

impl Trip {
    pub fn new(
        driver_id: Uuid,
        origin: Location,
        destination: Location,
        distance_km: Decimal,
        fuel_rate_per_km: Decimal,
        vehicle: VehicleKind,
        vehicle_factor: Decimal,
        max_seats: u8,
    ) -> Result<Self, Error> {
        if distance_km <= Decimal::ZERO {
            return Err(invalid_distance_error());
        }
        if vehicle_factor <= Decimal::ZERO || fuel_rate_per_km < Decimal::ZERO {
            return Err(invalid_input_error());
        }
        if max_seats == 0 || max_seats > MAX_PASSENGERS {
            return Err(invalid_passenger_count_error());
        }

        Ok(Self {
            id: Uuid::new_v4(),
            driver_id,
            status: Status::Open,
            origin,
            destination,
            distance_km,
            fuel_rate_per_km,
            vehicle,
            vehicle_factor,
            max_seats,
            cost: None,
            created_at: Utc::now(),
        })
    }

    pub fn accepts_bookings(&self) -> bool {
        match self.status {
            Status::Open | Status::PartiallyFilled { passengers: _ } | Status::Full => true,
            _ => false,
        }
    }

    /// Unrounded cost of driving the whole route.
    pub fn full_route_cost(&self) -> Decimal {
        self.distance_km * self.fuel_rate_per_km * self.vehicle_factor
    }

    /// Moves the seat state machine to match `active` bookings.
    #[tracing::instrument(skip(self), fields(trip_id = %self.id))]
    pub fn seats_changed(&mut self, active: u8) -> Result<(), Error> {
        if !self.accepts_bookings() {
            return Err(invalid_invocation_error());
        }
        if active > self.max_seats {
            return Err(invalid_passenger_count_error());
        }

        self.status = match active {
            0 => Status::Open,
            n if n == self.max_seats => Status::Full,
            n => Status::PartiallyFilled { passengers: n },
        };

        Ok(())
    }

    /// Aggregate cost once `passengers` are aboard; `None` for an empty trip.
    pub fn price_for(&self, passengers: u8) -> Result<Option<TripCost>, Error> {
        if passengers == 0 {
            return Ok(None);
        }

        let priced = compute_pricing(
            self.distance_km,
            self.fuel_rate_per_km,
            self.vehicle_factor,
            passengers,
            Decimal::ONE,
        )?;

        Ok(Some(TripCost {
            total_cost: priced.total_trip_cost,
            driver_contribution: priced.driver_contribution,
            cost_per_passenger: priced.cost_per_passenger,
            passenger_count: passengers,
        }))
    }

    /// Aggregate cost after the passenger count dropped from `previous` to
    /// `remaining`.
    pub fn price_after_cancellation(
        &self,
        previous: u8,
        remaining: u8,
    ) -> Result<Option<TripCost>, Error> {
        let total = round_money(self.full_route_cost());
        let split = recalculate_after_cancellation(total, previous, remaining)?;

        if remaining == 0 {
            return Ok(None);
        }

        Ok(Some(TripCost {
            total_cost: total,
            driver_contribution: split.driver_contribution,
            cost_per_passenger: split.cost_per_passenger,
            passenger_count: remaining,
        }))
    }

    pub fn cancel(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Open => {
                self.status = Status::Cancelled;
                Ok(())
            }
            _ => Err(invalid_invocation_error()),
        }
    }

    pub fn complete(&mut self) -> Result<(), Error> {
        match self.status {
            Status::PartiallyFilled { passengers: _ } | Status::Full => {
                self.status = Status::Completed;
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
    use rust_decimal_macros::dec;

    fn trip(max_seats: u8) -> Trip {
        let origin = Location::new(Coordinates::new(24.86, 67.00).unwrap(), "Saddar".into());
        let destination =
            Location::new(Coordinates::new(24.93, 67.09).unwrap(), "Gulshan".into());

        Trip::new(
            Uuid::new_v4(),
            origin,
            destination,
            dec!(20),
            dec!(25),
            VehicleKind::Standard,
            dec!(1.0),
            max_seats,
        )
        .unwrap()
    }

    #[test]
    fn rejects_invalid_trip() {
        let t = trip(3);

        let err = Trip::new(
            t.driver_id,
            t.origin.clone(),
            t.destination.clone(),
            dec!(0),
            dec!(25),
            VehicleKind::Standard,
            dec!(1),
            3,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidDistance);

        let err = Trip::new(
            t.driver_id,
            t.origin.clone(),
            t.destination.clone(),
            dec!(10),
            dec!(25),
            VehicleKind::Standard,
            dec!(1),
            4,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPassengerCount);
    }

    #[test]
    fn seat_state_machine() {
        let mut t = trip(3);
        assert_eq!(t.status, Status::Open);

        t.seats_changed(1).unwrap();
        assert_eq!(t.status, Status::PartiallyFilled { passengers: 1 });

        t.seats_changed(3).unwrap();
        assert_eq!(t.status, Status::Full);

        t.seats_changed(0).unwrap();
        assert_eq!(t.status, Status::Open);
        assert_eq!(t.status.name(), "open");
    }

    #[test]
    fn aggregate_cost_by_passenger_count() {
        let t = trip(3);

        assert!(t.price_for(0).unwrap().is_none());

        let cost = t.price_for(1).unwrap().unwrap();
        assert_eq!(cost.total_cost, dec!(500));
        assert_eq!(cost.driver_contribution, dec!(250));
        assert_eq!(cost.cost_per_passenger, dec!(250));

        let cost = t.price_for(3).unwrap().unwrap();
        assert_eq!(cost.driver_contribution, dec!(0));
        assert_eq!(cost.cost_per_passenger, dec!(166.67));
    }

    #[test]
    fn aggregate_cost_after_cancellation_matches_fresh_pricing() {
        let t = trip(3);

        for (previous, remaining) in [(3, 2), (2, 1), (3, 1)] {
            assert_eq!(
                t.price_after_cancellation(previous, remaining).unwrap(),
                t.price_for(remaining).unwrap()
            );
        }
        assert!(t.price_after_cancellation(1, 0).unwrap().is_none());
    }

    #[test]
    fn single_seat_trip_fills_with_one_passenger() {
        let mut t = trip(1);

        t.seats_changed(1).unwrap();
        assert_eq!(t.status, Status::Full);
        assert!(t.seats_changed(2).is_err());
    }

    #[test]
    fn terminal_states_reject_changes() {
        let mut t = trip(3);
        t.cancel().unwrap();

        assert!(!t.accepts_bookings());
        assert_eq!(t.seats_changed(1).unwrap_err().kind, ErrorKind::InvalidInvocation);

        let mut t = trip(3);
        assert!(t.complete().is_err());
        t.seats_changed(2).unwrap();
        t.complete().unwrap();
        assert_eq!(t.status.name(), "completed");
    }
}
