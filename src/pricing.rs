//! Trip cost-sharing formula.
//!
//! Pure functions with no storage or network access. The stepwise gross-up
//! and reproration in [`compute_pricing`] cancels out algebraically, but the
//! intermediate values are reported in [`Breakdown`] and must be kept as
//! separate steps.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{
    invalid_distance_error, invalid_input_error, invalid_partial_factor_error,
    invalid_passenger_count_error, Error,
};

/// Share of the full-route cost borne by the driver when exactly one
/// passenger is aboard.
pub const DRIVER_SHARE: Decimal = dec!(0.5);

pub const MAX_PASSENGERS: u8 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub base_cost: Decimal,
    pub vehicle_adjusted_cost: Decimal,
    pub driver_share: Decimal,
    pub passenger_share: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub total_trip_cost: Decimal,
    pub driver_contribution: Decimal,
    pub passenger_cost: Decimal,
    pub cost_per_passenger: Decimal,
    pub breakdown: Breakdown,
}

/// Driver/passenger split of a trip total after the active passenger count
/// dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationSplit {
    pub driver_contribution: Decimal,
    pub passenger_cost: Decimal,
    pub cost_per_passenger: Decimal,
}

/// Quick quote produced before a booking exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub passenger_count: u8,
    pub driver_contribution: Decimal,
    pub passenger_cost: Decimal,
    pub cost_per_passenger: Decimal,
}

/// Rounds half-up (away from zero) to 2 decimal places.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn validate_passenger_count(passenger_count: u8) -> Result<(), Error> {
    if passenger_count == 0 || passenger_count > MAX_PASSENGERS {
        return Err(invalid_passenger_count_error());
    }

    Ok(())
}

fn validate_partial_factor(partial_distance_factor: Decimal) -> Result<(), Error> {
    if partial_distance_factor <= Decimal::ZERO || partial_distance_factor > Decimal::ONE {
        return Err(invalid_partial_factor_error());
    }

    Ok(())
}

/// Splits the fuel-proportional cost of `distance_km` (the passenger's own,
/// possibly partial, distance) between the driver and `passenger_count`
/// passengers.
pub fn compute_pricing(
    distance_km: Decimal,
    fuel_rate_per_km: Decimal,
    vehicle_factor: Decimal,
    passenger_count: u8,
    partial_distance_factor: Decimal,
) -> Result<PricingResult, Error> {
    if distance_km <= Decimal::ZERO {
        return Err(invalid_distance_error());
    }
    validate_passenger_count(passenger_count)?;
    validate_partial_factor(partial_distance_factor)?;
    if fuel_rate_per_km < Decimal::ZERO || vehicle_factor <= Decimal::ZERO {
        return Err(invalid_input_error());
    }

    // gross the partial distance up to a full-route equivalent
    let full_route_cost =
        (distance_km / partial_distance_factor) * fuel_rate_per_km * vehicle_factor;
    let vehicle_adjusted_cost = full_route_cost;

    let driver_contribution_full_route = if passenger_count == 1 {
        vehicle_adjusted_cost * DRIVER_SHARE
    } else {
        Decimal::ZERO
    };

    // reprorate to the passenger's actual journey
    let driver_contribution = driver_contribution_full_route * partial_distance_factor;
    let remaining_cost =
        (vehicle_adjusted_cost - driver_contribution_full_route) * partial_distance_factor;

    let (passenger_cost, cost_per_passenger) = if passenger_count == 1 {
        (remaining_cost, remaining_cost)
    } else {
        let total_passenger_cost = vehicle_adjusted_cost * partial_distance_factor;
        (
            total_passenger_cost,
            total_passenger_cost / Decimal::from(passenger_count),
        )
    };

    let total_trip_cost = vehicle_adjusted_cost * partial_distance_factor;

    Ok(PricingResult {
        total_trip_cost: round_money(total_trip_cost),
        driver_contribution: round_money(driver_contribution),
        passenger_cost: round_money(passenger_cost),
        cost_per_passenger: round_money(cost_per_passenger),
        breakdown: Breakdown {
            base_cost: round_money(full_route_cost),
            vehicle_adjusted_cost: round_money(vehicle_adjusted_cost),
            driver_share: round_money(driver_contribution_full_route),
            passenger_share: round_money(vehicle_adjusted_cost - driver_contribution_full_route),
        },
    })
}

/// Pre-booking quote. Applies the driver-share rule directly to
/// `total_trip_cost` without the gross-up/reprorate cycle. The passenger
/// count is `new_passenger_count` if given, otherwise one more than
/// `current_passenger_count`, otherwise 1.
pub fn estimate_passenger_cost(
    total_trip_cost: Decimal,
    partial_distance_factor: Decimal,
    current_passenger_count: Option<u8>,
    new_passenger_count: Option<u8>,
) -> Result<Estimate, Error> {
    if total_trip_cost < Decimal::ZERO {
        return Err(invalid_input_error());
    }
    validate_partial_factor(partial_distance_factor)?;

    let passenger_count = match (new_passenger_count, current_passenger_count) {
        (Some(count), _) => count,
        (None, Some(count)) => count.saturating_add(1),
        (None, None) => 1,
    };
    validate_passenger_count(passenger_count)?;

    let share = total_trip_cost * partial_distance_factor;

    let (driver_contribution, passenger_cost, cost_per_passenger) = if passenger_count == 1 {
        let driver_contribution = share * DRIVER_SHARE;
        let passenger_cost = share - driver_contribution;
        (driver_contribution, passenger_cost, passenger_cost)
    } else {
        (
            Decimal::ZERO,
            share,
            share / Decimal::from(passenger_count),
        )
    };

    Ok(Estimate {
        passenger_count,
        driver_contribution: round_money(driver_contribution),
        passenger_cost: round_money(passenger_cost),
        cost_per_passenger: round_money(cost_per_passenger),
    })
}

/// Re-splits a trip total after a cancellation. With no passengers left the
/// trip is unpriced and every amount is zero.
pub fn recalculate_after_cancellation(
    trip_total_cost: Decimal,
    previous_passenger_count: u8,
    new_passenger_count: u8,
) -> Result<CancellationSplit, Error> {
    if trip_total_cost < Decimal::ZERO {
        return Err(invalid_input_error());
    }
    if previous_passenger_count > MAX_PASSENGERS || new_passenger_count > MAX_PASSENGERS {
        return Err(invalid_passenger_count_error());
    }
    if new_passenger_count >= previous_passenger_count {
        return Err(invalid_input_error());
    }

    let split = match new_passenger_count {
        0 => CancellationSplit {
            driver_contribution: Decimal::ZERO,
            passenger_cost: Decimal::ZERO,
            cost_per_passenger: Decimal::ZERO,
        },
        1 => {
            let driver_contribution = trip_total_cost * DRIVER_SHARE;
            let passenger_cost = trip_total_cost - driver_contribution;

            CancellationSplit {
                driver_contribution: round_money(driver_contribution),
                passenger_cost: round_money(passenger_cost),
                cost_per_passenger: round_money(passenger_cost),
            }
        }
        count => CancellationSplit {
            driver_contribution: Decimal::ZERO,
            passenger_cost: round_money(trip_total_cost),
            cost_per_passenger: round_money(trip_total_cost / Decimal::from(count)),
        },
    };

    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const FACTORS: [Decimal; 6] = [
        dec!(1.0),
        dec!(0.75),
        dec!(0.5),
        dec!(0.3),
        dec!(0.25),
        dec!(0.1),
    ];

    #[test]
    fn scenario_single_passenger_full_route() {
        let result = compute_pricing(dec!(20), dec!(25), dec!(1.0), 1, dec!(1.0)).unwrap();

        assert_eq!(result.total_trip_cost, dec!(500));
        assert_eq!(result.driver_contribution, dec!(250));
        assert_eq!(result.passenger_cost, dec!(250));
        assert_eq!(result.cost_per_passenger, dec!(250));
        assert_eq!(result.breakdown.base_cost, dec!(500));
        assert_eq!(result.breakdown.driver_share, dec!(250));
        assert_eq!(result.breakdown.passenger_share, dec!(250));
    }

    #[test]
    fn scenario_two_passengers() {
        let result = compute_pricing(dec!(20), dec!(25), dec!(1.0), 2, dec!(1.0)).unwrap();

        assert_eq!(result.driver_contribution, dec!(0));
        assert_eq!(result.passenger_cost, dec!(500));
        assert_eq!(result.cost_per_passenger, dec!(250));
    }

    #[test]
    fn scenario_electric_vehicle() {
        let result = compute_pricing(dec!(20), dec!(25), dec!(0.6), 1, dec!(1.0)).unwrap();

        assert_eq!(result.total_trip_cost, dec!(300));
        assert_eq!(result.driver_contribution, dec!(150));
        assert_eq!(result.passenger_cost, dec!(150));
    }

    #[test]
    fn partial_factor_cancels_out() {
        for factor in FACTORS {
            for passengers in 1..=3 {
                let result =
                    compute_pricing(dec!(13.7), dec!(22.5), dec!(0.8), passengers, factor)
                        .unwrap();
                let expected = round_money(dec!(13.7) * dec!(22.5) * dec!(0.8));

                assert_eq!(
                    result.driver_contribution + result.passenger_cost,
                    expected,
                    "factor {} passengers {}",
                    factor,
                    passengers
                );
                assert_eq!(result.total_trip_cost, expected);
            }
        }
    }

    #[test]
    fn breakdown_reports_the_grossed_up_route() {
        let result = compute_pricing(dec!(5), dec!(25), dec!(1.0), 1, dec!(0.25)).unwrap();

        assert_eq!(result.breakdown.base_cost, dec!(500));
        assert_eq!(result.breakdown.vehicle_adjusted_cost, dec!(500));
        assert_eq!(result.breakdown.driver_share, dec!(250));
        assert_eq!(result.breakdown.passenger_share, dec!(250));
        assert_eq!(result.driver_contribution, dec!(62.5));
        assert_eq!(result.passenger_cost, dec!(62.5));
        assert_eq!(result.total_trip_cost, dec!(125));
    }

    #[test]
    fn single_passenger_driver_pays_half() {
        for factor in FACTORS {
            let result = compute_pricing(dec!(17), dec!(31), dec!(0.6), 1, factor).unwrap();

            assert_eq!(
                result.driver_contribution,
                round_money(dec!(0.5) * dec!(17) * dec!(31) * dec!(0.6))
            );
        }
    }

    #[test]
    fn shared_trip_driver_pays_nothing() {
        for factor in FACTORS {
            for passengers in 2..=3u8 {
                let result =
                    compute_pricing(dec!(17), dec!(31), dec!(0.6), passengers, factor).unwrap();

                assert_eq!(result.driver_contribution, Decimal::ZERO);
                assert_eq!(
                    result.cost_per_passenger,
                    round_money(dec!(17) * dec!(31) * dec!(0.6) / Decimal::from(passengers))
                );
            }
        }
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let first = compute_pricing(dec!(9.99), dec!(27.3), dec!(0.8), 3, dec!(0.3)).unwrap();
        let second = compute_pricing(dec!(9.99), dec!(27.3), dec!(0.8), 3, dec!(0.3)).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.cost_per_passenger.serialize(),
            second.cost_per_passenger.serialize()
        );
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(2.675)), dec!(2.68));
        assert_eq!(round_money(dec!(2.674)), dec!(2.67));

        // 10 / 3 per passenger
        let result = compute_pricing(dec!(1), dec!(10), dec!(1), 3, dec!(1)).unwrap();
        assert_eq!(result.cost_per_passenger, dec!(3.33));
    }

    #[test]
    fn rejects_invalid_inputs() {
        let kind = |r: Result<PricingResult, Error>| r.unwrap_err().kind;

        assert_eq!(
            kind(compute_pricing(dec!(0), dec!(25), dec!(1), 1, dec!(1))),
            ErrorKind::InvalidDistance
        );
        assert_eq!(
            kind(compute_pricing(dec!(-3), dec!(25), dec!(1), 1, dec!(1))),
            ErrorKind::InvalidDistance
        );
        assert_eq!(
            kind(compute_pricing(dec!(20), dec!(25), dec!(1), 0, dec!(1))),
            ErrorKind::InvalidPassengerCount
        );
        assert_eq!(
            kind(compute_pricing(dec!(20), dec!(25), dec!(1), 4, dec!(1))),
            ErrorKind::InvalidPassengerCount
        );
        assert_eq!(
            kind(compute_pricing(dec!(20), dec!(25), dec!(1), 1, dec!(0))),
            ErrorKind::InvalidPartialFactor
        );
        assert_eq!(
            kind(compute_pricing(dec!(20), dec!(25), dec!(1), 1, dec!(1.01))),
            ErrorKind::InvalidPartialFactor
        );
        assert_eq!(
            kind(compute_pricing(dec!(20), dec!(25), dec!(0), 1, dec!(1))),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn cancellation_to_empty_trip_is_unpriced() {
        for previous in 1..=3 {
            let split = recalculate_after_cancellation(dec!(500), previous, 0).unwrap();

            assert_eq!(split.driver_contribution, Decimal::ZERO);
            assert_eq!(split.cost_per_passenger, Decimal::ZERO);
        }
    }

    #[test]
    fn cancellation_to_single_passenger_matches_pricing() {
        for total in [dec!(500), dec!(333.33), dec!(0.05), dec!(1234.57)] {
            let split = recalculate_after_cancellation(total, 2, 1).unwrap();
            let priced = compute_pricing(total, dec!(1), dec!(1), 1, dec!(1)).unwrap();

            assert_eq!(split.driver_contribution, priced.driver_contribution);
            assert_eq!(split.passenger_cost, priced.passenger_cost);
            assert_eq!(split.cost_per_passenger, priced.cost_per_passenger);
        }
    }

    #[test]
    fn cancellation_to_shared_trip_splits_equally() {
        let split = recalculate_after_cancellation(dec!(500), 3, 2).unwrap();

        assert_eq!(split.driver_contribution, Decimal::ZERO);
        assert_eq!(split.passenger_cost, dec!(500));
        assert_eq!(split.cost_per_passenger, dec!(250));
    }

    #[test]
    fn cancellation_rejects_non_decreasing_counts() {
        assert_eq!(
            recalculate_after_cancellation(dec!(500), 1, 1).unwrap_err().kind,
            ErrorKind::InvalidInput
        );
        assert_eq!(
            recalculate_after_cancellation(dec!(500), 5, 4).unwrap_err().kind,
            ErrorKind::InvalidPassengerCount
        );
    }

    #[test]
    fn estimate_for_first_passenger() {
        let estimate = estimate_passenger_cost(dec!(500), dec!(0.5), Some(0), None).unwrap();

        assert_eq!(estimate.passenger_count, 1);
        assert_eq!(estimate.driver_contribution, dec!(125));
        assert_eq!(estimate.cost_per_passenger, dec!(125));
    }

    #[test]
    fn estimate_for_joining_passenger() {
        let estimate = estimate_passenger_cost(dec!(500), dec!(1), Some(2), None).unwrap();

        assert_eq!(estimate.passenger_count, 3);
        assert_eq!(estimate.driver_contribution, Decimal::ZERO);
        assert_eq!(estimate.passenger_cost, dec!(500));
        assert_eq!(estimate.cost_per_passenger, dec!(166.67));

        let estimate = estimate_passenger_cost(dec!(500), dec!(1), Some(0), Some(2)).unwrap();
        assert_eq!(estimate.passenger_count, 2);
        assert_eq!(estimate.cost_per_passenger, dec!(250));
    }

    #[test]
    fn estimate_rejects_full_trip_and_bad_factor() {
        assert_eq!(
            estimate_passenger_cost(dec!(500), dec!(1), Some(3), None)
                .unwrap_err()
                .kind,
            ErrorKind::InvalidPassengerCount
        );
        assert_eq!(
            estimate_passenger_cost(dec!(500), dec!(0), None, None)
                .unwrap_err()
                .kind,
            ErrorKind::InvalidPartialFactor
        );
    }
}
