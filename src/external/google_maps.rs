use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{
    entities::Coordinates,
    error::{invalid_input_error, invalid_distance_error, route_unavailable_error, Error},
    external::DistanceProvider,
};

const MIN_PARTIAL_FACTOR: Decimal = dec!(0.1);

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response<T> {
    status: String,
    results: Option<T>,
    rows: Option<Vec<Row>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Row {
    elements: Vec<Element>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Element {
    status: String,
    distance: Option<Distance>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Distance {
    // meters
    value: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Geometry {
    location: Coordinates,
}

/// Distance Matrix and Geocoding API client.
#[derive(Clone, Debug)]
pub struct GoogleMaps {
    client: reqwest::Client,
    api_base: String,
    key: String,
}

impl GoogleMaps {
    pub fn new(api_base: String, key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            key,
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response<T>, Error> {
        let url = format!("https://{}/maps/api/{}/json", self.api_base, path);

        let res = self
            .client
            .get(url)
            .query(&[("key", &self.key)])
            .query(query)
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if status_code >= 400 && status_code < 500 {
            return Err(invalid_input_error());
        } else if status_code != 200 {
            return Err(route_unavailable_error());
        }

        let data: Response<T> = res.json().await?;

        Ok(data)
    }

    #[tracing::instrument(skip(self))]
    async fn driving_distance(
        &self,
        from: &Coordinates,
        to: &Coordinates,
    ) -> Result<Decimal, Error> {
        let data: Response<()> = self
            .get(
                "distancematrix",
                &[
                    ("origins", from.clone().into()),
                    ("destinations", to.clone().into()),
                    ("mode", "driving".into()),
                ],
            )
            .await?;

        if data.status != "OK" {
            tracing::warn!("distance matrix returned {}", data.status);
            return Err(route_unavailable_error());
        }

        let element = data
            .rows
            .and_then(|rows| rows.into_iter().next())
            .and_then(|row| row.elements.into_iter().next())
            .ok_or_else(|| route_unavailable_error())?;

        if element.status != "OK" {
            tracing::warn!("no route between points: {}", element.status);
            return Err(route_unavailable_error());
        }

        let meters = element
            .distance
            .ok_or_else(|| route_unavailable_error())?
            .value;

        Ok(Decimal::from(meters) / dec!(1000))
    }

    async fn geocode_query(&self, query: (&str, String)) -> Result<GeocodeResult, Error> {
        let data: Response<Vec<GeocodeResult>> = self.get("geocode", &[query]).await?;

        match data.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(invalid_input_error()),
            _ => return Err(route_unavailable_error()),
        }

        data.results
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| route_unavailable_error())
    }
}

/// Share of `full_km` covered by `partial_km`, clamped to `[0.1, 1]`.
pub fn partial_factor(partial_km: Decimal, full_km: Decimal) -> Result<Decimal, Error> {
    if full_km <= Decimal::ZERO {
        return Err(invalid_distance_error());
    }

    Ok((partial_km / full_km)
        .max(MIN_PARTIAL_FACTOR)
        .min(Decimal::ONE))
}

#[async_trait]
impl DistanceProvider for GoogleMaps {
    #[tracing::instrument(skip(self))]
    async fn full_route_distance(
        &self,
        origin: &Coordinates,
        destination: &Coordinates,
    ) -> Result<Decimal, Error> {
        self.driving_distance(origin, destination).await
    }

    #[tracing::instrument(skip(self))]
    async fn partial_route_factor(
        &self,
        trip_origin: &Coordinates,
        trip_destination: &Coordinates,
        pickup: &Coordinates,
        dropoff: &Coordinates,
    ) -> Result<Decimal, Error> {
        let (full_km, partial_km) = futures::try_join!(
            self.driving_distance(trip_origin, trip_destination),
            self.driving_distance(pickup, dropoff),
        )?;

        partial_factor(partial_km, full_km)
    }

    #[tracing::instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Coordinates, Error> {
        let result = self.geocode_query(("address", address.to_string())).await?;

        Ok(result.geometry.location)
    }

    #[tracing::instrument(skip(self))]
    async fn reverse_geocode(&self, coordinates: &Coordinates) -> Result<String, Error> {
        let result = self
            .geocode_query(("latlng", coordinates.clone().into()))
            .await?;

        Ok(result.formatted_address)
    }
}

#[test]
fn partial_factor_is_clamped() {
    assert_eq!(partial_factor(dec!(5), dec!(20)).unwrap(), dec!(0.25));
    assert_eq!(partial_factor(dec!(0.5), dec!(20)).unwrap(), dec!(0.1));
    // detours can exceed the trip route
    assert_eq!(partial_factor(dec!(23), dec!(20)).unwrap(), dec!(1));
    assert!(partial_factor(dec!(5), dec!(0)).is_err());
}

#[test]
fn parses_distance_matrix_response() {
    let body = serde_json::json!({
        "status": "OK",
        "rows": [{ "elements": [{ "status": "OK", "distance": { "value": 20450, "text": "20.5 km" } }] }]
    });

    let data: Response<()> = serde_json::from_value(body).unwrap();
    let element = &data.rows.unwrap()[0].elements[0];

    assert_eq!(element.distance.as_ref().unwrap().value, 20450);
}
