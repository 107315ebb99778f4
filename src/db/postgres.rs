use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{
    postgres::PgPoolOptions, types::Json, Executor, Pool, Postgres, Row, Transaction,
};
use uuid::Uuid;

use crate::{
    db::{Store, UnitOfWork},
    entities::{Booking, BookingCost, Trip, TripCost, TripStatus},
    error::{not_found_error, Error},
};

type Database = Postgres;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: Pool<Database>,
}

impl PgStore {
    #[tracing::instrument(name = "PgStore::connect", skip(db_uri))]
    pub async fn connect(db_uri: &str, max_connections: u32) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_uri)
            .await?;

        Self::new(pool).await
    }

    #[tracing::instrument(name = "PgStore::new", skip_all)]
    pub async fn new(pool: Pool<Database>) -> Result<Self, Error> {
        // TODO: move this to migrations
        pool.execute("CREATE TABLE IF NOT EXISTS trips (id UUID PRIMARY KEY, status VARCHAR NOT NULL, data JSONB NOT NULL)")
            .await?;
        pool.execute("CREATE TABLE IF NOT EXISTS bookings (id UUID PRIMARY KEY, trip_id UUID NOT NULL, status VARCHAR NOT NULL, data JSONB NOT NULL, CONSTRAINT fk_booking_trip FOREIGN KEY(trip_id) REFERENCES trips(id))")
            .await?;
        pool.execute(
            "CREATE INDEX IF NOT EXISTS bookings_trip_status ON bookings (trip_id, status)",
        )
        .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    type UnitOfWork = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork, Error> {
        let tx = self.pool.begin().await?;

        Ok(PgUnitOfWork { tx })
    }

    #[tracing::instrument(skip(self, trip), fields(trip_id = %trip.id))]
    async fn insert_trip(&self, trip: &Trip) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO trips (id, status, data) VALUES ($1, $2, $3)")
                .bind(&trip.id)
                .bind(trip.status.name())
                .bind(Json(trip)),
        )
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_trip(&self, id: Uuid) -> Result<Trip, Error> {
        let mut conn = self.pool.acquire().await?;

        let Json(trip): Json<Trip> = conn
            .fetch_optional(sqlx::query("SELECT data FROM trips WHERE id = $1").bind(&id))
            .await?
            .ok_or_else(|| not_found_error())?
            .try_get("data")?;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn find_booking(&self, id: Uuid) -> Result<Booking, Error> {
        let mut conn = self.pool.acquire().await?;

        let Json(booking): Json<Booking> = conn
            .fetch_optional(sqlx::query("SELECT data FROM bookings WHERE id = $1").bind(&id))
            .await?
            .ok_or_else(|| not_found_error())?
            .try_get("data")?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn count_active_bookings(&self, trip_id: Uuid) -> Result<usize, Error> {
        let mut conn = self.pool.acquire().await?;

        let count: i64 = conn
            .fetch_one(
                sqlx::query(
                    "SELECT COUNT(*) AS count FROM bookings WHERE trip_id = $1 AND status = 'active'",
                )
                .bind(&trip_id),
            )
            .await?
            .try_get("count")?;

        Ok(count as usize)
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Database>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    #[tracing::instrument(skip(self))]
    async fn fetch_trip_for_update(&mut self, id: Uuid) -> Result<Trip, Error> {
        let Json(trip): Json<Trip> = self
            .tx
            .fetch_optional(sqlx::query("SELECT data FROM trips WHERE id = $1 FOR UPDATE").bind(&id))
            .await?
            .ok_or_else(|| not_found_error())?
            .try_get("data")?;

        Ok(trip)
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_booking_for_update(&mut self, id: Uuid) -> Result<Booking, Error> {
        let Json(booking): Json<Booking> = self
            .tx
            .fetch_optional(
                sqlx::query("SELECT data FROM bookings WHERE id = $1 FOR UPDATE").bind(&id),
            )
            .await?
            .ok_or_else(|| not_found_error())?
            .try_get("data")?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn count_active_bookings(&mut self, trip_id: Uuid) -> Result<usize, Error> {
        let count: i64 = self
            .tx
            .fetch_one(
                sqlx::query(
                    "SELECT COUNT(*) AS count FROM bookings WHERE trip_id = $1 AND status = 'active'",
                )
                .bind(&trip_id),
            )
            .await?
            .try_get("count")?;

        Ok(count as usize)
    }

    #[tracing::instrument(skip(self))]
    async fn list_active_bookings(&mut self, trip_id: Uuid) -> Result<Vec<Booking>, Error> {
        let mut bookings = Vec::new();

        let mut rows = self.tx.fetch(
            sqlx::query(
                "SELECT data FROM bookings WHERE trip_id = $1 AND status = 'active' ORDER BY id FOR UPDATE",
            )
            .bind(&trip_id),
        );

        while let Some(row) = rows.try_next().await? {
            let Json(booking): Json<Booking> = row.try_get("data")?;
            bookings.push(booking);
        }

        Ok(bookings)
    }

    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn insert_booking(&mut self, booking: &Booking) -> Result<(), Error> {
        self.tx
            .execute(
                sqlx::query(
                    "INSERT INTO bookings (id, trip_id, status, data) VALUES ($1, $2, $3, $4)",
                )
                .bind(&booking.id)
                .bind(&booking.trip_id)
                .bind(booking.status.name())
                .bind(Json(booking)),
            )
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id))]
    async fn update_booking_status(&mut self, booking: &Booking) -> Result<(), Error> {
        self.tx
            .execute(
                sqlx::query("UPDATE bookings SET status = $2, data = $3 WHERE id = $1")
                    .bind(&booking.id)
                    .bind(booking.status.name())
                    .bind(Json(booking)),
            )
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, cost))]
    async fn save_booking_cost(
        &mut self,
        booking_id: Uuid,
        cost: &BookingCost,
    ) -> Result<(), Error> {
        self.tx
            .execute(
                sqlx::query("UPDATE bookings SET data = jsonb_set(data, '{cost}', $2) WHERE id = $1")
                    .bind(&booking_id)
                    .bind(Json(cost)),
            )
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn update_trip_status(
        &mut self,
        trip_id: Uuid,
        status: &TripStatus,
    ) -> Result<(), Error> {
        self.tx
            .execute(
                sqlx::query(
                    "UPDATE trips SET status = $2, data = jsonb_set(data, '{status}', $3) WHERE id = $1",
                )
                .bind(&trip_id)
                .bind(status.name())
                .bind(Json(status)),
            )
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn save_trip_aggregate_cost(
        &mut self,
        trip_id: Uuid,
        cost: Option<&TripCost>,
    ) -> Result<(), Error> {
        self.tx
            .execute(
                sqlx::query("UPDATE trips SET data = jsonb_set(data, '{cost}', $2) WHERE id = $1")
                    .bind(&trip_id)
                    .bind(Json(cost)),
            )
            .await?;

        Ok(())
    }

    async fn commit(self) -> Result<(), Error> {
        self.tx.commit().await?;

        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        self.tx.rollback().await?;

        Ok(())
    }
}
