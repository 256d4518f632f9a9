use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use villa_core::models::{Booking, BookingTotals};
use villa_core::repository::{BookingRepository, RepoResult};

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, place_id, user_id, check_in, check_out, number_of_guests, name, phone, price, payment_id, created_at";

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    place_id: Uuid,
    user_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    number_of_guests: i32,
    name: String,
    phone: String,
    price: Decimal,
    payment_id: String,
    created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            place_id: row.place_id,
            user_id: row.user_id,
            check_in: row.check_in,
            check_out: row.check_out,
            number_of_guests: row.number_of_guests,
            name: row.name,
            phone: row.phone,
            price: row.price,
            payment_id: row.payment_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TotalsRow {
    bookings: i64,
    distinct_users: i64,
    earnings: Decimal,
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert_booking(&self, booking: &Booking, reject_overlaps: bool) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        if reject_overlaps {
            // Serialises inserts per place until commit.
            sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                .bind(booking.place_id.to_string())
                .execute(&mut *tx)
                .await?;

            let clash: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM bookings
                    WHERE place_id = $1
                      AND check_in <= $3
                      AND $2 <= GREATEST(check_in, check_out)
                )
                "#,
            )
            .bind(booking.place_id)
            .bind(booking.check_in)
            .bind(booking.check_out)
            .fetch_one(&mut *tx)
            .await?;

            if clash {
                tx.rollback().await?;
                return Ok(false);
            }
        }

        sqlx::query(
            r#"
            INSERT INTO bookings (id, place_id, user_id, check_in, check_out, number_of_guests, name, phone, price, payment_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(booking.id)
        .bind(booking.place_id)
        .bind(booking.user_id)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(booking.number_of_guests)
        .bind(&booking.name)
        .bind(&booking.phone)
        .bind(booking.price)
        .bind(&booking.payment_id)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE id = $1",
            BOOKING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Booking::from))
    }

    async fn list_for_place(&self, place_id: Uuid) -> RepoResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE place_id = $1 ORDER BY check_in",
            BOOKING_COLUMNS
        ))
        .bind(place_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> RepoResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY check_in DESC",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn list_for_places(&self, place_ids: &[Uuid], limit: Option<i64>) -> RepoResult<Vec<Booking>> {
        if place_ids.is_empty() {
            return Ok(Vec::new());
        }

        // LIMIT NULL is "no limit" in Postgres.
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE place_id = ANY($1) ORDER BY check_in DESC LIMIT $2",
            BOOKING_COLUMNS
        ))
        .bind(place_ids)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn list_all(&self, limit: Option<i64>) -> RepoResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings ORDER BY check_in DESC LIMIT $1",
            BOOKING_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn delete_booking(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_owned_booking(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn totals(&self, place_ids: Option<&[Uuid]>) -> RepoResult<BookingTotals> {
        let row = match place_ids {
            Some(ids) => {
                sqlx::query_as::<_, TotalsRow>(
                    r#"
                    SELECT COUNT(*) AS bookings,
                           COUNT(DISTINCT user_id) AS distinct_users,
                           COALESCE(SUM(price), 0) AS earnings
                    FROM bookings
                    WHERE place_id = ANY($1)
                    "#,
                )
                .bind(ids)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, TotalsRow>(
                    r#"
                    SELECT COUNT(*) AS bookings,
                           COUNT(DISTINCT user_id) AS distinct_users,
                           COALESCE(SUM(price), 0) AS earnings
                    FROM bookings
                    "#,
                )
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(BookingTotals {
            bookings: row.bookings,
            distinct_users: row.distinct_users,
            earnings: row.earnings,
        })
    }
}
