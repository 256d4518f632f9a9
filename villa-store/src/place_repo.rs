use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use villa_core::models::Place;
use villa_core::repository::{PlaceRepository, RepoResult};

pub struct PgPlaceRepository {
    pool: PgPool,
}

impl PgPlaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PlaceRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    price: Decimal,
    max_guests: i32,
}

impl From<PlaceRow> for Place {
    fn from(row: PlaceRow) -> Self {
        Place {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            price: row.price,
            max_guests: row.max_guests,
        }
    }
}

#[async_trait]
impl PlaceRepository for PgPlaceRepository {
    async fn get_place(&self, id: Uuid) -> RepoResult<Option<Place>> {
        let row = sqlx::query_as::<_, PlaceRow>(
            "SELECT id, owner_id, title, price, max_guests FROM places WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Place::from))
    }

    async fn get_places(&self, ids: &[Uuid]) -> RepoResult<Vec<Place>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PlaceRow>(
            "SELECT id, owner_id, title, price, max_guests FROM places WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Place::from).collect())
    }

    async fn list_owned(&self, owner_id: Uuid) -> RepoResult<Vec<Place>> {
        let rows = sqlx::query_as::<_, PlaceRow>(
            "SELECT id, owner_id, title, price, max_guests FROM places WHERE owner_id = $1 ORDER BY title",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Place::from).collect())
    }

    async fn count_places(&self) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM places")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
