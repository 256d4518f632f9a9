use tracing::debug;
use uuid::Uuid;
use villa_core::models::Stats;
use villa_core::{CoreError, CoreResult};

use crate::Stores;

/// Whose figures to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsScope {
    /// Every place, booking and account on the platform.
    Admin,
    /// Only the places owned by this user and their bookings. `total_users`
    /// counts distinct guests.
    Owner(Uuid),
}

/// Dashboard totals.
#[derive(Clone)]
pub struct Aggregator {
    stores: Stores,
}

impl Aggregator {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn stats(&self, scope: StatsScope) -> CoreResult<Stats> {
        let stats = match scope {
            StatsScope::Admin => {
                let total_villas = self.stores.places.count_places().await.map_err(CoreError::dependency)?;
                let totals = self.stores.bookings.totals(None).await.map_err(CoreError::dependency)?;
                let total_users = self.stores.users.count_users().await.map_err(CoreError::dependency)?;

                Stats {
                    total_villas,
                    total_bookings: totals.bookings,
                    total_users,
                    total_earnings: totals.earnings,
                }
            }
            StatsScope::Owner(owner_id) => {
                let owned = self.stores.places.list_owned(owner_id).await.map_err(CoreError::dependency)?;
                let ids: Vec<Uuid> = owned.iter().map(|p| p.id).collect();
                let totals = self.stores.bookings.totals(Some(&ids)).await.map_err(CoreError::dependency)?;

                Stats {
                    total_villas: ids.len() as i64,
                    total_bookings: totals.bookings,
                    total_users: totals.distinct_users,
                    total_earnings: totals.earnings,
                }
            }
        };

        debug!(?scope, bookings = stats.total_bookings, "Computed stats");
        Ok(stats)
    }
}
