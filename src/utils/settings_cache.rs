use async_trait::async_trait;
use moka::future::Cache;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::{debug, info};

use crate::attendance::geofence::GeoFenceConfig;
use crate::attendance::store::GeoFenceSource;
use crate::error::AttendanceError;

const GEOFENCE_KEY: &str = "geofence";

/// Read-through cache over the singleton `settings` row.
pub struct GeoFenceSettings {
    pool: MySqlPool,
    cache: Cache<&'static str, GeoFenceConfig>,
}

impl GeoFenceSettings {
    pub fn new(pool: MySqlPool, ttl: Duration) -> Self {
        Self {
            pool,
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    async fn load(&self) -> Result<GeoFenceConfig, AttendanceError> {
        debug!("Loading geo-fence settings");

        sqlx::query_as::<_, GeoFenceConfig>(
            "SELECT office_lat, office_lng, radius FROM settings WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AttendanceError::Storage("geo-fence settings row is missing".to_string()))
    }

    /// Replaces the fence in place; the singleton row is created if absent.
    pub async fn update(&self, config: GeoFenceConfig) -> Result<GeoFenceConfig, AttendanceError> {
        config.validate()?;

        sqlx::query(
            r#"
            INSERT INTO settings (id, office_lat, office_lng, radius)
            VALUES (1, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                office_lat = VALUES(office_lat),
                office_lng = VALUES(office_lng),
                radius = VALUES(radius)
            "#,
        )
        .bind(config.office_latitude)
        .bind(config.office_longitude)
        .bind(config.radius_meters)
        .execute(&self.pool)
        .await?;

        self.cache.insert(GEOFENCE_KEY, config).await;
        info!(
            office_lat = config.office_latitude,
            office_lng = config.office_longitude,
            radius = config.radius_meters,
            "Geo-fence updated"
        );

        Ok(config)
    }

    pub async fn warmup(&self) -> anyhow::Result<()> {
        let config = self.current().await?;
        info!(radius = config.radius_meters, "Geo-fence cache warmup complete");
        Ok(())
    }
}

#[async_trait]
impl GeoFenceSource for GeoFenceSettings {
    async fn current(&self) -> Result<GeoFenceConfig, AttendanceError> {
        self.cache
            .try_get_with(GEOFENCE_KEY, self.load())
            .await
            .map_err(|e| (*e).clone())
    }
}
