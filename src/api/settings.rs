use crate::attendance::geofence::GeoFenceConfig;
use crate::attendance::store::GeoFenceSource;
use crate::auth::auth::AuthUser;
use crate::utils::settings_cache::GeoFenceSettings;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateGeoFence {
    #[schema(example = 12.9716)]
    pub office_latitude: f64,
    #[schema(example = 77.5946)]
    pub office_longitude: f64,
    #[schema(example = 200.0)]
    pub radius_meters: f64,
}

/// Current geo-fence
#[utoipa::path(
    get,
    path = "/api/settings/geofence",
    responses(
        (status = 200, description = "Office point and radius", body = GeoFenceConfig),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Storage unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn get_geofence(
    _auth: AuthUser,
    settings: web::Data<GeoFenceSettings>,
) -> actix_web::Result<HttpResponse> {
    let fence = settings.current().await.map_err(|e| {
        error!(error = %e, "Failed to load geo-fence");
        e
    })?;

    Ok(HttpResponse::Ok().json(fence))
}

/// Update geo-fence (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/settings/geofence",
    request_body = UpdateGeoFence,
    responses(
        (status = 200, description = "Geo-fence updated", body = GeoFenceConfig),
        (status = 400, description = "Invalid office point or radius"),
        (status = 403, description = "HR/Admin only"),
        (status = 503, description = "Storage unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn update_geofence(
    auth: AuthUser,
    settings: web::Data<GeoFenceSettings>,
    payload: web::Json<UpdateGeoFence>,
) -> actix_web::Result<HttpResponse> {
    auth.require_hr_or_admin()?;

    let fence = GeoFenceConfig::new(
        payload.office_latitude,
        payload.office_longitude,
        payload.radius_meters,
    )?;
    let updated = settings.update(fence).await.map_err(|e| {
        error!(error = %e, "Failed to update geo-fence");
        e
    })?;

    Ok(HttpResponse::Ok().json(updated))
}
