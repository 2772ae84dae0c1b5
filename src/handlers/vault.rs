//! Vault query endpoints
//!
//! Read-only projection over the rows the watcher persists:
//! latest TVL, TVL history, alerts and a health probe. No business logic
//! lives here; the watcher owns all drop detection.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect};
use tracing::{error, info};

use crate::AppState;
use crate::entities::{
    alerts,
    prelude::{Alerts, TvlPoints},
    tvl_points,
};
use crate::models::vault::{
    AlertResponse, AlertsQuery, AlertsResponse, ErrorResponse, HealthResponse,
    ServiceInfoResponse, TvlHistoryQuery, TvlHistoryResponse, TvlPointResponse,
};

/// Routes consumed by the dashboard
pub fn vault_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/vaults/health", get(health))
        .route("/api/v1/vaults/{vault_address}/tvl/latest", get(get_latest_tvl))
        .route("/api/v1/vaults/{vault_address}/tvl", get(get_tvl_history))
        .route("/api/v1/vaults/{vault_address}/alerts", get(get_alerts))
}

/// GET / — service identity
pub async fn service_info() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        name: "DeFi Vault Tracker API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Monitors a vault's TVL and raises drop alerts".to_string(),
    })
}

/// GET /api/v1/vaults/health
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<ErrorResponse>)> {
    state.db.ping().await.map_err(|e| {
        error!(error = %e, "Health check failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Database connection failed".to_string(),
            }),
        )
    })?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    }))
}

/// GET /api/v1/vaults/{vault_address}/tvl/latest
pub async fn get_latest_tvl(
    State(state): State<AppState>,
    Path(vault_address): Path<String>,
) -> Result<Json<TvlPointResponse>, (StatusCode, Json<ErrorResponse>)> {
    let vault_address = vault_address.to_lowercase();

    let point = TvlPoints::find()
        .filter(tvl_points::Column::VaultAddress.eq(&vault_address))
        .order_by(tvl_points::Column::RecordedAt, Order::Desc)
        .one(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching latest TVL");
            internal_error()
        })?;

    match point {
        Some(p) => Ok(Json(tvl_point_response(p))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No TVL data found for vault".to_string(),
            }),
        )),
    }
}

/// GET /api/v1/vaults/{vault_address}/tvl
///
/// # Query Parameters
/// - `from` / `to`: RFC3339 bounds on recorded_at
/// - `limit`: newest rows to return (default: 100)
///
/// The body is in chronological order.
pub async fn get_tvl_history(
    State(state): State<AppState>,
    Path(vault_address): Path<String>,
    Query(query): Query<TvlHistoryQuery>,
) -> Result<Json<TvlHistoryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let vault_address = vault_address.to_lowercase();

    let mut select = TvlPoints::find()
        .filter(tvl_points::Column::VaultAddress.eq(&vault_address));

    if let Some(from) = query.from {
        select = select.filter(tvl_points::Column::RecordedAt.gte(from));
    }
    if let Some(to) = query.to {
        select = select.filter(tvl_points::Column::RecordedAt.lte(to));
    }

    let points = select
        .order_by(tvl_points::Column::RecordedAt, Order::Desc)
        .limit(query.limit)
        .all(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching TVL history");
            internal_error()
        })?;

    info!(
        vault = %vault_address,
        count = points.len(),
        "TVL history query completed"
    );

    let mut data: Vec<TvlPointResponse> =
        points.into_iter().map(tvl_point_response).collect();
    // Return in chronological order
    data.reverse();

    Ok(Json(TvlHistoryResponse {
        vault_address,
        data,
    }))
}

/// GET /api/v1/vaults/{vault_address}/alerts
pub async fn get_alerts(
    State(state): State<AppState>,
    Path(vault_address): Path<String>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let vault_address = vault_address.to_lowercase();

    let rows = Alerts::find()
        .filter(alerts::Column::VaultAddress.eq(&vault_address))
        .order_by(alerts::Column::CreatedAt, Order::Desc)
        .limit(query.limit)
        .all(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching alerts");
            internal_error()
        })?;

    let alerts = rows
        .into_iter()
        .map(|a| AlertResponse {
            id: a.id,
            vault_address: a.vault_address,
            network: a.network,
            block_number: a.block_number,
            drop_pct: a.drop_pct,
            tvl_before: a.tvl_before,
            tvl_after: a.tvl_after,
            confirmed: a.confirmed,
            created_at: a.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(Json(AlertsResponse {
        vault_address,
        alerts,
    }))
}

fn tvl_point_response(p: tvl_points::Model) -> TvlPointResponse {
    TvlPointResponse {
        vault_address: p.vault_address,
        network: p.network,
        block_number: p.block_number,
        tvl: p.tvl,
        recorded_at: p.recorded_at.with_timezone(&Utc),
    }
}

fn internal_error() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_service_info() {
        let app: Router = Router::new().route("/", get(service_info));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body_str = String::from_utf8(body.to_vec()).unwrap();
        assert!(body_str.contains("DeFi Vault Tracker API"));
        assert!(body_str.contains(env!("CARGO_PKG_VERSION")));
    }
}
