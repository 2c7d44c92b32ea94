//! Upstream proxies
//!
//! `GET /environmental/{waqi,safar,openaq}` forward to the provider and pass
//! the raw JSON through as `{success, data, source, error?}`:
//! - 200 on success
//! - 400 when a required query parameter is missing
//! - 502 when the upstream fails or returns a non-2xx status
//! - 503 when the WAQI key is not configured

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::DashboardState;
use crate::config::SourcesConfig;
use crate::index::MetalLimits;
use crate::sources::{openaq, safar, waqi, OpenAqAdapter, SafarAdapter, SourceError, WaqiAdapter};

/// Concrete provider clients used by the proxy routes.
pub struct ProxyClients {
    pub waqi: WaqiAdapter,
    pub safar: SafarAdapter,
    pub openaq: OpenAqAdapter,
}

impl ProxyClients {
    pub fn from_config(
        config: &SourcesConfig,
        client: reqwest::Client,
        limits: &MetalLimits,
    ) -> Self {
        Self {
            waqi: WaqiAdapter::new(
                client.clone(),
                &config.waqi_base_url,
                config.waqi_api_key.clone(),
                config.cities.clone(),
                limits.clone(),
            ),
            safar: SafarAdapter::new(
                client.clone(),
                &config.safar_base_url,
                config.cities.clone(),
                limits.clone(),
            ),
            openaq: OpenAqAdapter::new(
                client,
                &config.openaq_base_url,
                &config.openaq_country,
                config.openaq_limit,
                limits.clone(),
            ),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProxyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type ProxyReply = (StatusCode, Json<ProxyResponse>);

fn reply(source: &str, result: Result<serde_json::Value, SourceError>) -> ProxyReply {
    match result {
        Ok(data) => (
            StatusCode::OK,
            Json(ProxyResponse {
                success: true,
                data: Some(data),
                source: source.to_string(),
                error: None,
            }),
        ),
        Err(e) => {
            let status = match e {
                SourceError::MissingApiKey(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            };
            warn!(source, error = %e, "Proxy request failed");
            failure(status, source, e.to_string())
        }
    }
}

fn failure(status: StatusCode, source: &str, error: String) -> ProxyReply {
    (
        status,
        Json(ProxyResponse {
            success: false,
            data: None,
            source: source.to_string(),
            error: Some(error),
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub city: Option<String>,
}

fn required_city(params: CityQuery) -> Option<String> {
    params.city.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

/// GET /environmental/waqi?city=
pub async fn proxy_waqi(
    State(state): State<DashboardState>,
    Query(params): Query<CityQuery>,
) -> ProxyReply {
    let Some(city) = required_city(params) else {
        return failure(
            StatusCode::BAD_REQUEST,
            waqi::LABEL,
            "query parameter 'city' is required".into(),
        );
    };
    reply(waqi::LABEL, state.proxies.waqi.fetch_city(&city).await)
}

/// GET /environmental/safar?city=
pub async fn proxy_safar(
    State(state): State<DashboardState>,
    Query(params): Query<CityQuery>,
) -> ProxyReply {
    let Some(city) = required_city(params) else {
        return failure(
            StatusCode::BAD_REQUEST,
            safar::LABEL,
            "query parameter 'city' is required".into(),
        );
    };
    reply(safar::LABEL, state.proxies.safar.fetch_city(&city).await)
}

#[derive(Debug, Deserialize)]
pub struct OpenAqQuery {
    pub country: Option<String>,
    pub limit: Option<u32>,
}

/// GET /environmental/openaq?country=&limit=
pub async fn proxy_openaq(
    State(state): State<DashboardState>,
    Query(params): Query<OpenAqQuery>,
) -> ProxyReply {
    let client = &state.proxies.openaq;
    let country = params
        .country
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| client.default_country().to_string());
    let limit = params.limit.unwrap_or_else(|| client.default_limit());
    reply(openaq::LABEL, client.fetch_measurements(&country, limit).await)
}
