//! HTTP API.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::error::{AppError, code};
use crate::report::ReportVariant;
use crate::service::ReportService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ReportService>,
}

/// JSON body of every non-file response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: code::OK,
            message: code::message(code::OK).to_string(),
            data: Some(data),
        }
    }
}

pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }

        let body = Envelope::<()> {
            code: self.0.code(),
            message: self.0.to_string(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    year: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/ping", get(ping))
        .route("/init/calendar/:year", get(init_calendar))
        .route("/attendance/detail/:month", get(detail_report))
        .route("/attendance/record/:month", get(record_report));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}

async fn ping() -> Json<Envelope<&'static str>> {
    Json(Envelope::ok("pong!"))
}

async fn init_calendar(State(state): State<AppState>, Path(year): Path<String>) -> ApiResult<Json<Envelope<usize>>> {
    let year = parse_number::<i32>("year", &year)?;
    let days = state.service.init_calendar(year).await?;
    Ok(Json(Envelope::ok(days)))
}

async fn detail_report(
    State(state): State<AppState>,
    Path(month): Path<String>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Response> {
    report(&state, &month, query, ReportVariant::Detail).await
}

async fn record_report(
    State(state): State<AppState>,
    Path(month): Path<String>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Response> {
    report(&state, &month, query, ReportVariant::Record).await
}

async fn report(state: &AppState, month: &str, query: YearQuery, variant: ReportVariant) -> ApiResult<Response> {
    let month = parse_number::<u32>("month", month)?;
    let year = match query.year.as_deref() {
        Some(year) => parse_number::<i32>("year", year)?,
        None => Utc::now().with_timezone(&state.service.rules().offset).year(),
    };

    let report = state
        .service
        .generate(year, month, variant)
        .await
        .inspect_err(|e| tracing::warn!("{} report for {year}-{month:02} failed: {e}", variant.slug()))?;
    let headers = [
        (header::CONTENT_TYPE, report.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.file_name),
        ),
    ];
    Ok((headers, report.bytes).into_response())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::validation(format!("Invalid {name} '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::service;
    use crate::store::memory::{MemoryStore, WeekendHolidays};
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(source: WeekendHolidays) -> Router {
        let service = service(Arc::new(MemoryStore::default()), Arc::new(source));
        router(AppState {
            service: Arc::new(service),
        })
    }

    async fn send(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn envelope(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let response = send(app(WeekendHolidays::default()), "/api/v1/ping").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = envelope(response).await;
        assert_eq!(body["code"], 0);
        assert_eq!(body["data"], "pong!");
    }

    #[tokio::test]
    async fn test_init_calendar() {
        let response = send(app(WeekendHolidays::default()), "/api/v1/init/calendar/2024").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(envelope(response).await["data"], 366);
    }

    #[tokio::test]
    async fn test_detail_download() {
        let response = send(app(WeekendHolidays::default()), "/api/v1/attendance/detail/5?year=2023").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"attendance_detail_202305.xlsx\""
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[tokio::test]
    async fn test_bad_params() {
        for uri in [
            "/api/v1/attendance/record/13?year=2023",
            "/api/v1/attendance/record/may?year=2023",
            "/api/v1/attendance/detail/5?year=abc",
            "/api/v1/init/calendar/twenty",
        ] {
            let response = send(app(WeekendHolidays::default()), uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(envelope(response).await["code"], code::PARAMS_ERROR, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let source = WeekendHolidays {
            fail: true,
            ..WeekendHolidays::default()
        };
        let response = send(app(source), "/api/v1/attendance/record/5?year=2023").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(envelope(response).await["code"], code::SERVICE_UNAVAILABLE);
    }
}
