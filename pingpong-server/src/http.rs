//! HTTP API

use crate::system::{FeederSystem, SystemStatus};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use bytes::Bytes;
use pingpong_core::{Error, ServerConfig};
use pingpong_eye::{BallDetection, DetectionParameters};
use pingpong_motor::VariableValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tower_http::cors::CorsLayer;
use tracing::{debug, error};

pub const BANNER: &str = "Pingpong Ball Feeder System API";

const MJPEG_BOUNDARY: &str = "frame";

#[derive(Clone)]
pub struct AppState {
    pub system: Arc<FeederSystem>,
    pub server: ServerConfig,
}

impl AppState {
    pub fn new(system: Arc<FeederSystem>, server: ServerConfig) -> Self {
        Self { system, server }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/track-balls", get(track_balls_handler))
        .route("/ball-params", get(ball_params_handler))
        .route("/update-ball-params", post(update_ball_params_handler))
        .route("/control-servo", post(control_servo_handler))
        .route("/control/variables", get(list_variables_handler))
        .route("/control/variables/:name", put(write_variable_handler))
        .route("/video_feed", get(video_feed_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Error returned by every handler; renders as `{error, code}`
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        }
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        });
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn root_handler() -> Json<MessageResponse> {
    MessageResponse::new(BANNER)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let status = if state.system.is_shut_down() {
        "stopping"
    } else {
        "healthy"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn status_handler(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(state.system.status())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrackBallsResponse {
    pub balls: Vec<BallDetection>,
    pub total_balls: usize,
    /// Annotated frame, base64 JPEG
    pub frame: String,
}

async fn track_balls_handler(State(state): State<AppState>) -> ApiResult<Json<TrackBallsResponse>> {
    let report = state.system.latest_detections().await?;
    debug!(
        frame = report.frame_sequence,
        balls = report.detections.len(),
        "Detections served"
    );
    Ok(Json(TrackBallsResponse {
        total_balls: report.detections.len(),
        balls: report.detections,
        frame: report.frame_jpeg_base64,
    }))
}

async fn ball_params_handler(State(state): State<AppState>) -> Json<DetectionParameters> {
    Json(state.system.detection_parameters())
}

async fn update_ball_params_handler(
    State(state): State<AppState>,
    payload: Result<Json<DetectionParameters>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(params) = payload?;
    state.system.update_detection_parameters(params)?;
    Ok(MessageResponse::new("Ball detection parameters updated successfully"))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServoAngle {
    pub angle: i32,
}

async fn control_servo_handler(
    State(state): State<AppState>,
    payload: Result<Json<ServoAngle>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(ServoAngle { angle }) = payload?;
    state.system.set_actuator_angle(angle)?;
    Ok(MessageResponse::new(format!("Servo moved to {} degrees", angle)))
}

async fn list_variables_handler(State(state): State<AppState>) -> Json<BTreeMap<String, VariableValue>> {
    Json(state.system.control_variables().into_iter().collect())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VariableWrite {
    pub value: VariableValue,
}

async fn write_variable_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<VariableWrite>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(VariableWrite { value }) = payload?;
    state.system.write_control_variable(&name, value)?;
    Ok(MessageResponse::new(format!("Variable '{}' set to {}", name, value)))
}

/// Preview stream: the latest raw frame as multipart JPEG parts. Ticks
/// without a frame are skipped; the stream ends when the system shuts down.
async fn video_feed_handler(State(state): State<AppState>) -> ApiResult<Response> {
    let quality = state.server.stream_jpeg_quality;
    let mut ticker = tokio::time::interval(Duration::from_millis(state.server.stream_interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let stream = futures::stream::unfold((state.system, ticker), move |(system, mut ticker)| async move {
        loop {
            ticker.tick().await;
            if system.is_shut_down() {
                return None;
            }
            match system.latest_frame_jpeg(quality).await {
                Ok(jpeg) => {
                    let part = multipart_part(&jpeg);
                    return Some((Ok::<Bytes, Infallible>(part), (system, ticker)));
                }
                Err(e) => debug!("Preview frame skipped: {}", e),
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={}", MJPEG_BOUNDARY),
        )
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError(Error::Internal(format!("Failed to build stream response: {}", e))))
}

fn multipart_part(jpeg: &[u8]) -> Bytes {
    let mut part = Vec::with_capacity(jpeg.len() + 64);
    part.extend_from_slice(format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", MJPEG_BOUNDARY).as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}
