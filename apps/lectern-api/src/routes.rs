use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use lectern_service::{
	ChatTurnRequest, ChatTurnResponse, Error as ServiceError, ExplicitTurnRequest,
	ExplicitTurnResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/chat/turn", post(chat_turn))
		.route("/v1/chat/explicit", post(chat_explicit))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn chat_turn(
	State(state): State<AppState>,
	Json(payload): Json<ChatTurnRequest>,
) -> Result<Json<ChatTurnResponse>, ApiError> {
	let response = state.service.execute(payload).await?;

	Ok(Json(response))
}

async fn chat_explicit(
	State(state): State<AppState>,
	Json(payload): Json<ExplicitTurnRequest>,
) -> Result<Json<ExplicitTurnResponse>, ApiError> {
	let response = state.service.execute_with_context(payload).await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			ServiceError::SessionDenied { message } =>
				Self::new(StatusCode::FORBIDDEN, "SESSION_DENIED", message, None),
			ServiceError::Provider { message } => {
				tracing::error!(error = %message, "Provider error.");

				Self::new(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", "Upstream provider failed.", None)
			},
			ServiceError::Storage { message } | ServiceError::Qdrant { message } => {
				tracing::error!(error = %message, "Storage error.");

				Self::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"STORAGE_ERROR",
					"Internal storage error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}
