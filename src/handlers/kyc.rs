// src/handlers/kyc.rs

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{common::error::ApiError, config::AppState, models::kyc::KycReport};

// GET /kyc/{user_id}: só exige login
#[utoipa::path(
    get,
    path = "/kyc/{user_id}",
    tag = "KYC",
    params(("user_id" = Uuid, Path, description = "ID do usuário")),
    responses(
        (status = 200, description = "Status e detalhes por seção", body = KycReport),
        (status = 404, description = "Usuário inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_kyc_status(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<KycReport>, ApiError> {
    Ok(Json(app_state.kyc_service.evaluate(user_id).await?))
}
