// src/handlers/files.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{common::error::ApiError, config::AppState};

// GET /files/{id}: UUID = documento de usuário, inteiro = banco, depois fiscal
#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "Files",
    params(("id" = String, Path, description = "UUID ou ID numérico do documento")),
    responses(
        (status = 200, description = "Conteúdo do arquivo"),
        (status = 404, description = "Arquivo não encontrado")
    )
)]
pub async fn get_file(State(app_state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let file = app_state.file_service.fetch(id.trim()).await?;

    // Aspas no nome quebrariam o cabeçalho
    let disposition = format!("inline; filename=\"{}\"", file.file_name.replace('"', ""));
    let headers = [
        (header::CONTENT_TYPE, file.content_type),
        (header::CONTENT_DISPOSITION, disposition),
    ];

    Ok((headers, file.bytes).into_response())
}
