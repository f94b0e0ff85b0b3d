// src/services/file_service.rs

use std::path::PathBuf;

use uuid::Uuid;

use crate::{common::error::AppError, db::DocumentRepository, models::catalog::StoredDocument};

const FALLBACK_MIME: &str = "application/octet-stream";

// Identificador de arquivo: UUID para documentos de usuário, inteiro para banco/fiscal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileId {
    UserDocument(Uuid),
    Numeric(i32),
}

impl FileId {
    pub fn parse(raw: &str) -> Option<Self> {
        if let Ok(id) = Uuid::parse_str(raw) {
            return Some(FileId::UserDocument(id));
        }
        raw.parse::<i32>().ok().map(FileId::Numeric)
    }
}

#[derive(Debug)]
pub struct ServedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct FileService {
    repo: DocumentRepository,
}

impl FileService {
    pub fn new(repo: DocumentRepository) -> Self {
        Self { repo }
    }

    pub async fn fetch(&self, raw_id: &str) -> Result<ServedFile, AppError> {
        let not_found = || AppError::NotFound("File not found".into());
        let id = FileId::parse(raw_id).ok_or_else(not_found)?;

        let document = match id {
            FileId::UserDocument(uuid) => self.repo.find_user_document(uuid).await?,
            FileId::Numeric(n) => match self.repo.find_bank_document(n).await? {
                Some(doc) => Some(doc),
                None => self.repo.find_tax_document(n).await?,
            },
        }
        .ok_or_else(not_found)?;

        let StoredDocument { file_name, mime_type, document_data, document_url } = document;
        let bytes = if document_data.is_empty() {
            let path = document_url.map(PathBuf::from).ok_or_else(not_found)?;
            tokio::fs::read(&path).await.map_err(|e| {
                tracing::warn!("Arquivo do documento indisponível ({}): {}", path.display(), e);
                not_found()
            })?
        } else {
            document_data
        };

        Ok(ServedFile {
            file_name,
            content_type: mime_type.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| FALLBACK_MIME.into()),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_ids_dispatch_by_shape() {
        let uuid = Uuid::from_u128(5);
        assert_eq!(FileId::parse(&uuid.to_string()), Some(FileId::UserDocument(uuid)));
        assert_eq!(FileId::parse("17"), Some(FileId::Numeric(17)));
        assert_eq!(FileId::parse("abc"), None);
    }
}
