// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::schemas::FieldError;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia. Toda falha de
// uma atualização aborta a chamada inteira; nenhuma variante aqui resulta
// em escrita parcial.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Cliente não encontrado")]
    CustomerNotFound,

    #[error("Fatura não encontrada")]
    InvoiceNotFound,

    // Uma ou mais falhas de schema dentro de um bloco de configuração;
    // carrega TODOS os campos inválidos, não só o primeiro.
    #[error("Validação falhou em {section}")]
    SectionValidationFailed {
        section: &'static str,
        errors: Vec<FieldError>,
    },

    #[error("Dados sensíveis de cartão não são permitidos")]
    SensitiveDataRejected,

    #[error("{0}")]
    IdentityInvalid(String),

    // Um contato/endereço enviado com id que não pertence ao cliente
    #[error("Registro {0} não pertence ao cliente")]
    ChildNotOwned(Uuid),

    #[error("É necessário um contato financeiro com e-mail para envio automático de NFS-e")]
    MissingBillingContact,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Conflito de unicidade: {0}")]
    UniqueConstraintViolation(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Devolve todos os detalhes da validação de payload.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // Falha de schema em um bloco JSONB: seção + lista completa de
            // campos inválidos.
            AppError::SectionValidationFailed { section, errors } => {
                let body = Json(json!({
                    "error": format!("Validação falhou em {section}"),
                    "section": section,
                    "details": errors,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            AppError::CustomerNotFound => {
                (StatusCode::NOT_FOUND, "Cliente não encontrado.".to_string())
            }
            AppError::InvoiceNotFound => {
                (StatusCode::NOT_FOUND, "Fatura não encontrada.".to_string())
            }
            AppError::SensitiveDataRejected => (
                StatusCode::BAD_REQUEST,
                "Dados sensíveis de cartão não são permitidos.".to_string(),
            ),
            AppError::IdentityInvalid(reason) => (StatusCode::BAD_REQUEST, reason),
            AppError::ChildNotOwned(id) => (
                StatusCode::CONFLICT,
                format!("Registro {id} não pertence ao cliente."),
            ),
            AppError::MissingBillingContact => (
                StatusCode::BAD_REQUEST,
                "É necessário um contato financeiro com e-mail para envio automático de NFS-e."
                    .to_string(),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "E-mail ou senha inválidos.".to_string(),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::UniqueConstraintViolation(detail) => (StatusCode::CONFLICT, detail),

            // Todos os outros erros (DatabaseError, InternalServerError...)
            // viram 500; o `tracing` loga a mensagem detalhada.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
