// src/handlers/customers.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::customer::{CustomerAggregate, CustomerPage, UpdateCustomerPayload},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListCustomersQuery {
    /// Termo de busca: razão social, fantasia, e-mail ou dígitos de
    /// CNPJ/CPF/whatsapp
    pub q: Option<String>,
    /// Máx 500 (default 100)
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order_by: Option<String>,
    /// ASC | DESC (default ASC)
    pub order_dir: Option<String>,
}

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    params(
        ("q" = Option<String>, Query, description = "Termo de busca"),
        ("limit" = Option<i64>, Query, description = "Máx 500 (default 100)"),
        ("offset" = Option<i64>, Query, description = "Default 0"),
        ("orderBy" = Option<String>, Query, description = "Campo de ordenação (ex.: legal_name)"),
        ("orderDir" = Option<String>, Query, description = "ASC | DESC")
    ),
    responses(
        (status = 200, description = "Página de clientes", body = CustomerPage)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    Query(query): Query<ListCustomersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .customer_repo
        .list(
            query.q.as_deref(),
            query.limit.unwrap_or(100),
            query.offset.unwrap_or(0),
            query.order_by.as_deref().unwrap_or("legal_name"),
            query.order_dir.as_deref().unwrap_or("ASC"),
        )
        .await?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(
        ("id" = Uuid, Path, description = "ID do cliente")
    ),
    responses(
        (status = 200, description = "Cliente com contatos e endereços", body = CustomerAggregate),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let aggregate = app_state.customer_service.get_customer(id).await?;
    Ok((StatusCode::OK, Json(aggregate)))
}

// PATCH /api/customers/{id}
#[utoipa::path(
    patch,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(
        ("id" = Uuid, Path, description = "ID do cliente")
    ),
    request_body = UpdateCustomerPayload,
    responses(
        (status = 200, description = "Agregado atualizado", body = CustomerAggregate),
        (status = 400, description = "Validação de seção/identidade ou dados sensíveis"),
        (status = 404, description = "Cliente não encontrado"),
        (status = 409, description = "Contato/endereço de outro cliente ou documento duplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let aggregate = app_state
        .customer_service
        .update_customer(id, payload, &claims.email)
        .await?;

    Ok((StatusCode::OK, Json(aggregate)))
}
