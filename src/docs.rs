// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;
use crate::schemas;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Customers ---
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::update_customer,

        // --- Invoices ---
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,

        // --- Ops ---
        handlers::ops::get_metrics,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::UserInfo,
            models::auth::LoginPayload,
            models::auth::LoginResponse,
            models::auth::Claims,

            // --- Customers ---
            models::customer::PersonType,
            models::customer::CustomerStatus,
            models::customer::AddressKind,
            models::customer::Customer,
            models::customer::CustomerContact,
            models::customer::CustomerAddress,
            models::customer::CustomerAggregate,
            models::customer::ContactPayload,
            models::customer::AddressPayload,
            models::customer::UpdateCustomerPayload,
            models::customer::CustomerPage,
            schemas::FieldError,

            // --- Invoices / Ops ---
            models::billing::InvoiceStatus,
            models::billing::Invoice,
            models::billing::InvoiceItem,
            models::billing::InvoiceWithItems,
            models::billing::FinanceMetrics,

            // --- Payloads ---
            handlers::customers::ListCustomersQuery,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação do admin"),
        (name = "Customers", description = "Gestão de clientes (agregado com contatos e endereços)"),
        (name = "Invoices", description = "Consulta de faturas"),
        (name = "Ops", description = "Indicadores financeiros")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
