// src/models/customer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- ENUMS ---

// PJ = pessoa jurídica (CNPJ), PF = pessoa física (CPF). Clientes legados
// podem ainda não ter o tipo definido, por isso a coluna é opcional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "person_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PersonType {
    Pj,
    Pf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "customer_status")]
pub enum CustomerStatus {
    Active,
    Trial,
    Paused,
    Delinquent,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "address_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Billing,
    Operational,
}

// --- O CLIENTE (linha da tabela 'customers') ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,

    // Identificação & classificação
    pub person_type: Option<PersonType>,
    pub legal_name: Option<String>,
    pub trade_name: Option<String>,
    pub cnpj: Option<String>, // apenas dígitos
    pub cpf: Option<String>,  // apenas dígitos

    pub state_registration: Option<String>, // "ISENTO" permitido
    pub municipal_registration: Option<String>,
    pub main_cnae: Option<String>,
    pub company_size: Option<String>, // MEI/ME/EPP/Médio/Grande
    pub business_sector: Option<String>,

    pub status: CustomerStatus,
    pub risk_classification: Option<String>,
    pub tags: Vec<String>,

    // Blocos de configuração (JSONB). Cada um satisfaz o schema registrado
    // da sua seção; só o validador produz os valores gravados aqui.
    pub billing_prefs: Value,
    pub payment_prefs: Value,
    pub fiscal_rules: Value,
    pub nfse_settings: Value,
    pub dunning_rules: Value,
    pub finance_kpis: Value,
    pub accounting: Value,
    pub portal_config: Value,
    pub document_refs: Value,
    pub lgpd: Value,
    pub integrations: Value,

    // Auditoria
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

// --- COLEÇÕES FILHAS ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContact {
    pub id: Uuid,
    pub customer_id: Uuid,

    pub name: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub preferred_channel: Option<String>, // email/sms/whatsapp

    pub billing_responsible: bool,
    pub technical_responsible: bool,

    // Consentimento comercial (IP + data do aceite)
    pub consent_ip: Option<String>,
    pub consent_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAddress {
    pub id: Uuid,
    pub customer_id: Uuid,

    pub kind: AddressKind,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub district: String,
    pub city: String,
    pub state: String, // UF com 2 letras
    pub postal_code: String,
    pub country: String,
    pub ibge_city_code: Option<i32>,

    pub created_at: DateTime<Utc>,
}

/// O agregado completo: cliente + contatos + endereços, sempre carregado e
/// persistido como uma unidade.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAggregate {
    #[serde(flatten)]
    pub customer: Customer,
    pub contacts: Vec<CustomerContact>,
    pub addresses: Vec<CustomerAddress>,
}

// --- PAYLOADS DE ATUALIZAÇÃO ---

fn digits_only(value: &str, len: usize) -> Result<(), ValidationError> {
    if value.len() == len && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("digits");
        err.message = Some(format!("deve conter exatamente {len} dígitos").into());
        Err(err)
    }
}

fn validate_cnpj_shape(value: &str) -> Result<(), ValidationError> {
    digits_only(value, 14)
}

fn validate_cpf_shape(value: &str) -> Result<(), ValidationError> {
    digits_only(value, 11)
}

// Telefone com DDI opcional, 10 a 15 dígitos
fn validate_phone_shape(value: &str) -> Result<(), ValidationError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    if (10..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("telefone inválido (use DDI opcional e 10-15 dígitos)".into());
        Err(err)
    }
}

fn validate_preferred_channel(value: &str) -> Result<(), ValidationError> {
    if matches!(value, "email" | "sms" | "whatsapp") {
        Ok(())
    } else {
        let mut err = ValidationError::new("channel");
        err.message = Some("canal deve ser email, sms ou whatsapp".into());
        Err(err)
    }
}

fn validate_uf(value: &str) -> Result<(), ValidationError> {
    if value.len() == 2 && value.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("uf");
        err.message = Some("UF deve ter 2 letras maiúsculas".into());
        Err(err)
    }
}

// CEP: 00000-000 ou 00000000
fn validate_cep(value: &str) -> Result<(), ValidationError> {
    let b = value.as_bytes();
    let ok = match b.len() {
        8 => b.iter().all(u8::is_ascii_digit),
        9 => {
            b[..5].iter().all(u8::is_ascii_digit)
                && b[5] == b'-'
                && b[6..].iter().all(u8::is_ascii_digit)
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("cep");
        err.message = Some("CEP inválido".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    // Presente quando o contato já existe; ausente cria um novo
    pub id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Maria da Silva")]
    pub name: String,

    pub role: Option<String>,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    #[validate(custom(function = "validate_phone_shape"))]
    pub phone: Option<String>,

    #[validate(custom(function = "validate_phone_shape"))]
    pub whatsapp: Option<String>,

    #[validate(custom(function = "validate_preferred_channel"))]
    pub preferred_channel: Option<String>,

    pub billing_responsible: Option<bool>,
    pub technical_responsible: Option<bool>,

    pub consent_ip: Option<String>,
    pub consent_at: Option<DateTime<Utc>>,
}

impl ContactPayload {
    pub fn create_row(&self, customer_id: Uuid) -> CustomerContact {
        CustomerContact {
            id: Uuid::new_v4(),
            customer_id,
            name: self.name.clone(),
            role: self.role.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            whatsapp: self.whatsapp.clone(),
            preferred_channel: self.preferred_channel.clone(),
            billing_responsible: self.billing_responsible.unwrap_or(false),
            technical_responsible: self.technical_responsible.unwrap_or(false),
            consent_ip: self.consent_ip.clone(),
            consent_at: self.consent_at,
            created_at: Utc::now(),
        }
    }

    /// Sobrescreve no registro existente apenas os campos enviados; id e
    /// vínculo com o cliente são preservados.
    pub fn apply_to(&self, row: &mut CustomerContact) {
        row.name = self.name.clone();
        if self.role.is_some() {
            row.role = self.role.clone();
        }
        if self.email.is_some() {
            row.email = self.email.clone();
        }
        if self.phone.is_some() {
            row.phone = self.phone.clone();
        }
        if self.whatsapp.is_some() {
            row.whatsapp = self.whatsapp.clone();
        }
        if self.preferred_channel.is_some() {
            row.preferred_channel = self.preferred_channel.clone();
        }
        if let Some(flag) = self.billing_responsible {
            row.billing_responsible = flag;
        }
        if let Some(flag) = self.technical_responsible {
            row.technical_responsible = flag;
        }
        if self.consent_ip.is_some() {
            row.consent_ip = self.consent_ip.clone();
        }
        if self.consent_at.is_some() {
            row.consent_at = self.consent_at;
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub id: Option<Uuid>,

    pub kind: AddressKind,

    #[validate(length(min = 1, message = "required"))]
    pub street: String,
    #[validate(length(min = 1, message = "required"))]
    pub number: String,
    pub complement: Option<String>,
    #[validate(length(min = 1, message = "required"))]
    pub district: String,
    #[validate(length(min = 1, message = "required"))]
    pub city: String,

    #[validate(custom(function = "validate_uf"))]
    #[schema(example = "PR")]
    pub state: String,

    #[validate(custom(function = "validate_cep"))]
    #[schema(example = "80010-000")]
    pub postal_code: String,

    pub country: Option<String>,
    pub ibge_city_code: Option<i32>,
}

impl AddressPayload {
    pub fn create_row(&self, customer_id: Uuid) -> CustomerAddress {
        CustomerAddress {
            id: Uuid::new_v4(),
            customer_id,
            kind: self.kind,
            street: self.street.clone(),
            number: self.number.clone(),
            complement: self.complement.clone(),
            district: self.district.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone().unwrap_or_else(|| "Brasil".to_string()),
            ibge_city_code: self.ibge_city_code,
            created_at: Utc::now(),
        }
    }

    pub fn apply_to(&self, row: &mut CustomerAddress) {
        row.kind = self.kind;
        row.street = self.street.clone();
        row.number = self.number.clone();
        if self.complement.is_some() {
            row.complement = self.complement.clone();
        }
        row.district = self.district.clone();
        row.city = self.city.clone();
        row.state = self.state.clone();
        row.postal_code = self.postal_code.clone();
        if let Some(country) = &self.country {
            row.country = country.clone();
        }
        if self.ibge_city_code.is_some() {
            row.ibge_city_code = self.ibge_city_code;
        }
    }
}

/// Payload do PATCH /api/customers/{id}: tudo opcional. Campo ausente
/// mantém o valor armazenado (atualização parcial, nunca full-replace).
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerPayload {
    // 1) Identificação
    pub person_type: Option<PersonType>,

    pub legal_name: Option<String>,
    pub trade_name: Option<String>,

    #[validate(custom(function = "validate_cnpj_shape"))]
    #[schema(example = "11444777000161")]
    pub cnpj: Option<String>, // só dígitos

    #[validate(custom(function = "validate_cpf_shape"))]
    #[schema(example = "52998224725")]
    pub cpf: Option<String>,

    pub state_registration: Option<String>,
    pub municipal_registration: Option<String>,
    pub main_cnae: Option<String>,
    pub company_size: Option<String>,
    pub business_sector: Option<String>,

    pub status: Option<CustomerStatus>,
    pub risk_classification: Option<String>,

    pub tags: Option<Vec<String>>,

    // 2) Contatos & Endereços
    #[validate(nested)]
    pub contacts: Option<Vec<ContactPayload>>,
    #[validate(nested)]
    pub addresses: Option<Vec<AddressPayload>>,

    // 3) Blocos de configuração, validados no serviço pelo registro de
    // schemas, seção por seção
    #[schema(value_type = Object)]
    pub billing_prefs: Option<Value>,
    #[schema(value_type = Object)]
    pub payment_prefs: Option<Value>,
    #[schema(value_type = Object)]
    pub fiscal_rules: Option<Value>,
    #[schema(value_type = Object)]
    pub nfse_settings: Option<Value>,
    #[schema(value_type = Object)]
    pub dunning_rules: Option<Value>,
    #[schema(value_type = Object)]
    pub finance_kpis: Option<Value>,
    #[schema(value_type = Object)]
    pub accounting: Option<Value>,
    #[schema(value_type = Object)]
    pub portal_config: Option<Value>,
    #[schema(value_type = Object)]
    pub document_refs: Option<Value>,
    #[schema(value_type = Object)]
    pub lgpd: Option<Value>,
    #[schema(value_type = Object)]
    pub integrations: Option<Value>,
}

/// Página de clientes da listagem com busca.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPage {
    pub total: i64,
    pub items: Vec<Customer>,
    pub limit: i64,
    pub offset: i64,
}
