// src/schemas/sections.rs

//! O registro de schemas das seções de configuração do cliente.
//!
//! Cada cliente carrega onze blocos JSONB independentes (cobrança, pagamento,
//! fiscal, NFS-e, régua de cobrança, KPIs, contabilidade, portal, documentos,
//! LGPD e integrações). As tabelas abaixo declaram campo a campo o shape de
//! cada bloco: tipos, faixas numéricas, enumerações e defaults.

use serde_json::Value;

use super::engine::{DefaultValue as Dv, Field, FieldError, Presence, Rule, validate_object};

const fn req(key: &'static str, rule: Rule) -> Field {
    Field { key, rule, presence: Presence::Required }
}

const fn opt(key: &'static str, rule: Rule) -> Field {
    Field { key, rule, presence: Presence::Optional }
}

const fn def(key: &'static str, rule: Rule, default: Dv) -> Field {
    Field { key, rule, presence: Presence::Default(default) }
}

// Regras reutilizadas entre seções
const STR: Rule = Rule::Str { min: 0, max: usize::MAX };
const STR1: Rule = Rule::Str { min: 1, max: usize::MAX };
const PERCENT: Rule = Rule::Float { min: 0.0, max: 100.0 };
const MONEY: Rule = Rule::Float { min: 0.0, max: f64::INFINITY };
const POS_INT: Rule = Rule::Int { min: 0, max: i64::MAX };

const CHANNELS: &[&str] = &["email", "sms", "whatsapp", "portal"];
const REMINDER_CHANNELS: &[&str] = &["email", "sms", "whatsapp"];
const GATEWAYS: &[&str] = &["Pagar.me", "Stripe", "PagSeguro", "MercadoPago", "Outro"];

// ---------------------------------------------------------------------------
// Preferências de Cobrança & Faturamento
// ---------------------------------------------------------------------------

static INVOICE_WEBHOOK: &[Field] = &[
    def("enabled", Rule::Bool, Dv::Bool(false)),
    opt("url", Rule::Url),
];

static BILLING_PREFS: &[Field] = &[
    def("currency", STR, Dv::Str("BRL")),
    def("invoiceDay", Rule::Int { min: 1, max: 28 }, Dv::Int(1)),
    def("paymentTermDays", POS_INT, Dv::Int(7)),
    // Limites razoáveis para multa e juros
    def("lateFeePercent", Rule::Float { min: 0.0, max: 20.0 }, Dv::Float(2.0)),
    def("monthlyInterestPercent", Rule::Float { min: 0.0, max: 20.0 }, Dv::Float(1.0)),
    def("earlyPaymentDiscountPercent", PERCENT, Dv::Float(0.0)),
    def("annualAdjustmentIndex", Rule::OneOf(&["IPCA", "IGP-M", "Fixo", "Outro"]), Dv::Str("IPCA")),
    opt("adjustmentBaseDate", Rule::IsoDate),
    def("invoiceChannels", Rule::OneOfArray { allowed: CHANNELS, min: 0 }, Dv::StrList(&["email"])),
    def("communicationLanguage", Rule::OneOf(&["pt-BR", "en-US"]), Dv::Str("pt-BR")),
    def("attachPdfToInvoice", Rule::Bool, Dv::Bool(true)),
    def("defaultInvoiceNote", Rule::Str { min: 0, max: 3000 }, Dv::Str("")),
    def("includeBoletos", Rule::Bool, Dv::Bool(false)),
    def("autoSendFiscalNote", Rule::Bool, Dv::Bool(true)),
    def("invoiceWebhook", Rule::Object(INVOICE_WEBHOOK), Dv::NestedDefaults),
];

// ---------------------------------------------------------------------------
// Meios de Pagamento & Credenciais (apenas flags/tokens; nunca PAN/CVV)
// ---------------------------------------------------------------------------

static PIX: &[Field] = &[
    def("acceptsPix", Rule::Bool, Dv::Bool(true)),
    opt("instructions", Rule::Str { min: 0, max: 2000 }),
];

static CARD: &[Field] = &[
    def("payWithCard", Rule::Bool, Dv::Bool(false)),
    opt("tokenizedCardId", Rule::Str { min: 0, max: 255 }),
];

static BOLETO: &[Field] = &[
    def("acceptsBoleto", Rule::Bool, Dv::Bool(false)),
    def("boletoDays", POS_INT, Dv::Int(3)),
    opt("boletoInstructions", Rule::Str { min: 0, max: 2000 }),
];

static TRANSFER: &[Field] = &[
    def("acceptsTransfer", Rule::Bool, Dv::Bool(false)),
    opt("transferInstructions", Rule::Str { min: 0, max: 2000 }),
];

static GATEWAY_PREFS: &[Field] = &[
    opt("cardGateway", Rule::OneOf(GATEWAYS)),
    opt("pixGateway", Rule::OneOf(GATEWAYS)),
    opt("boletoGateway", Rule::OneOf(GATEWAYS)),
];

static PAYMENT_PREFS: &[Field] = &[
    def("preferredMethod", Rule::OneOf(&["Pix", "Cartão", "Boleto", "Transferência"]), Dv::Str("Pix")),
    def("pix", Rule::Object(PIX), Dv::NestedDefaults),
    def("card", Rule::Object(CARD), Dv::NestedDefaults),
    def("boleto", Rule::Object(BOLETO), Dv::NestedDefaults),
    def("transfer", Rule::Object(TRANSFER), Dv::NestedDefaults),
    def("gateways", Rule::Object(GATEWAY_PREFS), Dv::NestedDefaults),
    def("creditLimit", MONEY, Dv::Float(0.0)),
    def("blockOnDelinquency", Rule::Bool, Dv::Bool(true)),
    def("blockAfterDays", Rule::Int { min: 1, max: 120 }, Dv::Int(15)),
];

// ---------------------------------------------------------------------------
// Regras de Tributação & Retenções
// ---------------------------------------------------------------------------

static FISCAL_RULES: &[Field] = &[
    req("serviceCity", STR1),
    // Item da lista de serviços da LC 116 (ex.: "1.05")
    req("serviceListItemLc116", STR1),
    opt("municipalTaxCode", STR1),
    def("issRatePercent", PERCENT, Dv::Float(5.0)),
    def("issWithheld", Rule::Bool, Dv::Bool(false)),
    def("irrfWithheld", Rule::Bool, Dv::Bool(false)),
    def("irrfRatePercent", PERCENT, Dv::Float(0.0)),
    def("inssWithheld", Rule::Bool, Dv::Bool(false)),
    def("inssRatePercent", PERCENT, Dv::Float(0.0)),
    def("csllWithheld", Rule::Bool, Dv::Bool(false)),
    def("csllRatePercent", PERCENT, Dv::Float(0.0)),
    def("pisWithheld", Rule::Bool, Dv::Bool(false)),
    def("pisRatePercent", PERCENT, Dv::Float(0.0)),
    def("cofinsWithheld", Rule::Bool, Dv::Bool(false)),
    def("cofinsRatePercent", PERCENT, Dv::Float(0.0)),
    opt("takerMunicipalRegistration", STR),
    def("issExigibility", Rule::OneOf(&["Normal", "Exigibilidade Suspensa", "Isento"]), Dv::Str("Normal")),
    opt("specialTaxRegime", Rule::Nullable(&STR)),
    def("fiscalNotes", Rule::Str { min: 0, max: 3000 }, Dv::Str("")),
];

// ---------------------------------------------------------------------------
// NFS-e
// ---------------------------------------------------------------------------

static NFSE_SETTINGS: &[Field] = &[
    // Ex.: "Curitiba/PR"
    req("cityHall", STR1),
    def("environment", Rule::OneOf(&["Producao", "Homologacao", "Produção", "Homologação"]), Dv::Str("Producao")),
    def("rpsSeries", STR1, Dv::Str("A")),
    def("rpsNextNumber", Rule::Int { min: 1, max: i64::MAX }, Dv::Int(1)),
    def("batchNextNumber", Rule::Int { min: 1, max: i64::MAX }, Dv::Int(1)),
    def("autoSendToCustomerEmail", Rule::Bool, Dv::Bool(true)),
    def(
        "serviceDescriptionTemplate",
        Rule::Str { min: 1, max: 5000 },
        Dv::Str("Prestação de serviços conforme contrato. Ref.: {{fatura_numero}}"),
    ),
    def("withholdingBase", Rule::OneOf(&["preco_cheio", "preco_menos_descontos", "custom"]), Dv::Str("preco_cheio")),
    def("attachXmlPdfToInvoice", Rule::Bool, Dv::Bool(true)),
    def(
        "sendResponsibility",
        Rule::OneOf(&["automatico_pos_pagamento", "na_emissao", "manual"]),
        Dv::Str("automatico_pos_pagamento"),
    ),
];

// ---------------------------------------------------------------------------
// Dunning / Régua de Cobrança
// ---------------------------------------------------------------------------

static REMINDER: &[Field] = &[
    req("days", Rule::Int { min: -30, max: 365 }),
    req("channels", Rule::OneOfArray { allowed: REMINDER_CHANNELS, min: 1 }),
];

static REMINDER_RULE: Rule = Rule::Object(REMINDER);

static DUNNING_RULES: &[Field] = &[
    def("policy", STR, Dv::Str("Padrao B2B")),
    def("remindersBeforeDue", Rule::ArrayOf(&REMINDER_RULE), Dv::EmptyArray),
    def("remindersAfterDue", Rule::ArrayOf(&REMINDER_RULE), Dv::EmptyArray),
    def("autoNegotiationOffer", Rule::Bool, Dv::Bool(false)),
    def("pauseServicesAfterDaysOverdue", Rule::Int { min: 1, max: 120 }, Dv::Int(15)),
    def("cancelAfterDaysOverdue", Rule::Int { min: 1, max: 365 }, Dv::Int(60)),
    opt("escalationContactEmail", Rule::Email),
    def("customMessagesByStage", Rule::StrMap { max_len: 2000 }, Dv::EmptyObject),
];

// ---------------------------------------------------------------------------
// Financeiro (KPIs)
// ---------------------------------------------------------------------------

static AGING: &[Field] = &[
    def("0-30", MONEY, Dv::Float(0.0)),
    def("31-60", MONEY, Dv::Float(0.0)),
    def("61-90", MONEY, Dv::Float(0.0)),
    def("90+", MONEY, Dv::Float(0.0)),
];

static LAST_PAYMENT: &[Field] = &[
    def("date", Rule::Nullable(&Rule::DateTime), Dv::Null),
    def("amount", MONEY, Dv::Float(0.0)),
];

static BILLING_MONTH: &[Field] = &[
    req("month", Rule::MonthKey),
    req("amount", MONEY),
    def("status", Rule::OneOf(&["ok", "atraso", "cancelado"]), Dv::Str("ok")),
];

static BILLING_MONTH_RULE: Rule = Rule::Object(BILLING_MONTH);

static FINANCE_KPIS: &[Field] = &[
    def("currentMrr", MONEY, Dv::Float(0.0)),
    def("estimatedArr", MONEY, Dv::Float(0.0)),
    def("averageTicket", MONEY, Dv::Float(0.0)),
    def("lifetimeValue", MONEY, Dv::Float(0.0)),
    def("openBalance", MONEY, Dv::Float(0.0)),
    def("openInvoicesCount", POS_INT, Dv::Int(0)),
    def("aging", Rule::Object(AGING), Dv::NestedDefaults),
    def("averageDelinquencyDays", POS_INT, Dv::Int(0)),
    def("lastPayment", Rule::Object(LAST_PAYMENT), Dv::NestedDefaults),
    def("churnRiskScore", PERCENT, Dv::Float(0.0)),
    def("monthlyBillingHistory", Rule::ArrayOf(&BILLING_MONTH_RULE), Dv::EmptyArray),
];

// ---------------------------------------------------------------------------
// Contabilidade
// ---------------------------------------------------------------------------

static ACCOUNTING: &[Field] = &[
    opt("defaultCostCenter", STR),
    opt("defaultChartOfAccounts", STR),
    opt("projectRef", Rule::Nullable(&STR)),
    def("managementTags", Rule::StrArray { min: 0 }, Dv::EmptyArray),
];

// ---------------------------------------------------------------------------
// Portal do Cliente
// ---------------------------------------------------------------------------

static BRANDING: &[Field] = &[
    opt("logoUrl", Rule::Nullable(&Rule::Url)),
    def("primaryColor", Rule::HexColor, Dv::Str("#9b5cff")),
];

static ANY_RULE: Rule = Rule::Any;

static PORTAL_CONFIG: &[Field] = &[
    def("portalEnabled", Rule::Bool, Dv::Bool(true)),
    opt("customPortalUrl", Rule::Nullable(&Rule::Url)),
    def("branding", Rule::Object(BRANDING), Dv::NestedDefaults),
    // Usuários do portal idealmente em tabela própria (MFA/2FA)
    def("users", Rule::ArrayOf(&ANY_RULE), Dv::EmptyArray),
];

// ---------------------------------------------------------------------------
// Documentos & Anexos (apenas refs/IDs do storage)
// ---------------------------------------------------------------------------

static FILE_REF: &[Field] = &[req("id", STR1), req("name", STR1)];

static FILE_REF_RULE: Rule = Rule::Object(FILE_REF);

static DOCUMENT_REFS: &[Field] = &[
    def("signedContracts", Rule::ArrayOf(&FILE_REF_RULE), Dv::EmptyArray),
    def("proposals", Rule::ArrayOf(&FILE_REF_RULE), Dv::EmptyArray),
    def("fiscalNotes", Rule::ArrayOf(&FILE_REF_RULE), Dv::EmptyArray),
    def("paymentReceipts", Rule::ArrayOf(&FILE_REF_RULE), Dv::EmptyArray),
    def("ndas", Rule::ArrayOf(&FILE_REF_RULE), Dv::EmptyArray),
    def("otherDocuments", Rule::ArrayOf(&FILE_REF_RULE), Dv::EmptyArray),
];

// ---------------------------------------------------------------------------
// LGPD & Compliance
// ---------------------------------------------------------------------------

static CONSENT: &[Field] = &[
    req("type", STR1),
    req("date", Rule::DateTime),
    req("ip", Rule::IpOrEmpty),
    req("version", STR1),
];

static CONSENT_RULE: Rule = Rule::Object(CONSENT);

static CONTACT_RESTRICTIONS: &[Field] = &[
    def("quiet", Rule::Bool, Dv::Bool(false)),
    def("hours", STR, Dv::Str("9h-18h")),
    def("allowedChannels", Rule::OneOfArray { allowed: CHANNELS, min: 0 }, Dv::StrList(&["email", "whatsapp"])),
];

static DATA_SUBJECT_REQUEST: &[Field] = &[
    req("type", Rule::OneOf(&["acesso", "retificacao", "exclusao", "portabilidade"])),
    req("date", Rule::DateTime),
    def("status", Rule::OneOf(&["aberto", "em_andamento", "atendido", "negado"]), Dv::Str("aberto")),
];

static DATA_SUBJECT_REQUEST_RULE: Rule = Rule::Object(DATA_SUBJECT_REQUEST);

static LGPD: &[Field] = &[
    def(
        "legalBasis",
        Rule::OneOf(&["Execucao de contrato", "Consentimento", "Obrigacao legal", "Legitimo interesse"]),
        Dv::Str("Execucao de contrato"),
    ),
    def("processingPurposes", Rule::StrArray { min: 1 }, Dv::StrList(&["faturar", "contatar", "suporte"])),
    def("personalDataRetentionYears", Rule::Int { min: 1, max: 20 }, Dv::Int(5)),
    def("auditLogRetentionYears", Rule::Int { min: 1, max: 20 }, Dv::Int(10)),
    def("consents", Rule::ArrayOf(&CONSENT_RULE), Dv::EmptyArray),
    def("contactRestrictions", Rule::Object(CONTACT_RESTRICTIONS), Dv::NestedDefaults),
    def("dataSubjectRequests", Rule::ArrayOf(&DATA_SUBJECT_REQUEST_RULE), Dv::EmptyArray),
    opt("lastRecordReviewDate", Rule::IsoDate),
];

// ---------------------------------------------------------------------------
// Integrações (por cliente)
// ---------------------------------------------------------------------------

static CUSTOMER_WEBHOOK: &[Field] = &[
    req("event", Rule::OneOf(&["invoice.created", "payment.succeeded", "dunning.step"])),
    req("url", Rule::Url),
];

static CUSTOMER_WEBHOOK_RULE: Rule = Rule::Object(CUSTOMER_WEBHOOK);

static INTEGRATIONS: &[Field] = &[
    opt("integratedErp", Rule::Nullable(&STR)),
    // Segredos ficam no cofre, aqui só os identificadores
    def("integrationKeys", Rule::StrMap { max_len: 1000 }, Dv::EmptyObject),
    opt("externalCrmId", Rule::Nullable(&STR)),
    def("customerWebhooks", Rule::ArrayOf(&CUSTOMER_WEBHOOK_RULE), Dv::EmptyArray),
];

// ---------------------------------------------------------------------------
// Registro
// ---------------------------------------------------------------------------

/// Conjunto fechado das onze seções de configuração do cliente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    BillingPrefs,
    PaymentPrefs,
    FiscalRules,
    NfseSettings,
    DunningRules,
    FinanceKpis,
    Accounting,
    PortalConfig,
    DocumentRefs,
    Lgpd,
    Integrations,
}

impl SectionKind {
    pub const ALL: [SectionKind; 11] = [
        SectionKind::BillingPrefs,
        SectionKind::PaymentPrefs,
        SectionKind::FiscalRules,
        SectionKind::NfseSettings,
        SectionKind::DunningRules,
        SectionKind::FinanceKpis,
        SectionKind::Accounting,
        SectionKind::PortalConfig,
        SectionKind::DocumentRefs,
        SectionKind::Lgpd,
        SectionKind::Integrations,
    ];

    /// A chave da seção no payload e na coluna JSONB correspondente.
    pub fn key(self) -> &'static str {
        match self {
            SectionKind::BillingPrefs => "billingPrefs",
            SectionKind::PaymentPrefs => "paymentPrefs",
            SectionKind::FiscalRules => "fiscalRules",
            SectionKind::NfseSettings => "nfseSettings",
            SectionKind::DunningRules => "dunningRules",
            SectionKind::FinanceKpis => "financeKpis",
            SectionKind::Accounting => "accounting",
            SectionKind::PortalConfig => "portalConfig",
            SectionKind::DocumentRefs => "documentRefs",
            SectionKind::Lgpd => "lgpd",
            SectionKind::Integrations => "integrations",
        }
    }

    fn fields(self) -> &'static [Field] {
        match self {
            SectionKind::BillingPrefs => BILLING_PREFS,
            SectionKind::PaymentPrefs => PAYMENT_PREFS,
            SectionKind::FiscalRules => FISCAL_RULES,
            SectionKind::NfseSettings => NFSE_SETTINGS,
            SectionKind::DunningRules => DUNNING_RULES,
            SectionKind::FinanceKpis => FINANCE_KPIS,
            SectionKind::Accounting => ACCOUNTING,
            SectionKind::PortalConfig => PORTAL_CONFIG,
            SectionKind::DocumentRefs => DOCUMENT_REFS,
            SectionKind::Lgpd => LGPD,
            SectionKind::Integrations => INTEGRATIONS,
        }
    }
}

/// Valida a entrada crua de uma seção. No sucesso devolve a seção validada e
/// com defaults preenchidos; na falha, TODOS os campos inválidos.
pub fn validate_section(kind: SectionKind, raw: &Value) -> Result<Value, Vec<FieldError>> {
    let mut errors = Vec::new();
    let out = validate_object(kind.fields(), raw, "", &mut errors);
    if errors.is_empty() { Ok(out) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn billing_prefs_fill_documented_defaults() {
        let out = validate_section(SectionKind::BillingPrefs, &json!({})).unwrap();
        assert_eq!(out["currency"], "BRL");
        assert_eq!(out["invoiceDay"], 1);
        assert_eq!(out["paymentTermDays"], 7);
        assert_eq!(out["lateFeePercent"], 2.0);
        assert_eq!(out["invoiceChannels"], json!(["email"]));
        assert_eq!(out["invoiceWebhook"], json!({ "enabled": false }));
        assert_eq!(out["communicationLanguage"], "pt-BR");
    }

    #[test]
    fn billing_prefs_reject_out_of_range_values() {
        let err = validate_section(
            SectionKind::BillingPrefs,
            &json!({ "lateFeePercent": 25, "invoiceDay": 31 }),
        )
        .unwrap_err();
        let paths: Vec<&str> = err.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(err.len(), 2);
        assert!(paths.contains(&"lateFeePercent"));
        assert!(paths.contains(&"invoiceDay"));
    }

    #[test]
    fn unknown_fields_are_rejected_not_dropped() {
        let err = validate_section(
            SectionKind::BillingPrefs,
            &json!({ "currency": "BRL", "surpriseField": 1 }),
        )
        .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].path, "surpriseField");
        assert_eq!(err[0].message, "campo desconhecido");
    }

    #[test]
    fn fiscal_rules_require_city_and_service_item() {
        let err = validate_section(SectionKind::FiscalRules, &json!({ "issRatePercent": 5 }))
            .unwrap_err();
        let paths: Vec<&str> = err.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"serviceCity"));
        assert!(paths.contains(&"serviceListItemLc116"));
    }

    #[test]
    fn nfse_defaults_keep_auto_send_enabled() {
        let out = validate_section(SectionKind::NfseSettings, &json!({ "cityHall": "Curitiba/PR" }))
            .unwrap();
        assert_eq!(out["autoSendToCustomerEmail"], true);
        assert_eq!(out["rpsSeries"], "A");
        assert_eq!(out["environment"], "Producao");
    }

    #[test]
    fn dunning_reminders_validate_each_entry() {
        let err = validate_section(
            SectionKind::DunningRules,
            &json!({
                "remindersBeforeDue": [
                    { "days": -5, "channels": ["email"] },
                    { "days": 400, "channels": [] }
                ]
            }),
        )
        .unwrap_err();
        let paths: Vec<&str> = err.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"remindersBeforeDue[1].days"));
        assert!(paths.contains(&"remindersBeforeDue[1].channels"));
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn lgpd_validates_consent_ips() {
        let section = |ip: &str| {
            json!({
                "consents": [
                    { "type": "comercial", "date": "2025-01-10T12:00:00Z", "ip": ip, "version": "v1" }
                ]
            })
        };

        assert!(validate_section(SectionKind::Lgpd, &section("187.10.2.1")).is_ok());
        assert!(validate_section(SectionKind::Lgpd, &section("::1")).is_ok());
        // Vazio é aceito (consentimento colhido fora do portal)
        assert!(validate_section(SectionKind::Lgpd, &section("")).is_ok());

        let err = validate_section(SectionKind::Lgpd, &section("999.999.1.1")).unwrap_err();
        assert_eq!(err[0].path, "consents[0].ip");
        assert_eq!(err[0].message, "IP inválido");
    }

    #[test]
    fn finance_kpis_default_aging_and_last_payment() {
        let out = validate_section(SectionKind::FinanceKpis, &json!({})).unwrap();
        assert_eq!(out["aging"], json!({ "0-30": 0.0, "31-60": 0.0, "61-90": 0.0, "90+": 0.0 }));
        assert_eq!(out["lastPayment"], json!({ "date": null, "amount": 0.0 }));
    }

    #[test]
    fn portal_config_checks_branding_color() {
        let err = validate_section(
            SectionKind::PortalConfig,
            &json!({ "branding": { "primaryColor": "roxo" } }),
        )
        .unwrap_err();
        assert_eq!(err[0].path, "branding.primaryColor");

        let out = validate_section(SectionKind::PortalConfig, &json!({})).unwrap();
        assert_eq!(out["branding"]["primaryColor"], "#9b5cff");
    }

    #[test]
    fn integrations_validate_webhook_events_and_urls() {
        let err = validate_section(
            SectionKind::Integrations,
            &json!({
                "customerWebhooks": [
                    { "event": "invoice.deleted", "url": "https://hooks.exemplo.com/a" },
                    { "event": "invoice.created", "url": "sem-esquema" }
                ]
            }),
        )
        .unwrap_err();
        let paths: Vec<&str> = err.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"customerWebhooks[0].event"));
        assert!(paths.contains(&"customerWebhooks[1].url"));
    }

    #[test]
    fn validation_is_idempotent_on_its_own_output() {
        for kind in SectionKind::ALL {
            let input = match kind {
                SectionKind::FiscalRules => {
                    json!({ "serviceCity": "Curitiba", "serviceListItemLc116": "1.05" })
                }
                SectionKind::NfseSettings => json!({ "cityHall": "Curitiba/PR" }),
                _ => json!({}),
            };
            let once = validate_section(kind, &input).unwrap();
            let twice = validate_section(kind, &once)
                .unwrap_or_else(|e| panic!("{} não revalidou: {e:?}", kind.key()));
            assert_eq!(once, twice, "seção {}", kind.key());
        }
    }
}
