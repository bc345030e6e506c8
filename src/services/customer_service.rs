// src/services/customer_service.rs

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::{
        documents::{is_valid_cnpj, is_valid_cpf, normalize_digits},
        error::AppError,
    },
    db::CustomerStore,
    models::customer::{CustomerAggregate, PersonType, UpdateCustomerPayload},
    schemas::{self, SectionKind},
    services::reconcile::reconcile_collection,
};

/// Valida e mescla um bloco de configuração, quando ele veio no payload.
/// A entrada validada (já com defaults) é quem entra no merge, então o bloco
/// armazenado nunca recebe valor fora do schema.
fn merge_section(
    kind: SectionKind,
    input: Option<&Value>,
    current: &Value,
) -> Result<Value, AppError> {
    match input {
        Some(raw) => {
            let validated = schemas::validate_section(kind, raw).map_err(|errors| {
                AppError::SectionValidationFailed {
                    section: kind.key(),
                    errors,
                }
            })?;
            Ok(schemas::deep_merge(current, &validated))
        }
        None => Ok(current.clone()),
    }
}

#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn CustomerStore>,
}

impl CustomerService {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<CustomerAggregate, AppError> {
        self.store
            .load_aggregate(id)
            .await?
            .ok_or(AppError::CustomerNotFound)
    }

    /// Atualização do agregado Cliente, tudo-ou-nada:
    ///
    /// 1. carrega o agregado (404 se não existe);
    /// 2. valida e mescla cada bloco de configuração presente no payload;
    /// 3. rejeita PAN/CVV cru em paymentPrefs antes do schema estrito;
    /// 4. regras de identidade PJ/PF (documento + razão social);
    /// 5. campos simples: só o que veio no payload sobrescreve;
    /// 6. reconcilia contatos/endereços (upsert + remoção por ausência;
    ///    lista sem nenhum id SUBSTITUI a coleção inteira);
    /// 7. invariante NFS-e: envio automático exige contato financeiro com
    ///    e-mail no conjunto final;
    /// 8. persiste o agregado em uma única transação.
    ///
    /// Qualquer falha nos passos 2–7 deixa o agregado armazenado intacto.
    pub async fn update_customer(
        &self,
        id: Uuid,
        payload: UpdateCustomerPayload,
        actor: &str,
    ) -> Result<CustomerAggregate, AppError> {
        let CustomerAggregate {
            mut customer,
            contacts,
            addresses,
        } = self.get_customer(id).await?;

        // (1) Validação + merge, apenas dos blocos que vieram no payload
        customer.billing_prefs = merge_section(
            SectionKind::BillingPrefs,
            payload.billing_prefs.as_ref(),
            &customer.billing_prefs,
        )?;

        // Dados de cartão nunca entram neste caminho de gravação. A checagem
        // roda na entrada CRUA: depois do schema estrito essas chaves jamais
        // sobrevivem, e o erro viraria um "campo desconhecido" genérico.
        if let Some(raw) = &payload.payment_prefs {
            if raw.get("cardPan").is_some() || raw.get("cardCvv").is_some() {
                return Err(AppError::SensitiveDataRejected);
            }
        }
        customer.payment_prefs = merge_section(
            SectionKind::PaymentPrefs,
            payload.payment_prefs.as_ref(),
            &customer.payment_prefs,
        )?;

        customer.fiscal_rules = merge_section(
            SectionKind::FiscalRules,
            payload.fiscal_rules.as_ref(),
            &customer.fiscal_rules,
        )?;
        customer.nfse_settings = merge_section(
            SectionKind::NfseSettings,
            payload.nfse_settings.as_ref(),
            &customer.nfse_settings,
        )?;
        customer.dunning_rules = merge_section(
            SectionKind::DunningRules,
            payload.dunning_rules.as_ref(),
            &customer.dunning_rules,
        )?;
        customer.finance_kpis = merge_section(
            SectionKind::FinanceKpis,
            payload.finance_kpis.as_ref(),
            &customer.finance_kpis,
        )?;
        customer.accounting = merge_section(
            SectionKind::Accounting,
            payload.accounting.as_ref(),
            &customer.accounting,
        )?;
        customer.portal_config = merge_section(
            SectionKind::PortalConfig,
            payload.portal_config.as_ref(),
            &customer.portal_config,
        )?;
        customer.document_refs = merge_section(
            SectionKind::DocumentRefs,
            payload.document_refs.as_ref(),
            &customer.document_refs,
        )?;
        customer.lgpd = merge_section(SectionKind::Lgpd, payload.lgpd.as_ref(), &customer.lgpd)?;
        customer.integrations = merge_section(
            SectionKind::Integrations,
            payload.integrations.as_ref(),
            &customer.integrations,
        )?;

        // (2) Regras dependentes (PJ/PF), sobre o tipo efetivo
        let person_type = payload.person_type.or(customer.person_type);
        if person_type == Some(PersonType::Pj) {
            if payload.cnpj.is_none() && customer.cnpj.is_none() {
                return Err(AppError::IdentityInvalid(
                    "CNPJ é obrigatório para PJ".to_string(),
                ));
            }
            if let Some(cnpj) = &payload.cnpj {
                if !is_valid_cnpj(cnpj) {
                    return Err(AppError::IdentityInvalid("CNPJ inválido".to_string()));
                }
            }
            if payload.legal_name.is_none() && customer.legal_name.is_none() {
                return Err(AppError::IdentityInvalid(
                    "Razão Social é obrigatória para PJ".to_string(),
                ));
            }
        }
        if person_type == Some(PersonType::Pf) {
            if let Some(cpf) = &payload.cpf {
                if !is_valid_cpf(cpf) {
                    return Err(AppError::IdentityInvalid("CPF inválido".to_string()));
                }
            }
        }

        // (3) Campos simples: ausente no payload mantém o valor atual
        if let Some(v) = payload.legal_name {
            customer.legal_name = Some(v);
        }
        if let Some(v) = payload.trade_name {
            customer.trade_name = Some(v);
        }
        if let Some(v) = &payload.cnpj {
            customer.cnpj = Some(normalize_digits(v));
        }
        if let Some(v) = &payload.cpf {
            customer.cpf = Some(normalize_digits(v));
        }
        if let Some(v) = payload.state_registration {
            customer.state_registration = Some(v);
        }
        if let Some(v) = payload.municipal_registration {
            customer.municipal_registration = Some(v);
        }
        if let Some(v) = payload.main_cnae {
            customer.main_cnae = Some(v);
        }
        if let Some(v) = payload.company_size {
            customer.company_size = Some(v);
        }
        if let Some(v) = payload.business_sector {
            customer.business_sector = Some(v);
        }
        if let Some(v) = payload.status {
            customer.status = v;
        }
        if let Some(v) = payload.risk_classification {
            customer.risk_classification = Some(v);
        }
        if let Some(v) = payload.tags {
            customer.tags = v;
        }
        if let Some(pt) = payload.person_type {
            customer.person_type = Some(pt);
            // A identidade fiscal nunca fica com as duas formas ao mesmo
            // tempo: trocar o tipo de pessoa limpa o documento oposto.
            match pt {
                PersonType::Pj => customer.cpf = None,
                PersonType::Pf => customer.cnpj = None,
            }
        }
        customer.updated_by = Some(actor.to_string());

        // (4) Reconciliação de contatos e endereços
        let contact_writes = match &payload.contacts {
            Some(inputs) => Some(reconcile_collection(
                &contacts,
                inputs,
                |row| row.id,
                |input| input.id,
                |input| input.create_row(customer.id),
                |input, row| input.apply_to(row),
            )?),
            None => None,
        };

        let address_writes = match &payload.addresses {
            Some(inputs) => Some(reconcile_collection(
                &addresses,
                inputs,
                |row| row.id,
                |input| input.id,
                |input| input.create_row(customer.id),
                |input, row| input.apply_to(row),
            )?),
            None => None,
        };

        // (5) Regra cruzada: NFS-e automática exige contato financeiro com
        // e-mail no conjunto que vai valer depois desta chamada
        let auto_send = customer
            .nfse_settings
            .get("autoSendToCustomerEmail")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if auto_send {
            let final_contacts = contact_writes
                .as_ref()
                .map(|writes| writes.rows.as_slice())
                .unwrap_or(&contacts);
            let has_billing_email = final_contacts.iter().any(|c| {
                c.billing_responsible && c.email.as_deref().is_some_and(|e| !e.is_empty())
            });
            if !has_billing_email {
                return Err(AppError::MissingBillingContact);
            }
        }

        // (6) Persiste tudo em uma transação e devolve o agregado recarregado
        self.store
            .save_aggregate(&customer, contact_writes.as_ref(), address_writes.as_ref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::models::customer::{
        AddressKind, AddressPayload, ContactPayload, Customer, CustomerAddress, CustomerContact,
        CustomerStatus,
    };
    use crate::services::reconcile::ChildWrites;

    struct MemoryStore {
        state: Mutex<HashMap<Uuid, CustomerAggregate>>,
    }

    #[async_trait]
    impl CustomerStore for MemoryStore {
        async fn load_aggregate(&self, id: Uuid) -> Result<Option<CustomerAggregate>, AppError> {
            Ok(self.state.lock().unwrap().get(&id).cloned())
        }

        async fn save_aggregate(
            &self,
            customer: &Customer,
            contacts: Option<&ChildWrites<CustomerContact>>,
            addresses: Option<&ChildWrites<CustomerAddress>>,
        ) -> Result<CustomerAggregate, AppError> {
            let mut state = self.state.lock().unwrap();
            let entry = state
                .get_mut(&customer.id)
                .ok_or(AppError::CustomerNotFound)?;
            entry.customer = customer.clone();
            if let Some(writes) = contacts {
                entry.contacts = writes.rows.clone();
            }
            if let Some(writes) = addresses {
                entry.addresses = writes.rows.clone();
            }
            Ok(entry.clone())
        }
    }

    fn base_customer(id: Uuid) -> Customer {
        let now = Utc::now();
        Customer {
            id,
            person_type: None,
            legal_name: Some("Fauno Estúdio".to_string()),
            trade_name: None,
            cnpj: None,
            cpf: None,
            state_registration: None,
            municipal_registration: None,
            main_cnae: None,
            company_size: None,
            business_sector: None,
            status: CustomerStatus::Active,
            risk_classification: None,
            tags: vec![],
            billing_prefs: json!({}),
            payment_prefs: json!({}),
            fiscal_rules: json!({}),
            nfse_settings: json!({}),
            dunning_rules: json!({}),
            finance_kpis: json!({}),
            accounting: json!({}),
            portal_config: json!({}),
            document_refs: json!({}),
            lgpd: json!({}),
            integrations: json!({}),
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
        }
    }

    fn contact_row(customer_id: Uuid, name: &str, billing: bool, email: Option<&str>) -> CustomerContact {
        CustomerContact {
            id: Uuid::new_v4(),
            customer_id,
            name: name.to_string(),
            role: None,
            email: email.map(str::to_string),
            phone: None,
            whatsapp: None,
            preferred_channel: None,
            billing_responsible: billing,
            technical_responsible: false,
            consent_ip: None,
            consent_at: None,
            created_at: Utc::now(),
        }
    }

    fn contact_input(id: Option<Uuid>, name: &str) -> ContactPayload {
        ContactPayload {
            id,
            name: name.to_string(),
            role: None,
            email: None,
            phone: None,
            whatsapp: None,
            preferred_channel: None,
            billing_responsible: None,
            technical_responsible: None,
            consent_ip: None,
            consent_at: None,
        }
    }

    fn address_input(id: Option<Uuid>) -> AddressPayload {
        AddressPayload {
            id,
            kind: AddressKind::Billing,
            street: "Rua XV de Novembro".to_string(),
            number: "100".to_string(),
            complement: None,
            district: "Centro".to_string(),
            city: "Curitiba".to_string(),
            state: "PR".to_string(),
            postal_code: "80020-310".to_string(),
            country: None,
            ibge_city_code: None,
        }
    }

    fn setup(aggregate: CustomerAggregate) -> (CustomerService, Arc<MemoryStore>, Uuid) {
        let id = aggregate.customer.id;
        let mut state = HashMap::new();
        state.insert(id, aggregate);
        let store = Arc::new(MemoryStore {
            state: Mutex::new(state),
        });
        (CustomerService::new(store.clone()), store, id)
    }

    fn plain_aggregate() -> CustomerAggregate {
        let id = Uuid::new_v4();
        CustomerAggregate {
            customer: base_customer(id),
            contacts: vec![],
            addresses: vec![],
        }
    }

    async fn reload(service: &CustomerService, id: Uuid) -> CustomerAggregate {
        service.get_customer(id).await.unwrap()
    }

    #[tokio::test]
    async fn unknown_customer_is_not_found() {
        let (service, _, _) = setup(plain_aggregate());
        let err = service
            .update_customer(Uuid::new_v4(), UpdateCustomerPayload::default(), "ana@op.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CustomerNotFound));
    }

    #[tokio::test]
    async fn organization_without_cnpj_is_rejected() {
        let (service, _, id) = setup(plain_aggregate());

        let payload = UpdateCustomerPayload {
            person_type: Some(PersonType::Pj),
            ..Default::default()
        };
        let err = service.update_customer(id, payload, "ana@op.com").await.unwrap_err();

        match err {
            AppError::IdentityInvalid(reason) => assert!(reason.contains("CNPJ é obrigatório")),
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn organization_with_bad_check_digits_is_rejected() {
        let (service, _, id) = setup(plain_aggregate());

        let payload = UpdateCustomerPayload {
            person_type: Some(PersonType::Pj),
            // 14 dígitos, mas dígito verificador errado
            cnpj: Some("11444777000160".to_string()),
            ..Default::default()
        };
        let err = service.update_customer(id, payload, "ana@op.com").await.unwrap_err();

        match err {
            AppError::IdentityInvalid(reason) => assert_eq!(reason, "CNPJ inválido"),
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[tokio::test]
    async fn individual_with_bad_cpf_is_rejected() {
        let (service, _, id) = setup(plain_aggregate());

        let payload = UpdateCustomerPayload {
            person_type: Some(PersonType::Pf),
            cpf: Some("52998224720".to_string()),
            ..Default::default()
        };
        let err = service.update_customer(id, payload, "ana@op.com").await.unwrap_err();

        assert!(matches!(err, AppError::IdentityInvalid(_)));
    }

    #[tokio::test]
    async fn raw_card_data_is_rejected() {
        let (service, _, id) = setup(plain_aggregate());

        let payload = UpdateCustomerPayload {
            payment_prefs: Some(json!({ "cardPan": "4111111111111111" })),
            ..Default::default()
        };
        let err = service.update_customer(id, payload, "ana@op.com").await.unwrap_err();

        assert!(matches!(err, AppError::SensitiveDataRejected));
    }

    #[tokio::test]
    async fn invalid_section_aborts_the_whole_update() {
        let (service, _, id) = setup(plain_aggregate());

        let payload = UpdateCustomerPayload {
            legal_name: Some("Novo Nome".to_string()),
            billing_prefs: Some(json!({ "lateFeePercent": 50 })),
            ..Default::default()
        };
        let err = service.update_customer(id, payload, "ana@op.com").await.unwrap_err();

        match err {
            AppError::SectionValidationFailed { section, errors } => {
                assert_eq!(section, "billingPrefs");
                assert_eq!(errors[0].path, "lateFeePercent");
            }
            other => panic!("erro inesperado: {other:?}"),
        }

        // Nada foi gravado: nem o campo simples que veio junto
        let stored = reload(&service, id).await;
        assert_eq!(stored.customer.legal_name.as_deref(), Some("Fauno Estúdio"));
        assert_eq!(stored.customer.billing_prefs, json!({}));
    }

    #[tokio::test]
    async fn section_update_merges_over_the_stored_block() {
        let mut aggregate = plain_aggregate();
        aggregate.customer.billing_prefs = json!({
            "currency": "USD",
            "adjustmentBaseDate": "2024-01-01",
            "legacyField": 7
        });
        let (service, _, id) = setup(aggregate);

        let payload = UpdateCustomerPayload {
            billing_prefs: Some(json!({ "invoiceDay": 10 })),
            ..Default::default()
        };
        let updated = service.update_customer(id, payload, "ana@op.com").await.unwrap();

        let prefs = &updated.customer.billing_prefs;
        assert_eq!(prefs["invoiceDay"], 10);
        // Campo com default volta ao default quando não vem na entrada
        assert_eq!(prefs["currency"], "BRL");
        // Opcional sem default e chave legada fora do schema sobrevivem
        assert_eq!(prefs["adjustmentBaseDate"], "2024-01-01");
        assert_eq!(prefs["legacyField"], 7);
    }

    #[tokio::test]
    async fn contacts_absent_from_the_list_are_deleted() {
        let mut aggregate = plain_aggregate();
        let keep = contact_row(aggregate.customer.id, "Um", false, None);
        let gone = contact_row(aggregate.customer.id, "Dois", false, None);
        let keep_id = keep.id;
        aggregate.contacts = vec![keep, gone];
        let (service, _, id) = setup(aggregate);

        let payload = UpdateCustomerPayload {
            contacts: Some(vec![contact_input(Some(keep_id), "X")]),
            ..Default::default()
        };
        let updated = service.update_customer(id, payload, "ana@op.com").await.unwrap();

        assert_eq!(updated.contacts.len(), 1);
        assert_eq!(updated.contacts[0].id, keep_id);
        assert_eq!(updated.contacts[0].name, "X");
    }

    #[tokio::test]
    async fn foreign_contact_id_aborts_and_leaves_store_unchanged() {
        let mut aggregate = plain_aggregate();
        aggregate.contacts = vec![
            contact_row(aggregate.customer.id, "Um", false, None),
            contact_row(aggregate.customer.id, "Dois", false, None),
        ];
        let (service, _, id) = setup(aggregate);

        let foreign = Uuid::new_v4();
        let payload = UpdateCustomerPayload {
            legal_name: Some("Novo Nome".to_string()),
            contacts: Some(vec![contact_input(Some(foreign), "X")]),
            ..Default::default()
        };
        let err = service.update_customer(id, payload, "ana@op.com").await.unwrap_err();

        match err {
            AppError::ChildNotOwned(child) => assert_eq!(child, foreign),
            other => panic!("erro inesperado: {other:?}"),
        }

        let stored = reload(&service, id).await;
        assert_eq!(stored.contacts.len(), 2);
        assert_eq!(stored.customer.legal_name.as_deref(), Some("Fauno Estúdio"));
    }

    #[tokio::test]
    async fn list_without_ids_replaces_the_whole_collection() {
        let mut aggregate = plain_aggregate();
        let old = contact_row(aggregate.customer.id, "Velho", false, None);
        let old_id = old.id;
        aggregate.contacts = vec![old];
        let (service, _, id) = setup(aggregate);

        let payload = UpdateCustomerPayload {
            contacts: Some(vec![contact_input(None, "Novo")]),
            ..Default::default()
        };
        let updated = service.update_customer(id, payload, "ana@op.com").await.unwrap();

        assert_eq!(updated.contacts.len(), 1);
        assert_eq!(updated.contacts[0].name, "Novo");
        assert_ne!(updated.contacts[0].id, old_id);
    }

    #[tokio::test]
    async fn addresses_reconcile_like_contacts() {
        let (service, _, id) = setup(plain_aggregate());

        let payload = UpdateCustomerPayload {
            addresses: Some(vec![address_input(None)]),
            ..Default::default()
        };
        let updated = service.update_customer(id, payload, "ana@op.com").await.unwrap();

        assert_eq!(updated.addresses.len(), 1);
        assert_eq!(updated.addresses[0].city, "Curitiba");
        assert_eq!(updated.addresses[0].country, "Brasil");
    }

    #[tokio::test]
    async fn nfse_auto_send_requires_billing_contact_with_email() {
        let mut aggregate = plain_aggregate();
        aggregate.contacts = vec![contact_row(aggregate.customer.id, "Sem Flag", false, Some("a@b.com"))];
        let (service, _, id) = setup(aggregate);

        let payload = UpdateCustomerPayload {
            nfse_settings: Some(json!({
                "cityHall": "Curitiba/PR",
                "autoSendToCustomerEmail": true
            })),
            ..Default::default()
        };
        let err = service.update_customer(id, payload, "ana@op.com").await.unwrap_err();

        assert!(matches!(err, AppError::MissingBillingContact));
    }

    #[tokio::test]
    async fn flipping_the_billing_flag_in_the_same_call_satisfies_the_invariant() {
        let mut aggregate = plain_aggregate();
        let existing = contact_row(aggregate.customer.id, "Ana", false, Some("ana@fauno.com"));
        let existing_id = existing.id;
        aggregate.contacts = vec![existing];
        let (service, _, id) = setup(aggregate);

        let mut contact = contact_input(Some(existing_id), "Ana");
        contact.billing_responsible = Some(true);

        let payload = UpdateCustomerPayload {
            nfse_settings: Some(json!({
                "cityHall": "Curitiba/PR",
                "autoSendToCustomerEmail": true
            })),
            contacts: Some(vec![contact]),
            ..Default::default()
        };
        let updated = service.update_customer(id, payload, "ana@op.com").await.unwrap();

        assert_eq!(updated.customer.nfse_settings["autoSendToCustomerEmail"], true);
        assert!(updated.contacts[0].billing_responsible);
        // Campos não enviados do contato foram preservados
        assert_eq!(updated.contacts[0].email.as_deref(), Some("ana@fauno.com"));
    }

    #[tokio::test]
    async fn scalar_fields_follow_partial_update_semantics() {
        let mut aggregate = plain_aggregate();
        aggregate.customer.tags = vec!["vip".to_string()];
        let (service, _, id) = setup(aggregate);

        let payload = UpdateCustomerPayload {
            trade_name: Some("Fauno".to_string()),
            ..Default::default()
        };
        let updated = service.update_customer(id, payload, "ana@op.com").await.unwrap();

        assert_eq!(updated.customer.trade_name.as_deref(), Some("Fauno"));
        assert_eq!(updated.customer.legal_name.as_deref(), Some("Fauno Estúdio"));
        assert_eq!(updated.customer.tags, vec!["vip".to_string()]);
        assert_eq!(updated.customer.updated_by.as_deref(), Some("ana@op.com"));
    }

    #[tokio::test]
    async fn switching_person_type_clears_the_opposite_document() {
        let mut aggregate = plain_aggregate();
        aggregate.customer.person_type = Some(PersonType::Pf);
        aggregate.customer.cpf = Some("52998224725".to_string());
        let (service, _, id) = setup(aggregate);

        let payload = UpdateCustomerPayload {
            person_type: Some(PersonType::Pj),
            cnpj: Some("11444777000161".to_string()),
            ..Default::default()
        };
        let updated = service.update_customer(id, payload, "ana@op.com").await.unwrap();

        assert_eq!(updated.customer.person_type, Some(PersonType::Pj));
        assert_eq!(updated.customer.cnpj.as_deref(), Some("11444777000161"));
        assert_eq!(updated.customer.cpf, None);
    }

    #[tokio::test]
    async fn identity_rules_apply_against_the_stored_person_type() {
        let mut aggregate = plain_aggregate();
        aggregate.customer.person_type = Some(PersonType::Pj);
        aggregate.customer.cnpj = Some("11444777000161".to_string());
        let (service, _, id) = setup(aggregate);

        // Sem tipo no payload, mas o cliente é PJ: CNPJ inválido é barrado
        let payload = UpdateCustomerPayload {
            cnpj: Some("11444777000160".to_string()),
            ..Default::default()
        };
        let err = service.update_customer(id, payload, "ana@op.com").await.unwrap_err();
        assert!(matches!(err, AppError::IdentityInvalid(_)));
    }
}
