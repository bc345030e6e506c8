// src/db/customer_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CustomerStore,
    models::customer::{Customer, CustomerAddress, CustomerAggregate, CustomerContact, CustomerPage},
    services::reconcile::ChildWrites,
};

// Campos ordenáveis na listagem (whitelist, nunca interpolar entrada crua)
const ORDERABLE: &[&str] = &[
    "legal_name",
    "trade_name",
    "cnpj",
    "cpf",
    "status",
    "created_at",
    "updated_at",
];

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Busca paginada: nome/fantasia/e-mail de contato por ILIKE; quando o
    /// termo contém dígitos, também CNPJ/CPF/whatsapp de contato.
    pub async fn list(
        &self,
        q: Option<&str>,
        limit: i64,
        offset: i64,
        order_by: &str,
        order_dir: &str,
    ) -> Result<CustomerPage, AppError> {
        let limit = limit.clamp(1, 500);
        let offset = offset.max(0);
        let order_field = if ORDERABLE.contains(&order_by) {
            order_by
        } else {
            "legal_name"
        };
        let direction = if order_dir.eq_ignore_ascii_case("DESC") {
            "DESC"
        } else {
            "ASC"
        };

        let term = q.map(str::trim).filter(|t| !t.is_empty());

        let mut query = QueryBuilder::<Postgres>::new("SELECT DISTINCT c.* FROM customers c");
        push_search(&mut query, term);
        query
            .push(" ORDER BY c.")
            .push(order_field)
            .push(" ")
            .push(direction)
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let items: Vec<Customer> = query.build_query_as().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(DISTINCT c.id) FROM customers c");
        push_search(&mut count, term);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(CustomerPage {
            total,
            items,
            limit,
            offset,
        })
    }

    async fn fetch_aggregate(&self, id: Uuid) -> Result<Option<CustomerAggregate>, AppError> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(customer) = customer else {
            return Ok(None);
        };

        let contacts = sqlx::query_as::<_, CustomerContact>(
            "SELECT * FROM customer_contacts WHERE customer_id = $1 ORDER BY created_at ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let addresses = sqlx::query_as::<_, CustomerAddress>(
            "SELECT * FROM customer_addresses WHERE customer_id = $1 ORDER BY created_at ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CustomerAggregate {
            customer,
            contacts,
            addresses,
        }))
    }
}

fn push_search(query: &mut QueryBuilder<'_, Postgres>, term: Option<&str>) {
    let Some(term) = term else {
        return;
    };

    let like = format!("%{term}%");
    let digits: String = term.chars().filter(|c| c.is_ascii_digit()).collect();

    query
        .push(" LEFT JOIN customer_contacts ct ON ct.customer_id = c.id")
        .push(" WHERE (c.legal_name ILIKE ")
        .push_bind(like.clone())
        .push(" OR c.trade_name ILIKE ")
        .push_bind(like.clone())
        .push(" OR ct.email ILIKE ")
        .push_bind(like.clone());

    if digits.is_empty() {
        query.push(" OR ct.whatsapp ILIKE ").push_bind(like);
    } else {
        let digits_like = format!("%{digits}%");
        query
            .push(" OR c.cnpj LIKE ")
            .push_bind(digits_like.clone())
            .push(" OR c.cpf LIKE ")
            .push_bind(digits_like.clone())
            .push(" OR ct.whatsapp LIKE ")
            .push_bind(digits_like);
    }

    query.push(")");
}

#[async_trait]
impl CustomerStore for CustomerRepository {
    async fn load_aggregate(&self, id: Uuid) -> Result<Option<CustomerAggregate>, AppError> {
        self.fetch_aggregate(id).await
    }

    async fn save_aggregate(
        &self,
        customer: &Customer,
        contacts: Option<&ChildWrites<CustomerContact>>,
        addresses: Option<&ChildWrites<CustomerAddress>>,
    ) -> Result<CustomerAggregate, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE customers SET
                person_type = $2, legal_name = $3, trade_name = $4,
                cnpj = $5, cpf = $6,
                state_registration = $7, municipal_registration = $8,
                main_cnae = $9, company_size = $10, business_sector = $11,
                status = $12, risk_classification = $13, tags = $14,
                billing_prefs = $15, payment_prefs = $16, fiscal_rules = $17,
                nfse_settings = $18, dunning_rules = $19, finance_kpis = $20,
                accounting = $21, portal_config = $22, document_refs = $23,
                lgpd = $24, integrations = $25,
                updated_by = $26, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(customer.id)
        .bind(customer.person_type)
        .bind(&customer.legal_name)
        .bind(&customer.trade_name)
        .bind(&customer.cnpj)
        .bind(&customer.cpf)
        .bind(&customer.state_registration)
        .bind(&customer.municipal_registration)
        .bind(&customer.main_cnae)
        .bind(&customer.company_size)
        .bind(&customer.business_sector)
        .bind(customer.status)
        .bind(&customer.risk_classification)
        .bind(&customer.tags)
        .bind(&customer.billing_prefs)
        .bind(&customer.payment_prefs)
        .bind(&customer.fiscal_rules)
        .bind(&customer.nfse_settings)
        .bind(&customer.dunning_rules)
        .bind(&customer.finance_kpis)
        .bind(&customer.accounting)
        .bind(&customer.portal_config)
        .bind(&customer.document_refs)
        .bind(&customer.lgpd)
        .bind(&customer.integrations)
        .bind(&customer.updated_by)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // CNPJ/CPF têm índice único parcial
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(
                        "Documento fiscal já cadastrado para outro cliente.".to_string(),
                    );
                }
            }
            AppError::DatabaseError(e)
        })?;

        if let Some(writes) = contacts {
            if !writes.delete_ids.is_empty() {
                sqlx::query(
                    "DELETE FROM customer_contacts WHERE customer_id = $1 AND id = ANY($2)",
                )
                .bind(customer.id)
                .bind(&writes.delete_ids)
                .execute(&mut *tx)
                .await?;
            }

            for row in &writes.rows {
                sqlx::query(
                    r#"
                    INSERT INTO customer_contacts (
                        id, customer_id, name, role, email, phone, whatsapp,
                        preferred_channel, billing_responsible, technical_responsible,
                        consent_ip, consent_at, created_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                    ON CONFLICT (id) DO UPDATE SET
                        name = EXCLUDED.name,
                        role = EXCLUDED.role,
                        email = EXCLUDED.email,
                        phone = EXCLUDED.phone,
                        whatsapp = EXCLUDED.whatsapp,
                        preferred_channel = EXCLUDED.preferred_channel,
                        billing_responsible = EXCLUDED.billing_responsible,
                        technical_responsible = EXCLUDED.technical_responsible,
                        consent_ip = EXCLUDED.consent_ip,
                        consent_at = EXCLUDED.consent_at
                    "#,
                )
                .bind(row.id)
                .bind(row.customer_id)
                .bind(&row.name)
                .bind(&row.role)
                .bind(&row.email)
                .bind(&row.phone)
                .bind(&row.whatsapp)
                .bind(&row.preferred_channel)
                .bind(row.billing_responsible)
                .bind(row.technical_responsible)
                .bind(&row.consent_ip)
                .bind(row.consent_at)
                .bind(row.created_at)
                .execute(&mut *tx)
                .await?;
            }
        }

        if let Some(writes) = addresses {
            if !writes.delete_ids.is_empty() {
                sqlx::query(
                    "DELETE FROM customer_addresses WHERE customer_id = $1 AND id = ANY($2)",
                )
                .bind(customer.id)
                .bind(&writes.delete_ids)
                .execute(&mut *tx)
                .await?;
            }

            for row in &writes.rows {
                sqlx::query(
                    r#"
                    INSERT INTO customer_addresses (
                        id, customer_id, kind, street, number, complement,
                        district, city, state, postal_code, country,
                        ibge_city_code, created_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                    ON CONFLICT (id) DO UPDATE SET
                        kind = EXCLUDED.kind,
                        street = EXCLUDED.street,
                        number = EXCLUDED.number,
                        complement = EXCLUDED.complement,
                        district = EXCLUDED.district,
                        city = EXCLUDED.city,
                        state = EXCLUDED.state,
                        postal_code = EXCLUDED.postal_code,
                        country = EXCLUDED.country,
                        ibge_city_code = EXCLUDED.ibge_city_code
                    "#,
                )
                .bind(row.id)
                .bind(row.customer_id)
                .bind(row.kind)
                .bind(&row.street)
                .bind(&row.number)
                .bind(&row.complement)
                .bind(&row.district)
                .bind(&row.city)
                .bind(&row.state)
                .bind(&row.postal_code)
                .bind(&row.country)
                .bind(row.ibge_city_code)
                .bind(row.created_at)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        self.fetch_aggregate(customer.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("cliente sumiu após o commit").into())
    }
}
