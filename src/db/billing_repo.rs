// src/db/billing_repo.rs

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::billing::{FinanceMetrics, Invoice, InvoiceItem, InvoiceWithItems},
};

#[derive(Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Faturas por vencimento, com itens carregados de uma vez.
    pub async fn list_invoices(&self) -> Result<Vec<InvoiceWithItems>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices ORDER BY due_date ASC")
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = invoices.iter().map(|i| i.id).collect();
        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_invoice: HashMap<Uuid, Vec<InvoiceItem>> = HashMap::new();
        for item in items {
            by_invoice.entry(item.invoice_id).or_default().push(item);
        }

        Ok(invoices
            .into_iter()
            .map(|invoice| {
                let items = by_invoice.remove(&invoice.id).unwrap_or_default();
                InvoiceWithItems { invoice, items }
            })
            .collect())
    }

    pub async fn get_invoice(&self, id: Uuid) -> Result<Option<InvoiceWithItems>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(invoice) = invoice else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(InvoiceWithItems { invoice, items }))
    }

    /// Somatórios do mês corrente para o dashboard, lidos em uma transação
    /// só (snapshot consistente).
    pub async fn finance_metrics(&self) -> Result<FinanceMetrics, AppError> {
        let mut tx = self.pool.begin().await?;

        let billed_month_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)::bigint
            FROM invoices
            WHERE date_trunc('month', due_date::timestamp) = date_trunc('month', CURRENT_DATE)
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        let received_month_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)::bigint
            FROM invoices
            WHERE status = 'paid'
              AND date_trunc('month', updated_at) = date_trunc('month', CURRENT_DATE)
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        let overdue_cents: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)::bigint
            FROM invoices
            WHERE status = 'open' AND due_date < CURRENT_DATE
            "#,
        )
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(FinanceMetrics {
            billed_month_cents,
            received_month_cents,
            overdue_cents,
            delinquency_pct: 0.0,
        })
    }
}
