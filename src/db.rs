pub mod billing_repo;
pub mod customer_repo;
pub mod user_repo;

pub use billing_repo::BillingRepository;
pub use customer_repo::CustomerRepository;
pub use user_repo::UserRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::customer::{Customer, CustomerAddress, CustomerAggregate, CustomerContact},
    services::reconcile::ChildWrites,
};

/// O colaborador de persistência do agregado Cliente.
///
/// O orquestrador de atualização só conversa com esta interface: carrega o
/// agregado inteiro (cliente + contatos + endereços) e persiste tudo como
/// uma única unidade transacional: ou grava tudo, ou nada.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn load_aggregate(&self, id: Uuid) -> Result<Option<CustomerAggregate>, AppError>;

    /// Grava a linha do cliente e aplica os planos de escrita das coleções
    /// filhas (quando presentes) em uma transação só, devolvendo o agregado
    /// recarregado.
    async fn save_aggregate(
        &self,
        customer: &Customer,
        contacts: Option<&ChildWrites<CustomerContact>>,
        addresses: Option<&ChildWrites<CustomerAddress>>,
    ) -> Result<CustomerAggregate, AppError>;
}
