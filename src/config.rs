// src/config.rs

use std::sync::Arc;
use std::{env, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    db::{BillingRepository, CustomerRepository, UserRepository},
    services::{
        auth::{AuthService, UserDirectory},
        customer_service::CustomerService,
    },
};

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub customer_service: CustomerService,
    pub customer_repo: CustomerRepository,
    pub billing_repo: BillingRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // Roda as migrações antes de montar o grafo de serviços: o
        // diretório de operadores lê a tabela 'users' logo abaixo.
        sqlx::migrate!().run(&db_pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        // --- Monta o grafo de dependências ---
        let customer_repo = CustomerRepository::new(db_pool.clone());
        let customer_service = CustomerService::new(Arc::new(customer_repo.clone()));
        let billing_repo = BillingRepository::new(db_pool.clone());

        // Diretório de operadores: carregado uma vez, somente-leitura depois
        let users = UserRepository::new(db_pool.clone()).load_all().await?;
        tracing::info!("👤 {} operador(es) carregado(s) no diretório de login.", users.len());
        let auth_service = AuthService::new(UserDirectory::new(users), jwt_secret);

        Ok(Self {
            db_pool,
            auth_service,
            customer_service,
            customer_repo,
            billing_repo,
        })
    }
}
