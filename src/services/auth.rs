// src/services/auth.rs

use std::collections::HashMap;
use std::sync::Arc;

use bcrypt::verify;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::{
    common::error::AppError,
    models::auth::{Claims, LoginResponse, User, UserInfo},
};

/// Diretório de operadores do admin: a tabela 'users' carregada inteira na
/// subida do processo. Somente-leitura em runtime; lookup por e-mail,
/// case-insensitive.
#[derive(Clone)]
pub struct UserDirectory {
    by_email: Arc<HashMap<String, User>>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        let by_email = users
            .into_iter()
            .map(|user| (user.email.to_lowercase(), user))
            .collect();
        Self {
            by_email: Arc::new(by_email),
        }
    }

    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        self.by_email.get(&email.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

#[derive(Clone)]
pub struct AuthService {
    directory: UserDirectory,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(directory: UserDirectory, jwt_secret: String) -> Self {
        Self {
            directory,
            jwt_secret,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let user = self
            .directory
            .find_by_email(email)
            .cloned()
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_owned();
        let password_hash = user.password_hash.clone();

        // Executa a verificação bcrypt em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password, &password_hash)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        let access_token = self.create_token(&user)?;
        Ok(LoginResponse {
            access_token,
            user: UserInfo::from(&user),
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims)
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(2);

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            name: user.name.clone(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_user(email: &str, password: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Operadora".to_string(),
            role: "finance".to_string(),
            // custo baixo só para o teste não arrastar
            password_hash: bcrypt::hash(password, 4).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    fn service(users: Vec<User>) -> AuthService {
        AuthService::new(UserDirectory::new(users), "segredo-de-teste".to_string())
    }

    #[tokio::test]
    async fn login_issues_a_decodable_token() {
        let user = test_user("ana@op.com", "senha-forte");
        let expected_id = user.id;
        let svc = service(vec![user]);

        let response = svc.login("ANA@OP.COM", "senha-forte").await.unwrap();
        assert_eq!(response.user.email, "ana@op.com");

        let claims = svc.validate_token(&response.access_token).unwrap();
        assert_eq!(claims.sub, expected_id);
        assert_eq!(claims.email, "ana@op.com");
        assert_eq!(claims.role, "finance");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_invalid_credentials() {
        let svc = service(vec![test_user("ana@op.com", "senha-forte")]);

        let err = svc.login("ana@op.com", "senha-errada").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = svc.login("ninguem@op.com", "senha-forte").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let svc = service(vec![]);
        let err = svc.validate_token("nem.um.jwt").unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }
}
