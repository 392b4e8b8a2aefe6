use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::instrument;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{LoginInput, RegisterInput, RegisteredUser, TokenResponse},
    repository::UserRepository,
    telemetry::USERS_REGISTERED,
};

const MAX_NAME_LEN: usize = 150;
const MAX_EMAIL_LEN: usize = 254;
const RESERVED_USERNAME: &str = "me";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    jwt_expires_in_hours: i64,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, config: &Config) -> Self {
        Self {
            user_repo,
            jwt_secret: config.jwt_secret.clone(),
            jwt_expires_in_hours: config.jwt_expires_in_hours,
        }
    }

    #[instrument(name = "auth.register", skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> AppResult<RegisteredUser> {
        validate_registration(&input)?;

        if self
            .user_repo
            .exists_by_email_or_username(&input.email, &input.username)
            .await?
        {
            return Err(AppError::Conflict(
                "Email or username already registered".to_string(),
            ));
        }

        let password_hash = self.hash_password(&input.password)?;

        let user = self
            .user_repo
            .create(
                &input.email,
                &input.username,
                &input.first_name,
                &input.last_name,
                &password_hash,
            )
            .await?
            .ok_or_else(|| AppError::Conflict("Email or username already registered".to_string()))?;

        USERS_REGISTERED.add(1, &[]);

        tracing::info!(user_id = user.id, "User registered");

        Ok(RegisteredUser::from(user))
    }

    #[instrument(name = "auth.login", skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> AppResult<TokenResponse> {
        let user = self
            .user_repo
            .find_by_email(&input.email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        self.verify_password(&input.password, &user.password_hash)?;

        let auth_token = self.issue_token(user.id)?;

        tracing::info!(user_id = user.id, "User logged in");

        Ok(TokenResponse { auth_token })
    }

    #[instrument(name = "auth.validate_token", skip(self, token))]
    pub fn validate_token(&self, token: &str) -> AppResult<i32> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims.sub)
    }

    pub fn issue_token(&self, user_id: i32) -> AppResult<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + Duration::hours(self.jwt_expires_in_hours);

        let claims = Claims {
            sub: user_id,
            exp: exp.unix_timestamp(),
            iat: now.unix_timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    fn verify_password(&self, password: &str, hash: &str) -> AppResult<()> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid hash: {}", e)))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::InvalidCredentials)
    }
}

pub fn validate_registration(input: &RegisterInput) -> AppResult<()> {
    validate_username(&input.username)?;

    let email = input.email.trim();
    if email.is_empty() || !email.contains('@') || email.chars().count() > MAX_EMAIL_LEN {
        return Err(AppError::Validation("Enter a valid email address".to_string()));
    }

    for (field, value) in [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
    ] {
        if value.trim().is_empty() || value.chars().count() > MAX_NAME_LEN {
            return Err(AppError::Validation(format!(
                "{field} must be between 1 and {MAX_NAME_LEN} characters"
            )));
        }
    }

    if input.password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }

    Ok(())
}

fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() || username.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "username must be between 1 and {MAX_NAME_LEN} characters"
        )));
    }

    if username.to_lowercase() == RESERVED_USERNAME {
        return Err(AppError::Validation(format!(
            "username \"{username}\" is not allowed"
        )));
    }

    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        return Err(AppError::Validation(
            "username may contain only letters, digits and . @ + - _".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn create_test_claims(user_id: i32, hours_offset: i64) -> Claims {
        let now = OffsetDateTime::now_utc();
        let exp = now + Duration::hours(hours_offset);
        Claims {
            sub: user_id,
            exp: exp.unix_timestamp(),
            iat: now.unix_timestamp(),
        }
    }

    fn registration(username: &str) -> RegisterInput {
        RegisterInput {
            email: "anna@example.com".to_string(),
            username: username.to_string(),
            first_name: "Anna".to_string(),
            last_name: "Ivanova".to_string(),
            password: "secret123".to_string(),
        }
    }

    #[test]
    fn test_jwt_encode_decode() {
        let secret = "test-secret-key-for-jwt";
        let claims = create_test_claims(42, 24);

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encoding should succeed");

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .expect("decoding should succeed");

        assert_eq!(decoded.claims.sub, 42);
    }

    #[test]
    fn test_jwt_expired_token() {
        let secret = "test-secret-key-for-jwt";
        let claims = create_test_claims(42, -1);

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encoding should succeed");

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_password_hash_and_verify() {
        let password = "secure_password_123";
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .expect("hashing should succeed")
            .to_string();

        let parsed_hash = PasswordHash::new(&hash).expect("parsing should succeed");

        assert!(argon2.verify_password(password.as_bytes(), &parsed_hash).is_ok());
        assert!(argon2.verify_password(b"wrong_password", &parsed_hash).is_err());
    }

    #[test]
    fn test_valid_registration() {
        assert_ok!(validate_registration(&registration("anna.i+cook@home")));
    }

    #[test]
    fn test_reserved_username_rejected_in_any_case() {
        for username in ["me", "Me", "ME", "mE"] {
            let error = assert_err!(validate_registration(&registration(username)));
            assert!(matches!(error, AppError::Validation(_)));
        }
    }

    #[test]
    fn test_username_containing_me_is_allowed() {
        assert_ok!(validate_registration(&registration("meme")));
        assert_ok!(validate_registration(&registration("me_too")));
    }

    #[test]
    fn test_username_character_set() {
        assert_err!(validate_registration(&registration("has space")));
        assert_err!(validate_registration(&registration("semi;colon")));
        assert_err!(validate_registration(&registration("")));
        assert_ok!(validate_registration(&registration("Анна_1")));
    }

    #[test]
    fn test_registration_requires_email_and_names() {
        let mut input = registration("anna");
        input.email = "not-an-email".to_string();
        assert_err!(validate_registration(&input));

        let mut input = registration("anna");
        input.last_name = "  ".to_string();
        assert_err!(validate_registration(&input));

        let mut input = registration("anna");
        input.first_name = "x".repeat(MAX_NAME_LEN + 1);
        assert_err!(validate_registration(&input));

        let mut input = registration("anna");
        input.password = String::new();
        assert_err!(validate_registration(&input));
    }
}
