//! Stored company token.
//!
//! The portal keeps one provider token pair per environment so requests that
//! arrive without provider cookies can still reach the accounting API.

use crate::{config::QuickBooksEnvironment, db::DbPool, error::AppError, models::token::TokenSet};

/// Insert or replace the token pair for `environment`.
pub async fn save_company_token(
    pool: &DbPool,
    environment: QuickBooksEnvironment,
    tokens: &TokenSet,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO accounting_tokens (
            environment, realm_id, access_token, refresh_token, token_type,
            access_expires_at, refresh_expires_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (environment) DO UPDATE
        SET realm_id = EXCLUDED.realm_id,
            access_token = EXCLUDED.access_token,
            refresh_token = EXCLUDED.refresh_token,
            token_type = EXCLUDED.token_type,
            access_expires_at = EXCLUDED.access_expires_at,
            refresh_expires_at = EXCLUDED.refresh_expires_at,
            updated_at = NOW()
        "#,
    )
    .bind(environment.as_str())
    .bind(&tokens.realm_id)
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(&tokens.token_type)
    .bind(tokens.access_expires_at)
    .bind(tokens.refresh_expires_at)
    .execute(pool)
    .await?;

    tracing::info!(
        environment = environment.as_str(),
        realm_id = %tokens.realm_id,
        access_expires_at = %tokens.access_expires_at,
        "company token stored"
    );
    Ok(())
}

pub async fn load_company_token(
    pool: &DbPool,
    environment: QuickBooksEnvironment,
) -> Result<Option<TokenSet>, AppError> {
    let tokens = sqlx::query_as::<_, TokenSet>(
        r#"
        SELECT realm_id, access_token, refresh_token, token_type,
               access_expires_at, refresh_expires_at
        FROM accounting_tokens
        WHERE environment = $1
        "#,
    )
    .bind(environment.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(tokens)
}
