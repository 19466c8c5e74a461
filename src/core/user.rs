//! User business logic - Signup, profile edits and bank account settings.
//!
//! Users are keyed by the identity provider's subject and are never deleted.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Data captured on signup.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Identity provider subject
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Optional avatar URL
    pub photo_url: Option<String>,
}

/// Editable profile fields; replaces all of them at once.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Optional avatar URL
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Where other members send repayments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Four digit bank code
    pub bank_code: String,
    /// Three digit branch code
    pub branch_code: String,
    /// Seven digit account number
    pub account_code: String,
}

impl BankAccount {
    /// Checks that every code is made of ASCII digits of the expected length.
    pub fn validate(&self) -> Result<()> {
        check_digits("bank_code", &self.bank_code, 4)?;
        check_digits("branch_code", &self.branch_code, 3)?;
        check_digits("account_code", &self.account_code, 7)
    }
}

fn check_digits(field: &'static str, value: &str, len: usize) -> Result<()> {
    if value.len() != len || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid(field, format!("must be exactly {len} digits")));
    }
    Ok(())
}

/// API-facing view of a user, with the bank account grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    /// User id
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Avatar URL
    pub photo_url: Option<String>,
    /// Bank account, if one is registered
    pub bank: Option<BankAccount>,
}

impl From<user::Model> for UserProfile {
    fn from(model: user::Model) -> Self {
        let bank = match (model.bank_code, model.branch_code, model.account_code) {
            (Some(bank_code), Some(branch_code), Some(account_code)) => Some(BankAccount {
                bank_code,
                branch_code,
                account_code,
            }),
            _ => None,
        };
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            photo_url: model.photo_url,
            bank,
        }
    }
}

fn validate_profile(name: &str, email: &str, photo_url: Option<&str>) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::invalid("name", "name cannot be empty"));
    }
    let email = email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid_email {
        return Err(Error::invalid("email", "email address is not valid"));
    }
    if photo_url.is_some_and(|url| !(url.starts_with("https://") || url.starts_with("http://"))) {
        return Err(Error::invalid("photo_url", "photo URL must be http(s)"));
    }
    Ok(())
}

/// Returns the user or `UserNotFound`.
pub async fn require_user<C>(conn: &C, user_id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })
}

/// Finds a user by id.
pub async fn get_user(db: &DatabaseConnection, user_id: &str) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Registers a user on first sign-in. Registering an existing id returns the stored
/// user unchanged.
pub async fn register_user(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model> {
    if new_user.id.trim().is_empty() {
        return Err(Error::invalid("id", "user id cannot be empty"));
    }
    validate_profile(&new_user.name, &new_user.email, new_user.photo_url.as_deref())?;

    if let Some(existing) = get_user(db, &new_user.id).await? {
        return Ok(existing);
    }

    let now = chrono::Utc::now();
    let user = user::ActiveModel {
        id: Set(new_user.id),
        name: Set(new_user.name.trim().to_string()),
        email: Set(new_user.email.trim().to_string()),
        photo_url: Set(new_user.photo_url),
        bank_code: Set(None),
        branch_code: Set(None),
        account_code: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!(user_id = %user.id, "User registered");
    Ok(user)
}

/// Replaces the editable profile fields.
pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: &str,
    update: ProfileUpdate,
) -> Result<user::Model> {
    validate_profile(&update.name, &update.email, update.photo_url.as_deref())?;
    let user = require_user(db, user_id).await?;

    let mut active: user::ActiveModel = user.into();
    active.name = Set(update.name.trim().to_string());
    active.email = Set(update.email.trim().to_string());
    active.photo_url = Set(update.photo_url);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Registers or replaces the user's bank account.
pub async fn set_bank_account(
    db: &DatabaseConnection,
    user_id: &str,
    bank: BankAccount,
) -> Result<user::Model> {
    bank.validate()?;
    let user = require_user(db, user_id).await?;

    let mut active: user::ActiveModel = user.into();
    active.bank_code = Set(Some(bank.bank_code));
    active.branch_code = Set(Some(bank.branch_code));
    active.account_code = Set(Some(bank.account_code));
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(db).await?;
    info!(user_id, "Bank account updated");
    Ok(updated)
}

/// Removes the user's bank account.
pub async fn clear_bank_account(db: &DatabaseConnection, user_id: &str) -> Result<user::Model> {
    let user = require_user(db, user_id).await?;

    let mut active: user::ActiveModel = user.into();
    active.bank_code = Set(None);
    active.branch_code = Set(None);
    active.account_code = Set(None);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}
