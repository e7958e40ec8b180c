/// PostgreSQL identity store
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};

use super::{AccountInsert, IdentityStore, IdentityTx};
use crate::error::Result;
use crate::models::{
    Account, AccountChanges, AccountCredentials, AccountId, IdentityRecord, Profile,
    ProfileFields, ProfileId, ProfilePatch,
};

const SELECT_COMBINED: &str = r#"
    SELECT
        u.id,
        u.nom AS name,
        u.prenom AS surname,
        u.email,
        u.telephone AS phone,
        u.role,
        u.created_at,
        u.updated_at,
        c.id AS profile_id,
        c.civilite AS civility,
        c.piece_identite AS id_document,
        c.date_naissance AS birth_date,
        c.numero_permis AS license_number,
        c.date_permis AS license_issue_date,
        c.adresse AS address
    FROM utilisateurs u
    INNER JOIN client c ON c.utilisateur_id = u.id
"#;

const ACCOUNT_RETURNING: &str = r#"
    RETURNING
        id,
        nom AS name,
        prenom AS surname,
        email,
        telephone AS phone,
        role,
        created_at,
        updated_at
"#;

/// Flat join row, split into account and profile
#[derive(Debug, FromRow)]
struct CombinedRow {
    #[sqlx(flatten)]
    account: Account,
    profile_id: ProfileId,
    civility: Option<String>,
    id_document: Option<String>,
    birth_date: Option<NaiveDate>,
    license_number: Option<String>,
    license_issue_date: Option<NaiveDate>,
    address: Option<String>,
}

impl From<CombinedRow> for IdentityRecord {
    fn from(row: CombinedRow) -> Self {
        let profile = Profile {
            id: row.profile_id,
            account_id: row.account.id,
            civility: row.civility,
            id_document: row.id_document,
            birth_date: row.birth_date,
            license_number: row.license_number,
            license_issue_date: row.license_issue_date,
            address: row.address,
        };
        IdentityRecord {
            account: row.account,
            profile,
        }
    }
}

/// Identity store backed by a shared connection pool
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    type Tx = PgIdentityTx;

    async fn begin(&self) -> Result<PgIdentityTx> {
        let tx = self.pool.begin().await?;
        Ok(PgIdentityTx { tx })
    }

    async fn find_combined_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Option<IdentityRecord>> {
        let sql = format!("{SELECT_COMBINED} WHERE c.utilisateur_id = $1");
        let row = sqlx::query_as::<_, CombinedRow>(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(IdentityRecord::from))
    }

    async fn find_combined_by_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<IdentityRecord>> {
        let sql = format!("{SELECT_COMBINED} WHERE c.id = $1");
        let row = sqlx::query_as::<_, CombinedRow>(&sql)
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(IdentityRecord::from))
    }

    async fn find_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, nom AS name, prenom AS surname, email, telephone AS phone,
                   role, created_at, updated_at
            FROM utilisateurs
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_credentials_by_email(&self, email: &str) -> Result<Option<AccountCredentials>> {
        let credentials = sqlx::query_as::<_, AccountCredentials>(
            r#"
            SELECT id, nom AS name, prenom AS surname, email, telephone AS phone,
                   role, created_at, updated_at, mot_de_passe AS password_hash
            FROM utilisateurs
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credentials)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM utilisateurs WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

/// Open transaction on the pool
pub struct PgIdentityTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl IdentityTx for PgIdentityTx {
    async fn insert_account(&mut self, account: &AccountInsert) -> Result<Account> {
        let sql = format!(
            r#"
            INSERT INTO utilisateurs (nom, prenom, email, telephone, mot_de_passe, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            {ACCOUNT_RETURNING}
            "#
        );
        let created = sqlx::query_as::<_, Account>(&sql)
            .bind(&account.name)
            .bind(&account.surname)
            .bind(&account.email)
            .bind(&account.phone)
            .bind(&account.password_hash)
            .bind(account.role.as_str())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(created)
    }

    async fn insert_profile(
        &mut self,
        account_id: AccountId,
        fields: &ProfileFields,
    ) -> Result<Profile> {
        let fields = fields.normalized();
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO client (utilisateur_id, civilite, piece_identite, date_naissance,
                                numero_permis, date_permis, adresse)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING
                id,
                utilisateur_id AS account_id,
                civilite AS civility,
                piece_identite AS id_document,
                date_naissance AS birth_date,
                numero_permis AS license_number,
                date_permis AS license_issue_date,
                adresse AS address
            "#,
        )
        .bind(account_id)
        .bind(fields.civility)
        .bind(fields.id_document)
        .bind(fields.birth_date)
        .bind(fields.license_number)
        .bind(fields.license_issue_date)
        .bind(fields.address)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(profile)
    }

    async fn update_profile(&mut self, account_id: AccountId, patch: &ProfilePatch) -> Result<u64> {
        if patch.is_empty() {
            // Nothing to write, still lock and match the row
            let row = sqlx::query("SELECT 1 FROM client WHERE utilisateur_id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *self.tx)
                .await?;
            return Ok(u64::from(row.is_some()));
        }

        let patch = patch.normalized();
        let mut query = QueryBuilder::<Postgres>::new("UPDATE client SET ");
        {
            let mut set = query.separated(", ");
            if let Some(value) = patch.civility {
                set.push("civilite = ").push_bind_unseparated(value);
            }
            if let Some(value) = patch.id_document {
                set.push("piece_identite = ").push_bind_unseparated(value);
            }
            if let Some(value) = patch.birth_date {
                set.push("date_naissance = ").push_bind_unseparated(value);
            }
            if let Some(value) = patch.license_number {
                set.push("numero_permis = ").push_bind_unseparated(value);
            }
            if let Some(value) = patch.license_issue_date {
                set.push("date_permis = ").push_bind_unseparated(value);
            }
            if let Some(value) = patch.address {
                set.push("adresse = ").push_bind_unseparated(value);
            }
            set.push("updated_at = CURRENT_TIMESTAMP");
        }
        query.push(" WHERE utilisateur_id = ").push_bind(account_id);

        let result = query.build().execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn update_account(
        &mut self,
        account_id: AccountId,
        changes: &AccountChanges,
    ) -> Result<u64> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE utilisateurs SET ");
        {
            let mut set = query.separated(", ");
            if let Some(value) = &changes.name {
                set.push("nom = ").push_bind_unseparated(value.clone());
            }
            if let Some(value) = &changes.surname {
                set.push("prenom = ").push_bind_unseparated(value.clone());
            }
            if let Some(value) = &changes.email {
                set.push("email = ").push_bind_unseparated(value.clone());
            }
            if let Some(value) = &changes.phone {
                set.push("telephone = ").push_bind_unseparated(value.clone());
            }
            if let Some(value) = &changes.password_hash {
                set.push("mot_de_passe = ").push_bind_unseparated(value.clone());
            }
            if let Some(role) = changes.role {
                set.push("role = ").push_bind_unseparated(role.as_str());
            }
            set.push("updated_at = CURRENT_TIMESTAMP");
        }
        query.push(" WHERE id = ").push_bind(account_id);

        let result = query.build().execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn delete_profile(&mut self, account_id: AccountId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM client WHERE utilisateur_id = $1")
            .bind(account_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_account(&mut self, account_id: AccountId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM utilisateurs WHERE id = $1")
            .bind(account_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn account_exists(&mut self, account_id: AccountId) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM utilisateurs WHERE id = $1)",
        )
        .bind(account_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn fetch_combined(&mut self, account_id: AccountId) -> Result<Option<IdentityRecord>> {
        let sql = format!("{SELECT_COMBINED} WHERE c.utilisateur_id = $1");
        let row = sqlx::query_as::<_, CombinedRow>(&sql)
            .bind(account_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(IdentityRecord::from))
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
