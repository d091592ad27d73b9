//! PostgreSQL Repository Implementations
//!
//! [`PgAuthRepository`] runs each call on a pooled connection;
//! [`PgTransaction`] runs every call on one open transaction. Both share the
//! statements in [`sql`].

use chrono::{DateTime, Utc};
use sqlx::{Connection, PgConnection, PgPool, Postgres, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::application::transaction::{TransactionBackend, TxOptions};
use crate::domain::entity::login_attempt::LoginAttempt;
use crate::domain::entity::session::Session;
use crate::domain::entity::user::User;
use crate::domain::repository::{
    LoginAttemptRepository, Page, PageRequest, SessionRepository, UserRepository,
};
use crate::domain::value_object::{
    access_token::AccessToken, device_fingerprint::DeviceFingerprint, email::Email,
    ip_address::IpAddress, refresh_token::RefreshTokenValue, session_id::SessionId,
    user_agent::UserAgent, user_id::UserId, user_name::UserName, user_password::UserPassword,
    user_role::UserRole, user_status::UserStatus,
};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Delete sessions whose refresh window has closed
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE refresh_expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(sessions_deleted = deleted, "Purged expired sessions");

        Ok(deleted)
    }

    /// Delete login attempts older than `cutoff`
    pub async fn purge_attempts_before(&self, cutoff: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM login_attempts WHERE attempted_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(attempts_deleted = deleted, cutoff = %cutoff, "Purged login attempts");

        Ok(deleted)
    }
}

/// One open transaction
///
/// The connection sits behind a mutex because the store traits take `&self`.
pub struct PgTransaction {
    tx: Mutex<Transaction<'static, Postgres>>,
}

// ============================================================================
// Transactions
// ============================================================================

impl TransactionBackend for PgAuthRepository {
    type Tx = PgTransaction;

    async fn begin(&self, options: TxOptions) -> AuthResult<PgTransaction> {
        let mut tx = self.pool.begin().await?;

        let mut statement = format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            options.isolation.as_sql()
        );
        if options.read_only {
            statement.push_str(" READ ONLY");
        }
        sqlx::query(&statement).execute(&mut *tx).await?;

        Ok(PgTransaction { tx: Mutex::new(tx) })
    }

    async fn commit(&self, tx: PgTransaction) -> AuthResult<()> {
        tx.tx.into_inner().commit().await?;
        Ok(())
    }

    async fn rollback(&self, tx: PgTransaction) -> AuthResult<()> {
        tx.tx.into_inner().rollback().await?;
        Ok(())
    }
}

// ============================================================================
// Pooled access
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn create_user(&self, user: &User) -> AuthResult<()> {
        let mut conn = self.pool.acquire().await?;
        sql::insert_user(&mut conn, user).await
    }

    async fn find_user_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        sql::find_user_by_id(&mut conn, user_id).await
    }

    async fn find_user_by_name(&self, user_name: &UserName) -> AuthResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        sql::find_user_by_name(&mut conn, user_name).await
    }

    async fn update_user(&self, user: &User) -> AuthResult<()> {
        let mut conn = self.pool.acquire().await?;
        sql::update_user(&mut conn, user).await
    }
}

impl SessionRepository for PgAuthRepository {
    async fn insert_session(&self, session: &Session) -> AuthResult<()> {
        let mut conn = self.pool.acquire().await?;
        sql::insert_session(&mut conn, session).await
    }

    async fn update_session(&self, session: &Session) -> AuthResult<()> {
        let mut conn = self.pool.acquire().await?;
        sql::update_session(&mut conn, session).await
    }

    async fn find_session(&self, session_id: &SessionId) -> AuthResult<Option<Session>> {
        let mut conn = self.pool.acquire().await?;
        sql::find_session(&mut conn, session_id).await
    }

    async fn find_session_by_refresh_token(&self, value: &str) -> AuthResult<Option<Session>> {
        let mut conn = self.pool.acquire().await?;
        sql::find_session_by_refresh_token(&mut conn, value, false).await
    }

    async fn list_active_sessions(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> AuthResult<Page<Session>> {
        let mut conn = self.pool.acquire().await?;
        sql::list_active_sessions(&mut conn, user_id, now, page).await
    }

    async fn invalidate_session(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let mut conn = self.pool.acquire().await?;
        sql::invalidate_session(&mut conn, session_id, now).await
    }

    async fn invalidate_sessions_except(
        &self,
        user_id: &UserId,
        keep: Option<SessionId>,
        now: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let mut conn = self.pool.acquire().await?;
        sql::invalidate_sessions_except(&mut conn, user_id, keep, now).await
    }

    async fn touch_session(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let mut conn = self.pool.acquire().await?;
        sql::touch_session(&mut conn, session_id, now).await
    }
}

impl LoginAttemptRepository for PgAuthRepository {
    async fn append_attempt(&self, attempt: &LoginAttempt) -> AuthResult<()> {
        let mut conn = self.pool.acquire().await?;
        sql::insert_attempt(&mut conn, attempt).await
    }

    async fn count_failures_since(
        &self,
        user_name: &UserName,
        ip: &IpAddress,
        since: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let mut conn = self.pool.acquire().await?;
        sql::count_failures_since(&mut conn, user_name, ip, since).await
    }
}

// ============================================================================
// Transactional access
// ============================================================================

impl UserRepository for PgTransaction {
    async fn create_user(&self, user: &User) -> AuthResult<()> {
        let mut tx = self.tx.lock().await;
        sql::insert_user(&mut tx, user).await
    }

    async fn find_user_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let mut tx = self.tx.lock().await;
        sql::find_user_by_id(&mut tx, user_id).await
    }

    async fn find_user_by_name(&self, user_name: &UserName) -> AuthResult<Option<User>> {
        let mut tx = self.tx.lock().await;
        sql::find_user_by_name(&mut tx, user_name).await
    }

    async fn update_user(&self, user: &User) -> AuthResult<()> {
        let mut tx = self.tx.lock().await;
        sql::update_user(&mut tx, user).await
    }
}

impl SessionRepository for PgTransaction {
    async fn insert_session(&self, session: &Session) -> AuthResult<()> {
        let mut tx = self.tx.lock().await;
        sql::insert_session(&mut tx, session).await
    }

    async fn update_session(&self, session: &Session) -> AuthResult<()> {
        let mut tx = self.tx.lock().await;
        sql::update_session(&mut tx, session).await
    }

    async fn find_session(&self, session_id: &SessionId) -> AuthResult<Option<Session>> {
        let mut tx = self.tx.lock().await;
        sql::find_session(&mut tx, session_id).await
    }

    /// Locks the row until the transaction ends
    async fn find_session_by_refresh_token(&self, value: &str) -> AuthResult<Option<Session>> {
        let mut tx = self.tx.lock().await;
        sql::find_session_by_refresh_token(&mut tx, value, true).await
    }

    async fn list_active_sessions(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> AuthResult<Page<Session>> {
        let mut tx = self.tx.lock().await;
        sql::list_active_sessions(&mut tx, user_id, now, page).await
    }

    async fn invalidate_session(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let mut tx = self.tx.lock().await;
        sql::invalidate_session(&mut tx, session_id, now).await
    }

    async fn invalidate_sessions_except(
        &self,
        user_id: &UserId,
        keep: Option<SessionId>,
        now: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let mut tx = self.tx.lock().await;
        sql::invalidate_sessions_except(&mut tx, user_id, keep, now).await
    }

    async fn touch_session(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let mut tx = self.tx.lock().await;
        sql::touch_session(&mut tx, session_id, now).await
    }
}

impl LoginAttemptRepository for PgTransaction {
    /// Runs under a savepoint so a failed insert leaves the transaction usable
    async fn append_attempt(&self, attempt: &LoginAttempt) -> AuthResult<()> {
        let mut tx = self.tx.lock().await;
        let mut savepoint = Connection::begin(&mut **tx).await?;
        match sql::insert_attempt(&mut savepoint, attempt).await {
            Ok(()) => {
                savepoint.commit().await?;
                Ok(())
            }
            Err(e) => {
                savepoint.rollback().await?;
                Err(e)
            }
        }
    }

    async fn count_failures_since(
        &self,
        user_name: &UserName,
        ip: &IpAddress,
        since: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let mut tx = self.tx.lock().await;
        sql::count_failures_since(&mut tx, user_name, ip, since).await
    }
}

// ============================================================================
// Statements
// ============================================================================

mod sql {
    use super::*;

    const USER_COLUMNS: &str = r#"
        user_id,
        user_name,
        email,
        first_name,
        last_name,
        password_hash,
        user_role,
        user_status,
        last_login_at,
        created_at,
        updated_at
    "#;

    const SESSION_COLUMNS: &str = r#"
        session_id,
        user_id,
        access_token,
        refresh_token,
        device_fingerprint,
        ip_address,
        user_agent,
        is_active,
        access_expires_at,
        refresh_expires_at,
        created_at,
        updated_at,
        last_activity_at
    "#;

    pub async fn insert_user(conn: &mut PgConnection, user: &User) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                user_name,
                email,
                first_name,
                last_name,
                password_hash,
                user_role,
                user_status,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.user_name.as_str())
        .bind(user.email.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.password.as_phc_string())
        .bind(user.user_role.id())
        .bind(user.user_status.id())
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn find_user_by_id(
        conn: &mut PgConnection,
        user_id: &UserId,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(conn)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn find_user_by_name(
        conn: &mut PgConnection,
        user_name: &UserName,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_name = $1"
        ))
        .bind(user_name.as_str())
        .fetch_optional(conn)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn update_user(conn: &mut PgConnection, user: &User) -> AuthResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE users SET
                email = $2,
                first_name = $3,
                last_name = $4,
                password_hash = $5,
                user_role = $6,
                user_status = $7,
                last_login_at = $8,
                updated_at = $9
            WHERE user_id = $1
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.email.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.password.as_phc_string())
        .bind(user.user_role.id())
        .bind(user.user_status.id())
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .execute(conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    pub async fn insert_session(conn: &mut PgConnection, session: &Session) -> AuthResult<()> {
        sqlx::query(&format!(
            "INSERT INTO sessions ({SESSION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(session.session_id.as_uuid())
        .bind(session.user_id.as_uuid())
        .bind(session.access_token.as_str())
        .bind(session.refresh_token.as_str())
        .bind(session.device_fingerprint.as_str())
        .bind(session.ip_address.to_string())
        .bind(session.user_agent.as_str())
        .bind(session.is_active)
        .bind(session.access_expires_at)
        .bind(session.refresh_expires_at)
        .bind(session.created_at)
        .bind(session.updated_at)
        .bind(session.last_activity_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn update_session(conn: &mut PgConnection, session: &Session) -> AuthResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE sessions SET
                access_token = $2,
                refresh_token = $3,
                is_active = $4,
                access_expires_at = $5,
                updated_at = $6,
                last_activity_at = $7
            WHERE session_id = $1
            "#,
        )
        .bind(session.session_id.as_uuid())
        .bind(session.access_token.as_str())
        .bind(session.refresh_token.as_str())
        .bind(session.is_active)
        .bind(session.access_expires_at)
        .bind(session.updated_at)
        .bind(session.last_activity_at)
        .execute(conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AuthError::SessionNotFound);
        }
        Ok(())
    }

    pub async fn find_session(
        conn: &mut PgConnection,
        session_id: &SessionId,
    ) -> AuthResult<Option<Session>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = $1"
        ))
        .bind(session_id.as_uuid())
        .fetch_optional(conn)
        .await?;

        row.map(SessionRow::into_session).transpose()
    }

    pub async fn find_session_by_refresh_token(
        conn: &mut PgConnection,
        value: &str,
        lock: bool,
    ) -> AuthResult<Option<Session>> {
        let lock_clause = if lock { " FOR UPDATE" } else { "" };
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE refresh_token = $1{lock_clause}"
        ))
        .bind(value)
        .fetch_optional(conn)
        .await?;

        row.map(SessionRow::into_session).transpose()
    }

    pub async fn list_active_sessions(
        conn: &mut PgConnection,
        user_id: &UserId,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> AuthResult<Page<Session>> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM sessions
            WHERE user_id = $1 AND is_active AND refresh_expires_at > $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE user_id = $1 AND is_active AND refresh_expires_at > $2 \
             ORDER BY last_activity_at DESC, created_at DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(user_id.as_uuid())
        .bind(now)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&mut *conn)
        .await?;

        let items = rows
            .into_iter()
            .map(SessionRow::into_session)
            .collect::<AuthResult<Vec<_>>>()?;

        Ok(Page::new(items, total.max(0) as u64, page))
    }

    pub async fn invalidate_session(
        conn: &mut PgConnection,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let updated = sqlx::query(
            "UPDATE sessions SET is_active = FALSE, updated_at = $2 \
             WHERE session_id = $1 AND is_active",
        )
        .bind(session_id.as_uuid())
        .bind(now)
        .execute(conn)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    pub async fn invalidate_sessions_except(
        conn: &mut PgConnection,
        user_id: &UserId,
        keep: Option<SessionId>,
        now: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let updated = sqlx::query(
            r#"
            UPDATE sessions SET is_active = FALSE, updated_at = $3
            WHERE user_id = $1
              AND is_active
              AND ($2::uuid IS NULL OR session_id <> $2)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(keep.map(SessionId::into_uuid))
        .bind(now)
        .execute(conn)
        .await?
        .rows_affected();

        Ok(updated)
    }

    pub async fn touch_session(
        conn: &mut PgConnection,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let updated = sqlx::query("UPDATE sessions SET last_activity_at = $2 WHERE session_id = $1")
            .bind(session_id.as_uuid())
            .bind(now)
            .execute(conn)
            .await?
            .rows_affected();

        Ok(updated > 0)
    }

    pub async fn insert_attempt(conn: &mut PgConnection, attempt: &LoginAttempt) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO login_attempts (
                attempt_id,
                user_name,
                ip_address,
                user_agent,
                success,
                failure_reason,
                attempted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(attempt.attempt_id.as_uuid())
        .bind(attempt.user_name.as_str())
        .bind(attempt.ip_address.to_string())
        .bind(attempt.user_agent.as_str())
        .bind(attempt.success)
        .bind(attempt.failure_reason.map(|r| r.as_str()))
        .bind(attempt.attempted_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn count_failures_since(
        conn: &mut PgConnection,
        user_name: &UserName,
        ip: &IpAddress,
        since: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE user_name = $1
              AND ip_address = $2
              AND NOT success
              AND attempted_at >= $3
            "#,
        )
        .bind(user_name.as_str())
        .bind(ip.to_string())
        .bind(since)
        .fetch_one(conn)
        .await?;

        Ok(count.max(0) as u64)
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    user_name: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    password_hash: String,
    user_role: i16,
    user_status: i16,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let user_status = UserStatus::from_id(self.user_status).ok_or_else(|| {
            AuthError::Internal(format!("Invalid user_status: {}", self.user_status))
        })?;

        Ok(User {
            user_id: UserId::from_uuid(self.user_id),
            user_name: UserName::from_db(self.user_name),
            email: Email::from_db(self.email),
            first_name: self.first_name,
            last_name: self.last_name,
            password: UserPassword::from_phc_string(self.password_hash)?,
            user_role: UserRole::from_id(self.user_role)?,
            user_status,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: Uuid,
    user_id: Uuid,
    access_token: String,
    refresh_token: String,
    device_fingerprint: String,
    ip_address: String,
    user_agent: String,
    is_active: bool,
    access_expires_at: DateTime<Utc>,
    refresh_expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_session(self) -> AuthResult<Session> {
        let ip_address = IpAddress::parse(&self.ip_address)
            .map_err(|e| AuthError::Internal(format!("Invalid ip_address: {e}")))?;

        Ok(Session {
            session_id: SessionId::from_uuid(self.session_id),
            user_id: UserId::from_uuid(self.user_id),
            access_token: AccessToken::from_db(self.access_token),
            refresh_token: RefreshTokenValue::from_db(self.refresh_token),
            device_fingerprint: DeviceFingerprint::from_db(self.device_fingerprint),
            ip_address,
            user_agent: UserAgent::from_db(self.user_agent),
            is_active: self.is_active,
            access_expires_at: self.access_expires_at,
            refresh_expires_at: self.refresh_expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_activity_at: self.last_activity_at,
        })
    }
}
