//! SQLite database operations
//!
//! All database access goes through this module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;

use super::models::*;
use super::store::SocialStore;
use crate::error::AppError;
use crate::metrics::observe_db;

/// Columns selected for every post query, joined with the author profile
const POST_COLUMNS: &str = r#"
    p.id, p.author_id, p.comment, p.created_at, p.is_private,
    p.parent_post_id, p.quote_of, p.repost_of,
    a.nickname AS author_nickname, a.avatar_url AS author_avatar_url
"#;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: String,
    author_id: String,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    is_private: bool,
    parent_post_id: Option<String>,
    quote_of: Option<String>,
    repost_of: Option<String>,
    author_nickname: String,
    author_avatar_url: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let author = AuthorSummary {
            id: row.author_id.clone(),
            nickname: row.author_nickname,
            avatar_url: row.author_avatar_url,
        };
        Self {
            post: Post {
                id: row.id,
                author_id: row.author_id,
                comment: row.comment,
                created_at: row.created_at,
                is_private: row.is_private,
                parent_post_id: row.parent_post_id,
                quote_of: row.quote_of,
                repost_of: row.repost_of,
            },
            author,
        }
    }
}

fn map_unique_violation(error: sqlx::Error, message: &str) -> AppError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(error),
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    /// * `max_connections` - Pool size
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path, max_connections: u32) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }
}

#[async_trait]
impl SocialStore for Database {
    // =========================================================================
    // Accounts
    // =========================================================================

    async fn get_account(&self, id: &str) -> Result<Option<Account>, AppError> {
        let account = observe_db(
            "SELECT",
            "accounts",
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(account)
    }

    async fn insert_account_with_credential(
        &self,
        account: &Account,
        credential: &Credential,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO accounts (id, nickname, avatar_url, avatar_key, intro, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.nickname)
        .bind(&account.avatar_url)
        .bind(&account.avatar_key)
        .bind(&account.intro)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO credentials (account_id, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&credential.account_id)
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .bind(credential.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "Email is already registered"))?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_credential_by_email(&self, email: &str) -> Result<Option<Credential>, AppError> {
        let credential =
            sqlx::query_as::<_, Credential>("SELECT * FROM credentials WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(credential)
    }

    async fn update_account_profile(
        &self,
        id: &str,
        nickname: &str,
        intro: &str,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts SET nickname = ?, intro = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(nickname)
        .bind(intro)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn update_account_avatar(
        &self,
        id: &str,
        avatar_url: &str,
        avatar_key: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE accounts SET avatar_url = ?, avatar_key = ?, updated_at = ? WHERE id = ?",
        )
        .bind(avatar_url)
        .bind(avatar_key)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn search_accounts(&self, query: &str, limit: usize) -> Result<Vec<Account>, AppError> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let accounts = observe_db(
            "SELECT",
            "accounts",
            sqlx::query_as::<_, Account>(
                r#"
                SELECT * FROM accounts
                WHERE lower(nickname) LIKE ? ESCAPE '\'
                ORDER BY nickname ASC, id ASC
                LIMIT ?
                "#,
            )
            .bind(pattern)
            .bind(limit as i64)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(accounts)
    }

    // =========================================================================
    // Follows
    // =========================================================================

    async fn following_ids(&self, account_id: &str) -> Result<Vec<String>, AppError> {
        let ids = observe_db(
            "SELECT",
            "follows",
            sqlx::query_scalar::<_, String>("SELECT following_id FROM follows WHERE follower_id = ?")
                .bind(account_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(ids)
    }

    async fn follower_ids(&self, account_id: &str) -> Result<Vec<String>, AppError> {
        let ids = observe_db(
            "SELECT",
            "follows",
            sqlx::query_scalar::<_, String>("SELECT follower_id FROM follows WHERE following_id = ?")
                .bind(account_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(ids)
    }

    async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND following_id = ?",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn insert_follow(&self, follower_id: &str, following_id: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)")
            .bind(follower_id)
            .bind(following_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "Already following"))?;

        Ok(())
    }

    async fn delete_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_followers(&self, account_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE following_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn count_following(&self, account_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    async fn get_post(&self, id: &str) -> Result<Option<PostRecord>, AppError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts p JOIN accounts a ON a.id = p.author_id WHERE p.id = ?"
        );
        let row = observe_db(
            "SELECT",
            "posts",
            sqlx::query_as::<_, PostRow>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(PostRecord::from))
    }

    async fn list_posts(&self, offset: usize, limit: usize) -> Result<Vec<PostRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts p
            JOIN accounts a ON a.id = p.author_id
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let rows = observe_db(
            "SELECT",
            "posts",
            sqlx::query_as::<_, PostRow>(&sql)
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn list_replies(&self, parent_id: &str) -> Result<Vec<PostRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts p
            JOIN accounts a ON a.id = p.author_id
            WHERE p.parent_post_id = ?
            ORDER BY p.created_at ASC, p.id ASC
            "#
        );
        let rows = observe_db(
            "SELECT",
            "posts",
            sqlx::query_as::<_, PostRow>(&sql)
                .bind(parent_id)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn list_posts_with_edge(
        &self,
        edge: PostEdge,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PostRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS} FROM posts p
            JOIN accounts a ON a.id = p.author_id
            INNER JOIN {table} e ON e.post_id = p.id
            WHERE e.user_id = ?
            ORDER BY e.created_at DESC, p.id DESC
            LIMIT ?
            "#,
            table = edge.table()
        );
        let rows = observe_db(
            "SELECT",
            edge.table(),
            sqlx::query_as::<_, PostRow>(&sql)
                .bind(user_id)
                .bind(limit as i64)
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post, AppError> {
        let (parent_post_id, quote_of, repost_of) = match &post.reference {
            Some(reference) => {
                let target = Some(reference.target_id.clone());
                match reference.kind {
                    ReferenceKind::Parent => (target, None, None),
                    ReferenceKind::Quote => (None, target, None),
                    ReferenceKind::Repost => (None, None, target),
                }
            }
            None => (None, None, None),
        };

        let stored = Post {
            id: EntityId::new().0,
            author_id: post.author_id.clone(),
            comment: post.comment.clone(),
            created_at: Utc::now(),
            is_private: post.is_private,
            parent_post_id,
            quote_of,
            repost_of,
        };

        observe_db(
            "INSERT",
            "posts",
            sqlx::query(
                r#"
                INSERT INTO posts (
                    id, author_id, comment, created_at, is_private,
                    parent_post_id, quote_of, repost_of
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&stored.id)
            .bind(&stored.author_id)
            .bind(&stored.comment)
            .bind(stored.created_at)
            .bind(stored.is_private)
            .bind(&stored.parent_post_id)
            .bind(&stored.quote_of)
            .bind(&stored.repost_of)
            .execute(&self.pool),
        )
        .await
        .map_err(|e| map_unique_violation(e, "Already reposted"))?;

        Ok(stored)
    }

    async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_repost_id(
        &self,
        author_id: &str,
        target_id: &str,
    ) -> Result<Option<String>, AppError> {
        let id = sqlx::query_scalar::<_, String>(
            "SELECT id FROM posts WHERE author_id = ? AND repost_of = ? LIMIT 1",
        )
        .bind(author_id)
        .bind(target_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn count_referencing(
        &self,
        kind: ReferenceKind,
        post_id: &str,
    ) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM posts WHERE {} = ?", kind.column());
        let count = observe_db(
            "COUNT",
            "posts",
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(post_id)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(count)
    }

    // =========================================================================
    // Likes / Bookmarks
    // =========================================================================

    async fn has_edge(
        &self,
        edge: PostEdge,
        post_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE post_id = ? AND user_id = ?",
            edge.table()
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(post_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    async fn insert_edge(
        &self,
        edge: PostEdge,
        post_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO {} (post_id, user_id, created_at) VALUES (?, ?, ?)",
            edge.table()
        );
        observe_db(
            "INSERT",
            edge.table(),
            sqlx::query(&sql)
                .bind(post_id)
                .bind(user_id)
                .bind(Utc::now())
                .execute(&self.pool),
        )
        .await
        .map_err(|e| map_unique_violation(e, "Already exists"))?;

        Ok(())
    }

    async fn delete_edge(
        &self,
        edge: PostEdge,
        post_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        let sql = format!(
            "DELETE FROM {} WHERE post_id = ? AND user_id = ?",
            edge.table()
        );
        observe_db(
            "DELETE",
            edge.table(),
            sqlx::query(&sql)
                .bind(post_id)
                .bind(user_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn count_edges(&self, edge: PostEdge, post_id: &str) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE post_id = ?", edge.table());
        let count = observe_db(
            "COUNT",
            edge.table(),
            sqlx::query_scalar::<_, i64>(&sql)
                .bind(post_id)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(count)
    }
}
