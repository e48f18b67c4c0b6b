//! Temp-SQLite fixture shared by service tests

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use super::visibility::Viewer;
use crate::data::{Account, Credential, Database, NewPost, Post, SocialStore};

pub(crate) struct TestStore {
    pub db: Arc<Database>,
    _dir: TempDir,
}

impl TestStore {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::connect(&dir.path().join("test.db"), 4)
            .await
            .unwrap();
        Self {
            db: Arc::new(db),
            _dir: dir,
        }
    }

    pub fn store(&self) -> Arc<dyn SocialStore> {
        self.db.clone()
    }

    /// Insert an account with the given nickname and return it as a viewer
    pub async fn account(&self, nickname: &str) -> Viewer {
        let mut account = Account::new_default();
        account.nickname = nickname.to_string();
        let credential = Credential {
            account_id: account.id.clone(),
            email: format!("{}@example.com", account.id.to_lowercase()),
            password_hash: "unused".to_string(),
            created_at: Utc::now(),
        };
        self.db
            .insert_account_with_credential(&account, &credential)
            .await
            .unwrap();
        Viewer::new(account.id)
    }

    pub async fn post(&self, author: &Viewer, comment: &str, is_private: bool) -> Post {
        self.db
            .insert_post(&NewPost {
                author_id: author.id.clone(),
                comment: Some(comment.to_string()),
                is_private,
                reference: None,
            })
            .await
            .unwrap()
    }

    pub async fn follow(&self, follower: &Viewer, following: &Viewer) {
        self.db
            .insert_follow(&follower.id, &following.id)
            .await
            .unwrap();
    }
}
