//! In-process stores backed by `RwLock<HashMap>`

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    Comment, CommentStore, NewComment, NewPost, NewUser, Post, PostFilter, PostStore, PostUpdate,
    StoreError, StoreResult, User, UserStore,
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(StoreError::Duplicate("username"));
        }
        let stored = User {
            username: user.username,
            name: user.name,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(stored.username.clone(), stored.clone());
        Ok(stored)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(username).cloned())
    }
}

#[derive(Default)]
pub struct MemoryPostStore {
    posts: RwLock<HashMap<Uuid, Post>>,
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn create(&self, post: NewPost) -> StoreResult<Post> {
        let mut posts = self.posts.write().await;
        if posts.values().any(|p| p.title == post.title) {
            return Err(StoreError::Duplicate("post title"));
        }
        let stored = Post {
            id: Uuid::new_v4(),
            title: post.title,
            sub_heading: post.sub_heading,
            description: post.description,
            picture: post.picture,
            username: post.username,
            categories: post.categories,
            created_date: OffsetDateTime::now_utc(),
        };
        posts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, update: PostUpdate) -> StoreResult<Option<Post>> {
        let mut posts = self.posts.write().await;

        if !posts.contains_key(&id) {
            return Ok(None);
        }

        if let Some(title) = &update.title {
            if posts.values().any(|p| p.id != id && &p.title == title) {
                return Err(StoreError::Duplicate("post title"));
            }
        }

        let Some(post) = posts.get_mut(&id) else {
            return Ok(None);
        };
        update.apply(post);
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.posts.write().await.remove(&id).is_some())
    }

    async fn list(&self, filter: PostFilter) -> StoreResult<Vec<Post>> {
        let posts = self.posts.read().await;
        let mut matching: Vec<Post> = posts
            .values()
            .filter(|p| match &filter {
                PostFilter::All => true,
                PostFilter::Username(username) => &p.username == username,
                PostFilter::Category(category) => p.categories.contains(category),
            })
            .cloned()
            .collect();
        matching.sort_by_key(|p| p.created_date);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct MemoryCommentStore {
    // Insertion order doubles as creation order
    comments: RwLock<Vec<Comment>>,
}

#[async_trait]
impl CommentStore for MemoryCommentStore {
    async fn create(&self, comment: NewComment) -> StoreResult<Comment> {
        let stored = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            username: comment.username,
            content: comment.content,
            created_at: OffsetDateTime::now_utc(),
        };
        self.comments.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_post(&self, post_id: Uuid) -> StoreResult<Vec<Comment>> {
        let comments = self.comments.read().await;
        Ok(comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| c.id != id);
        Ok(comments.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_post(title: &str, username: &str, categories: &[&str]) -> NewPost {
        NewPost {
            title: title.into(),
            sub_heading: "sub".into(),
            description: Some("desc".into()),
            picture: None,
            username: username.into(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryUserStore::default();
        let user = NewUser {
            username: "jdoe".into(),
            name: "J Doe".into(),
            password_hash: "hash".into(),
        };

        store.create(user.clone()).await.unwrap();
        let err = store.create(user).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("username")));
    }

    #[tokio::test]
    async fn test_post_filters() {
        let store = MemoryPostStore::default();
        store.create(new_post("a", "alice", &["rust"])).await.unwrap();
        store.create(new_post("b", "bob", &["rust", "web"])).await.unwrap();
        store.create(new_post("c", "alice", &["web"])).await.unwrap();

        assert_eq!(store.list(PostFilter::All).await.unwrap().len(), 3);
        assert_eq!(
            store
                .list(PostFilter::Username("alice".into()))
                .await
                .unwrap()
                .len(),
            2
        );
        let web = store.list(PostFilter::Category("web".into())).await.unwrap();
        assert_eq!(web.len(), 2);
        assert!(web.iter().all(|p| p.categories.contains(&"web".to_string())));
    }

    #[tokio::test]
    async fn test_duplicate_title_rejected_on_create_and_update() {
        let store = MemoryPostStore::default();
        store.create(new_post("taken", "alice", &[])).await.unwrap();
        let other = store.create(new_post("free", "alice", &[])).await.unwrap();

        assert!(matches!(
            store.create(new_post("taken", "bob", &[])).await,
            Err(StoreError::Duplicate(_))
        ));

        let update = PostUpdate {
            title: Some("taken".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update(other.id, update).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_post() {
        let store = MemoryPostStore::default();
        let id = Uuid::new_v4();
        assert!(store.update(id, PostUpdate::default()).await.unwrap().is_none());
        assert!(!store.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_post_with_taken_title_is_none() {
        let store = MemoryPostStore::default();
        store.create(new_post("Taken", "jdoe", &[])).await.unwrap();

        let result = store
            .update(
                Uuid::new_v4(),
                PostUpdate {
                    title: Some("Taken".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_comments_scoped_to_post() {
        let store = MemoryCommentStore::default();
        let post_a = Uuid::new_v4();
        let post_b = Uuid::new_v4();

        let first = store
            .create(NewComment {
                post_id: post_a,
                username: "alice".into(),
                content: "first".into(),
            })
            .await
            .unwrap();
        store
            .create(NewComment {
                post_id: post_b,
                username: "bob".into(),
                content: "elsewhere".into(),
            })
            .await
            .unwrap();

        let comments = store.list_for_post(post_a).await.unwrap();
        assert_eq!(comments, vec![first.clone()]);

        assert!(store.delete(first.id).await.unwrap());
        assert!(!store.delete(first.id).await.unwrap());
        assert!(store.list_for_post(post_a).await.unwrap().is_empty());
    }
}
