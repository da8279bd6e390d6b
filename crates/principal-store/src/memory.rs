//! In-memory principal store
//!
//! A `tokio::sync::Mutex` over the record map serializes every mutation,
//! so the fingerprint compare-and-set is atomic: the compare and the write
//! happen under one lock acquisition with no await point in between.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::{Principal, PrincipalStore};

/// In-memory storage backend. Records do not survive process restart.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<HashMap<String, Principal>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrincipalStore for MemoryStore {
    fn load_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Principal>> + Send + 'a>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            state
                .get(id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("principal {id}")))
        })
    }

    fn load_by_email<'a>(
        &'a self,
        email: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Principal>> + Send + 'a>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            state
                .values()
                .find(|p| p.email == email)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("principal with email {email}")))
        })
    }

    fn create<'a>(
        &'a self,
        email: &'a str,
        password_hash: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Principal>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.values().any(|p| p.email == email) {
                return Err(Error::Conflict(format!("email {email} already registered")));
            }
            let principal = Principal {
                id: Uuid::new_v4().to_string(),
                email: email.to_owned(),
                password_hash: password_hash.to_owned(),
                renewal_fingerprint: None,
            };
            state.insert(principal.id.clone(), principal.clone());
            debug!(principal_id = %principal.id, "principal created");
            Ok(principal)
        })
    }

    fn set_renewal_fingerprint<'a>(
        &'a self,
        id: &'a str,
        fingerprint: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let principal = state
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(format!("principal {id}")))?;
            principal.renewal_fingerprint = fingerprint;
            Ok(())
        })
    }

    fn swap_renewal_fingerprint<'a>(
        &'a self,
        id: &'a str,
        expected: &'a str,
        new: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let principal = state
                .get_mut(id)
                .ok_or_else(|| Error::NotFound(format!("principal {id}")))?;
            match principal.renewal_fingerprint.as_deref() {
                Some(current) if current == expected => {
                    principal.renewal_fingerprint = Some(new.to_owned());
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn create_then_load_by_id_and_email() {
        let store = MemoryStore::new();
        let created = store.create("a@x.com", "hash").await.unwrap();

        let by_id = store.load_by_id(&created.id).await.unwrap();
        assert_eq!(by_id.email, "a@x.com");
        assert!(by_id.renewal_fingerprint.is_none());

        let by_email = store.load_by_email("a@x.com").await.unwrap();
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = MemoryStore::new();
        store.create("a@x.com", "hash").await.unwrap();
        let result = store.create("a@x.com", "other-hash").await;
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[tokio::test]
    async fn missing_principal_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load_by_id("nope").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.load_by_email("nope@x.com").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.set_renewal_fingerprint("nope", None).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn set_fingerprint_overwrites_and_clears() {
        let store = MemoryStore::new();
        let p = store.create("a@x.com", "hash").await.unwrap();

        store
            .set_renewal_fingerprint(&p.id, Some("fp1".into()))
            .await
            .unwrap();
        assert_eq!(
            store.load_by_id(&p.id).await.unwrap().renewal_fingerprint,
            Some("fp1".into())
        );

        store
            .set_renewal_fingerprint(&p.id, Some("fp2".into()))
            .await
            .unwrap();
        assert_eq!(
            store.load_by_id(&p.id).await.unwrap().renewal_fingerprint,
            Some("fp2".into())
        );

        store.set_renewal_fingerprint(&p.id, None).await.unwrap();
        assert!(
            store
                .load_by_id(&p.id)
                .await
                .unwrap()
                .renewal_fingerprint
                .is_none()
        );
    }

    #[tokio::test]
    async fn swap_requires_expected_value() {
        let store = MemoryStore::new();
        let p = store.create("a@x.com", "hash").await.unwrap();
        store
            .set_renewal_fingerprint(&p.id, Some("fp1".into()))
            .await
            .unwrap();

        assert!(!store.swap_renewal_fingerprint(&p.id, "stale", "fp2").await.unwrap());
        assert!(store.swap_renewal_fingerprint(&p.id, "fp1", "fp2").await.unwrap());
        // The consumed value no longer matches
        assert!(!store.swap_renewal_fingerprint(&p.id, "fp1", "fp3").await.unwrap());
    }

    #[tokio::test]
    async fn swap_fails_when_fingerprint_cleared() {
        let store = MemoryStore::new();
        let p = store.create("a@x.com", "hash").await.unwrap();
        assert!(!store.swap_renewal_fingerprint(&p.id, "fp1", "fp2").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_swaps_produce_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let p = store.create("a@x.com", "hash").await.unwrap();
        store
            .set_renewal_fingerprint(&p.id, Some("stale".into()))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            let id = p.id.clone();
            handles.push(tokio::spawn(async move {
                let new = format!("fp{i}");
                store.swap_renewal_fingerprint(&id, "stale", &new).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "exactly one concurrent swap may win");
    }
}
