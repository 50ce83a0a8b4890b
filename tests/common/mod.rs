#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};

use safeping_server::api::middleware::AuthKeys;
use safeping_server::app::{router, AppContext};
use safeping_server::geocode::Geocoder;
use safeping_server::identity::{IdentityError, IdentityProvider, VerifiedUser};
use safeping_server::notifications::SmsGateway;
use safeping_server::records;
use safeping_server::store::{DocumentStore, StoreError};

/// In-memory stand-in for the hosted document store: one JSON tree addressed
/// by slash-separated paths, with push keys that sort chronologically.
pub struct MemoryStore {
    root: Mutex<Value>,
    next_key: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: Mutex::new(json!({})),
            next_key: AtomicU64::new(1),
        }
    }

    fn segments(path: &str) -> Vec<String> {
        path.trim_matches('/')
            .split('/')
            .map(str::to_string)
            .collect()
    }

    fn node<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
        let mut node = root;
        for segment in segments {
            node = node.get(segment)?;
        }
        Some(node)
    }

    fn set(root: &mut Value, segments: &[String], value: Value) {
        let (last, parents) = segments.split_last().expect("empty path");
        let mut node = root;
        for segment in parents {
            if !node.is_object() {
                *node = json!({});
            }
            node = node
                .as_object_mut()
                .expect("object")
                .entry(segment.clone())
                .or_insert(json!({}));
        }
        if !node.is_object() {
            *node = json!({});
        }
        let map = node.as_object_mut().expect("object");
        if value.is_null() {
            map.remove(last);
        } else {
            map.insert(last.clone(), value);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let root = self.root.lock().unwrap();
        Ok(Self::node(&root, &Self::segments(path)).cloned())
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let mut root = self.root.lock().unwrap();
        Self::set(&mut root, &Self::segments(path), value);
        Ok(())
    }

    async fn update(&self, path: &str, fields: Value) -> Result<(), StoreError> {
        let fields = match fields {
            Value::Object(fields) => fields,
            other => {
                return Err(StoreError::Malformed {
                    path: path.to_string(),
                    reason: format!("update expects an object, got {}", other),
                })
            }
        };

        let mut root = self.root.lock().unwrap();
        let segments = Self::segments(path);
        let mut merged = Self::node(&root, &segments)
            .cloned()
            .unwrap_or_else(|| json!({}));
        if !merged.is_object() {
            merged = json!({});
        }
        let map = merged.as_object_mut().unwrap();
        for (key, value) in fields {
            if value.is_null() {
                map.remove(&key);
            } else {
                map.insert(key, value);
            }
        }
        Self::set(&mut root, &segments, merged);
        Ok(())
    }

    async fn push(&self, parent_path: &str, value: Value) -> Result<String, StoreError> {
        let id = format!("-K{:012}", self.next_key.fetch_add(1, Ordering::SeqCst));
        let mut root = self.root.lock().unwrap();
        let mut segments = Self::segments(parent_path);
        segments.push(id.clone());
        Self::set(&mut root, &segments, value);
        Ok(id)
    }

    async fn query_children_equal(
        &self,
        path: &str,
        field: &str,
        value: Value,
        limit: Option<usize>,
    ) -> Result<BTreeMap<String, Value>, StoreError> {
        let root = self.root.lock().unwrap();
        let mut matches: BTreeMap<String, Value> = BTreeMap::new();
        if let Some(Value::Object(children)) = Self::node(&root, &Self::segments(path)) {
            for (id, child) in children {
                if child.get(field) == Some(&value) {
                    matches.insert(id.clone(), child.clone());
                }
            }
        }

        // limitToLast semantics: keep the newest N by key order.
        if let Some(limit) = limit {
            while matches.len() > limit {
                let oldest = matches.keys().next().unwrap().clone();
                matches.remove(&oldest);
            }
        }
        Ok(matches)
    }
}

/// Wraps a [`MemoryStore`] and fails every operation whose path contains the
/// given fragment, standing in for a store that becomes unreachable midway
/// through a multi-path write sequence.
pub struct FailingPathStore {
    inner: Arc<MemoryStore>,
    fail_fragment: String,
}

impl FailingPathStore {
    pub fn new(inner: Arc<MemoryStore>, fail_fragment: &str) -> Self {
        Self {
            inner,
            fail_fragment: fail_fragment.to_string(),
        }
    }

    fn check(&self, path: &str) -> Result<(), StoreError> {
        if path.contains(&self.fail_fragment) {
            Err(StoreError::Backend {
                status: 503,
                body: "service unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for FailingPathStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.check(path)?;
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError> {
        self.check(path)?;
        self.inner.write(path, value).await
    }

    async fn update(&self, path: &str, fields: Value) -> Result<(), StoreError> {
        self.check(path)?;
        self.inner.update(path, fields).await
    }

    async fn push(&self, parent_path: &str, value: Value) -> Result<String, StoreError> {
        self.check(parent_path)?;
        self.inner.push(parent_path, value).await
    }

    async fn query_children_equal(
        &self,
        path: &str,
        field: &str,
        value: Value,
        limit: Option<usize>,
    ) -> Result<BTreeMap<String, Value>, StoreError> {
        self.check(path)?;
        self.inner.query_children_equal(path, field, value, limit).await
    }
}

/// Scriptable SMS gateway: records every attempt and fails the numbers it
/// was told to fail.
pub struct MockSms {
    configured: bool,
    fail_numbers: HashSet<String>,
    sent: Mutex<Vec<(String, String)>>,
    counter: AtomicU64,
}

impl MockSms {
    pub fn configured() -> Self {
        Self {
            configured: true,
            fail_numbers: HashSet::new(),
            sent: Mutex::new(Vec::new()),
            counter: AtomicU64::new(1),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::configured()
        }
    }

    pub fn failing_for(numbers: &[&str]) -> Self {
        Self {
            fail_numbers: numbers.iter().map(|n| n.to_string()).collect(),
            ..Self::configured()
        }
    }

    /// Every (number, body) pair handed to the gateway, in attempt order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsGateway for MockSms {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send_sms(&self, to_number: &str, body: &str) -> Result<String, String> {
        self.sent
            .lock()
            .unwrap()
            .push((to_number.to_string(), body.to_string()));
        if self.fail_numbers.contains(to_number) {
            Err(format!("gateway rejected {}", to_number))
        } else {
            Ok(format!("SM{:08}", self.counter.fetch_add(1, Ordering::SeqCst)))
        }
    }
}

/// In-memory identity provider keyed by email.
pub struct MockIdentity {
    users: Mutex<HashMap<String, (String, String)>>,
    counter: AtomicU64,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn create_user(
        &self,
        email: &str,
        password: &str,
        _display_name: &str,
    ) -> Result<String, IdentityError> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(IdentityError::EmailTaken);
        }
        let uid = format!("uid-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        users.insert(email.to_string(), (uid.clone(), password.to_string()));
        Ok(uid)
    }

    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<VerifiedUser, IdentityError> {
        let users = self.users.lock().unwrap();
        match users.get(email) {
            Some((uid, stored)) if stored == password => Ok(VerifiedUser {
                uid: uid.clone(),
                email: email.to_string(),
            }),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }
}

pub async fn seed_user(store: &MemoryStore, uid: &str, name: &str, email: &str) {
    store
        .write(
            &format!("users/{}", uid),
            json!({
                "name": name,
                "email": email,
                "phone": "+1000000000",
                "createdAt": records::now_millis(),
                "role": "user",
            }),
        )
        .await
        .unwrap();
}

pub async fn seed_contact(store: &MemoryStore, uid: &str, name: &str, phone: &str) -> String {
    store
        .push(
            &format!("users/{}/emergencyContacts", uid),
            json!({
                "name": name,
                "phone": phone,
                "relation": "friend",
                "addedAt": records::now_millis(),
            }),
        )
        .await
        .unwrap()
}

pub fn test_router(store: Arc<MemoryStore>, sms: Arc<MockSms>) -> Router {
    test_router_with_store(store as Arc<dyn DocumentStore>, sms)
}

pub fn test_router_with_store(store: Arc<dyn DocumentStore>, sms: Arc<MockSms>) -> Router {
    router(AppContext {
        store,
        identity: Arc::new(MockIdentity::new()),
        geocoder: Arc::new(Geocoder::new(None)),
        sms: sms as Arc<dyn SmsGateway>,
        auth_keys: AuthKeys::new("test-secret"),
    })
}
