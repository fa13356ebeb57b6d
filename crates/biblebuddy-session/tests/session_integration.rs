#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use biblebuddy_core::{
    AssistantService, AssistantSpec, BuddyError, BuddyResult, Message, MessageOrder, Role, Run,
    ThreadMessage, ToolSpec,
};
use biblebuddy_session::{InMemorySessionStore, Session, SessionStore};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts creation calls; everything else is unused here.
#[derive(Default)]
struct CountingService {
    assistants: AtomicUsize,
    threads: AtomicUsize,
}

#[async_trait]
impl AssistantService for CountingService {
    async fn create_assistant(&self, _spec: &AssistantSpec) -> BuddyResult<String> {
        let n = self.assistants.fetch_add(1, Ordering::SeqCst);
        Ok(format!("asst_{n}"))
    }

    async fn create_thread(&self) -> BuddyResult<String> {
        let n = self.threads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("thread_{n}"))
    }

    async fn create_message(&self, _: &str, _: Role, _: &str) -> BuddyResult<String> {
        unimplemented!()
    }

    async fn create_run(&self, _: &str, _: &str) -> BuddyResult<Run> {
        unimplemented!()
    }

    async fn retrieve_run(&self, _: &str, _: &str) -> BuddyResult<Run> {
        unimplemented!()
    }

    async fn cancel_run(&self, _: &str, _: &str) -> BuddyResult<Run> {
        unimplemented!()
    }

    async fn list_messages(&self, _: &str, _: MessageOrder) -> BuddyResult<Vec<ThreadMessage>> {
        unimplemented!()
    }
}

/// Fails every creation call.
struct DownService;

#[async_trait]
impl AssistantService for DownService {
    async fn create_assistant(&self, _spec: &AssistantSpec) -> BuddyResult<String> {
        Err(BuddyError::Http("503 Service Unavailable".into()))
    }

    async fn create_thread(&self) -> BuddyResult<String> {
        Err(BuddyError::Http("503 Service Unavailable".into()))
    }

    async fn create_message(&self, _: &str, _: Role, _: &str) -> BuddyResult<String> {
        unimplemented!()
    }

    async fn create_run(&self, _: &str, _: &str) -> BuddyResult<Run> {
        unimplemented!()
    }

    async fn retrieve_run(&self, _: &str, _: &str) -> BuddyResult<Run> {
        unimplemented!()
    }

    async fn cancel_run(&self, _: &str, _: &str) -> BuddyResult<Run> {
        unimplemented!()
    }

    async fn list_messages(&self, _: &str, _: MessageOrder) -> BuddyResult<Vec<ThreadMessage>> {
        unimplemented!()
    }
}

fn spec() -> AssistantSpec {
    AssistantSpec {
        name: "BibleBuddy".into(),
        instructions: "Always cite verses.".into(),
        model: "gpt-4o".into(),
        tools: vec![ToolSpec::FileSearch],
    }
}

#[tokio::test]
async fn test_get_or_create_assistant_is_idempotent() {
    let service = CountingService::default();
    let mut session = Session::new();

    let first = session
        .get_or_create_assistant(&service, &spec())
        .await
        .unwrap();
    let second = session
        .get_or_create_assistant(&service, &spec())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(service.assistants.load(Ordering::SeqCst), 1);
    assert_eq!(session.assistant_id(), Some(first.as_str()));
}

#[tokio::test]
async fn test_get_or_create_thread_is_idempotent() {
    let service = CountingService::default();
    let mut session = Session::new();

    let first = session.get_or_create_thread(&service).await.unwrap();
    let second = session.get_or_create_thread(&service).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(service.threads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sessions_get_independent_remote_ids() {
    let service = CountingService::default();
    let mut a = Session::new();
    let mut b = Session::new();

    let ta = a.get_or_create_thread(&service).await.unwrap();
    let tb = b.get_or_create_thread(&service).await.unwrap();

    assert_ne!(ta, tb);
    assert_eq!(service.threads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_creation_is_not_cached() {
    let mut session = Session::new();

    let err = session.get_or_create_thread(&DownService).await.unwrap_err();
    assert!(matches!(err, BuddyError::Http(_)));
    assert!(session.thread_id().is_none());

    let service = CountingService::default();
    let id = session.get_or_create_thread(&service).await.unwrap();
    assert_eq!(id, "thread_0");
}

#[tokio::test]
async fn test_store_create_get_list_end() {
    let store = InMemorySessionStore::new();
    let s1 = store.create().await.unwrap();
    let s2 = store.create().await.unwrap();

    let ids = store.list().await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&s1.id()));
    assert!(ids.contains(&s2.id()));

    assert!(store.end(s1.id()).await.unwrap());
    assert!(store.get(s1.id()).await.unwrap().is_none());
    assert!(store.get(s2.id()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_handles_share_state() {
    let store = InMemorySessionStore::new();
    let handle = store.create().await.unwrap();

    handle
        .lock()
        .await
        .append(Message::user("What does John 3:16 say?"))
        .unwrap();

    let again = store.get(handle.id()).await.unwrap().unwrap();
    let history = again.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, "What does John 3:16 say?");
}
