//! Behavioural tests shared by every TranscriptStore implementation.

use colloquy_core::{ColloquyResult, ConversationId, Role};
use colloquy_storage::{InMemoryTranscriptStore, LmdbTranscriptStore, TranscriptStore};
use proptest::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn conv(id: &str) -> ConversationId {
    ConversationId::new(id).expect("id should be valid")
}

async fn idempotent_creation(store: &dyn TranscriptStore) -> ColloquyResult<()> {
    let id = conv("idempotent");
    let first = store.create_conversation_if_absent(&id).await?;
    let again = store.create_conversation_if_absent(&id).await?;
    assert_eq!(first.created_at, again.created_at);
    store.append_message(&id, Role::User, "hello").await?;
    let third = store.create_conversation_if_absent(&id).await?;
    assert_eq!(first.created_at, third.created_at);
    Ok(())
}

async fn ordering_within_conversation(store: &dyn TranscriptStore) -> ColloquyResult<()> {
    let a = conv("order-a");
    let b = conv("order-b");
    store.append_message(&a, Role::User, "a1").await?;
    store.append_message(&b, Role::User, "b1").await?;
    store.append_message(&a, Role::Assistant, "a2").await?;
    store.append_message(&b, Role::Assistant, "b2").await?;
    store.append_message(&a, Role::User, "a3").await?;

    let listed = store.list_messages(&a).await?;
    let contents: Vec<_> = listed.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["a1", "a2", "a3"]);
    assert!(listed.windows(2).all(|w| w[0].id < w[1].id));
    Ok(())
}

async fn tool_call_roundtrip(store: &dyn TranscriptStore) -> ColloquyResult<()> {
    let id = conv("tools");
    let message_id = store.append_message(&id, Role::User, "sell 3 mugs").await?;
    let input = json!({"item_name": "Mug", "transaction_type": "sale", "quantity": 3});
    let result = json!({"success": false, "error": "Insufficient stock: 1 available, 3 requested"});

    store
        .append_tool_call(
            &id,
            message_id,
            "record_transaction",
            &input.to_string(),
            &result.to_string(),
        )
        .await?;

    let calls = store.list_tool_calls(&id).await?;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].message_id, message_id);
    assert_eq!(calls[0].input()?, input);
    assert_eq!(calls[0].result()?, result);
    assert!(!calls[0].succeeded());
    Ok(())
}

async fn unknown_conversation_is_empty(store: &dyn TranscriptStore) -> ColloquyResult<()> {
    let id = conv("never-written");
    assert!(store.get_conversation(&id).await?.is_none());
    assert!(store.list_messages(&id).await?.is_empty());
    assert!(store.list_tool_calls(&id).await?.is_empty());
    Ok(())
}

async fn run_contract(store: &dyn TranscriptStore) -> ColloquyResult<()> {
    store.initialize().await?;
    idempotent_creation(store).await?;
    ordering_within_conversation(store).await?;
    tool_call_roundtrip(store).await?;
    unknown_conversation_is_empty(store).await?;
    Ok(())
}

#[tokio::test]
async fn in_memory_store_honours_contract() -> ColloquyResult<()> {
    let store = InMemoryTranscriptStore::new();
    run_contract(&store).await
}

#[tokio::test]
async fn lmdb_store_honours_contract() -> ColloquyResult<()> {
    let dir = TempDir::new().expect("temp dir should be created");
    let store = LmdbTranscriptStore::open_at(dir.path(), 10)?;
    run_contract(&store).await
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_lmdb_preserves_message_content(contents in prop::collection::vec(".{0,64}", 1..12)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build");
        let dir = TempDir::new().expect("temp dir should be created");
        let store = LmdbTranscriptStore::open_at(dir.path(), 10).expect("store should open");
        let id = conv("prop");

        let listed = runtime.block_on(async {
            for content in &contents {
                store.append_message(&id, Role::User, content).await?;
            }
            store.list_messages(&id).await
        }).expect("store operations should succeed");

        let stored: Vec<_> = listed.into_iter().map(|m| m.content).collect();
        prop_assert_eq!(stored, contents);
    }
}
