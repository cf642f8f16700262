use reef_chat::{ChatClient, ChatError, Message, ReceiptStatus, Session};
use reef_store::MemoryGateway;
use std::sync::Arc;
use std::time::Duration;

fn client(gateway: &Arc<MemoryGateway>, user: &str) -> ChatClient<MemoryGateway, MemoryGateway> {
    ChatClient::new(Arc::clone(gateway), Arc::clone(gateway), Session::new(user))
}

async fn seed_messages(
    sender: &ChatClient<MemoryGateway, MemoryGateway>,
    conversation: &reef_chat::Conversation,
    n: usize,
) -> Vec<Message> {
    let mut messages = Vec::new();
    for i in 0..n {
        messages.push(
            sender
                .create_message(conversation, Some(&format!("msg {i}")), None)
                .await
                .unwrap(),
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    messages
}

#[tokio::test]
async fn test_read_is_not_regressed_by_delivered() {
    let gateway = Arc::new(MemoryGateway::new());
    let alice = client(&gateway, "alice");
    let bob = client(&gateway, "bob");

    let conversation = alice
        .create_direct_conversation("bob", None, None)
        .await
        .unwrap();
    let messages = seed_messages(&alice, &conversation, 1).await;

    bob.mark_read(&messages).await.unwrap();
    let receipts = bob.fetch_receipts(&messages[0]).await.unwrap();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].status(), ReceiptStatus::Read);

    // Delivered after read is a silent no-op.
    bob.mark_delivered(&messages).await.unwrap();
    let receipts = bob.fetch_receipts(&messages[0]).await.unwrap();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].status(), ReceiptStatus::Read);
}

#[tokio::test]
async fn test_delivered_then_read_keeps_both_timestamps() {
    let gateway = Arc::new(MemoryGateway::new());
    let alice = client(&gateway, "alice");
    let bob = client(&gateway, "bob");

    let conversation = alice
        .create_direct_conversation("bob", None, None)
        .await
        .unwrap();
    let messages = seed_messages(&alice, &conversation, 1).await;

    bob.mark_delivered(&messages).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    bob.mark_read(&messages).await.unwrap();

    let receipts = bob.fetch_receipts(&messages[0]).await.unwrap();
    let receipt = &receipts[0];
    assert_eq!(receipt.status(), ReceiptStatus::Read);
    assert!(receipt.delivered_at.unwrap() < receipt.read_at.unwrap());
}

#[tokio::test]
async fn test_one_receipt_per_recipient() {
    let gateway = Arc::new(MemoryGateway::new());
    let alice = client(&gateway, "alice");
    let bob = client(&gateway, "bob");
    let carol = client(&gateway, "carol");

    let conversation = alice
        .create_conversation(&["bob".to_string(), "carol".to_string()], None, None)
        .await
        .unwrap();
    let messages = seed_messages(&alice, &conversation, 1).await;

    bob.mark_delivered(&messages).await.unwrap();
    carol.mark_read(&messages).await.unwrap();
    // Marking twice adds nothing.
    bob.mark_delivered(&messages).await.unwrap();

    let receipts = alice.fetch_receipts(&messages[0]).await.unwrap();
    assert_eq!(receipts.len(), 2);
    let bob_receipt = receipts.iter().find(|r| r.user_id == "bob").unwrap();
    let carol_receipt = receipts.iter().find(|r| r.user_id == "carol").unwrap();
    assert_eq!(bob_receipt.status(), ReceiptStatus::Delivered);
    assert_eq!(carol_receipt.status(), ReceiptStatus::Read);
}

#[tokio::test]
async fn test_mark_last_read_moves_pointer() {
    let gateway = Arc::new(MemoryGateway::new());
    let alice = client(&gateway, "alice");
    let bob = client(&gateway, "bob");

    let conversation = alice
        .create_direct_conversation("bob", None, None)
        .await
        .unwrap();
    let messages = seed_messages(&alice, &conversation, 3).await;

    let view = bob.fetch_user_conversation(&conversation.id).await.unwrap();
    assert_eq!(bob.fetch_unread_count(&view).await.unwrap(), 3);

    // Pointer on the middle message: only the newest stays unread.
    let view = bob.mark_last_read(&messages[1], &view).await.unwrap();
    assert_eq!(view.last_read_message_id.as_deref(), Some(messages[1].id.as_str()));
    assert_eq!(view.unread_count, 1);
    assert_eq!(bob.fetch_unread_count(&view).await.unwrap(), 1);
}

#[tokio::test]
async fn test_mark_last_read_writes_no_receipts() {
    let gateway = Arc::new(MemoryGateway::new());
    let alice = client(&gateway, "alice");
    let bob = client(&gateway, "bob");

    let conversation = alice
        .create_direct_conversation("bob", None, None)
        .await
        .unwrap();
    let messages = seed_messages(&alice, &conversation, 2).await;

    let view = bob.fetch_user_conversation(&conversation.id).await.unwrap();
    bob.mark_last_read(&messages[1], &view).await.unwrap();

    for message in &messages {
        assert!(bob.fetch_receipts(message).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_mark_last_read_rejects_foreign_view() {
    let gateway = Arc::new(MemoryGateway::new());
    let alice = client(&gateway, "alice");
    let bob = client(&gateway, "bob");

    let conversation = alice
        .create_direct_conversation("bob", None, None)
        .await
        .unwrap();
    let messages = seed_messages(&alice, &conversation, 1).await;

    let bobs_view = bob.fetch_user_conversation(&conversation.id).await.unwrap();
    let err = alice
        .mark_last_read(&messages[0], &bobs_view)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Validation(_)));
}

#[tokio::test]
async fn test_deleted_messages_not_counted_unread() {
    let gateway = Arc::new(MemoryGateway::new());
    let alice = client(&gateway, "alice");
    let bob = client(&gateway, "bob");

    let conversation = alice
        .create_direct_conversation("bob", None, None)
        .await
        .unwrap();
    let messages = seed_messages(&alice, &conversation, 2).await;
    alice.delete_message(&messages[0]).await.unwrap();

    let view = bob.fetch_user_conversation(&conversation.id).await.unwrap();
    assert_eq!(bob.fetch_unread_count(&view).await.unwrap(), 1);
}

#[tokio::test]
async fn test_total_unread_aggregation() {
    let gateway = Arc::new(MemoryGateway::new());
    let alice = client(&gateway, "alice");
    let bob = client(&gateway, "bob");

    // conv1: 2 unread, conv2: 0 unread, conv3: 5 unread for bob.
    let conv1 = alice
        .create_conversation(&["bob".to_string()], Some("one"), None)
        .await
        .unwrap();
    let conv2 = alice
        .create_conversation(&["bob".to_string()], Some("two"), None)
        .await
        .unwrap();
    let conv3 = alice
        .create_conversation(&["bob".to_string()], Some("three"), None)
        .await
        .unwrap();

    seed_messages(&alice, &conv1, 2).await;
    let read_in_conv2 = seed_messages(&alice, &conv2, 1).await;
    seed_messages(&alice, &conv3, 5).await;
    bob.mark_read(&read_in_conv2).await.unwrap();

    let totals = bob.fetch_total_unread_count().await.unwrap();
    assert_eq!(totals.conversations, 2);
    assert_eq!(totals.messages, 7);

    // The projection agrees after the recompute.
    assert_eq!(bob.local_unread_count(&conv1.id).await, 2);
    assert_eq!(bob.local_unread_count(&conv2.id).await, 0);
    assert_eq!(bob.local_unread_count(&conv3.id).await, 5);
}
