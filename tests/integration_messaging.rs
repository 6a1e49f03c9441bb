//! End-to-end messaging tests. These need a Postgres instance reachable via
//! DATABASE_URL.

mod common;

use common::TestApp;
use uuid::Uuid;

#[tokio::test]
async fn append_then_list_round_trips_content() {
    let app = TestApp::spawn().await;
    let owner = app.seed_user(&format!("owner_{}", Uuid::new_v4())).await;
    let customer = app.seed_user(&format!("customer_{}", Uuid::new_v4())).await;
    let store = app.seed_store(owner, "Corner Bakery").await;
    let order = app.seed_order(store, customer).await;

    let resp = app.send_message(&app.token_for(customer), "order", order, "Is my cake ready?").await;
    assert_eq!(resp.status(), 201);
    let created: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(created["content"], "Is my cake ready?");
    assert_eq!(created["sender_role"], "customer");

    let resp = app.list_messages(&app.token_for(owner), "order", order).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "Is my cake ready?");
    assert_eq!(messages[0]["sender_role"], "customer");
    assert_eq!(messages[0]["created_at"], created["created_at"]);
}

#[tokio::test]
async fn messages_are_listed_oldest_first() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user(&format!("alice_{}", Uuid::new_v4())).await;
    let bob = app.seed_user(&format!("bob_{}", Uuid::new_v4())).await;

    for i in 0..5 {
        let resp = app.send_message(&app.token_for(alice), "direct", bob, &format!("msg {i}")).await;
        assert_eq!(resp.status(), 201);
    }

    let body: serde_json::Value =
        app.list_messages(&app.token_for(bob), "direct", alice).await.json().await.unwrap();
    let contents: Vec<&str> =
        body["messages"].as_array().unwrap().iter().map(|m| m["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
}

#[tokio::test]
async fn unread_counts_follow_sends_and_reads() {
    let app = TestApp::spawn().await;
    let owner = app.seed_user(&format!("owner_{}", Uuid::new_v4())).await;
    let customer = app.seed_user(&format!("customer_{}", Uuid::new_v4())).await;
    let store = app.seed_store(owner, "Corner Bakery").await;
    let order = app.seed_order(store, customer).await;

    // Customer sends three messages; the owner has sent nothing.
    for i in 0..3 {
        app.send_message(&app.token_for(customer), "order", order, &format!("ping {i}")).await;
    }

    let owner_feed = app.get_feed(&app.token_for(owner)).await;
    let entry = TestApp::feed_entry(&owner_feed, order).expect("order conversation missing from feed");
    assert_eq!(entry["unread_count"], 3);
    assert_eq!(owner_feed["total_unread"], 3);

    // The sender's own side has nothing unread.
    let customer_feed = app.get_feed(&app.token_for(customer)).await;
    let entry = TestApp::feed_entry(&customer_feed, order).unwrap();
    assert_eq!(entry["unread_count"], 0);

    // Owner reads the thread.
    let resp = app.mark_read(&app.token_for(owner), "order", order).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["updated"], 3);
    assert_eq!(body["unread"], 0);

    let owner_feed = app.get_feed(&app.token_for(owner)).await;
    let entry = TestApp::feed_entry(&owner_feed, order).unwrap();
    assert_eq!(entry["unread_count"], 0);
}

#[tokio::test]
async fn mark_read_is_idempotent() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user(&format!("alice_{}", Uuid::new_v4())).await;
    let bob = app.seed_user(&format!("bob_{}", Uuid::new_v4())).await;

    app.send_message(&app.token_for(alice), "direct", bob, "hi").await;

    let first: serde_json::Value =
        app.mark_read(&app.token_for(bob), "direct", alice).await.json().await.unwrap();
    assert_eq!(first["updated"], 1);
    assert_eq!(first["unread"], 0);

    let second: serde_json::Value =
        app.mark_read(&app.token_for(bob), "direct", alice).await.json().await.unwrap();
    assert_eq!(second["updated"], 0);
    assert_eq!(second["unread"], 0);
}

#[tokio::test]
async fn listing_a_thread_does_not_mark_it_read() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user(&format!("alice_{}", Uuid::new_v4())).await;
    let bob = app.seed_user(&format!("bob_{}", Uuid::new_v4())).await;

    app.send_message(&app.token_for(alice), "direct", bob, "hi").await;
    app.list_messages(&app.token_for(bob), "direct", alice).await;

    let feed = app.get_feed(&app.token_for(bob)).await;
    let entry = TestApp::feed_entry(&feed, alice).unwrap();
    assert_eq!(entry["unread_count"], 1);
}

#[tokio::test]
async fn summary_counter_matches_live_message_count() {
    use vitrinex_conversations::domain::conversation::{ConversationRef, Side};
    use vitrinex_conversations::storage::conversation_repo::ConversationRepository;

    let app = TestApp::spawn().await;
    let owner = app.seed_user(&format!("owner_{}", Uuid::new_v4())).await;
    let customer = app.seed_user(&format!("customer_{}", Uuid::new_v4())).await;
    let store = app.seed_store(owner, "Corner Bakery").await;
    let booking = app.seed_booking(store, customer).await;

    for _ in 0..4 {
        app.send_message(&app.token_for(customer), "booking", booking, "here yet?").await;
    }
    app.send_message(&app.token_for(owner), "booking", booking, "almost").await;

    let repo = ConversationRepository::new();
    let mut conn = app.pool.acquire().await.unwrap();
    let summary =
        repo.find(&mut conn, &ConversationRef::Booking(booking)).await.unwrap().unwrap();

    // The cached counters must equal the live counts from the message log.
    let live_a = repo.live_unread(&mut conn, summary.id, Side::A).await.unwrap();
    let live_b = repo.live_unread(&mut conn, summary.id, Side::B).await.unwrap();
    assert_eq!(summary.unread_a, live_a);
    assert_eq!(summary.unread_b, live_b);
    assert_eq!(summary.unread_a, 4);
    assert_eq!(summary.unread_b, 1);
}

#[tokio::test]
async fn concurrent_appends_lose_no_unread_increments() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user(&format!("alice_{}", Uuid::new_v4())).await;
    let bob = app.seed_user(&format!("bob_{}", Uuid::new_v4())).await;

    let sends = 20;
    let mut tasks = Vec::new();
    for i in 0..sends {
        let client = app.client.clone();
        let url = format!("{}/v1/conversations/direct/{bob}/messages", app.server_url);
        let token = app.token_for(alice);
        tasks.push(tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .json(&serde_json::json!({ "content": format!("burst {i}") }))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), 201);
    }

    let feed = app.get_feed(&app.token_for(bob)).await;
    let entry = TestApp::feed_entry(&feed, alice).unwrap();
    assert_eq!(entry["unread_count"], sends);

    let body: serde_json::Value =
        app.list_messages(&app.token_for(bob), "direct", alice).await.json().await.unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), sends as usize);
}

#[tokio::test]
async fn mark_read_racing_append_keeps_counter_consistent() {
    use vitrinex_conversations::domain::conversation::ConversationRef;
    use vitrinex_conversations::storage::conversation_repo::ConversationRepository;
    use vitrinex_conversations::storage::message_repo::MessageRepository;

    let app = TestApp::spawn().await;
    let alice = app.seed_user(&format!("alice_{}", Uuid::new_v4())).await;
    let bob = app.seed_user(&format!("bob_{}", Uuid::new_v4())).await;

    app.send_message(&app.token_for(alice), "direct", bob, "first").await;

    // Start an append transaction by hand and leave it open. It holds the
    // conversation row lock, so bob's counter update below has to wait on it.
    let conversations = ConversationRepository::new();
    let messages = MessageRepository::new();
    let conv_ref = ConversationRef::direct(alice, bob);

    let mut append_tx = app.pool.begin().await.unwrap();
    let summary = conversations.find_or_create(&mut append_tx, &conv_ref).await.unwrap();
    let alice_side = summary.side_of(alice).unwrap();
    let msg = messages
        .create(&mut append_tx, summary.id, alice, alice_side, "second")
        .await
        .unwrap();
    conversations
        .record_message(&mut append_tx, summary.id, alice_side.opposite(), msg.created_at, "second")
        .await
        .unwrap();

    // Bob marks the thread read while the append is in flight. The read only
    // sees "first", so it must leave "second"'s increment alone.
    let reader = {
        let client = app.client.clone();
        let url = format!("{}/v1/conversations/direct/{alice}/read", app.server_url);
        let token = app.token_for(bob);
        tokio::spawn(async move {
            let resp = client.post(url).bearer_auth(token).send().await.unwrap();
            assert_eq!(resp.status(), 200);
            resp.json::<serde_json::Value>().await.unwrap()
        })
    };

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    append_tx.commit().await.unwrap();

    let body = reader.await.unwrap();
    assert_eq!(body["updated"], 1);
    assert_eq!(body["unread"], 1);

    // The cached counter still matches the live count: "second" is unread.
    let mut conn = app.pool.acquire().await.unwrap();
    let summary = conversations.find(&mut conn, &conv_ref).await.unwrap().unwrap();
    let bob_side = summary.side_of(bob).unwrap();
    let live = conversations.live_unread(&mut conn, summary.id, bob_side).await.unwrap();
    assert_eq!(live, 1);
    assert_eq!(summary.unread_for(bob_side), 1);
}

#[tokio::test]
async fn last_message_activity_never_moves_backward() {
    use vitrinex_conversations::domain::conversation::{ConversationRef, Side};
    use vitrinex_conversations::storage::conversation_repo::ConversationRepository;

    let app = TestApp::spawn().await;
    let alice = app.seed_user(&format!("alice_{}", Uuid::new_v4())).await;
    let bob = app.seed_user(&format!("bob_{}", Uuid::new_v4())).await;

    app.send_message(&app.token_for(alice), "direct", bob, "now").await;

    let conversations = ConversationRepository::new();
    let conv_ref = ConversationRef::direct(alice, bob);
    let mut conn = app.pool.acquire().await.unwrap();
    let before = conversations.find(&mut conn, &conv_ref).await.unwrap().unwrap();
    let latest = before.last_message_at.unwrap();

    // A summary update carrying an older timestamp (a delayed writer) must
    // not pull the activity marker back.
    let stale = latest - time::Duration::hours(1);
    conversations
        .record_message(&mut conn, before.id, Side::B, stale, "stale")
        .await
        .unwrap();

    let after = conversations.find(&mut conn, &conv_ref).await.unwrap().unwrap();
    assert_eq!(after.last_message_at, Some(latest));

    // A newer timestamp still advances it. Derived from the stored value so
    // it stays at the microsecond precision Postgres keeps.
    let newer = latest + time::Duration::seconds(5);
    conversations
        .record_message(&mut conn, before.id, Side::B, newer, "newer")
        .await
        .unwrap();
    let after = conversations.find(&mut conn, &conv_ref).await.unwrap().unwrap();
    assert_eq!(after.last_message_at, Some(newer));
}

#[tokio::test]
async fn mark_read_only_flips_the_read_flag() {
    use vitrinex_conversations::domain::conversation::ConversationRef;
    use vitrinex_conversations::storage::conversation_repo::ConversationRepository;
    use vitrinex_conversations::storage::message_repo::MessageRepository;

    let app = TestApp::spawn().await;
    let alice = app.seed_user(&format!("alice_{}", Uuid::new_v4())).await;
    let bob = app.seed_user(&format!("bob_{}", Uuid::new_v4())).await;

    app.send_message(&app.token_for(alice), "direct", bob, "one").await;
    app.send_message(&app.token_for(alice), "direct", bob, "two").await;
    app.send_message(&app.token_for(bob), "direct", alice, "three").await;

    let conversations = ConversationRepository::new();
    let messages = MessageRepository::new();
    let conv_ref = ConversationRef::direct(alice, bob);
    let mut conn = app.pool.acquire().await.unwrap();
    let summary = conversations.find(&mut conn, &conv_ref).await.unwrap().unwrap();
    let bob_side = summary.side_of(bob).unwrap();

    let before = messages.list_for_conversation(&mut conn, summary.id).await.unwrap();
    app.mark_read(&app.token_for(bob), "direct", alice).await;
    let after = messages.list_for_conversation(&mut conn, summary.id).await.unwrap();

    // The log itself is untouched: same rows, same order, same content.
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.id, a.id);
        assert_eq!(b.seq, a.seq);
        assert_eq!(b.content, a.content);
        assert_eq!(b.sender_id, a.sender_id);
        assert_eq!(b.created_at, a.created_at);
        // Only counterparty messages flip; bob's own stay as they were.
        if a.sender_side == bob_side {
            assert_eq!(a.is_read, b.is_read);
        } else {
            assert!(a.is_read);
        }
    }
}

#[tokio::test]
async fn error_statuses_match_contract() {
    let app = TestApp::spawn().await;
    let alice = app.seed_user(&format!("alice_{}", Uuid::new_v4())).await;
    let bob = app.seed_user(&format!("bob_{}", Uuid::new_v4())).await;
    let mallory = app.seed_user(&format!("mallory_{}", Uuid::new_v4())).await;
    let store = app.seed_store(alice, "Corner Bakery").await;
    let order = app.seed_order(store, bob).await;

    // 404: unresolvable reference and unknown kind.
    let resp = app.send_message(&app.token_for(alice), "order", Uuid::new_v4(), "hello").await;
    assert_eq!(resp.status(), 404);
    let resp = app.send_message(&app.token_for(alice), "carrier-pigeon", order, "hello").await;
    assert_eq!(resp.status(), 404);

    // 403: caller is neither participant.
    let resp = app.send_message(&app.token_for(mallory), "order", order, "let me in").await;
    assert_eq!(resp.status(), 403);
    let resp = app.list_messages(&app.token_for(mallory), "order", order).await;
    assert_eq!(resp.status(), 403);

    // 400: empty and oversized content.
    let resp = app.send_message(&app.token_for(bob), "order", order, "   ").await;
    assert_eq!(resp.status(), 400);
    let resp = app.send_message(&app.token_for(bob), "order", order, &"x".repeat(4001)).await;
    assert_eq!(resp.status(), 400);

    // 401: missing token.
    let resp = app
        .client
        .post(format!("{}/v1/conversations/order/{order}/messages", app.server_url))
        .json(&serde_json::json!({ "content": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}
