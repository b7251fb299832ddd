/*
    Concurrency tests

    Many tasks hitting one ChatService at once: ids stay unique, every
    command is applied exactly once and a stalled listener never holds up
    delivery to the others.
*/

mod common;

use chatline_core::{Alert, ConversationKind, StoreError};
use common::{service, service_with_buffer, user, USERS};
use std::collections::HashSet;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_group_creation_yields_distinct_ids() {
    let service = service();

    let tasks: Vec<_> = (0..100)
        .map(|n| {
            let service = service.clone();
            tokio::spawn(async move {
                let owner = user(USERS[n % USERS.len()]);
                service
                    .create_group(&owner, &format!("Group {n}"), ConversationKind::PublicGroup)
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        assert!(ids.insert(task.await.unwrap()));
    }

    assert_eq!(ids.len(), 100);
    assert_eq!(service.store().len().await, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_direct_creation_admits_one() {
    let service = service();

    // both sides try to open the same pair at once
    let tasks: Vec<_> = (0..20)
        .map(|n| {
            let service = service.clone();
            tokio::spawn(async move {
                let (owner, peer) = if n % 2 == 0 {
                    (user("a"), user("b"))
                } else {
                    (user("b"), user("a"))
                };
                service.create_direct(&owner, "Trip", &peer).await
            })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(err) => assert_eq!(err, StoreError::DuplicateConversation.into()),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(service.list_conversations(&user("a")).await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_posts_all_recorded() {
    let service = service();
    let id = service
        .create_group(&user("a"), "Busy", ConversationKind::PublicGroup)
        .await
        .unwrap();
    for member in &USERS[1..] {
        service.join(&user(member), &id).await.unwrap();
    }

    let tasks: Vec<_> = (0..50)
        .map(|n| {
            let service = service.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let author = user(USERS[n % USERS.len()]);
                service
                    .post_message(&author, &id, &format!("message {n}"))
                    .await
                    .unwrap()
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let snapshot = service.get_conversation(&user("a"), &id).await.unwrap();
    assert_eq!(snapshot.message_list.len(), 50);

    // timestamps never go backwards in stored order
    assert!(snapshot
        .message_list
        .windows(2)
        .all(|pair| pair[0].created_at <= pair[1].created_at));
}

#[tokio::test]
async fn test_stalled_listener_does_not_block_others() {
    let service = service_with_buffer(4);
    let (a, b) = (user("a"), user("b"));
    let id = service.create_direct(&a, "Trip", &b).await.unwrap();

    let mut stalled = service.fanout().subscribe(&b).await;
    let mut healthy = service.fanout().subscribe(&b).await;

    for n in 0..20 {
        // publishing must not wait on the stalled listener
        tokio::time::timeout(
            Duration::from_secs(1),
            service.post_message(&a, &id, &format!("message {n}")),
        )
        .await
        .expect("publish blocked")
        .unwrap();

        match healthy.recv().await {
            Some(Alert::NewMessageAdded(posted)) => {
                assert_eq!(posted.content, format!("message {n}"))
            }
            other => panic!("expected NewMessageAdded, got {other:?}"),
        }
    }

    // the stalled one got its buffer's worth, then was evicted
    let mut buffered = 0;
    while stalled.recv().await.is_some() {
        buffered += 1;
    }
    assert_eq!(buffered, 4);
    assert_eq!(service.fanout().subscriber_count(&b).await, 1);
}

#[tokio::test]
async fn test_abandoned_listener_is_pruned() {
    let service = service();
    let (a, b) = (user("a"), user("b"));
    let id = service.create_direct(&a, "Trip", &b).await.unwrap();

    let abandoned = service.fanout().subscribe(&b).await;
    let mut live = service.fanout().subscribe(&b).await;
    drop(abandoned);

    service.post_message(&a, &id, "hi").await.unwrap();
    assert!(matches!(live.recv().await, Some(Alert::NewMessageAdded(_))));
    assert_eq!(service.fanout().subscriber_count(&b).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Run with: cargo test --test concurrency -- --ignored
async fn stress_many_listeners_many_messages() {
    println!("\n=== Stress: fanout ===\n");

    let service = service_with_buffer(1024);
    let owner = user("a");
    let id = service
        .create_group(&owner, "Stress", ConversationKind::PublicGroup)
        .await
        .unwrap();
    for member in &USERS[1..] {
        service.join(&user(member), &id).await.unwrap();
    }

    let mut handles = Vec::new();
    for member in USERS {
        for _ in 0..20 {
            handles.push(service.fanout().subscribe(&user(member)).await);
        }
    }

    let start = std::time::Instant::now();
    for n in 0..500 {
        service
            .post_message(&owner, &id, &format!("message {n}"))
            .await
            .unwrap();
    }
    let elapsed = start.elapsed();

    for handle in &mut handles {
        let mut count = 0;
        while handle.try_recv().is_some() {
            count += 1;
        }
        assert_eq!(count, 500);
    }

    println!(
        "✓ 500 messages to {} listeners in {:?}",
        handles.len(),
        elapsed
    );
}
