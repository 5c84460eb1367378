pub mod common;

use reqwest::StatusCode;

#[tokio::test]
async fn lists_tickets_by_role() {
    let url = common::spawn().await;
    let alice = common::Client::signed_up(&url, "Alice", "customer").await;
    let dave = common::Client::signed_up(&url, "Dave", "customer").await;
    let bob = common::Client::signed_up(&url, "Bob", "agent").await;
    let carol = common::Client::signed_up(&url, "Carol", "admin").await;
    let first = alice.report("Printer on fire").await;
    let second = alice.report("Forgot password").await;
    dave.report("Slow laptop").await;
    bob.pickup(first.id).await.unwrap();

    let own = alice.get_tickets().await.unwrap();
    assert_eq!(own.total_count, 2);
    // Newest first.
    assert_eq!(own.tickets[0].id, second.id);
    assert_eq!(own.tickets[1].id, first.id);

    let held = bob.get_tickets().await.unwrap();
    assert_eq!(held.total_count, 1);
    assert_eq!(bob.my_tickets().await.unwrap().tickets[0].id, first.id);
    assert_eq!(bob.unassigned_tickets().await.unwrap().total_count, 2);

    assert_eq!(carol.get_tickets().await.unwrap().total_count, 3);

    let status = alice.unassigned_tickets().await.unwrap_err();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn filters_admin_listing() {
    let url = common::spawn().await;
    let alice = common::Client::signed_up(&url, "Alice", "customer").await;
    let bob = common::Client::signed_up(&url, "Bob", "agent").await;
    let carol = common::Client::signed_up(&url, "Carol", "admin").await;
    let printer = alice.report("Printer on fire").await;
    let password = alice.report("Forgot password").await;
    bob.pickup(printer.id).await.unwrap();
    alice.escalate(password.id, "Locked out").await.unwrap();
    let bob_id = carol.agent_id("Bob").await.to_string();

    let found = carol.admin_tickets(&[("search", "PRINTER")]).await.unwrap();
    assert_eq!(found.total_count, 1);
    assert_eq!(found.tickets[0].id, printer.id);

    let found = carol
        .admin_tickets(&[("assignedTo", bob_id.as_str())])
        .await
        .unwrap();
    assert_eq!(found.total_count, 1);
    assert_eq!(found.tickets[0].id, printer.id);

    let found = carol.admin_tickets(&[("unassigned", "true")]).await.unwrap();
    assert_eq!(found.tickets[0].id, password.id);

    let found = carol
        .admin_tickets(&[("escalated", "true"), ("priority", "high")])
        .await
        .unwrap();
    assert_eq!(found.total_count, 1);
    assert_eq!(found.tickets[0].id, password.id);

    let found = carol
        .admin_tickets(&[("status", "assigned")])
        .await
        .unwrap();
    assert_eq!(found.total_count, 1);

    let found = carol
        .admin_tickets(&[("createdFrom", "2000-01-01T00:00:00Z")])
        .await
        .unwrap();
    assert_eq!(found.total_count, 2);
    let found = carol
        .admin_tickets(&[("createdTo", "2000-01-01T00:00:00Z")])
        .await
        .unwrap();
    assert_eq!(found.total_count, 0);

    let status = bob.admin_tickets(&[]).await.unwrap_err();
    assert_eq!(status, StatusCode::FORBIDDEN);
}
