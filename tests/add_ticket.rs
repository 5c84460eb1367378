pub mod common;

use reqwest::StatusCode;
use serde_json::json;
use ticket_desk::api::ticket::{Complexity, Kind, Priority, Severity, Status};

#[tokio::test]
async fn adds_ticket_with_defaults() {
    let url = common::spawn().await;
    let alice = common::Client::signed_up(&url, "Alice", "customer").await;

    let ticket = alice
        .add_ticket(json!({
            "subject": "Printer on fire",
            "description": "Third floor",
            "tags": ["hardware"],
        }))
        .await
        .unwrap();

    assert_eq!(ticket.subject, "Printer on fire");
    assert_eq!(ticket.description, "Third floor");
    assert_eq!(ticket.status, Status::New);
    assert_eq!(ticket.priority, Priority::Medium);
    assert_eq!(ticket.complexity, Complexity::Moderate);
    assert_eq!(ticket.severity, Severity::Minor);
    assert_eq!(ticket.kind, Kind::Incident);
    assert_eq!(ticket.tags, ["hardware"]);
    assert_eq!(ticket.assigned_to, None);
    assert!(!ticket.escalated);
    assert_eq!(ticket.history.len(), 1);
    assert_eq!(ticket.history[0].changed_by, "System");
    assert_eq!(
        (ticket.sla_deadline - ticket.created_at).whole_hours(),
        168,
    );
}

#[tokio::test]
async fn critical_ticket_gets_short_sla() {
    let url = common::spawn().await;
    let alice = common::Client::signed_up(&url, "Alice", "customer").await;

    let ticket = alice
        .add_ticket(json!({
            "subject": "Outage",
            "description": "Everything is down",
            "priority": "critical",
            "type": "problem",
        }))
        .await
        .unwrap();

    assert_eq!(ticket.priority, Priority::Critical);
    assert_eq!(ticket.kind, Kind::Problem);
    assert_eq!((ticket.sla_deadline - ticket.created_at).whole_hours(), 72);
}

#[tokio::test]
async fn cant_add_ticket_without_subject() {
    let url = common::spawn().await;
    let alice = common::Client::signed_up(&url, "Alice", "customer").await;

    let status = alice
        .add_ticket(json!({ "subject": " ", "description": "Details" }))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(alice.get_tickets().await.unwrap().total_count, 0);
}

#[tokio::test]
async fn cant_add_ticket_as_agent() {
    let url = common::spawn().await;
    let bob = common::Client::signed_up(&url, "Bob", "agent").await;

    let status = bob
        .add_ticket(json!({ "subject": "Subject", "description": "Details" }))
        .await
        .unwrap_err();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
