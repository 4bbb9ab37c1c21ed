//! Integration tests for the mailstore crate
//!
//! These tests verify the complete flow from delivery and storage to
//! listing and the JMAP adapter, against both backends.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use mailstore::jmap::{AccountId, MailboxService, Request, handle_request};
use mailstore::models::{EmailAddress, Mailbox, Marker, Message, MessageId, MimePart, ReservedLabel};
use mailstore::sending::SendingService;
use mailstore::storage::{KvMailStore, ListQuery, MailStorage};
use mailstore::{MailError, ParsedEmail, StoreConfig, deliver};
use serde_json::json;
use tempfile::TempDir;

/// Helper to create test messages
fn make_message(id: &MessageId, labels: &[ReservedLabel], subject: &str) -> Message {
    let mut builder = Message::builder(id.clone())
        .from(EmailAddress::with_name("Test User", "test@example.com"))
        .to(vec![
            EmailAddress::new("alice@example.com"),
            EmailAddress::with_name("Carol", "carol@example.com"),
        ])
        .subject(subject)
        .date(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        .text(format!("Text of {}", subject))
        .html(format!("<p>{}</p>", subject));
    for label in labels {
        builder = builder.label(*label);
    }
    builder.build()
}

fn alice() -> Mailbox {
    Mailbox::from_email("alice@example.com").unwrap()
}

/// Both backends, so every property is checked against each
fn backends() -> Vec<(KvMailStore, Option<TempDir>)> {
    let dir = TempDir::new().unwrap();
    let persistent = KvMailStore::open(&StoreConfig::with_data_dir(dir.path())).unwrap();
    vec![(KvMailStore::in_memory(), None), (persistent, Some(dir))]
}

#[test]
fn test_put_get_round_trip() {
    for (store, _dir) in backends() {
        let id = store.generate_id();
        let mut message = make_message(&id, &[ReservedLabel::Inbox], "Round trip");
        message.in_reply_to = Some("<parent@example.com>".to_string());
        let expected = message.clone();

        store.put_message(&alice(), &id, &mut message).unwrap();
        let stored = store.get_message(&alice(), &id).unwrap();

        assert_eq!(stored.labels, expected.labels);
        assert_eq!(stored.subject, expected.subject);
        assert_eq!(stored.from, expected.from);
        assert_eq!(stored.to, expected.to);
        assert_eq!(stored.text, expected.text);
        assert_eq!(stored.html, expected.html);
        assert_eq!(stored.date, expected.date);
        assert_eq!(stored.in_reply_to, expected.in_reply_to);
    }
}

#[test]
fn test_folder_membership_scenario() {
    for (store, _dir) in backends() {
        let id = store.generate_id();
        let mut message = make_message(&id, &[ReservedLabel::All, ReservedLabel::Inbox], "Hi");
        store.put_message(&alice(), &id, &mut message).unwrap();

        let inbox = ListQuery::new().folder(ReservedLabel::Inbox);
        let drafts = ListQuery::new().folder(ReservedLabel::Drafts);
        assert_eq!(store.get_message_ids(Some(&alice()), &inbox).unwrap(), vec![id]);
        assert!(store.get_message_ids(Some(&alice()), &drafts).unwrap().is_empty());
    }
}

#[test]
fn test_listing_tracks_last_write_and_deletes() {
    for (store, _dir) in backends() {
        let ids: Vec<MessageId> = (0..6).map(|_| store.generate_id()).collect();
        for (i, id) in ids.iter().enumerate() {
            let label = if i % 2 == 0 { ReservedLabel::Inbox } else { ReservedLabel::Sent };
            let mut message = make_message(id, &[label], &format!("Message {}", i));
            store.put_message(&alice(), id, &mut message).unwrap();
        }

        // Move message 0 from Inbox to Deleted, delete message 2
        let mut moved = store.get_message(&alice(), &ids[0]).unwrap();
        moved.labels = BTreeSet::from([ReservedLabel::Deleted]);
        store.put_message(&alice(), &ids[0], &mut moved).unwrap();
        store.delete(&alice(), &ids[2]).unwrap();

        let inbox = store
            .get_all_message_ids(Some(&alice()), Some(ReservedLabel::Inbox))
            .unwrap();
        assert_eq!(inbox, vec![ids[4].clone()]);

        let deleted = store
            .get_all_message_ids(Some(&alice()), Some(ReservedLabel::Deleted))
            .unwrap();
        assert_eq!(deleted, vec![ids[0].clone()]);

        let all = store.get_all_message_ids(Some(&alice()), None).unwrap();
        assert_eq!(all.len(), 5);
        assert!(!all.contains(&ids[2]));
    }
}

#[test]
fn test_pagination_has_no_gaps_or_duplicates() {
    for (store, _dir) in backends() {
        let mut expected = Vec::new();
        for i in 0..23 {
            let id = store.generate_id();
            let mut message = make_message(&id, &[ReservedLabel::Inbox], &format!("m{}", i));
            store.put_message(&alice(), &id, &mut message).unwrap();
            expected.push(id);
        }

        for limit in [1, 5, 22, 23, 24] {
            let mut collected = Vec::new();
            let mut query = ListQuery::new().folder(ReservedLabel::Inbox).limit(limit);
            let mut pages = 0;
            loop {
                let page = store.get_message_id_page(Some(&alice()), &query).unwrap();
                assert!(page.ids.len() <= limit);
                collected.extend(page.ids);
                pages += 1;
                match page.next {
                    Some(next) => query = query.after(Some(next)),
                    None => break,
                }
            }

            // Generated ids sort by creation, so listing order is arrival order
            assert_eq!(collected, expected, "limit {}", limit);
            assert_eq!(pages, expected.len().div_ceil(limit), "limit {}", limit);
        }
    }
}

#[test]
fn test_messages_with_metadata_pages() {
    for (store, _dir) in backends() {
        for i in 0..3 {
            let id = store.generate_id();
            let mut message = make_message(&id, &[ReservedLabel::Inbox], &format!("m{}", i));
            store.put_message(&alice(), &id, &mut message).unwrap();
        }

        let query = ListQuery::new().limit(2);
        let first = store.get_messages_with_metadata(Some(&alice()), &query).unwrap();
        assert_eq!(first.messages.len(), 2);
        assert_eq!(first.messages[0].subject.as_deref(), Some("m0"));

        let second = store
            .get_messages_with_metadata(Some(&alice()), &query.after(first.next))
            .unwrap();
        assert_eq!(second.messages.len(), 1);
        assert_eq!(second.messages[0].subject.as_deref(), Some("m2"));
        assert!(second.next.is_none());
    }
}

#[test]
fn test_delete_is_idempotent() {
    for (store, _dir) in backends() {
        let id = store.generate_id();
        let mut message = make_message(&id, &[ReservedLabel::Drafts], "Bye");
        store.put_message(&alice(), &id, &mut message).unwrap();

        store.delete(&alice(), &id).unwrap();
        store.delete(&alice(), &id).unwrap();

        assert!(matches!(
            store.get_message(&alice(), &id),
            Err(MailError::MessageNotFound { .. })
        ));
        for label in ReservedLabel::ALL {
            let query = ListQuery::new().folder(label);
            assert!(store.get_message_ids(Some(&alice()), &query).unwrap().is_empty());
        }
    }
}

#[test]
fn test_unbounded_limit_lists_everything() {
    for (store, _dir) in backends() {
        let mut ids = Vec::new();
        for i in 0..3 {
            let id = store.generate_id();
            let mut message = make_message(&id, &[ReservedLabel::Inbox], &format!("m{}", i));
            store.put_message(&alice(), &id, &mut message).unwrap();
            ids.push(id);
        }
        ids.sort();

        let query = ListQuery::new().folder(ReservedLabel::Inbox).limit(usize::MAX);
        let page = store.get_message_id_page(Some(&alice()), &query).unwrap();
        assert_eq!(page.ids, ids);
        assert!(page.next.is_none());

        let unscoped = store.get_message_ids(None, &query).unwrap();
        assert_eq!(unscoped, ids);
    }
}

#[test]
fn test_unstorable_message_id_is_rejected() {
    for (store, _dir) in backends() {
        for raw in ["x:y", "a.b", ""] {
            let id = MessageId::new(raw);
            let mut message = make_message(&id, &[ReservedLabel::Inbox], "Bad id");
            message.parts.push(MimePart::new("1", b"bytes".to_vec()));

            let err = store.put_message(&alice(), &id, &mut message).unwrap_err();
            assert!(matches!(err, MailError::InvalidArguments(_)), "{raw:?}: {err}");
            assert!(err.is_client_error());
            assert!(store.get_part_content(&alice(), &id, "1").unwrap().is_none());
        }

        // Nothing was written, so listings only ever return fetchable ids
        let inbox = ListQuery::new().folder(ReservedLabel::Inbox);
        assert!(store.get_message_ids(Some(&alice()), &inbox).unwrap().is_empty());
        assert!(store.get_message_ids(None, &ListQuery::new()).unwrap().is_empty());
    }
}

#[test]
fn test_mailbox_identity() {
    assert_eq!(Mailbox::from_email("a@b.com").unwrap().id(), "a@b.com");
    assert!(matches!(
        Mailbox::from_email("nodomain"),
        Err(MailError::MalformedAddress(_))
    ));
}

#[test]
fn test_tenants_are_isolated() {
    for (store, _dir) in backends() {
        let bob = Mailbox::from_email("bob@example.com").unwrap();
        let id = store.generate_id();
        let mut message = make_message(&id, &[ReservedLabel::Inbox], "Private");
        store.put_message(&bob, &id, &mut message).unwrap();

        assert!(store.get_message(&alice(), &id).is_err());
        assert!(store.get_all_message_ids(Some(&alice()), None).unwrap().is_empty());
        assert_eq!(store.get_all_message_ids(Some(&bob), None).unwrap(), vec![id]);
    }
}

#[test]
fn test_attachments_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::with_data_dir(dir.path());
    let id = MessageId::generate();

    {
        let store = KvMailStore::open(&config).unwrap();
        let mut message = Message::builder(id.clone())
            .part(MimePart::new("1", vec![0u8; 4096]).with_filename("zeros.bin"))
            .part(MimePart::new("2", b"second".to_vec()).with_mime_type("text/plain"))
            .build();
        store.put_message(&alice(), &id, &mut message).unwrap();
    }

    let store = KvMailStore::open(&config).unwrap();
    let stored = store.get_message(&alice(), &id).unwrap();
    assert_eq!(stored.parts.len(), 2);
    assert_eq!(stored.parts[0].id, "1");
    assert_eq!(stored.parts[0].size, 4096);
    assert_eq!(
        store.get_part_content(&alice(), &id, "1").unwrap().unwrap(),
        vec![0u8; 4096]
    );
    assert_eq!(
        store.get_part_content(&alice(), &id, "2").unwrap().unwrap(),
        b"second"
    );
    assert!(store.get_part_content(&alice(), &id, "3").unwrap().is_none());
}

/// Sends succeed for every recipient except those at the blocked domain
struct DomainFilterSender {
    blocked: &'static str,
    sent: Mutex<Vec<String>>,
}

impl SendingService for DomainFilterSender {
    fn send(&self, message: &Message) -> bool {
        if message.to.iter().any(|to| to.address.ends_with(self.blocked)) {
            return false;
        }
        self.sent.lock().unwrap().push(message.id.to_string());
        true
    }
}

#[test]
fn test_jmap_compose_and_submit() {
    let store = Arc::new(KvMailStore::in_memory());
    let sender = Arc::new(DomainFilterSender {
        blocked: "@blocked.example",
        sent: Mutex::new(Vec::new()),
    });
    let service = MailboxService::new(store.clone(), sender.clone());
    let account = AccountId::for_email("alice@example.com");

    let request = |calls: serde_json::Value| -> Request {
        serde_json::from_value(json!({ "using": [], "methodCalls": calls })).unwrap()
    };

    let draft = |to: &str| {
        json!({
            "subject": "Hello",
            "to": [{ "name": null, "email": to }],
            "textBody": [{ "partId": "t" }],
            "bodyValues": { "t": { "value": "hello" } }
        })
    };

    let response = handle_request(
        &service,
        request(json!([[
            "Email/set",
            {
                "accountId": account,
                "create": { "ok": draft("bob@example.com"), "blocked": draft("eve@blocked.example") }
            },
            "c0"
        ]])),
    );
    let created = &response.method_responses[0].arguments()["created"];
    let ok_id = created["ok"]["id"].as_str().unwrap().to_string();
    let blocked_id = created["blocked"]["id"].as_str().unwrap().to_string();

    let stored = store.get_message(&alice(), &MessageId::new(ok_id.as_str())).unwrap();
    assert_eq!(stored.text.as_deref(), Some("hello"));
    assert!(stored.has_label(ReservedLabel::All) && stored.has_label(ReservedLabel::Drafts));
    assert!(stored.markers.contains(&Marker::Seen));

    let response = handle_request(
        &service,
        request(json!([
            [
                "EmailSubmission/set",
                {
                    "accountId": account,
                    "create": {
                        "s1": { "emailId": ok_id },
                        "s2": { "emailId": blocked_id }
                    }
                },
                "c1"
            ],
            ["Email/query", { "accountId": account, "filter": { "inMailbox": "2" } }, "c2"]
        ])),
    );

    let submission = response.method_responses[0].arguments();
    assert_eq!(submission["created"]["s1"]["id"], "s1");
    assert!(submission["created"].get("s2").is_none());
    assert_eq!(submission["notCreated"]["s2"], json!({}));
    assert_eq!(*sender.sent.lock().unwrap(), vec![ok_id]);

    let drafts = response.method_responses[1].arguments()["ids"].as_array().unwrap();
    assert_eq!(drafts.len(), 2);
}

#[test]
fn test_delivered_mail_is_visible_over_jmap() {
    struct Unused;
    impl SendingService for Unused {
        fn send(&self, _message: &Message) -> bool {
            false
        }
    }

    let raw = b"From: Bob <bob@example.com>\r\n\
To: alice@example.com\r\n\
Subject: Ping\r\n\
Date: Wed, 01 May 2024 10:00:00 +0000\r\n\
\r\n\
pong?\r\n";

    let store = Arc::new(KvMailStore::in_memory());
    let parsed = ParsedEmail::parse(raw).unwrap();
    let id = deliver(store.as_ref(), "alice@example.com", parsed, raw.len() as u64).unwrap();

    let service = MailboxService::new(store, Arc::new(Unused));
    let account = AccountId::for_email("alice@example.com");
    let request: Request = serde_json::from_value(json!({
        "using": [],
        "methodCalls": [
            ["Mailbox/get", { "accountId": account }, "c0"],
            ["Email/get", { "accountId": account, "fetchTextBodyValues": true }, "c1"]
        ]
    }))
    .unwrap();

    let response = handle_request(&service, request);
    assert_eq!(response.method_responses[0].arguments()["list"][0]["totalEmails"], 1);

    let email = &response.method_responses[1].arguments()["list"][0];
    assert_eq!(email["id"], id.as_str());
    assert_eq!(email["subject"], "Ping");
    assert_eq!(email["from"][0]["email"], "bob@example.com");
    assert_eq!(email["mailboxIds"], json!({ "0": true, "1": true }));
    assert_eq!(email["size"], raw.len());
    assert!(email["bodyValues"]["2a"]["value"].as_str().unwrap().starts_with("pong?"));
}
