//! Concurrency tests: many requests in flight, replies in arbitrary order

#![allow(clippy::unwrap_used, clippy::expect_used)]

use bytes::Bytes;
use im_protocol::protocol::event::*;
use im_protocol::protocol::{InboundFrame, Session};
use rand::seq::SliceRandom;
use std::time::Duration;
use tokio::task::JoinSet;

const UIN: u64 = 10000;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_get_their_own_replies() {
    let (session, mut channels) = Session::builder(UIN).build().unwrap();
    let requests = 64u32;

    let mut tasks = JoinSet::new();
    for request_id in 0..requests {
        let ctx = session.context().clone();
        tasks.spawn(async move {
            let reply: OnlineRespPushEvent = ctx
                .send_request(OnlineRespPushEvent::confirm(UIN, request_id))
                .await
                .expect("reply should arrive");
            assert_eq!(reply.request_id, request_id);
        });
    }

    let mut frames = Vec::new();
    for _ in 0..requests {
        frames.push(channels.outbound.recv().await.unwrap());
    }
    frames.shuffle(&mut rand::rng());

    for frame in frames {
        let ProtocolEvent::OnlineRespPush(confirm) = frame.event else {
            panic!("unexpected outbound event {:?}", frame.kind);
        };
        session.handle_frame(InboundFrame::new(frame.sequence, confirm));
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    let snapshot = session.metrics().snapshot();
    assert_eq!(snapshot.requests_sent, requests as u64);
    assert_eq!(snapshot.replies_matched, requests as u64);
}

// Single-threaded so each pull takes its generation and sends before the next one starts;
// outbound order is then generation order.
#[tokio::test(flavor = "current_thread")]
async fn concurrent_pulls_never_lose_the_cursor() {
    let (session, mut channels) = Session::builder(UIN).build().unwrap();
    let notifies = 16usize;

    for i in 0..notifies {
        session.handle_frame(InboundFrame::new(
            0x8000_0000 + i as u32,
            PushNotifyEvent {
                notify_type: NotifyType::FriendMessage,
            },
        ));
    }

    let mut pulls = Vec::new();
    for generation in 0..notifies {
        let frame = tokio::time::timeout(Duration::from_secs(5), channels.outbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.kind, EventKind::PullMessage);
        pulls.push((generation, frame));
    }

    // every third pull comes back without a cursor, including the newest
    let cursor_for =
        |generation: usize| (generation % 3 != 0).then(|| Bytes::from(vec![generation as u8 + 1]));
    let expected = (0..notifies)
        .rev()
        .find_map(cursor_for)
        .expect("some pull returns a cursor");

    pulls.shuffle(&mut rand::rng());
    for (generation, pull) in pulls {
        session.handle_frame(InboundFrame::new(
            pull.sequence,
            PullMessageResponseEvent {
                sync_cursor: cursor_for(generation),
                messages: vec![ProtocolEvent::FriendMessage(FriendMessageEvent {
                    from_uin: generation as u64,
                    text: format!("pulled {generation}"),
                })],
            },
        ));
    }

    // a pulled message reaches the entity only after its pull committed
    for _ in 0..notifies {
        let forwarded = tokio::time::timeout(Duration::from_secs(5), channels.entity.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(forwarded.kind(), EventKind::FriendMessage);
    }

    assert_eq!(session.metrics().snapshot().replies_matched, notifies as u64);
    assert_eq!(session.state().sync_cursor().await, Some(expected));
    assert!(channels.errors.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unsubscribed_events_forwarded_in_arrival_order() {
    let (session, mut channels) = Session::builder(UIN).build().unwrap();

    for i in 0..500u32 {
        session.handle_frame(InboundFrame::new(
            0x8000_0000 + i,
            FriendMessageEvent {
                from_uin: i as u64,
                text: format!("m{i}"),
            },
        ));
    }

    for i in 0..500u64 {
        match channels.entity.recv().await.unwrap() {
            ProtocolEvent::FriendMessage(message) => assert_eq!(message.from_uin, i),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(session.metrics().snapshot().events_forwarded, 500);
}
