//! Integration tests driving a `DiscoveryClient` through the nullable
//! clock and transport factory: beacon assignment, the rediscovery and
//! heartbeat cadence, inbound gating and every receive path.

use std::rc::Rc;

use beacon_network::{
    DiscoveryClient, DiscoveryConfig, DiscoveryNode, ListenDelegate, NetworkError,
    TransportFactory,
};
use beacon_nullables::{NullClock, NullTransportFactory, RecordingDelegate};
use beacon_protocol::{Frame, Opcode};
use beacon_types::{Endpoint, ProtocolDescriptor, TransportId};
use proptest::prelude::*;

type Client = DiscoveryClient<NullTransportFactory, RecordingDelegate>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const LOCAL: &str = "127.0.0.1:8000";
const BEACON: &str = "10.0.0.1:8002";

fn ep(s: &str) -> Endpoint {
    s.parse().unwrap()
}

fn protocols() -> Vec<ProtocolDescriptor> {
    vec![
        ProtocolDescriptor::new(0x0001_0000, 1, 8001),
        ProtocolDescriptor::new(0x0002_0000, 3, 8003),
    ]
}

fn client_with(discoverable: bool, protocols: Vec<ProtocolDescriptor>) -> (Rc<NullClock>, Client) {
    let clock = Rc::new(NullClock::new(0));
    let config = DiscoveryConfig {
        discoverable,
        ..Default::default()
    };
    let client = DiscoveryClient::new(
        ep(LOCAL),
        NullTransportFactory::new(),
        RecordingDelegate::new(protocols),
        clock.clone(),
        config,
    )
    .unwrap();
    (clock, client)
}

fn client(discoverable: bool) -> (Rc<NullClock>, Client) {
    client_with(discoverable, protocols())
}

/// Start discovery and let the beacon dial complete.
fn establish(client: &mut Client) -> TransportId {
    client.start_discovery(ep(BEACON));
    let beacon = client.factory_mut().complete_dial(ep(BEACON));
    client.process_events();
    beacon
}

/// Advance simulated time in `step_ms` increments, polling timers each step.
fn tick(clock: &NullClock, client: &mut Client, step_ms: u64, steps: usize) {
    for _ in 0..steps {
        clock.advance(step_ms);
        client.poll_timers();
        client.process_events();
    }
}

fn heartbeats(client: &Client) -> usize {
    client.factory().count_sent(Opcode::Heartbeat.as_byte())
}

fn disc_peers(client: &Client) -> usize {
    client.factory().count_sent(Opcode::DiscPeer.as_byte())
}

// ---------------------------------------------------------------------------
// Construction and bootstrap
// ---------------------------------------------------------------------------

#[test]
fn new_binds_and_listens() {
    let (_clock, client) = client(false);
    assert_eq!(client.factory().bound(), Some(ep(LOCAL)));
    assert!(client.factory().is_listening());
    assert_eq!(client.beacon(), None);
    assert_eq!(client.next_timeout_ms(), None);
}

#[test]
fn bind_failure_is_propagated() {
    let mut factory = NullTransportFactory::new();
    factory.bind(ep("127.0.0.1:9999")).unwrap();
    let result = DiscoveryClient::new(
        ep(LOCAL),
        factory,
        RecordingDelegate::default(),
        Rc::new(NullClock::new(0)),
        DiscoveryConfig::default(),
    );
    assert!(matches!(result, Err(NetworkError::AlreadyBound(_))));
}

#[test]
fn start_discovery_dials_beacon_once() {
    let (_clock, mut client) = client(false);
    client.start_discovery(ep(BEACON));
    assert_eq!(client.factory().dials(), &[ep(BEACON)]);
    assert_eq!(client.beacon(), None);
    assert!(!client.is_rediscovering());
}

#[test]
fn first_dial_becomes_beacon_and_requests_peers() {
    let (_clock, mut client) = client(false);
    let beacon = establish(&mut client);

    assert_eq!(client.beacon(), Some(beacon));
    assert_eq!(client.factory().sent_frames(beacon), vec![Frame::DiscPeer]);
    assert!(client.is_rediscovering());
    assert!(!client.is_heartbeating());
    assert_eq!(client.next_timeout_ms(), Some(60_000));
}

#[test]
fn discoverable_beacon_assignment_starts_heartbeat() {
    let (_clock, mut client) = client(true);
    establish(&mut client);
    assert!(client.is_heartbeating());
    assert_eq!(client.next_timeout_ms(), Some(10_000));
}

#[test]
fn later_dials_get_discproto_and_never_replace_beacon() {
    let (_clock, mut client) = client(false);
    let beacon = establish(&mut client);

    let p1 = client.factory_mut().complete_dial(ep("10.0.0.2:8002"));
    let p2 = client.factory_mut().complete_dial(ep("10.0.0.3:8002"));
    client.process_events();

    assert_eq!(client.beacon(), Some(beacon));
    assert_eq!(client.factory().sent_frames(p1), vec![Frame::DiscProto]);
    assert_eq!(client.factory().sent_frames(p2), vec![Frame::DiscProto]);
    assert_eq!(client.factory().sent_frames(beacon), vec![Frame::DiscPeer]);
}

#[test]
fn redial_of_beacon_address_is_just_another_peer() {
    let (_clock, mut client) = client(false);
    let beacon = establish(&mut client);

    let again = client.factory_mut().complete_dial(ep(BEACON));
    client.process_events();

    assert_ne!(again, beacon);
    assert_eq!(client.beacon(), Some(beacon));
    assert_eq!(client.factory().sent_frames(again), vec![Frame::DiscProto]);
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

#[test]
fn rediscovery_resends_discpeer_every_interval() {
    let (clock, mut client) = client(false);
    establish(&mut client);
    assert_eq!(disc_peers(&client), 1);

    tick(&clock, &mut client, 59_999, 1);
    assert_eq!(disc_peers(&client), 1);

    tick(&clock, &mut client, 1, 1);
    assert_eq!(disc_peers(&client), 2);

    tick(&clock, &mut client, 60_000, 3);
    assert_eq!(disc_peers(&client), 5);
}

#[test]
fn discoverable_client_heartbeats_beacon() {
    let (clock, mut client) = client(true);
    let beacon = establish(&mut client);

    tick(&clock, &mut client, 10_000, 6);

    assert_eq!(heartbeats(&client), 6);
    assert_eq!(disc_peers(&client), 2);
    assert!(client
        .factory()
        .sent()
        .iter()
        .all(|(transport, _)| *transport == beacon));
}

#[test]
fn non_discoverable_client_never_heartbeats_even_after_toggle() {
    let (clock, mut client) = client(false);
    establish(&mut client);

    tick(&clock, &mut client, 10_000, 3);
    client.set_discoverable(true);
    tick(&clock, &mut client, 10_000, 10);

    assert_eq!(heartbeats(&client), 0);
    assert!(!client.is_heartbeating());
}

#[test]
fn clearing_flag_suppresses_heartbeat_without_stopping_timer() {
    let (clock, mut client) = client(true);
    establish(&mut client);

    client.set_discoverable(false);
    tick(&clock, &mut client, 10_000, 2);
    assert_eq!(heartbeats(&client), 0);
    assert!(client.is_heartbeating());

    client.set_discoverable(true);
    tick(&clock, &mut client, 10_000, 1);
    assert_eq!(heartbeats(&client), 1);
}

#[test]
fn flag_set_before_beacon_assignment_counts() {
    let (clock, mut client) = client(false);
    client.set_discoverable(true);
    establish(&mut client);
    tick(&clock, &mut client, 10_000, 1);
    assert_eq!(heartbeats(&client), 1);
}

#[test]
fn vanished_beacon_is_skipped_and_timer_keeps_running() {
    let (clock, mut client) = client(false);
    let beacon = establish(&mut client);
    client.factory_mut().close(beacon);

    tick(&clock, &mut client, 60_000, 2);

    assert_eq!(disc_peers(&client), 1);
    assert!(client.is_rediscovering());
    assert_eq!(client.beacon(), Some(beacon));
}

#[test]
fn custom_intervals_are_honoured() {
    let clock = Rc::new(NullClock::new(0));
    let config = DiscoveryConfig {
        discoverable: true,
        rediscovery_interval_ms: 500,
        heartbeat_interval_ms: 100,
    };
    let mut client = DiscoveryClient::new(
        ep(LOCAL),
        NullTransportFactory::new(),
        RecordingDelegate::default(),
        clock.clone(),
        config,
    )
    .unwrap();
    establish(&mut client);

    tick(&clock, &mut client, 100, 10);

    assert_eq!(heartbeats(&client), 10);
    assert_eq!(disc_peers(&client), 3);
}

#[test]
fn zero_intervals_keep_timers_repeating() {
    let clock = Rc::new(NullClock::new(0));
    let config = DiscoveryConfig {
        discoverable: true,
        rediscovery_interval_ms: 0,
        heartbeat_interval_ms: 0,
    };
    let mut client = DiscoveryClient::new(
        ep(LOCAL),
        NullTransportFactory::new(),
        RecordingDelegate::default(),
        clock.clone(),
        config,
    )
    .unwrap();
    assert_eq!(client.config().rediscovery_interval_ms, 0);
    establish(&mut client);

    tick(&clock, &mut client, 1_000, 5);

    assert!(client.is_rediscovering());
    assert!(client.is_heartbeating());
    assert_eq!(disc_peers(&client), 6);
    assert_eq!(heartbeats(&client), 5);
}

// ---------------------------------------------------------------------------
// Inbound gating
// ---------------------------------------------------------------------------

#[test]
fn should_accept_mirrors_flag_for_every_address() {
    let (_clock, mut client) = client(false);
    let addrs = ["1.1.1.1:1", "10.0.0.1:8002", "127.0.0.1:8000", "255.255.255.255:65535"];

    for a in addrs {
        assert!(!client.should_accept(&ep(a)));
    }
    client.set_discoverable(true);
    for a in addrs {
        assert!(client.should_accept(&ep(a)));
    }
}

#[test]
fn inbound_is_rejected_when_not_discoverable() {
    let (_clock, mut client) = client(false);
    client
        .factory_mut()
        .incoming(ep("10.0.0.9:7000"), Frame::DiscProto.encode().unwrap());
    client.process_events();

    assert_eq!(client.factory().transport_count(), 0);
    assert!(client.factory().sent().is_empty());
}

#[test]
fn inbound_discproto_is_answered_when_discoverable() {
    let (_clock, mut client) = client(true);
    client
        .factory_mut()
        .incoming(ep("10.0.0.9:7000"), Frame::DiscProto.encode().unwrap());
    client.process_events();

    let sent = client.factory().sent();
    assert_eq!(sent.len(), 1);
    let transport = sent[0].0;
    assert!(client.factory().is_attached(transport));
    assert_eq!(
        client.factory().sent_frames(transport),
        vec![Frame::ListProto(protocols())]
    );
}

// ---------------------------------------------------------------------------
// Receive paths
// ---------------------------------------------------------------------------

#[test]
fn listproto_reports_each_descriptor_with_its_port() {
    let (_clock, mut client) = client(false);
    establish(&mut client);
    let peer_addr = ep("10.0.0.5:8002");
    let peer = client.factory_mut().complete_dial(peer_addr);
    client.process_events();

    let advertised = vec![
        ProtocolDescriptor::new(7, 1, 9000),
        ProtocolDescriptor::new(8, 2, 9001),
    ];
    client
        .factory_mut()
        .deliver_frame(peer, &Frame::ListProto(advertised));
    client.process_events();

    assert_eq!(
        client.delegate().peers(),
        &[
            (peer_addr.with_port(9000), 7, 1),
            (peer_addr.with_port(9001), 8, 2),
        ]
    );
}

#[test]
fn truncated_listproto_reports_complete_entries_only() {
    let (_clock, mut client) = client(false);
    let beacon = establish(&mut client);

    let mut packet = Frame::ListProto(vec![
        ProtocolDescriptor::new(1, 1, 1000),
        ProtocolDescriptor::new(2, 1, 2000),
    ])
    .encode()
    .unwrap();
    packet.truncate(packet.len() - 1);
    client.factory_mut().deliver(beacon, packet);
    client.process_events();

    assert_eq!(
        client.delegate().peers(),
        &[(ep(BEACON).with_port(1000), 1, 1)]
    );
}

#[test]
fn discproto_is_answered_in_delegate_order() {
    let (_clock, mut client) = client(false);
    let beacon = establish(&mut client);
    client.factory_mut().clear_sent();

    client.factory_mut().deliver_frame(beacon, &Frame::DiscProto);
    client.process_events();

    assert_eq!(
        client.factory().sent_frames(beacon),
        vec![Frame::ListProto(protocols())]
    );
}

#[test]
fn listproto_reply_reflects_current_delegate_protocols() {
    let (_clock, mut client) = client(false);
    let beacon = establish(&mut client);
    client.factory_mut().clear_sent();
    client
        .delegate_mut()
        .set_protocols(vec![ProtocolDescriptor::new(99, 9, 9999)]);

    client.factory_mut().deliver_frame(beacon, &Frame::DiscProto);
    client.process_events();

    assert_eq!(
        client.factory().sent_frames(beacon),
        vec![Frame::ListProto(vec![ProtocolDescriptor::new(99, 9, 9999)])]
    );
}

#[test]
fn oversized_protocol_list_is_not_sent() {
    let (_clock, mut client) = client_with(false, vec![ProtocolDescriptor::new(1, 1, 1); 256]);
    let beacon = establish(&mut client);
    client.factory_mut().clear_sent();

    client.factory_mut().deliver_frame(beacon, &Frame::DiscProto);
    client.process_events();

    assert!(client.factory().sent().is_empty());
}

#[test]
fn listpeer_dials_every_entry_in_order_without_dedup() {
    let (_clock, mut client) = client(false);
    let beacon = establish(&mut client);
    let peers = vec![ep("10.0.1.1:8002"), ep(BEACON), ep("10.0.1.1:8002")];

    let mut packet = Frame::ListPeer(peers.clone()).encode().unwrap();
    packet.extend_from_slice(&[0, 2, 0, 80, 10]);
    client.factory_mut().deliver(beacon, packet);
    client.process_events();

    let mut expected = vec![ep(BEACON)];
    expected.extend(peers);
    assert_eq!(client.factory().dials(), expected.as_slice());
}

#[test]
fn unexpected_discpeer_and_heartbeat_are_dropped() {
    let (_clock, mut client) = client(true);
    let beacon = establish(&mut client);
    client.factory_mut().clear_sent();

    client.factory_mut().deliver_frame(beacon, &Frame::DiscPeer);
    client.factory_mut().deliver_frame(beacon, &Frame::Heartbeat);
    client.process_events();

    assert!(client.factory().sent().is_empty());
    assert_eq!(client.beacon(), Some(beacon));
}

#[test]
fn unknown_opcode_changes_nothing() {
    let (_clock, mut client) = client(false);
    let beacon = establish(&mut client);
    client.factory_mut().clear_sent();
    let dials_before = client.factory().dials().to_vec();

    client.factory_mut().deliver(beacon, vec![0, 255, 1, 2, 3]);
    client.process_events();

    assert!(client.factory().sent().is_empty());
    assert_eq!(client.factory().dials(), dials_before.as_slice());
    assert!(client.delegate().peers().is_empty());
    assert_eq!(client.beacon(), Some(beacon));
}

#[test]
fn malformed_frames_are_dropped() {
    let (_clock, mut client) = client(false);
    let beacon = establish(&mut client);
    client.factory_mut().clear_sent();

    for packet in [vec![], vec![0], vec![1, 0], vec![9, 3, 1, 2]] {
        client.factory_mut().deliver(beacon, packet);
    }
    client.process_events();

    assert!(client.factory().sent().is_empty());
    assert_eq!(client.factory().dials(), &[ep(BEACON)]);
}

proptest! {
    /// A LISTPEER of N endpoints plus a short tail triggers exactly N dials.
    #[test]
    fn listpeer_triggers_one_dial_per_complete_entry(
        octets in prop::collection::vec((prop::array::uniform4(0u8..), any::<u16>()), 0..40),
        tail in prop::collection::vec(any::<u8>(), 0..8),
    ) {
        let (_clock, mut client) = client(false);
        let beacon = establish(&mut client);
        let peers: Vec<Endpoint> = octets
            .into_iter()
            .map(|(o, port)| Endpoint::new(o.into(), port))
            .collect();

        let mut packet = Frame::ListPeer(peers.clone()).encode().unwrap();
        packet.extend_from_slice(&tail);
        client.factory_mut().deliver(beacon, packet);
        client.process_events();

        prop_assert_eq!(&client.factory().dials()[1..], peers.as_slice());
    }
}
