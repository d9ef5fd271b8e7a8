use bytes::Bytes;
use proptest::prelude::*;

use telnetrs::events::Event;
use telnetrs::negotiation::{Command, QState, TelOpt};
use telnetrs::telnet::op_command::IAC;
use telnetrs::{Codec, Flags};

const ECHO: u8 = telnetrs::telnet::op_option::ECHO;

/// Collect every `Event::Data` payload from a batch into one buffer.
fn data_bytes(events: &[Event]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Data(b) => Some(b.to_vec()),
            _ => None,
        })
        .flatten()
        .collect()
}

proptest! {
    /// Escaping then decoding arbitrary application data (including raw
    /// 0xFF bytes) round-trips to the original bytes.
    #[test]
    fn data_round_trips_through_escape_and_decode(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut codec = Codec::new();
        let sent = codec.send_data(&data);
        let wire: Vec<u8> = sent
            .into_iter()
            .flat_map(|e| match e {
                Event::Send(b) => b.to_vec(),
                _ => Vec::new(),
            })
            .collect();

        let mut receiver = Codec::new();
        let events = receiver.receive(&wire);
        prop_assert_eq!(data_bytes(&events), data);
    }

    /// Feeding the same bytes in one shot or split across arbitrary
    /// boundaries produces an identical event sequence.
    #[test]
    fn incremental_decoding_matches_single_shot(
        data in prop::collection::vec(any::<u8>(), 1..128),
        splits in prop::collection::vec(0usize..128, 0..8),
    ) {
        let table = [TelOpt::new(ECHO, false, true)];

        let mut one_shot = Codec::with_options(&table, Flags::default());
        let all_at_once = one_shot.receive(&data);

        let mut points: Vec<usize> = splits.into_iter().map(|s| s % (data.len() + 1)).collect();
        points.sort_unstable();
        points.dedup();

        let mut incremental = Codec::with_options(&table, Flags::default());
        let mut piecewise = Vec::new();
        let mut prev = 0;
        for point in points {
            piecewise.extend(incremental.receive(&data[prev..point]));
            prev = point;
        }
        piecewise.extend(incremental.receive(&data[prev..]));

        prop_assert_eq!(all_at_once, piecewise);
    }

    /// The subnegotiation buffer never exceeds its documented hard cap
    /// regardless of how much payload is pushed before IAC SE.
    #[test]
    fn subnegotiation_buffer_never_exceeds_hard_cap(payload in prop::collection::vec(any::<u8>(), 0..20000)) {
        let mut codec = Codec::new();
        let mut input = vec![IAC, telnetrs::telnet::op_command::SB, 100];
        for &b in &payload {
            input.push(b);
            if b == IAC {
                input.push(IAC);
            }
        }
        input.extend_from_slice(&[IAC, telnetrs::telnet::op_command::SE]);

        let events = codec.receive(&input);
        for event in events {
            if let Event::Subnegotiation(sub) = event {
                prop_assert!(sub.buffer.len() <= 16384);
            }
        }
    }

    /// A caller-initiated WILL request followed by the expected DO reply
    /// always converges to the Yes/Yes steady state, regardless of
    /// interleaving noise bytes sent in between (Q-method liveness).
    #[test]
    fn q_method_converges_after_expected_reply(noise in prop::collection::vec(any::<u8>(), 0..16)) {
        let table = [TelOpt::new(ECHO, true, false)];
        let mut codec = Codec::with_options(&table, Flags::default());

        codec.negotiate(Command::Will, ECHO);
        prop_assert_eq!(codec.local_enabled(ECHO), false);

        // Unrelated application data shouldn't disturb negotiation state.
        let _ = codec.receive(&noise.into_iter().filter(|&b| b != IAC).collect::<Vec<_>>());

        codec.receive(&[IAC, telnetrs::telnet::op_command::DO, ECHO]);
        prop_assert!(codec.local_enabled(ECHO));
    }

    /// Once a COMPRESS2 stream tears down on malformed input, subsequent
    /// bytes are treated as cleartext data rather than re-entering inflate.
    #[test]
    fn no_stale_compression_after_teardown(tail in prop::collection::vec(1u8..=254, 1..64)) {
        let mut codec = Codec::new();
        let mut input = vec![IAC, telnetrs::telnet::op_command::SB, telnetrs::telnet::op_option::COMPRESS2, IAC, telnetrs::telnet::op_command::SE];
        // Garbage zlib stream: guaranteed to fail the deflate header check.
        input.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let events = codec.receive(&input);
        prop_assert!(events.iter().any(|e| matches!(e, Event::Compress(false))));

        let events = codec.receive(&tail);
        prop_assert_eq!(data_bytes(&events), tail);
    }
}

#[test]
fn example_iac_escape_round_trip_literal() {
    let mut codec = Codec::new();
    let events = codec.send_data(&[0x41, 0xFF, 0x42]);
    assert_eq!(
        events,
        vec![Event::Send(Bytes::copy_from_slice(&[0x41, 0xFF, 0xFF, 0x42]))]
    );
}

#[test]
fn example_q_method_offer_with_echo() {
    let table = [TelOpt::new(ECHO, false, true)];
    let mut codec = Codec::with_options(&table, Flags::default());
    let events = codec.receive(&[IAC, telnetrs::telnet::op_command::WILL, ECHO]);
    assert!(events.contains(&Event::Send(Bytes::copy_from_slice(&[
        IAC,
        telnetrs::telnet::op_command::DO,
        ECHO
    ]))));
    assert_eq!(codec.remote_enabled(ECHO), true);
}

#[test]
fn example_unsupported_option_refusal_with_ttype() {
    let mut codec = Codec::new();
    let events = codec.receive(&[IAC, telnetrs::telnet::op_command::DO, telnetrs::telnet::op_option::TTYPE]);
    assert_eq!(
        events,
        vec![Event::Send(Bytes::copy_from_slice(&[
            IAC,
            telnetrs::telnet::op_command::WONT,
            telnetrs::telnet::op_option::TTYPE
        ]))]
    );
}

#[test]
fn example_naws_subnegotiation_with_embedded_iac() {
    let mut codec = Codec::new();
    let events = codec.receive(&[
        IAC,
        telnetrs::telnet::op_command::SB,
        telnetrs::telnet::op_option::NAWS,
        0x00,
        0xFF,
        0xFF,
        0x00,
        0x50,
        IAC,
        telnetrs::telnet::op_command::SE,
    ]);
    assert_eq!(
        events,
        vec![Event::Subnegotiation(telnetrs::events::Subnegotiation::generic(
            telnetrs::telnet::op_option::NAWS,
            Bytes::copy_from_slice(&[0x00, 0xFF, 0x00, 0x50])
        ))]
    );
}

#[test]
fn example_zmp_parse() {
    let mut codec = Codec::new();
    let mut input = vec![IAC, telnetrs::telnet::op_command::SB, telnetrs::telnet::op_option::ZMP];
    input.extend_from_slice(b"zmp.ping\x00");
    input.extend_from_slice(&[IAC, telnetrs::telnet::op_command::SE]);
    let events = codec.receive(&input);
    let Event::Subnegotiation(sub) = &events[0] else {
        panic!("expected subnegotiation");
    };
    assert_eq!(sub.argc(), 1);
    assert_eq!(&sub.argv.as_ref().unwrap()[0][..], b"zmp.ping");
}
