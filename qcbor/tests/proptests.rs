//! Property-based round-trip checks for the encoder/decoder pair, weighted toward
//! the argument-width boundaries (23/24, 255/256, 65535/65536) where most encoding
//! bugs hide.

use proptest::prelude::*;

use qcbor::{Decoder, EncodeFlags, Encoder, Item};

const BUF_SIZE: usize = 8192;

fn encode_int(v: i64) -> Vec<u8> {
    let mut buf = vec![0u8; BUF_SIZE];
    let mut enc = Encoder::new(&mut buf);
    enc.configure(EncodeFlags::PREFERRED);
    enc.add_int64(v);
    let len = enc.finish().unwrap();
    buf.truncate(len);
    buf
}

fn encode_bytes(v: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; BUF_SIZE.max(v.len() + 16)];
    let mut enc = Encoder::new(&mut buf);
    enc.configure(EncodeFlags::PREFERRED);
    enc.add_bytes(v);
    let len = enc.finish().unwrap();
    buf.truncate(len);
    buf
}

fn encode_text(v: &str) -> Vec<u8> {
    let mut buf = vec![0u8; BUF_SIZE.max(v.len() + 16)];
    let mut enc = Encoder::new(&mut buf);
    enc.configure(EncodeFlags::PREFERRED);
    enc.add_text(v);
    let len = enc.finish().unwrap();
    buf.truncate(len);
    buf
}

/// Biases generation toward the argument-width boundaries rather than sampling
/// uniformly over the full range, where a flat distribution would rarely land on
/// the bytes that actually matter.
fn arb_int64() -> impl Strategy<Value = i64> {
    prop_oneof![
        3 => -24i64..24,
        2 => prop_oneof![Just(23i64), Just(24), Just(-24), Just(-25)],
        2 => prop_oneof![Just(255i64), Just(256), Just(-256), Just(-257)],
        2 => prop_oneof![Just(65535i64), Just(65536), Just(-65536), Just(-65537)],
        1 => any::<i32>().prop_map(i64::from),
        1 => any::<i64>(),
    ]
}

fn arb_byte_len() -> impl Strategy<Value = usize> {
    prop_oneof![
        3 => 0usize..23,
        2 => prop_oneof![Just(23usize), Just(24), Just(255), Just(256)],
        1 => 0usize..2048,
    ]
}

proptest! {
    #[test]
    fn int_round_trips(v in arb_int64()) {
        let bytes = encode_int(v);
        let mut dec = Decoder::new(&bytes);
        let item = dec.get_next().unwrap();
        dec.finish().unwrap();
        let decoded = match item.item {
            Item::UInt(n) => i64::try_from(n).unwrap(),
            Item::NInt(n) => -1 - i64::try_from(n).unwrap(),
            other => panic!("unexpected item {other:?}"),
        };
        prop_assert_eq!(decoded, v);
    }

    #[test]
    fn int_encoding_is_minimal(v in arb_int64()) {
        // Encoding the same value twice with PREFERRED set must be byte-identical:
        // the encoder carries no hidden state across calls.
        let a = encode_int(v);
        let b = encode_int(v);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn byte_string_round_trips(len in arb_byte_len()) {
        let data: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
        let bytes = encode_bytes(&data);
        let mut dec = Decoder::new(&bytes);
        let item = dec.get_next().unwrap();
        dec.finish().unwrap();
        match item.item {
            Item::Bytes(b, _) => prop_assert_eq!(b, data.as_slice()),
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn text_string_round_trips(s in "\\PC*") {
        let bytes = encode_text(&s);
        let mut dec = Decoder::new(&bytes);
        let item = dec.get_next().unwrap();
        dec.finish().unwrap();
        match item.item {
            Item::Text(t, _) => prop_assert_eq!(t, s.as_str()),
            other => panic!("unexpected item {other:?}"),
        }
    }

    #[test]
    fn array_of_ints_round_trips(values in prop::collection::vec(arb_int64(), 0..32)) {
        let mut buf = vec![0u8; BUF_SIZE];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        enc.open_array();
        for v in &values {
            enc.add_int64(*v);
        }
        enc.close_array();
        let len = enc.finish().unwrap();
        buf.truncate(len);

        let mut dec = Decoder::new(&buf);
        let outer = dec.get_next().unwrap();
        prop_assert!(matches!(outer.item, Item::ArrayStart(n) if n == values.len() as u64));
        dec.enter_array(&outer.item).unwrap();
        let mut decoded = Vec::with_capacity(values.len());
        for _ in 0..values.len() {
            let item = dec.get_next().unwrap();
            decoded.push(match item.item {
                Item::UInt(n) => i64::try_from(n).unwrap(),
                Item::NInt(n) => -1 - i64::try_from(n).unwrap(),
                other => panic!("unexpected item {other:?}"),
            });
        }
        dec.exit_array().unwrap();
        dec.finish().unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn bstr_wrap_round_trips(values in prop::collection::vec(arb_int64(), 0..16)) {
        let mut buf = vec![0u8; BUF_SIZE];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        enc.bstr_wrap();
        enc.open_array();
        for v in &values {
            enc.add_int64(*v);
        }
        enc.close_array();
        enc.close_bstr_wrap2(true);
        let len = enc.finish().unwrap();
        buf.truncate(len);

        let mut outer_dec = Decoder::new(&buf);
        let wrapped = outer_dec.get_next().unwrap();
        let inner = match wrapped.item {
            Item::Bytes(b, _) => b,
            other => panic!("unexpected item {other:?}"),
        };

        let mut dec = Decoder::new(inner);
        let arr = dec.get_next().unwrap();
        prop_assert!(matches!(arr.item, Item::ArrayStart(n) if n == values.len() as u64));
        dec.enter_array(&arr.item).unwrap();
        let mut decoded = Vec::with_capacity(values.len());
        for _ in 0..values.len() {
            let item = dec.get_next().unwrap();
            decoded.push(match item.item {
                Item::UInt(n) => i64::try_from(n).unwrap(),
                Item::NInt(n) => -1 - i64::try_from(n).unwrap(),
                other => panic!("unexpected item {other:?}"),
            });
        }
        dec.exit_array().unwrap();
        dec.finish().unwrap();
        prop_assert_eq!(decoded, values);
    }

    #[test]
    fn decoding_never_panics_on_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut dec = Decoder::new(&data);
        // A malformed or truncated buffer must surface as an error, not a panic,
        // no matter how many items we try to pull off it.
        for _ in 0..16 {
            match dec.get_next() {
                Ok(_) => continue,
                Err(_) => break,
            }
        }
    }

    #[test]
    fn tag_number_round_trips(tag in 0u64..(1u64 << 40), len in arb_byte_len()) {
        let data: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
        let mut buf = vec![0u8; BUF_SIZE.max(len + 32)];
        let mut enc = Encoder::new(&mut buf);
        enc.configure(EncodeFlags::PREFERRED);
        enc.add_tag_number(tag);
        enc.add_bytes(&data);
        let encoded_len = enc.finish().unwrap();
        buf.truncate(encoded_len);

        let mut dec = Decoder::new(&buf);
        let item = dec.get_next().unwrap();
        dec.finish().unwrap();
        prop_assert_eq!(item.tags.as_slice(), [tag]);
        match item.item {
            Item::Bytes(b, _) => prop_assert_eq!(b, data.as_slice()),
            other => panic!("unexpected item {other:?}"),
        }
    }
}
