//! Fixed test vectors for integer/float/container preferred serialization, matching
//! RFC 8949 Appendix A where the values overlap.

use qcbor::{Decoder, EncodeFlags, Encoder, Item};

fn encode(body: impl FnOnce(&mut Encoder<'_>)) -> Vec<u8> {
    let mut buf = vec![0u8; 4096];
    let mut enc = Encoder::new(&mut buf);
    enc.configure(EncodeFlags::PREFERRED);
    body(&mut enc);
    let len = enc.finish().unwrap();
    buf.truncate(len);
    buf
}

#[test]
fn small_uint_is_one_byte() {
    assert_eq!(encode(|e| e.add_int64(0)), [0x00]);
    assert_eq!(encode(|e| e.add_int64(10)), [0x0a]);
    assert_eq!(encode(|e| e.add_int64(23)), [0x17]);
}

#[test]
fn uint_argument_width_grows_at_boundaries() {
    assert_eq!(encode(|e| e.add_int64(24)), [0x18, 0x18]);
    assert_eq!(encode(|e| e.add_int64(255)), [0x18, 0xff]);
    assert_eq!(encode(|e| e.add_int64(256)), [0x19, 0x01, 0x00]);
    assert_eq!(encode(|e| e.add_int64(65535)), [0x19, 0xff, 0xff]);
    assert_eq!(encode(|e| e.add_int64(65536)), [0x1a, 0x00, 0x01, 0x00, 0x00]);
}

#[test]
fn negative_int_uses_type_1() {
    assert_eq!(encode(|e| e.add_int64(-1)), [0x20]);
    assert_eq!(encode(|e| e.add_int64(-10)), [0x29]);
    assert_eq!(encode(|e| e.add_int64(-100)), [0x38, 0x63]);
    assert_eq!(encode(|e| e.add_int64(-1000)), [0x39, 0x03, 0xe7]);
}

#[test]
fn empty_and_short_byte_string() {
    assert_eq!(encode(|e| e.add_bytes(&[])), [0x40]);
    assert_eq!(encode(|e| e.add_bytes(&[1, 2, 3, 4])), [0x44, 1, 2, 3, 4]);
}

#[test]
fn text_string_is_utf8() {
    assert_eq!(encode(|e| e.add_text("")), [0x60]);
    assert_eq!(encode(|e| e.add_text("a")), [0x61, b'a']);
    assert_eq!(encode(|e| e.add_text("IETF")), [0x64, b'I', b'E', b'T', b'F']);
}

#[test]
fn definite_array_head_is_back_patched() {
    let bytes = encode(|e| {
        e.open_array();
        e.add_int64(1);
        e.add_int64(2);
        e.add_int64(3);
        e.close_array();
    });
    assert_eq!(bytes, [0x83, 0x01, 0x02, 0x03]);
}

#[test]
fn nested_array_of_arrays() {
    let bytes = encode(|e| {
        e.open_array();
        e.open_array();
        e.close_array();
        e.open_array();
        e.add_int64(1);
        e.close_array();
        e.open_array();
        e.add_int64(1);
        e.add_int64(2);
        e.close_array();
        e.close_array();
    });
    assert_eq!(bytes, [0x83, 0x80, 0x81, 0x01, 0x82, 0x01, 0x02]);
}

#[test]
fn definite_map_head_counts_pairs_not_entries() {
    let bytes = encode(|e| {
        e.open_map();
        e.add_int64(1);
        e.add_int64(2);
        e.add_int64(3);
        e.add_int64(4);
        e.close_map();
    });
    assert_eq!(bytes[0], 0xa2);
}

#[test]
fn preferred_float_reduces_to_half_when_exact() {
    // 1.0 round-trips through half precision exactly.
    let bytes = encode(|e| e.add_double(1.0));
    assert_eq!(bytes, [0xf9, 0x3c, 0x00]);
}

#[test]
fn preferred_float_keeps_double_when_not_exactly_reducible() {
    let bytes = encode(|e| e.add_double(core::f64::consts::PI));
    assert_eq!(bytes[0], 0xfb);
}

#[test]
fn tag_number_precedes_its_item() {
    let bytes = encode(|e| {
        e.add_tag_number(18);
        e.add_bytes(&[1, 2, 3]);
    });
    assert_eq!(bytes, [0xd2, 0x43, 1, 2, 3]);
    let mut dec = Decoder::new(&bytes);
    let item = dec.get_next().unwrap();
    assert_eq!(item.tags.as_slice(), [18]);
    assert!(matches!(item.item, Item::Bytes(b, _) if b == [1, 2, 3]));
}

#[test]
fn bstr_wrap_produces_nested_cbor_byte_string() {
    let bytes = encode(|e| {
        e.bstr_wrap();
        e.open_map();
        e.add_int64(1);
        e.add_int64(5);
        e.close_map();
        e.close_bstr_wrap2(true);
    });
    // 0x43 = byte string of length 3: a1 01 05 (map{1:5}).
    assert_eq!(bytes, [0x43, 0xa1, 0x01, 0x05]);
}

#[test]
fn buffer_too_small_latches_and_surfaces_at_finish() {
    let mut buf = [0u8; 1];
    let mut enc = Encoder::new(&mut buf);
    enc.add_bytes(&[1, 2, 3, 4, 5]);
    assert!(enc.finish().is_err());
}
