use super::*;
use hashes::MURMUR_HASHES;
use std::io::Cursor;

const SIZE_EXP: u32 = 24;

fn simple_filter() -> BloomFilter {
    BloomFilter::init(SIZE_EXP, HashFamily::Simple).unwrap()
}

// -------------------- Construction --------------------

#[test]
fn init_creates_zeroed_filter() {
    let bf = simple_filter();
    assert_eq!(bf.bitsize(), 1 << SIZE_EXP);
    assert_eq!(bf.size(), (1 << SIZE_EXP) / 8);
    assert_eq!(bf.num_funcs(), 3);
    assert!(bf.bits.iter().all(|&b| b == 0));
    assert_eq!(bf.count(), 0);
}

#[test]
fn new_rounds_byte_size_up() {
    let bf = BloomFilter::new(12).unwrap();
    assert_eq!(bf.bitsize(), 12);
    assert_eq!(bf.size(), 2);
}

#[test]
fn zero_bitsize_is_rejected() {
    assert!(matches!(BloomFilter::new(0), Err(BloomError::ZeroBitsize)));
}

#[test]
fn bad_size_exponents_are_rejected() {
    assert!(matches!(
        BloomFilter::init(0, HashFamily::Simple),
        Err(BloomError::SizeExponent(0))
    ));
    assert!(matches!(
        BloomFilter::init(64, HashFamily::Simple),
        Err(BloomError::SizeExponent(64))
    ));
}

#[test]
fn empty_hash_list_is_rejected() {
    let mut bf = BloomFilter::new(64).unwrap();
    assert!(matches!(
        bf.set_hash_funcs(&[]),
        Err(BloomError::HashCount(0))
    ));
}

// -------------------- Add / Check --------------------

#[test]
fn added_key_is_found() {
    let mut bf = simple_filter();
    bf.add(b"abc");
    assert!(bf.check(b"abc"));
    assert!(!bf.check(b"ABC"));
}

#[test]
fn added_num_is_found() {
    let mut bf = simple_filter();
    bf.add_num(0x5A7AD);
    assert!(bf.check_num(0x5A7AD));
    assert!(!bf.check_num(0xC0FFEE));
}

#[test]
fn empty_key_sets_bits() {
    let mut bf = simple_filter();
    assert!(!bf.check(b""));
    bf.add(b"");
    assert!(bf.check(b""));
    // sax/sdbm/bernstein all hash the empty slice to 0
    assert_eq!(bf.count(), 1);
}

#[test]
fn no_false_negatives() {
    let mut bf = simple_filter();
    for i in 0..1000u64 {
        bf.add(&i.to_le_bytes());
    }
    for i in 0..1000u64 {
        assert!(bf.check(&i.to_le_bytes()), "key {} should be found", i);
    }
}

#[test]
fn count_bounded_by_inserts() {
    let mut bf = simple_filter();
    for i in 0..100u64 {
        bf.add(&i.to_le_bytes());
    }
    assert!(bf.count() <= 3 * 100);
    assert!(bf.count() <= bf.bitsize());
}

#[test]
fn hash_collisions_sanity() {
    // Three functions, one key: three distinct bits per family at this
    // size (no intra-family collision for "abc").
    let mut x1 = simple_filter();
    x1.add(b"abc");
    assert_eq!(x1.count(), 3);

    let mut x2 = BloomFilter::init(SIZE_EXP, HashFamily::Murmur).unwrap();
    x2.add(b"abc");
    assert_eq!(x2.count(), 3);
}

#[test]
fn odd_bitsize_masks_into_final_byte() {
    let mut bf = BloomFilter::new(12).unwrap();
    bf.set_hash_funcs(&MURMUR_HASHES).unwrap();
    for i in 0..64u64 {
        bf.add(&i.to_le_bytes());
        assert!(bf.check(&i.to_le_bytes()));
    }
    // bits 12..16 of the 2-byte array must never be set
    assert_eq!(bf.bits[1] & 0xF0, 0);
    assert!(bf.count() <= 12);
}

// -------------------- Clear / Count --------------------

#[test]
fn count_is_popcount() {
    let mut bf = simple_filter();
    bf.bits[0] = 0x03;
    let last = bf.bits.len() - 1;
    bf.bits[last] = 0x80;
    assert_eq!(bf.count(), 3);
}

#[test]
fn clear_zeroes_but_keeps_shape() {
    let mut bf = simple_filter();
    bf.bits[0] = 0xCA;
    let last = bf.bits.len() - 1;
    bf.bits[last] = 0xFE;
    bf.clear();
    assert_eq!(bf.count(), 0);
    assert_eq!(bf.bitsize(), 1 << SIZE_EXP);
    assert_eq!(bf.num_funcs(), 3);
}

// -------------------- Compare --------------------

#[test]
fn compare_equal_filters() {
    let b1 = simple_filter();
    let b2 = simple_filter();
    assert_eq!(b1.compare(&b2), 0);
    assert_eq!(b1.compare(&b1), 0);
}

#[test]
fn compare_detects_bitsize_and_content() {
    let mut b1 = simple_filter();
    let mut b2 = simple_filter();

    b1.bitsize -= 1;
    assert_ne!(b1.compare(&b2), 0);
    b2.bitsize -= 1;
    assert_eq!(b1.compare(&b2), 0);
    b1.bitsize += 1;
    b2.bitsize += 1;

    b1.bits[0] += 1;
    assert_ne!(b1.compare(&b2), 0);
    b2.bits[0] += 1;
    assert_eq!(b1.compare(&b2), 0);
}

#[test]
fn compare_ignores_hash_funcs() {
    let mut b1 = simple_filter();
    let mut b2 = BloomFilter::init(SIZE_EXP, HashFamily::Murmur).unwrap();
    assert_eq!(b1.compare(&b2), 0);

    b1.add(b"abc");
    assert_ne!(b1.compare(&b2), 0);

    b1.clear();
    b2.add_num(0x5A7AD);
    assert_ne!(b1.compare(&b2), 0);
}

#[test]
fn equal_filters_have_equal_counts() {
    let mut b1 = simple_filter();
    let mut b2 = simple_filter();
    b1.add(b"abc");
    b2.add(b"abc");
    assert_eq!(b1.compare(&b2), 0);
    assert_eq!(b1.count(), b2.count());
}

// -------------------- Serialization --------------------

#[test]
fn roundtrip_serialize_deserialize() {
    let mut bf = simple_filter();
    for i in 0..500u64 {
        bf.add(&i.to_le_bytes());
    }

    let mut buf = Vec::new();
    bf.write_to(&mut buf).unwrap();
    assert_eq!(buf.len(), bf.serialized_size());

    let mut cursor = Cursor::new(&buf);
    let bf2 = BloomFilter::read_from(&mut cursor, bf.funcs()).unwrap();

    assert_eq!(bf2.bitsize(), bf.bitsize());
    assert_eq!(bf2.size(), bf.size());
    assert_eq!(bf.compare(&bf2), 0);
    for i in 0..500u64 {
        assert!(bf2.check(&i.to_le_bytes()));
    }
}

#[test]
fn roundtrip_odd_bitsize() {
    let mut bf = BloomFilter::new(13).unwrap();
    bf.set_hash_funcs(&hashes::SIMPLE_HASHES).unwrap();
    bf.add(b"x");

    let mut buf = Vec::new();
    bf.write_to(&mut buf).unwrap();
    let bf2 = BloomFilter::read_from(&mut Cursor::new(&buf), bf.funcs()).unwrap();
    assert_eq!(bf.compare(&bf2), 0);
}

#[test]
fn read_rejects_size_mismatch() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&16u64.to_le_bytes()); // bitsize = 16
    buf.extend_from_slice(&3u64.to_le_bytes()); // size should be 2
    buf.extend_from_slice(&[0, 0, 0]);
    let err = BloomFilter::read_from(&mut Cursor::new(&buf), &hashes::SIMPLE_HASHES);
    assert!(matches!(err, Err(BloomError::Corrupt)));
}

#[test]
fn read_rejects_zero_bitsize() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());
    let err = BloomFilter::read_from(&mut Cursor::new(&buf), &hashes::SIMPLE_HASHES);
    assert!(matches!(err, Err(BloomError::Corrupt)));
}

#[test]
fn read_rejects_stray_bits() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&12u64.to_le_bytes()); // bitsize = 12 -> 2 bytes
    buf.extend_from_slice(&2u64.to_le_bytes());
    buf.extend_from_slice(&[0x00, 0x10]); // bit 12 set
    let err = BloomFilter::read_from(&mut Cursor::new(&buf), &hashes::SIMPLE_HASHES);
    assert!(matches!(err, Err(BloomError::Corrupt)));
}

#[test]
fn read_rejects_truncated_payload() {
    let mut bf = BloomFilter::new(64).unwrap();
    bf.set_hash_funcs(&hashes::SIMPLE_HASHES).unwrap();
    let mut buf = Vec::new();
    bf.write_to(&mut buf).unwrap();
    buf.truncate(buf.len() - 4);
    let err = BloomFilter::read_from(&mut Cursor::new(&buf), &hashes::SIMPLE_HASHES);
    assert!(matches!(err, Err(BloomError::Io(_))));
}

#[test]
fn read_rejects_oversized_claim() {
    let mut buf = Vec::new();
    let bitsize = 16u64 * 1024 * 1024 * 1024 * 1024; // 2 TiB of bits
    buf.extend_from_slice(&bitsize.to_le_bytes());
    buf.extend_from_slice(&(bitsize / 8).to_le_bytes());
    let err = BloomFilter::read_from(&mut Cursor::new(&buf), &hashes::SIMPLE_HASHES);
    assert!(matches!(err, Err(BloomError::Corrupt)));
}

// -------------------- memcmp_bytes --------------------

#[test]
fn memcmp_bytes_basics() {
    let a = [0u8; 100];
    let b = [0u8; 100];
    let c = [0xFFu8; 100];

    assert_eq!(memcmp_bytes(&a, &b), 0);
    assert_ne!(memcmp_bytes(&a, &c), 0);
}

#[test]
fn memcmp_bytes_last_byte() {
    let a = [0u8; 100];
    let mut b = [0u8; 100];

    b[99] = 1;
    assert_eq!(memcmp_bytes(&a, &b), -1);

    let mut a = a;
    a[99] = 2;
    assert_eq!(memcmp_bytes(&a, &b), 1);
}

#[test]
fn memcmp_bytes_returns_byte_difference() {
    let mut a = [0u8; 100];
    let mut b = [0u8; 100];

    a[42] = 0xFF;
    assert_eq!(memcmp_bytes(&a, &b), 0xFF);

    b[23] = 0xFF;
    assert_eq!(memcmp_bytes(&a, &b), -0xFF);

    a[0] = 1;
    assert_eq!(memcmp_bytes(&a, &b), 1);

    b[0] = 2;
    assert_eq!(memcmp_bytes(&a, &b), -1);
}

#[test]
fn memcmp_bytes_subranges() {
    let mut a = [0xFFu8; 100];
    let c = [0xFFu8; 100];
    a[98] = 0;
    a[99] = 0;

    assert_eq!(memcmp_bytes(&a[..99], &c[..99]), -0xFF);
    a[98] = 0xFF;
    assert_eq!(memcmp_bytes(&a[..99], &c[..99]), 0);
    a[99] = 0xFF;
    assert_eq!(memcmp_bytes(&a, &c), 0);
}

#[test]
fn debug_impl_works() {
    let bf = simple_filter();
    let dbg = format!("{:?}", bf);
    assert!(dbg.contains("BloomFilter"));
    assert!(dbg.contains("bitsize"));
}
