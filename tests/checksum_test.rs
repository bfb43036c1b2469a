use proptest::prelude::*;
use sixpack::checksum::{adler32, update_adler32, Adler32, ADLER32_INIT};
use std::io;

fn reference(data: &[u8]) -> u32 {
    let mut rolling = ::adler32::RollingAdler32::new();
    rolling.update_buffer(data);
    rolling.hash()
}

#[test]
fn test_known_values() {
    assert_eq!(adler32(b""), 1);
    assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
    assert_eq!(adler32(b"a"), 0x0062_0062);
}

#[test]
fn test_long_runs_match_reference() {
    // exercises the deferred modulo across many 5552-byte runs
    let ones = vec![0xFFu8; 100_000];
    assert_eq!(adler32(&ones), reference(&ones));

    let ramp: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();
    assert_eq!(adler32(&ramp), reference(&ramp));
}

#[test]
fn test_rolling_accumulator_as_writer() {
    let data = vec![b'k'; 20_000];
    let mut sum = Adler32::new();
    io::copy(&mut &data[..], &mut sum).unwrap();
    assert_eq!(sum.finish(), adler32(&data));

    let resumed = {
        let mut s = Adler32::from_value(adler32(&data[..7]));
        s.update(&data[7..]);
        s.finish()
    };
    assert_eq!(resumed, adler32(&data));
}

proptest! {
    #[test]
    fn prop_split_is_associative(data in prop::collection::vec(any::<u8>(), 0..8192), cut in any::<prop::sample::Index>()) {
        let at = cut.index(data.len() + 1);
        let split = update_adler32(update_adler32(ADLER32_INIT, &data[..at]), &data[at..]);
        prop_assert_eq!(split, adler32(&data));
    }

    #[test]
    fn prop_matches_adler32_crate(data in prop::collection::vec(any::<u8>(), 0..16_384)) {
        prop_assert_eq!(adler32(&data), reference(&data));
    }
}
