#![cfg(test)]

use proptest::collection::vec;
use proptest::prelude::*;

use crate::cshake::{CShake, ShakeMode};
use crate::kmac::{Kmac, KmacMode};

#[derive(Clone, Debug, PartialEq)]
enum MacOp {
    Update(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq)]
struct MacTranscript {
    key: Vec<u8>,
    custom: Vec<u8>,
    ops: Vec<MacOp>,
}

fn apply_mac_transcript(transcript: &MacTranscript) -> [u8; 32] {
    let mut mac = Kmac::new(KmacMode::Kmac256);
    mac.initialize(&transcript.key, &transcript.custom).expect("legal key");

    for MacOp::Update(data) in &transcript.ops {
        mac.update(data).expect("initialized");
    }

    let mut tag = [0u8; 32];
    mac.finalize(&mut tag).expect("initialized");
    tag
}

/// The concatenation of a transcript's updates; two transcripts with equal
/// flattenings must produce equal tags, chunking notwithstanding.
fn flatten(transcript: &MacTranscript) -> Vec<u8> {
    transcript.ops.iter().flat_map(|MacOp::Update(d)| d.iter().copied()).collect()
}

fn arb_mac_transcript() -> impl Strategy<Value = MacTranscript> {
    (
        vec(any::<u8>(), 32..64),
        vec(any::<u8>(), 0..32),
        vec(vec(any::<u8>(), 0..300).prop_map(MacOp::Update), 0..12),
    )
        .prop_map(|(key, custom, ops)| MacTranscript { key, custom, ops })
}

proptest! {
    #[test]
    fn mac_transcript_consistency(t0 in arb_mac_transcript(), t1 in arb_mac_transcript()) {
        let out0 = apply_mac_transcript(&t0);
        let out1 = apply_mac_transcript(&t1);

        if t0.key == t1.key && t0.custom == t1.custom && flatten(&t0) == flatten(&t1) {
            prop_assert_eq!(out0, out1);
        } else {
            prop_assert_ne!(out0, out1);
        }
    }

    #[test]
    fn xof_streams_diverge_on_any_input(
        key in vec(any::<u8>(), 1..64),
        custom in vec(any::<u8>(), 0..32),
        name in vec(any::<u8>(), 0..32),
        tweak in 0usize..3,
    ) {
        let mut a = CShake::new(ShakeMode::Shake256);
        a.initialize(&key, &custom, &name);

        // flip one byte of one of the three inputs
        let (mut key2, mut custom2, mut name2) = (key.clone(), custom.clone(), name.clone());
        match tweak {
            0 => key2[0] ^= 1,
            1 => custom2.push(0xFF),
            _ => name2.push(0xFF),
        }
        let mut b = CShake::new(ShakeMode::Shake256);
        b.initialize(&key2, &custom2, &name2);

        let (mut x, mut y) = ([0u8; 48], [0u8; 48]);
        a.squeeze(&mut x);
        b.squeeze(&mut y);
        prop_assert_ne!(x, y);
    }
}
