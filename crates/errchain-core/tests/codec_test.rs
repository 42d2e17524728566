use std::fmt;
use std::sync::{Arc, Mutex, Once};

use errchain_core::codec::MAX_DEPTH;
use errchain_core::{
    Arg, ArgKind, Cause, Chain, CodecError, Registry, Site, args, copy, decode, decode_with,
    encode, encode_with,
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Endpoint {
    host: String,
    port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl ArgKind for Endpoint {
    const KIND: &'static str = "codec_test.endpoint";
}

/// A counter with interior mutability whose clones do not share state.
#[derive(Debug, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
struct Tally(Arc<Mutex<u32>>);

impl Tally {
    fn new(count: u32) -> Self {
        Tally(Arc::new(Mutex::new(count)))
    }

    fn bump(&self) {
        *self.0.lock().unwrap() += 1;
    }

    fn get(&self) -> u32 {
        *self.0.lock().unwrap()
    }
}

impl Clone for Tally {
    fn clone(&self) -> Self {
        Tally::new(self.get())
    }
}

impl From<u32> for Tally {
    fn from(count: u32) -> Self {
        Tally::new(count)
    }
}

impl From<Tally> for u32 {
    fn from(tally: Tally) -> Self {
        tally.get()
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl ArgKind for Tally {
    const KIND: &'static str = "codec_test.tally";
}

fn install_registry() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        Registry::new()
            .with::<Endpoint>()
            .with::<Tally>()
            .install()
            .unwrap();
    });
}

fn endpoint() -> Endpoint {
    Endpoint {
        host: "db.internal".to_owned(),
        port: 5432,
    }
}

#[test]
fn custom_arguments_round_trip_through_installed_registry() {
    install_registry();
    let chain = Chain::with_args("cannot reach {}", args![Arg::custom(endpoint())])
        .push("startup failed")
        .expect("pushed");

    let decoded = decode(&encode(&chain).unwrap()).unwrap();
    assert_eq!(decoded.trace(), chain.trace());
    assert_eq!(
        decoded.last().args()[0].downcast_ref::<Endpoint>(),
        Some(&endpoint())
    );
}

#[test]
fn unregistered_kinds_fail_both_ways() {
    let chain = Chain::with_args("cannot reach {}", args![Arg::custom(endpoint())]);
    let empty = Registry::new();

    match encode_with(&chain, &empty) {
        Err(CodecError::UnregisteredKind(kind)) => assert_eq!(kind, Endpoint::KIND),
        other => panic!("unexpected encode result {other:?}"),
    }

    let full = Registry::new().with::<Endpoint>();
    let bytes = encode_with(&chain, &full).unwrap();
    assert!(matches!(
        decode_with(&bytes, &empty),
        Err(CodecError::UnregisteredKind(_))
    ));
    assert_eq!(decode_with(&bytes, &full).unwrap().formatted(), "cannot reach db.internal:5432");
}

#[test]
fn round_trip_keeps_every_argument_kind() {
    let args = args![
        true,
        -7_i64,
        7_u64,
        0.25_f64,
        'λ',
        "text",
        Arg::bytes(vec![0_u8, 255]),
        Arg::list(["a", "b"]),
    ];
    let chain = Chain::with_args("{} {} {} {} {} {} {:x} {}", args.clone());
    let decoded = decode(&encode(&chain).unwrap()).unwrap();
    assert_eq!(decoded.args(), args.as_slice());
    assert_eq!(decoded.formatted(), "true -7 7 0.25 λ text 00ff [a, b]");
}

#[test]
fn round_trip_long_chain() {
    let mut chain = Chain::new("origin");
    for i in 0..50 {
        chain = chain.push(format!("hop {i}")).expect("pushed");
    }
    let decoded = decode(&encode(&chain).unwrap()).unwrap();
    assert_eq!(decoded.len(), 51);
    assert_eq!(decoded.trace(), chain.trace());
}

/// Builds a chain of `len` nodes, each with a site, without stack capture.
fn long_chain(len: usize) -> Chain {
    let mut chain = Chain::from_parts(
        Cause::Native("origin".to_owned()),
        Vec::new(),
        Some(Site::new("codec_test::origin", "tests/codec_test.rs", 1)),
        None,
    );
    for i in 1..len {
        chain = Chain::from_parts(
            Cause::Native("hop {}".to_owned()),
            args![i],
            Some(Site::new("codec_test::hop", "tests/codec_test.rs", i as u32)),
            Some(chain),
        );
    }
    chain
}

#[test]
fn chain_length_is_not_limited_by_nesting_depth() {
    let len = 5_000;
    assert!(len > MAX_DEPTH);
    let chain = long_chain(len);
    let decoded = decode(&encode(&chain).unwrap()).unwrap();

    assert_eq!(decoded.len(), len);
    assert_eq!(decoded.formatted(), format!("hop {}", len - 1));
    assert_eq!(decoded.last().formatted(), "origin");
    assert_eq!(decoded.find_str("origin"), Some(len - 1));
    assert_eq!(decoded.trace(), chain.trace());
}

#[test]
fn very_long_chains_copy_and_drop_without_overflow() {
    let chain = long_chain(200_000);
    let copied = copy(Some(&chain)).expect("copied");
    assert_eq!(copied.len(), 200_000);
    assert_eq!(copied.last().site(), chain.last().site());
    drop(chain);

    let bytes = encode(&copied).unwrap();
    drop(copied);
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded.len(), 200_000);
    assert!(format!("{decoded:?}").starts_with("[Node {"));
}

#[test]
fn decoded_site_metadata_matches() {
    let chain = Chain::new("located");
    let decoded = decode(&encode(&chain).unwrap()).unwrap();
    assert_eq!(decoded.site(), chain.site());
    assert!(decoded.has_debug_info());
}

#[test]
fn copy_is_independent_of_the_original() {
    let chain = Chain::with_args("seen {} times", args![Arg::custom(Tally::new(1))])
        .push("outer")
        .expect("pushed");
    let copied = copy(Some(&chain)).expect("copied");

    let tally = copied.last().args()[0]
        .downcast_ref::<Tally>()
        .expect("tally argument");
    tally.bump();

    assert_eq!(copied.last().formatted(), "seen 2 times");
    assert_eq!(chain.last().formatted(), "seen 1 times");
}

#[test]
fn copy_survives_rebuilding_the_copy() {
    let chain = Chain::with_args("limit {}", args![10]);
    let (cause, _, site, next) = chain.copy().into_parts();
    let rebuilt = Chain::from_parts(cause, args![99], site, next);

    assert_eq!(rebuilt.formatted(), "limit 99");
    assert_eq!(chain.formatted(), "limit 10");
    assert!(matches!(chain.cause(), Cause::Native(message) if message == "limit {}"));
}
