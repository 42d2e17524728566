use errchain_core::{CaptureConfig, Chain, ConfigError, decode, encode};
use pretty_assertions::assert_eq;

// The configuration is process-wide, so everything that depends on it lives in
// one test.
#[test]
fn disabled_capture_builds_nodes_without_sites() {
    CaptureConfig::builder()
        .enabled(false)
        .build()
        .install()
        .unwrap();

    assert_eq!(
        CaptureConfig::default().install(),
        Err(ConfigError::AlreadyInstalled("capture configuration"))
    );
    assert!(!CaptureConfig::current().enabled());

    let chain = Chain::new("disk full").push("saving draft").expect("pushed");
    assert!(chain.iter().all(|node| !node.has_debug_info()));
    assert_eq!(chain.line(), None);
    assert_eq!(chain.function(), None);
    assert_eq!(chain.trace(), "saving draft\ndisk full\n");
    assert_eq!(chain.to_string(), "saving draft");
    assert_eq!(format!("{chain:#}"), "\"saving draft\"");

    let decoded = decode(&encode(&chain).unwrap()).unwrap();
    assert!(!decoded.has_debug_info());
    assert_eq!(decoded.trace(), chain.trace());
}
