use weir_base::{Config, Tracing, TracingConfig};

#[test]
fn test_tracing_init_from() {
    let mut config = Config::new();
    config
        .set(
            "tracing",
            TracingConfig {
                level: tracing::Level::DEBUG,
                directives: vec!["weir=trace".to_string()],
            },
        )
        .unwrap();
    Tracing::init_from(&config).unwrap();
    tracing::debug!("Tracing installed");

    // Only one global subscriber may be installed per process.
    assert!(Tracing::init_from(&Config::new()).is_err());
}
