use dohgate_domain::{guess_driver, AliasTable, DomainError, DriverDescriptor, DriverKind, ErrorKind};

#[test]
fn test_guess_driver_wire_schemes() {
    for url in ["udp://8.8.8.8", "tcp://8.8.8.8:5353", "tcp-tls://dns.quad9.net"] {
        assert_eq!(guess_driver(url).unwrap(), DriverKind::Dns, "{}", url);
    }
}

#[test]
fn test_guess_driver_http_paths() {
    assert_eq!(guess_driver("https://dns.google/resolve").unwrap(), DriverKind::Google);
    assert_eq!(guess_driver("https://cloudflare-dns.com/dns-query").unwrap(), DriverKind::Rfc8484);
    assert_eq!(guess_driver("http://127.0.0.1:8080/dns-query").unwrap(), DriverKind::Rfc8484);
    assert_eq!(guess_driver("https://example.net/custom").unwrap(), DriverKind::Doh);
    assert_eq!(guess_driver("https://example.net").unwrap(), DriverKind::Doh);
}

#[test]
fn test_guess_driver_unknown_scheme() {
    let err = guess_driver("ftp://x").unwrap_err();
    assert!(matches!(err, DomainError::UnsupportedScheme(ref s) if s == "ftp"));
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_guess_driver_malformed_url() {
    let err = guess_driver("not a url").unwrap_err();
    assert!(matches!(err, DomainError::InvalidUrl { .. }));
}

#[test]
fn test_descriptor_applies_alias_before_inference() {
    let aliases: AliasTable = [("google", "https://dns.google/resolve")].into_iter().collect();

    let resolved = DriverDescriptor::new(None, "google").resolve(&aliases).unwrap();

    assert_eq!(resolved.kind, DriverKind::Google);
    assert_eq!(resolved.url, "https://dns.google/resolve");
}

#[test]
fn test_descriptor_explicit_driver_wins() {
    let resolved = DriverDescriptor::new(Some("rfc8484".into()), "https://dns.google/resolve")
        .resolve(&AliasTable::new())
        .unwrap();

    assert_eq!(resolved.kind, DriverKind::Rfc8484);
}

#[test]
fn test_descriptor_empty_driver_falls_back_to_inference() {
    let resolved = DriverDescriptor::new(Some("  ".into()), "udp://1.1.1.1")
        .resolve(&AliasTable::new())
        .unwrap();

    assert_eq!(resolved.kind, DriverKind::Dns);
}

#[test]
fn test_descriptor_unknown_driver_name() {
    let err = DriverDescriptor::new(Some("carrier-pigeon".into()), "udp://1.1.1.1")
        .resolve(&AliasTable::new())
        .unwrap_err();

    assert!(matches!(err, DomainError::UnknownDriver(_)));
}

#[test]
fn test_alias_is_substituted_once() {
    let aliases: AliasTable = [("a", "b"), ("b", "udp://9.9.9.9")].into_iter().collect();
    assert_eq!(aliases.resolve("a"), "b");
    assert_eq!(aliases.resolve("udp://1.1.1.1"), "udp://1.1.1.1");
}
