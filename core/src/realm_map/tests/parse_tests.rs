//! Unit tests for realm map entry parsing

use ag_shared::config::EngineSettings;

use crate::realm_map::{parse_map_entries, parse_map_line, RealmMapProvider, StaticRealmMapProvider};

#[test]
fn parses_full_entry() {
    let spec = parse_map_line("test.com$$ldap$$Servers=ldap1,ldap2;BindFormat=Email$$")
        .unwrap()
        .unwrap();
    assert_eq!(spec.realm, "test.com");
    assert_eq!(spec.extension_type, "ldap");
    assert_eq!(spec.args.get("servers"), Some("ldap1,ldap2"));
    assert_eq!(spec.query, None);
}

#[test]
fn parses_entry_with_query() {
    let spec = parse_map_line(
        "db.example.com$$sql$$Server=dbhost$$SELECT Auth($(realm), $(account), $(password))",
    )
    .unwrap()
    .unwrap();
    assert_eq!(
        spec.query.as_deref(),
        Some("SELECT Auth($(realm), $(account), $(password))")
    );
}

#[test]
fn skips_comments_and_blanks() {
    assert!(parse_map_line("").unwrap().is_none());
    assert!(parse_map_line("   ").unwrap().is_none());
    assert!(parse_map_line("// test.com$$config$$").unwrap().is_none());
}

#[test]
fn rejects_malformed_entries() {
    assert!(parse_map_line("lonefield").is_err());
    assert!(parse_map_line("$$config$$x=1").is_err());
    assert!(parse_map_line("realm$$$$x=1").is_err());
    assert!(parse_map_line("a$$b$$c$$d$$e").is_err());
}

#[test]
fn expands_env_macros_in_args() {
    std::env::set_var("AUTHGRID_TEST_SERVER", "radius.example.com");
    let spec = parse_map_line("test.com$$radius$$Servers=$(AUTHGRID_TEST_SERVER);Secret=s3cr3t")
        .unwrap()
        .unwrap();
    assert_eq!(spec.args.get("Servers"), Some("radius.example.com"));
}

#[test]
fn duplicate_realms_are_rejected() {
    let err = parse_map_entries(vec![
        "test.com$$config$$$$test.com;jeff;foobar",
        "other.com$$memory",
        "TEST.COM$$memory",
    ])
    .unwrap_err();
    assert!(err.to_string().contains("duplicate realm"));
}

#[tokio::test]
async fn static_provider_round_trips_and_reloads() {
    let provider = StaticRealmMapProvider::from_lines(&[
        "test.com$$config$$$$test.com;jeff;foobar",
        "// decommissioned",
        "x.com$$memory",
    ]);
    provider.open(&EngineSettings::default()).await.unwrap();

    let map = provider.get_map().await.unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[0].realm, "test.com");
    assert_eq!(map[1].extension_type, "memory");

    provider
        .set_entries(vec!["y.com$$memory".to_string()])
        .await;
    let map = provider.get_map().await.unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map[0].realm, "y.com");

    provider.close().await;
}

#[tokio::test]
async fn static_provider_open_rejects_bad_entries() {
    let provider = StaticRealmMapProvider::from_lines(&["garbage-without-separator"]);
    assert!(provider.open(&EngineSettings::default()).await.is_err());
}
