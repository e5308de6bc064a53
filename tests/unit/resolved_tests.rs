use streamscout::{
    AccessType, AvailabilityOption, LookupKey, LookupResult, Provenance, Resolved,
};

#[test]
fn test_resolved_serializes_as_cli_json_line() {
    let key = LookupKey::new(603, " US ").unwrap();
    let options = LookupResult::new(vec![AvailabilityOption::new(
        "Netflix",
        AccessType::Subscription,
    )
    .with_link("https://netflix.com/title/603")]);

    let resolved = Resolved::new(&key, options, Provenance::Api);
    let json: serde_json::Value = serde_json::to_value(&resolved).unwrap();

    assert_eq!(json["subject_id"], 603);
    assert_eq!(json["region"], "us");
    assert_eq!(json["provenance"], "api");
    assert_eq!(json["options"][0]["provider"], "Netflix");
    assert_eq!(json["options"][0]["access_type"], "subscription");
}

#[test]
fn test_lookup_key_rejects_bad_regions() {
    tokio_test::assert_err!(LookupKey::new(1, ""));
    tokio_test::assert_err!(LookupKey::new(1, "usa1"));
    tokio_test::assert_err!(LookupKey::new(1, "ü"));
    let key = tokio_test::assert_ok!(LookupKey::new(1, "PL"));
    assert_eq!(key.region(), "pl");
}
