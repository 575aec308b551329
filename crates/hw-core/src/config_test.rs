use super::*;

#[test]
fn test_parse_empty_config_uses_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert_eq!(config.database.db_type, DbType::DuckDb);
    assert_eq!(config.database.path, "warehouse.duckdb");
    assert_eq!(config.unknown_cause_id, -1);
    assert_eq!(config.staging.prefix, "stg_");
    assert_eq!(config.staging.max_attempts, 5);
    assert!(config.schema.is_none());
    assert!(config.collapse.is_empty());
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
database:
  type: duckdb
  path: ":memory:"
schema: warehouse
unknown_cause_id: 9999
staging:
  prefix: tmp_upsert_
  max_attempts: 3
collapse:
  - level: 3
    code: national_id
    map:
      "11001": "11000"
      "11002": "11000"
unique_keys:
  fact_weekly_deaths: [country_fk, calendar_week_fk]
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.database.path, ":memory:");
    assert_eq!(config.schema.as_deref(), Some("warehouse"));
    assert_eq!(config.unknown_cause_id, 9999);
    assert_eq!(config.staging.prefix, "tmp_upsert_");

    let map = config
        .collapse_map(SubdivisionLevel::Three, SubdivisionCode::NationalId)
        .unwrap();
    assert_eq!(map.get("11002").map(String::as_str), Some("11000"));
    assert!(config
        .collapse_map(SubdivisionLevel::Three, SubdivisionCode::Nuts)
        .is_none());

    assert_eq!(
        config.unique_key_columns("warehouse.fact_weekly_deaths"),
        Some(&["country_fk".to_string(), "calendar_week_fk".to_string()][..])
    );
    assert!(config.unique_key_columns("fact_cases").is_none());
}

#[test]
fn test_rejects_unknown_fields() {
    assert!(Config::from_yaml("staging_prefix: x").is_err());
}

#[test]
fn test_rejects_bad_subdivision_level() {
    let yaml = r#"
collapse:
  - level: 4
    code: nuts
    map: {}
"#;
    assert!(matches!(
        Config::from_yaml(yaml),
        Err(CoreError::YamlParse(_))
    ));
}

#[test]
fn test_rejects_bad_staging_prefix() {
    let err = Config::from_yaml("staging: { prefix: \"Stg-\" }").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_rejects_zero_attempts() {
    let err = Config::from_yaml("staging: { max_attempts: 0 }").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_rejects_duplicate_collapse_rule() {
    let yaml = r#"
collapse:
  - { level: 2, code: nuts, map: {} }
  - { level: 2, code: nuts, map: {} }
"#;
    let err = Config::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("duplicate collapse rule"));
}

#[test]
fn test_rejects_empty_unique_key_list() {
    let err = Config::from_yaml("unique_keys: { fact_cases: [] }").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join("warehouse.yml")).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_load_from_dir_prefers_yml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("warehouse.yml"), "unknown_cause_id: 1").unwrap();
    std::fs::write(dir.path().join("warehouse.yaml"), "unknown_cause_id: 2").unwrap();

    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.unknown_cause_id, 1);
}

#[test]
fn test_load_from_dir_falls_back_to_yaml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("warehouse.yaml"), "schema: facts").unwrap();

    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.schema.as_deref(), Some("facts"));
}

#[test]
fn test_load_from_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Config::load_from_dir(dir.path()),
        Err(CoreError::ConfigNotFound { .. })
    ));
}
