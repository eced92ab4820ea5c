use domain::{ParameterError, ParameterSpec, ParameterStore, ParameterType, ParameterValue, default_parameter_specs};

#[test]
fn default_store_matches_builtin_table() {
    let store = ParameterStore::from_specs(&default_parameter_specs()).expect("store");
    let names: Vec<&str> = store.iter().map(|param| param.name()).collect();
    assert_eq!(names, vec!["A", "B", "C", "D"]);

    let c = store.get("C").expect("C");
    assert_eq!(c.peek(), &ParameterValue::Analog(10.0));
    assert_eq!(c.rand_sum(), 0.5);
    assert_eq!(c.rand_mul(), 0.2);

    let d = store.get("D").expect("D");
    assert_eq!(d.kind(), ParameterType::String);
    assert_eq!(d.peek(), &ParameterValue::String("mystring".to_string()));
}

#[test]
fn duplicate_names_are_rejected() {
    let specs = vec![
        ParameterSpec::new("X", ParameterType::Analog),
        ParameterSpec::new("X", ParameterType::Binary),
    ];
    assert!(matches!(
        ParameterStore::from_specs(&specs),
        Err(ParameterError::InvalidParameter(_))
    ));
}

#[test]
fn one_bad_spec_fails_the_store() {
    let specs = vec![
        ParameterSpec::new("ok", ParameterType::Analog),
        ParameterSpec::new("bad", ParameterType::Integer).with_initial("x"),
    ];
    assert!(ParameterStore::from_specs(&specs).is_err());
}

#[test]
fn lookup_and_mutation() {
    let mut store = ParameterStore::from_specs(&default_parameter_specs()).expect("store");
    assert!(store.contains("A"));
    assert!(!store.contains("ZZZ"));
    assert_eq!(store.len(), 4);

    store.get_mut("A").expect("A").write("1").expect("write");
    assert_eq!(store.get("A").expect("A").peek(), &ParameterValue::Binary(true));
}
