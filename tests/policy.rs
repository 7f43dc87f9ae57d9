//! Loading, validating and evaluating policy documents.

use std::sync::Arc;

use cilguard::prelude::*;

fn sample_path() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/samples/plugin_policy.json")
}

#[test]
fn sample_policy_loads() {
    let policy = Policy::from_file(sample_path()).unwrap();
    assert_eq!(policy.rule_count(), 21);

    let required = policy.required_attributes(MethodRole::Constructor).unwrap();
    assert!(required.flags.contains(&MethodAttribute::RtSpecialName));
    assert!(policy.required_attributes(MethodRole::Method).is_none());
}

#[test]
fn sample_policy_round_trips_through_serde() {
    let text = std::fs::read_to_string(sample_path()).unwrap();
    let config: PolicyConfig = serde_json::from_str(&text).unwrap();
    let again: PolicyConfig = serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
    assert_eq!(config, again);
    assert_eq!(
        Policy::from_config(again).unwrap().rule_count(),
        Policy::from_json(&text).unwrap().rule_count()
    );
}

#[test]
fn ambiguous_policies_are_rejected_at_load_time() {
    let conflicting = r#"{
        "methods": [
            { "declaring_type": "System.IO.File", "name": "Delete" },
            { "declaring_type": "System.IO.File", "name": "Delete", "reason": "illegal_name" }
        ]
    }"#;
    match Policy::from_json(conflicting) {
        Err(Error::Configuration(message)) => {
            assert!(message.contains("System.IO.File.Delete"), "{}", message);
        }
        other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
    }

    let duplicate = r#"{
        "methods": [
            { "declaring_type": "System.IO.File", "name": "Delete" },
            { "declaring_type": "System.IO.File", "name": "Delete", "reason": "restricted" }
        ]
    }"#;
    assert_eq!(Policy::from_json(duplicate).unwrap().rule_count(), 1);
}

#[test]
fn malformed_documents_are_rejected() {
    assert!(matches!(Policy::from_json(r#"{ "types": 5 }"#), Err(Error::Json(_))));
    assert!(matches!(
        Policy::from_json(r#"{ "typos": [] }"#),
        Err(Error::Json(_))
    ));
    assert!(matches!(
        Policy::from_json(r#"{ "assemblies": [ { "name": "" } ] }"#),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        Policy::from_json(
            r#"{ "required_attributes": [ { "applies_to": "method", "flags": [ "Public", "Sealed" ] } ] }"#
        ),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(
        Policy::from_json(r#"{ "names": [ {} ] }"#),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn sample_policy_verifies_plugins() {
    let verifier = Verifier::new(Arc::new(Policy::from_file(sample_path()).unwrap()));

    let mut module = ModuleBuilder::new(AssemblyIdentity::simple("Plugin"));
    TypeDefBuilder::new()
        .namespace("Plugin")
        .name("Proxy")
        .extends(
            TypeReference::new("System", "MarshalByRefObject")
                .with_scope(AssemblyIdentity::simple("mscorlib")),
        )
        .build(&mut module)
        .unwrap();
    let violation = verifier.check(&module.build()).violation().cloned().unwrap();
    assert_eq!(
        violation.illegal_instruction.to_string(),
        "[TYPE] Plugin.Proxy on System.MarshalByRefObject"
    );

    let mut module = ModuleBuilder::new(AssemblyIdentity::simple("Plugin"));
    TypeDefBuilder::new().namespace("Plugin").name("Main").build(&mut module).unwrap();
    MethodDefBuilder::new()
        .name(".ctor")
        .modifiers(MethodModifiers::HIDE_BY_SIG)
        .code([0x2A])
        .build(&mut module)
        .unwrap();
    let violation = verifier.check(&module.build()).violation().cloned().unwrap();
    assert_eq!(
        violation.illegal_instruction.to_string(),
        "[METHOD_ATTRIBUTE] [SpecialName, RTSpecialName]"
    );
    assert_eq!(violation.position.to_string(), "[CONSTRUCTOR] Plugin.Main..ctor");
}
