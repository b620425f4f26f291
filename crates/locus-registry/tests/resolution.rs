//! End-to-end resolution scenarios against the full resolver set.

use std::sync::Arc;

use serde_json::json;

use locus_location::{ConfigBag, Location, LocationProperties, MachineLocation};
use locus_pool::{FixedListProvisioningLocation, MachineProvisioner, ObtainFlags};
use locus_registry::{CloudResolver, LocationRegistry, Resolved, ResolveError};

fn registry_with(toml: &str) -> Arc<LocationRegistry> {
    LocationRegistry::new(LocationProperties::from_toml_str(toml).unwrap())
}

#[test]
fn byon_spec_builds_a_named_pool() {
    let registry = LocationRegistry::empty();
    let resolved = registry
        .resolve("byon:(hosts=\"10.0.0.1,10.0.0.2\",name=mypool)")
        .unwrap();

    assert_eq!(resolved.location().display_name(), "mypool");
    let pool = resolved
        .location()
        .as_any()
        .downcast_ref::<FixedListProvisioningLocation>()
        .unwrap();
    assert_eq!(pool.all_machines().len(), 2);
    assert_eq!(pool.in_use_count(), 0);

    let provisioner = resolved.provisioner().unwrap();
    let machine = provisioner.obtain(&ObtainFlags::any()).unwrap();
    assert_eq!(machine.address(), "10.0.0.1");
    assert_eq!(pool.in_use_count(), 1);
}

#[test]
fn byon_without_hosts_is_malformed() {
    let registry = LocationRegistry::empty();
    let err = registry.resolve("byon:(name=x)").unwrap_err();
    assert!(matches!(err, ResolveError::Malformed { .. }));
}

#[test]
fn localhost_resolves_to_an_extensible_pool() {
    let registry = LocationRegistry::empty();
    let resolved = registry.resolve("localhost").unwrap();
    let provisioner = resolved.provisioner().unwrap();

    let a = provisioner.obtain(&ObtainFlags::any()).unwrap();
    let b = provisioner.obtain(&ObtainFlags::any()).unwrap();
    assert_eq!(a.address(), "localhost");
    assert_ne!(a.id(), b.id());
}

#[test]
fn host_spec_wraps_one_machine() {
    let registry = LocationRegistry::empty();
    let resolved = registry.resolve("host:(\"admin@10.1.2.3\")").unwrap();

    let provisioner = resolved.provisioner().unwrap();
    let machine = provisioner.obtain(&ObtainFlags::any()).unwrap();
    assert_eq!(machine.address(), "10.1.2.3");
    assert_eq!(machine.user().as_deref(), Some("admin"));

    // the pool holds exactly one machine
    let err = provisioner.obtain(&ObtainFlags::any()).unwrap_err();
    assert!(err.to_string().contains("no machines available"));
}

#[test]
fn host_rejects_multiple_addresses() {
    let registry = LocationRegistry::empty();
    let err = registry.resolve("host:(\"web{1,2}\")").unwrap_err();
    assert!(matches!(err, ResolveError::Malformed { .. }));
}

#[test]
fn named_spec_resolves_through_the_definition() {
    let registry = registry_with(
        r#"
        [location.named]
        prod = "byon:(hosts=\"10.0.0.1\",name=prod-pool)"
        "#,
    );

    let resolved = registry.resolve("named:prod").unwrap();
    assert_eq!(resolved.location().display_name(), "prod-pool");
    assert!(resolved.provisioner().is_some());
}

#[test]
fn bare_name_falls_back_to_named_resolution() {
    let registry = registry_with(
        r#"
        [location.named]
        prod = "byon:(hosts=\"10.0.0.1\")"
        "#,
    );
    assert!(registry.resolve("prod").is_ok());
    assert!(matches!(
        registry.resolve("absent").unwrap_err(),
        ResolveError::ResolverNotFound { .. }
    ));
}

#[test]
fn property_layers_merge_in_ascending_precedence() {
    let registry = registry_with(
        r#"
        [location]
        user = "generic-user"

        [location.byon]
        user = "byon-user"

        [location.named]
        prod = "byon:(hosts=\"10.0.0.1\")"
        "prod.user" = "prod-user"
        "#,
    );

    // named overrides beat provider scope and generic
    let resolved = registry.resolve("named:prod").unwrap();
    let machine = resolved
        .provisioner()
        .unwrap()
        .obtain(&ObtainFlags::any())
        .unwrap();
    assert_eq!(machine.user().as_deref(), Some("prod-user"));

    // caller flags beat everything
    let mut flags = ConfigBag::new();
    flags.insert("user", json!("cli-user"));
    let resolved = registry.resolve_with_flags("named:prod", flags).unwrap();
    let machine = resolved
        .provisioner()
        .unwrap()
        .obtain(&ObtainFlags::any())
        .unwrap();
    assert_eq!(machine.user().as_deref(), Some("cli-user"));
}

#[test]
fn provider_scope_applies_to_direct_specs() {
    let registry = registry_with(
        r#"
        [location.byon]
        user = "byon-user"
        "#,
    );
    let resolved = registry.resolve("byon:(hosts=\"10.0.0.1\")").unwrap();
    let machine = resolved
        .provisioner()
        .unwrap()
        .obtain(&ObtainFlags::any())
        .unwrap();
    assert_eq!(machine.user().as_deref(), Some("byon-user"));
}

#[test]
fn self_referential_named_spec_fails_then_unrelated_resolve_succeeds() {
    let registry = registry_with(
        r#"
        [location.named]
        a = "named:a"
        "#,
    );

    let err = registry.resolve("named:a").unwrap_err();
    match err {
        ResolveError::CircularReference { spec, chain } => {
            assert_eq!(spec, "named:a");
            assert_eq!(chain, ["named:a"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // the guard died with the failed call
    assert!(registry.resolve("localhost").is_ok());
}

#[test]
fn mutual_named_cycle_reports_the_chain() {
    let registry = registry_with(
        r#"
        [location.named]
        a = "named:b"
        b = "named:a"
        "#,
    );

    let err = registry.resolve("named:a").unwrap_err();
    match err {
        ResolveError::CircularReference { spec, chain } => {
            assert_eq!(spec, "named:a");
            assert_eq!(chain, ["named:a", "named:b"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn id_spec_resolves_a_registered_definition() {
    let registry = LocationRegistry::empty();
    let definition = locus_location::LocationDefinition::new(
        locus_types::DefinitionId::from("east-1"),
        Some("east".into()),
        "byon:(hosts=\"10.0.0.1\")",
        Default::default(),
    );
    registry.register_definition(definition);

    assert!(registry.resolve("id:east-1").is_ok());
    // bare fallback tries id first
    assert!(registry.resolve("east-1").is_ok());
}

#[test]
fn single_shares_one_machine_from_its_target() {
    let registry = registry_with(
        r#"
        [location.named]
        workers = "byon:(hosts=\"10.0.0.1,10.0.0.2\")"
        "#,
    );

    let resolved = registry.resolve("single:(target=workers)").unwrap();
    let provisioner = resolved.provisioner().unwrap();

    let a = provisioner.obtain(&ObtainFlags::any()).unwrap();
    let b = provisioner.obtain(&ObtainFlags::any()).unwrap();
    assert_eq!(a.id(), b.id());

    provisioner.release(&a).unwrap();
    provisioner.release(&b).unwrap();
}

#[test]
fn single_without_target_is_malformed() {
    let registry = LocationRegistry::empty();
    let err = registry.resolve("single:()").unwrap_err();
    assert!(matches!(err, ResolveError::Malformed { .. }));
}

#[test]
fn single_with_unresolvable_target_fails_at_first_obtain() {
    let registry = LocationRegistry::empty();
    let resolved = registry.resolve("single:(target=ghost)").unwrap();

    let err = resolved
        .provisioner()
        .unwrap()
        .obtain(&ObtainFlags::any())
        .unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn multi_exposes_zones_and_leases_from_the_first() {
    let registry = registry_with(
        r#"
        [location.named]
        east = "byon:(hosts=\"10.0.1.1\")"
        west = "byon:(hosts=\"10.0.2.1\")"
        "#,
    );

    let resolved = registry
        .resolve("multi:(targets=\"named:east,named:west\")")
        .unwrap();
    let multi = resolved
        .location()
        .as_any()
        .downcast_ref::<locus_pool::MultiLocation>()
        .unwrap();
    assert_eq!(multi.availability_zones().len(), 2);

    let machine = resolved
        .provisioner()
        .unwrap()
        .obtain(&ObtainFlags::any())
        .unwrap();
    assert_eq!(machine.address(), "10.0.1.1");
}

#[test]
fn catalog_item_resolves_like_a_definition() {
    let registry = LocationRegistry::empty();
    registry.register_catalog_item(
        "my-pool",
        locus_location::LocationDefinition::named("my-pool", "byon:(hosts=\"10.0.0.1\")"),
    );
    assert!(registry.resolve("catalog:my-pool").is_ok());
}

#[test]
fn default_cloud_is_the_last_fallback() {
    let mut props = LocationProperties::new();
    props.insert("location.defaultCloud", json!("acme"));
    let registry = LocationRegistry::new(props);

    registry.register_resolver(Arc::new(CloudResolver::new(
        "acme",
        Arc::new(|_spec, flags| {
            let pool = locus_pool::LocalhostProvisioningLocation::from_flags(flags)
                .map_err(|e| ResolveError::Malformed {
                    spec: "acme".into(),
                    reason: e.to_string(),
                })?;
            Ok(Resolved::pool(Arc::new(pool)))
        }),
    )));

    // bare spec, no id or name matches, lands on the default cloud
    let resolved = registry.resolve("anything-region-1").unwrap();
    assert!(resolved.provisioner().is_some());

    // a colon means a prefix was intended; the fallback chain (and the
    // default cloud with it) is off the table for "bogus:"
    let err = registry.resolve("bogus:").unwrap_err();
    assert!(matches!(err, ResolveError::ResolverNotFound { .. }));
}

#[test]
fn resolved_locations_are_managed_in_the_arena() {
    let registry = LocationRegistry::empty();
    let resolved = registry.resolve("localhost").unwrap();
    assert!(registry.manager().is_managed(resolved.location().id()));
}

#[test]
fn syntax_errors_surface_with_the_spec() {
    let registry = LocationRegistry::empty();
    let err = registry.resolve("byon:(hosts=a").unwrap_err();
    assert!(matches!(err, ResolveError::Spec(_)));
    assert!(err.to_string().contains("byon:(hosts=a"));
}
