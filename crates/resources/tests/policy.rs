use std::collections::BTreeMap;

use ipnet::IpNet;
use maplit::btreemap;
use serde_json::json;
use tsingress_resources::annotations as a;
use tsingress_resources::{AuthSatisfy, AuthType, Ingress, IngressPolicy};

fn ingress(annotations: BTreeMap<&str, &str>) -> Ingress {
    Ingress::parse(&json!({
        "kind": "Ingress",
        "metadata": { "name": "web", "namespace": "prod", "annotations": annotations },
    }))
    .unwrap()
}

#[test]
fn absent_annotations_inherit_defaults() {
    let ing = ingress(BTreeMap::new());
    assert_eq!(ing.cache_enable(), Ok(None));
    assert_eq!(ing.auth_type(), Ok(None));
    assert_eq!(ing.auth_satisfy(), Ok(None));
    assert_eq!(ing.whitelist_source_range(), Ok(None));
    assert_eq!(ing.hsts_max_age(), Ok(None));
    assert!(ing.cache_ignore_params().is_none());
    assert_eq!(IngressPolicy::from_ingress(&ing), Ok(IngressPolicy::default()));
}

#[test]
fn valid_annotations_are_interpreted() {
    let ing = ingress(btreemap! {
        a::CACHE_ENABLE => "true",
        a::CACHE_GENERATION => "1490000000",
        a::CACHE_IGNORE_PARAMS => "utm_* fbclid",
        a::AUTH_TYPE => "basic",
        a::AUTH_REALM => "staff only",
        a::AUTH_SECRET => "htpasswd",
        a::HSTS_MAX_AGE => "31536000",
        a::HSTS_INCLUDE_SUBDOMAINS => "false",
        a::SSL_REDIRECT => "false",
        a::REWRITE_TARGET => "/app",
    });

    assert_eq!(ing.cache_enable(), Ok(Some(true)));
    assert_eq!(ing.cache_generation(), Ok(Some(1_490_000_000)));
    assert_eq!(
        ing.cache_ignore_params().unwrap().as_slice(),
        ["utm_*".to_string(), "fbclid".to_string()]
    );
    assert_eq!(ing.auth_type(), Ok(Some(AuthType::Basic)));
    assert_eq!(ing.auth_satisfy(), Ok(Some(AuthSatisfy::All)));
    assert_eq!(ing.auth_realm(), Some("staff only"));
    assert_eq!(ing.auth_secret(), Some("htpasswd"));
    assert_eq!(ing.hsts_max_age(), Ok(Some(31_536_000)));
    assert_eq!(ing.hsts_include_subdomains(), Ok(Some(false)));
    assert_eq!(ing.ssl_redirect(), Ok(Some(false)));
    assert_eq!(ing.rewrite_target(), Some("/app"));
    assert_eq!(ing.app_root(), None);

    let policy = IngressPolicy::from_ingress(&ing).unwrap();
    assert_eq!(policy.cache_enable, Some(true));
    assert_eq!(policy.auth_type, Some(AuthType::Basic));
    assert_eq!(policy.auth_realm.as_deref(), Some("staff only"));
    assert_eq!(policy.force_ssl_redirect, None);
}

#[test]
fn invalid_values_are_errors_not_defaults() {
    let ing = ingress(btreemap! {
        a::CACHE_ENABLE => "bogus",
        a::AUTH_TYPE => "kerberos",
        a::HSTS_MAX_AGE => "-1",
    });

    let err = ing.cache_enable().unwrap_err();
    assert_eq!(err.annotation, a::CACHE_ENABLE);
    assert_eq!(err.value, "bogus");
    assert!(ing.auth_type().is_err());
    assert!(ing.hsts_max_age().is_err());
    // satisfy depends on auth-type, so it fails with it.
    assert!(ing.auth_satisfy().is_err());
    assert!(IngressPolicy::from_ingress(&ing).is_err());
}

#[test]
fn flags_are_case_sensitive() {
    let ing = ingress(btreemap! { a::PRESERVE_HOST => "True" });
    assert!(ing.preserve_host().is_err());
}

#[test]
fn scalar_values_are_not_trimmed() {
    let ing = ingress(btreemap! {
        a::PRESERVE_HOST => " true",
        a::CACHE_GENERATION => " 5",
        a::HSTS_MAX_AGE => "60 ",
        a::AUTH_TYPE => "basic ",
    });
    assert_eq!(ing.preserve_host().unwrap_err().value, " true");
    assert_eq!(ing.cache_generation().unwrap_err().value, " 5");
    assert_eq!(ing.hsts_max_age().unwrap_err().value, "60 ");
    assert!(ing.auth_type().is_err());
}

#[test]
fn explicit_satisfy_wins() {
    let ing = ingress(btreemap! {
        a::AUTH_TYPE => "digest",
        a::AUTH_SATISFY => "any",
    });
    assert_eq!(ing.auth_satisfy(), Ok(Some(AuthSatisfy::Any)));

    let ing = ingress(btreemap! { a::AUTH_SATISFY => "some" });
    assert!(ing.auth_satisfy().is_err());
}

#[test]
fn whitelist_accepts_networks_and_addresses() {
    let ing = ingress(btreemap! {
        a::WHITELIST_SOURCE_RANGE => "10.0.0.0/8, 192.168.1.7,2001:db8::/32",
    });
    let nets = ing.whitelist_source_range().unwrap().unwrap();
    let expected: Vec<IpNet> = ["10.0.0.0/8", "192.168.1.7/32", "2001:db8::/32"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    assert_eq!(nets, expected);
    assert_eq!(ing.auth_satisfy(), Ok(Some(AuthSatisfy::All)));

    let ing = ingress(btreemap! { a::WHITELIST_SOURCE_RANGE => "10.0.0.0/8,not-a-net" });
    let err = ing.whitelist_source_range().unwrap_err();
    assert_eq!(err.annotation, a::WHITELIST_SOURCE_RANGE);
}

#[test]
fn ingress_class_selects_controller() {
    let unclassed = ingress(BTreeMap::new());
    assert!(unclassed.is_handled_by(a::CLASS_TRAFFICSERVER));

    let ours = ingress(btreemap! { a::INGRESS_CLASS => "trafficserver" });
    assert_eq!(ours.ingress_class(), Some("trafficserver"));
    assert!(ours.is_handled_by(a::CLASS_TRAFFICSERVER));

    let theirs = ingress(btreemap! { a::INGRESS_CLASS => "nginx" });
    assert!(!theirs.is_handled_by(a::CLASS_TRAFFICSERVER));
}

#[test]
fn policy_serializes_camel_case() {
    let ing = ingress(btreemap! { a::AUTH_TYPE => "basic", a::CACHE_ENABLE => "false" });
    let v = serde_json::to_value(IngressPolicy::from_ingress(&ing).unwrap()).unwrap();
    assert_eq!(v["authType"], "basic");
    assert_eq!(v["authSatisfy"], "all");
    assert_eq!(v["cacheEnable"], false);
    assert!(v["hstsMaxAge"].is_null());
}
