#![forbid(unsafe_code)]

use serde_json::json;
use tsingress_core::Kind;
use tsingress_resources::{
    parse, parse_value, EndpointAddress, Endpoints, Ingress, IngressBackend, ParseError, Protocol, Resource, Secret,
    Service, TargetPort,
};

fn ingress_doc() -> serde_json::Value {
    json!({
        "apiVersion": "extensions/v1beta1",
        "kind": "Ingress",
        "metadata": {
            "name": "web",
            "namespace": "prod",
            "resourceVersion": "1234",
            "creationTimestamp": "2017-03-01T12:00:00Z",
            "annotations": {
                "ingress.torchbox.com/cache-enable": "true",
                "example.com/unrelated": "kept",
            },
        },
        "spec": {
            "tls": [
                { "secretName": "web-tls", "hosts": ["www.example.com", "example.com"] },
            ],
            "rules": [
                {
                    "host": "www.example.com",
                    "http": { "paths": [
                        { "path": "/", "backend": { "serviceName": "web", "servicePort": 80 } },
                        { "path": "/static", "backend": { "serviceName": "static", "servicePort": "http" } },
                    ]},
                },
                { "host": "empty.example.com" },
            ],
        },
    })
}

#[test]
fn ingress_parses_rules_tls_and_annotations() {
    let ing = Ingress::parse(&ingress_doc()).unwrap();
    assert_eq!(ing.name(), "web");
    assert_eq!(ing.namespace(), "prod");
    assert_eq!(ing.meta.resource_version, "1234");
    assert_eq!(ing.meta.creation_ts, 1_488_369_600);

    assert_eq!(ing.tls.len(), 1);
    assert_eq!(ing.tls[0].secret_name, "web-tls");
    assert_eq!(&*ing.tls[0].hosts, ["www.example.com", "example.com"]);
    assert!(ing.tls_for_host("example.com").is_some());
    assert!(ing.tls_for_host("other.example.com").is_none());

    assert_eq!(ing.rules.len(), 2);
    let paths = &ing.rules[0].paths;
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[0].path, "/");
    assert_eq!(paths[0].backend, IngressBackend::service("web", "80"));
    assert_eq!(paths[1].backend.as_service(), Some(("static", "http")));
    assert!(ing.rules[1].paths.is_empty());

    assert_eq!(ing.meta.annotations.len(), 2);
    assert_eq!(ing.annotation("example.com/unrelated"), Some("kept"));
    assert!(ing.default_backend.is_none());
}

#[test]
fn ingress_accepts_networking_v1_backends() {
    let doc = json!({
        "kind": "Ingress",
        "metadata": { "name": "v1", "namespace": "prod" },
        "spec": {
            "defaultBackend": { "service": { "name": "fallback", "port": { "name": "http" } } },
            "rules": [{ "http": { "paths": [
                { "path": "/", "pathType": "Prefix",
                  "backend": { "service": { "name": "web", "port": { "number": 8080 } } } },
            ]}}],
        },
    });
    let ing = Ingress::parse(&doc).unwrap();
    assert_eq!(ing.rules[0].host, "");
    assert_eq!(ing.rules[0].paths[0].backend.as_service(), Some(("web", "8080")));
    let fallback = ing.default_backend.unwrap();
    assert_eq!(fallback, IngressBackend::service("fallback", "http"));
}

#[test]
fn resource_backends_keep_the_rest_of_the_ingress() {
    let doc = json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": { "name": "mixed", "namespace": "prod" },
        "spec": {
            "tls": [{ "secretName": "web-tls", "hosts": ["www.example.com"] }],
            "defaultBackend": { "resource": { "kind": "StorageBucket", "name": "static-assets" } },
            "rules": [{ "host": "www.example.com", "http": { "paths": [
                { "path": "/", "pathType": "Prefix",
                  "backend": { "service": { "name": "web", "port": { "number": 80 } } } },
                { "path": "/icons", "pathType": "ImplementationSpecific",
                  "backend": { "resource": {
                      "apiGroup": "k8s.example.com", "kind": "StorageBucket", "name": "icon-assets",
                  } } },
            ]}}],
        },
    });
    let ing = Ingress::parse(&doc).unwrap();
    assert_eq!(ing.tls[0].secret_name, "web-tls");

    let paths = &ing.rules[0].paths;
    assert_eq!(paths[0].backend, IngressBackend::service("web", "80"));
    assert_eq!(
        paths[1].backend,
        IngressBackend::Resource {
            api_group: "k8s.example.com".into(),
            kind: "StorageBucket".into(),
            name: "icon-assets".into(),
        }
    );
    assert_eq!(paths[1].backend.as_service(), None);
    assert_eq!(paths[1].backend.to_string(), "StorageBucket.k8s.example.com/icon-assets");

    let fallback = ing.default_backend.as_ref().unwrap();
    assert_eq!(fallback.to_string(), "StorageBucket/static-assets");

    let view = serde_json::to_value(&paths[1].backend).unwrap();
    assert_eq!(view["type"], "resource");
    assert_eq!(view["apiGroup"], "k8s.example.com");

    let broken = json!({
        "metadata": { "name": "broken", "namespace": "prod" },
        "spec": { "defaultBackend": { "resource": { "name": "no-kind" } } },
    });
    assert!(matches!(
        Ingress::parse(&broken),
        Err(ParseError::MissingField("backend.resource.kind"))
    ));
}

#[test]
fn missing_identity_rejects_the_document() {
    let mut doc = ingress_doc();
    doc["metadata"].as_object_mut().unwrap().remove("namespace");
    assert!(matches!(
        Ingress::parse(&doc),
        Err(ParseError::MissingField("metadata.namespace"))
    ));

    let doc = json!({ "kind": "Service", "spec": {} });
    assert!(matches!(Service::parse(&doc), Err(ParseError::MissingField("metadata"))));
}

#[test]
fn optional_fields_take_unset_values() {
    let ing = Ingress::parse(&json!({ "metadata": { "name": "bare", "namespace": "ns" } })).unwrap();
    assert!(ing.tls.is_empty());
    assert!(ing.rules.is_empty());
    assert!(ing.meta.annotations.is_empty());
    assert!(ing.meta.labels.is_empty());
    assert_eq!(ing.meta.resource_version, "");
    assert_eq!(ing.meta.creation_ts, 0);
}

fn service_doc(protocol: &str) -> serde_json::Value {
    json!({
        "kind": "Service",
        "metadata": { "name": "web", "namespace": "prod", "labels": { "app": "web" } },
        "spec": {
            "type": "ClusterIP",
            "clusterIP": "10.0.0.10",
            "sessionAffinity": "ClientIP",
            "selector": { "app": "web", "tier": "frontend" },
            "ports": [
                { "name": "http", "port": 80, "targetPort": 8080, "protocol": protocol },
                { "name": "metrics", "port": 9100, "targetPort": "metrics" },
            ],
        },
    })
}

#[test]
fn service_parses_ports_and_selector() {
    let svc = Service::parse(&service_doc("TCP")).unwrap();
    assert_eq!(svc.service_type, "ClusterIP");
    assert_eq!(svc.cluster_ip, "10.0.0.10");
    assert_eq!(svc.session_affinity, "ClientIP");
    assert_eq!(svc.external_name, None);
    assert!(!svc.is_external_name());
    assert_eq!(svc.selector.get("tier").map(String::as_str), Some("frontend"));
    assert_eq!(svc.meta.labels.get("app").map(String::as_str), Some("web"));

    let http = svc.find_port("http", Protocol::Tcp).unwrap();
    assert_eq!(http.port, 80);
    assert_eq!(http.target_port, TargetPort::Number(8080));
    assert!(svc.find_port("http", Protocol::Udp).is_none());

    let metrics = svc.port_for_backend("9100").unwrap();
    assert_eq!(metrics.name, "metrics");
    assert_eq!(metrics.target_port, TargetPort::Name("metrics".into()));
    assert_eq!(metrics.protocol, Protocol::Tcp);
    assert!(svc.port_for_backend("443").is_none());
}

#[test]
fn service_protocols_are_a_closed_set() {
    assert!(Service::parse(&service_doc("UDP")).is_ok());
    match Service::parse(&service_doc("SCTP")) {
        Err(ParseError::UnknownProtocol(p)) => assert_eq!(p, "SCTP"),
        other => panic!("expected UnknownProtocol, got {other:?}"),
    }
}

#[test]
fn external_name_service() {
    let svc = Service::parse(&json!({
        "metadata": { "name": "ext", "namespace": "prod" },
        "spec": { "type": "ExternalName", "externalName": "db.example.com" },
    }))
    .unwrap();
    assert!(svc.is_external_name());
    assert_eq!(svc.external_name.as_deref(), Some("db.example.com"));
    assert!(svc.ports.is_empty());
    assert_eq!(svc.session_affinity, "None");
}

#[test]
fn endpoints_parse_subsets() {
    let ep = Endpoints::parse(&json!({
        "kind": "Endpoints",
        "metadata": { "name": "web", "namespace": "prod" },
        "subsets": [
            {
                "addresses": [
                    { "ip": "10.1.0.4", "nodeName": "node-a" },
                    { "ip": "10.1.0.5" },
                ],
                "notReadyAddresses": [{ "ip": "10.1.0.6" }],
                "ports": [{ "name": "http", "port": 8080, "protocol": "TCP" }],
            },
            {
                "addresses": [{ "ip": "10.1.1.9" }],
                "ports": [{ "name": "metrics", "port": 9100 }],
            },
        ],
    }))
    .unwrap();

    assert_eq!(ep.subsets.len(), 2);
    assert_eq!(
        ep.subsets[0].addresses[0],
        EndpointAddress { ip: "10.1.0.4".into(), node_name: Some("node-a".into()) }
    );
    assert_eq!(ep.subsets[0].addresses[1].node_name, None);
    assert_eq!(ep.subsets[0].not_ready_addresses.len(), 1);

    let ready: Vec<(&str, u16)> = ep.ready_addresses("http").map(|(a, p)| (a.ip.as_str(), p)).collect();
    assert_eq!(ready, [("10.1.0.4", 8080), ("10.1.0.5", 8080)]);
}

#[test]
fn duplicate_port_names_are_rejected() {
    let err = Service::parse(&json!({
        "metadata": { "name": "web", "namespace": "prod" },
        "spec": { "ports": [{ "port": 80 }, { "port": 443 }] },
    }))
    .unwrap_err();
    assert!(matches!(err, ParseError::InvalidField { field: "spec.ports[].name", .. }));

    let err = Endpoints::parse(&json!({
        "metadata": { "name": "web", "namespace": "prod" },
        "subsets": [{ "ports": [
            { "name": "http", "port": 8080 },
            { "name": "http", "port": 8081, "protocol": "UDP" },
        ]}],
    }))
    .unwrap_err();
    assert!(matches!(err, ParseError::InvalidField { field: "subsets[].ports[].name", .. }));

    let single = Service::parse(&json!({
        "metadata": { "name": "web", "namespace": "prod" },
        "spec": { "ports": [{ "port": 80 }] },
    }))
    .unwrap();
    assert_eq!(single.port_for_backend("80").map(|p| p.name.as_str()), Some(""));
}

#[test]
fn endpoint_address_requires_ip() {
    let err = Endpoints::parse(&json!({
        "metadata": { "name": "web", "namespace": "prod" },
        "subsets": [{ "addresses": [{ "nodeName": "node-a" }] }],
    }))
    .unwrap_err();
    assert!(matches!(err, ParseError::MissingField("subsets[].addresses[].ip")));
}

#[test]
fn secret_data_is_base64_decoded() {
    let secret = Secret::parse(&json!({
        "kind": "Secret",
        "type": "Opaque",
        "metadata": { "name": "creds", "namespace": "prod" },
        "data": { "user": "YWRtaW4=", "empty": "" },
    }))
    .unwrap();
    assert_eq!(secret.secret_type, "Opaque");
    assert_eq!(secret.data.get("user").map(Vec::as_slice), Some(&b"admin"[..]));
    assert_eq!(secret.data.get("empty").map(Vec::len), Some(0));

    let err = Secret::parse(&json!({
        "metadata": { "name": "creds", "namespace": "prod" },
        "data": { "user": "not base64!" },
    }))
    .unwrap_err();
    assert!(matches!(err, ParseError::Base64 { ref key, .. } if key == "user"));
}

#[test]
fn parse_dispatches_on_kind_and_checks_it() {
    let res = parse(Kind::Service, &service_doc("TCP").to_string()).unwrap();
    assert_eq!(res.kind(), Kind::Service);
    assert_eq!(res.key().to_string(), "Service prod/web");
    assert!(matches!(res, Resource::Service(_)));

    match parse_value(Kind::Ingress, &service_doc("TCP")) {
        Err(ParseError::KindMismatch { expected, found }) => {
            assert_eq!(expected, Kind::Ingress);
            assert_eq!(found, "Service");
        }
        other => panic!("expected KindMismatch, got {other:?}"),
    }

    assert!(matches!(parse(Kind::Secret, "{ not json"), Err(ParseError::Json(_))));
    assert!(matches!(parse(Kind::Secret, "[]"), Err(ParseError::NotAnObject("document"))));
}

#[test]
fn resources_serialize_with_kind_tag() {
    let res = parse_value(Kind::Secret, &json!({
        "kind": "Secret",
        "type": "kubernetes.io/tls",
        "metadata": { "name": "web-tls", "namespace": "prod" },
        "data": { "tls.crt": "" },
    }))
    .unwrap();
    let v = serde_json::to_value(&res).unwrap();
    assert_eq!(v["kind"], "Secret");
    assert_eq!(v["secretType"], "kubernetes.io/tls");
    assert_eq!(v["data"], json!(["tls.crt"]));
}
