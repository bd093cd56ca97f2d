//! Annotation keys understood by the controller.
//!
//! `ingress.kubernetes.io/` carries the annotations shared with other ingress
//! controllers; `ingress.torchbox.com/` carries the Traffic Server specific ones.

pub const PREFIX_KUBERNETES: &str = "kubernetes.io/";
pub const PREFIX_INGRESS: &str = "ingress.kubernetes.io/";
pub const PREFIX_TORCHBOX: &str = "ingress.torchbox.com/";

pub const SECURE_BACKENDS: &str = "ingress.kubernetes.io/secure-backends";
pub const SSL_REDIRECT: &str = "ingress.kubernetes.io/ssl-redirect";
pub const FORCE_SSL_REDIRECT: &str = "ingress.kubernetes.io/force-ssl-redirect";
pub const APP_ROOT: &str = "ingress.kubernetes.io/app-root";
pub const REWRITE_TARGET: &str = "ingress.kubernetes.io/rewrite-target";
pub const AUTH_TYPE: &str = "ingress.kubernetes.io/auth-type";
pub const AUTH_REALM: &str = "ingress.kubernetes.io/auth-realm";
pub const AUTH_SECRET: &str = "ingress.kubernetes.io/auth-secret";
pub const WHITELIST_SOURCE_RANGE: &str = "ingress.kubernetes.io/whitelist-source-range";

pub const INGRESS_CLASS: &str = "kubernetes.io/ingress.class";
pub const CLASS_TRAFFICSERVER: &str = "trafficserver";

pub const HSTS_INCLUDE_SUBDOMAINS: &str = "ingress.torchbox.com/hsts-include-subdomains";
pub const HSTS_MAX_AGE: &str = "ingress.torchbox.com/hsts-max-age";
pub const CACHE_ENABLE: &str = "ingress.torchbox.com/cache-enable";
pub const CACHE_GENERATION: &str = "ingress.torchbox.com/cache-generation";
pub const CACHE_IGNORE_PARAMS: &str = "ingress.torchbox.com/cache-ignore-params";
pub const CACHE_WHITELIST_PARAMS: &str = "ingress.torchbox.com/cache-whitelist-params";
pub const PRESERVE_HOST: &str = "ingress.torchbox.com/preserve-host";
pub const FOLLOW_REDIRECTS: &str = "ingress.torchbox.com/follow-redirects";
pub const AUTH_SATISFY: &str = "ingress.torchbox.com/auth-satisfy";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_carry_their_prefix() {
        for key in [
            SECURE_BACKENDS,
            SSL_REDIRECT,
            FORCE_SSL_REDIRECT,
            APP_ROOT,
            REWRITE_TARGET,
            AUTH_TYPE,
            AUTH_REALM,
            AUTH_SECRET,
            WHITELIST_SOURCE_RANGE,
        ] {
            assert!(key.starts_with(PREFIX_INGRESS), "{key}");
        }
        for key in [
            HSTS_INCLUDE_SUBDOMAINS,
            HSTS_MAX_AGE,
            CACHE_ENABLE,
            CACHE_GENERATION,
            CACHE_IGNORE_PARAMS,
            CACHE_WHITELIST_PARAMS,
            PRESERVE_HOST,
            FOLLOW_REDIRECTS,
            AUTH_SATISFY,
        ] {
            assert!(key.starts_with(PREFIX_TORCHBOX), "{key}");
        }
        assert!(INGRESS_CLASS.starts_with(PREFIX_KUBERNETES));
    }
}
