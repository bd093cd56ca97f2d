//! Policy derived from an Ingress's annotations.
//!
//! Every accessor distinguishes three outcomes: the annotation is absent
//! (`Ok(None)`, meaning "inherit the default"), present and valid, or present
//! with a value that cannot be interpreted (`Err(PolicyError)`). An invalid
//! value is never replaced by a default.
//!
//! Scalar values must match exactly, surrounding whitespace included. List
//! values allow whitespace around their separators.

use std::net::IpAddr;

use ipnet::IpNet;
use serde::Serialize;
use smallvec::SmallVec;
use thiserror::Error;

use crate::annotations as a;
use crate::Ingress;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("annotation {annotation}: invalid value {value:?}, expected {expected}")]
pub struct PolicyError {
    pub annotation: &'static str,
    pub value: String,
    pub expected: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Basic,
    Digest,
}

/// How IP whitelisting and password authentication combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthSatisfy {
    Any,
    All,
}

pub type ParamList = SmallVec<[String; 4]>;

fn invalid(annotation: &'static str, value: &str, expected: &'static str) -> PolicyError {
    PolicyError {
        annotation,
        value: value.to_string(),
        expected,
    }
}

impl Ingress {
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.meta.annotations.get(key).map(String::as_str)
    }

    fn flag(&self, annotation: &'static str) -> Result<Option<bool>, PolicyError> {
        match self.annotation(annotation) {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(invalid(annotation, other, "\"true\" or \"false\"")),
        }
    }

    fn number(&self, annotation: &'static str) -> Result<Option<u64>, PolicyError> {
        self.annotation(annotation)
            .map(|v| {
                v.parse()
                    .map_err(|_| invalid(annotation, v, "a non-negative integer"))
            })
            .transpose()
    }

    fn params(&self, annotation: &'static str) -> Option<ParamList> {
        self.annotation(annotation)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
    }

    /// The ingress class this ingress asks for, if any.
    pub fn ingress_class(&self) -> Option<&str> {
        self.annotation(a::INGRESS_CLASS)
    }

    /// An ingress without a class annotation is handled by every controller.
    pub fn is_handled_by(&self, class: &str) -> bool {
        self.ingress_class().map_or(true, |c| c == class)
    }

    pub fn auth_type(&self) -> Result<Option<AuthType>, PolicyError> {
        match self.annotation(a::AUTH_TYPE) {
            None => Ok(None),
            Some("basic") => Ok(Some(AuthType::Basic)),
            Some("digest") => Ok(Some(AuthType::Digest)),
            Some(other) => Err(invalid(a::AUTH_TYPE, other, "\"basic\" or \"digest\"")),
        }
    }

    /// Defaults to `All` once authentication or a source whitelist is configured.
    pub fn auth_satisfy(&self) -> Result<Option<AuthSatisfy>, PolicyError> {
        match self.annotation(a::AUTH_SATISFY) {
            Some("any") => Ok(Some(AuthSatisfy::Any)),
            Some("all") => Ok(Some(AuthSatisfy::All)),
            Some(other) => Err(invalid(a::AUTH_SATISFY, other, "\"any\" or \"all\"")),
            None => {
                let configured = self.auth_type()?.is_some()
                    || self.annotation(a::WHITELIST_SOURCE_RANGE).is_some();
                Ok(configured.then_some(AuthSatisfy::All))
            }
        }
    }

    pub fn auth_realm(&self) -> Option<&str> {
        self.annotation(a::AUTH_REALM)
    }

    /// Name of the Secret holding the password file, in the ingress's namespace.
    pub fn auth_secret(&self) -> Option<&str> {
        self.annotation(a::AUTH_SECRET)
    }

    /// Comma-separated networks or bare addresses.
    pub fn whitelist_source_range(&self) -> Result<Option<Vec<IpNet>>, PolicyError> {
        let Some(value) = self.annotation(a::WHITELIST_SOURCE_RANGE) else {
            return Ok(None);
        };
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<IpNet>()
                    .or_else(|_| s.parse::<IpAddr>().map(IpNet::from))
                    .map_err(|_| invalid(a::WHITELIST_SOURCE_RANGE, value, "a comma-separated list of CIDRs"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    pub fn cache_enable(&self) -> Result<Option<bool>, PolicyError> {
        self.flag(a::CACHE_ENABLE)
    }

    pub fn cache_generation(&self) -> Result<Option<u64>, PolicyError> {
        self.number(a::CACHE_GENERATION)
    }

    pub fn cache_ignore_params(&self) -> Option<ParamList> {
        self.params(a::CACHE_IGNORE_PARAMS)
    }

    pub fn cache_whitelist_params(&self) -> Option<ParamList> {
        self.params(a::CACHE_WHITELIST_PARAMS)
    }

    pub fn hsts_max_age(&self) -> Result<Option<u64>, PolicyError> {
        self.number(a::HSTS_MAX_AGE)
    }

    pub fn hsts_include_subdomains(&self) -> Result<Option<bool>, PolicyError> {
        self.flag(a::HSTS_INCLUDE_SUBDOMAINS)
    }

    pub fn preserve_host(&self) -> Result<Option<bool>, PolicyError> {
        self.flag(a::PRESERVE_HOST)
    }

    pub fn follow_redirects(&self) -> Result<Option<bool>, PolicyError> {
        self.flag(a::FOLLOW_REDIRECTS)
    }

    pub fn ssl_redirect(&self) -> Result<Option<bool>, PolicyError> {
        self.flag(a::SSL_REDIRECT)
    }

    pub fn force_ssl_redirect(&self) -> Result<Option<bool>, PolicyError> {
        self.flag(a::FORCE_SSL_REDIRECT)
    }

    pub fn secure_backends(&self) -> Result<Option<bool>, PolicyError> {
        self.flag(a::SECURE_BACKENDS)
    }

    pub fn rewrite_target(&self) -> Option<&str> {
        self.annotation(a::REWRITE_TARGET)
    }

    pub fn app_root(&self) -> Option<&str> {
        self.annotation(a::APP_ROOT)
    }
}

/// All annotation-derived policy of one ingress. `None` fields inherit the
/// renderer's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressPolicy {
    pub auth_type: Option<AuthType>,
    pub auth_satisfy: Option<AuthSatisfy>,
    pub auth_realm: Option<String>,
    pub auth_secret: Option<String>,
    pub whitelist_source_range: Option<Vec<IpNet>>,
    pub cache_enable: Option<bool>,
    pub cache_generation: Option<u64>,
    pub cache_ignore_params: Option<ParamList>,
    pub cache_whitelist_params: Option<ParamList>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub preserve_host: Option<bool>,
    pub follow_redirects: Option<bool>,
    pub ssl_redirect: Option<bool>,
    pub force_ssl_redirect: Option<bool>,
    pub secure_backends: Option<bool>,
    pub rewrite_target: Option<String>,
    pub app_root: Option<String>,
}

impl IngressPolicy {
    /// Derives every policy at once, failing on the first invalid annotation.
    pub fn from_ingress(ing: &Ingress) -> Result<Self, PolicyError> {
        Ok(Self {
            auth_type: ing.auth_type()?,
            auth_satisfy: ing.auth_satisfy()?,
            auth_realm: ing.auth_realm().map(str::to_string),
            auth_secret: ing.auth_secret().map(str::to_string),
            whitelist_source_range: ing.whitelist_source_range()?,
            cache_enable: ing.cache_enable()?,
            cache_generation: ing.cache_generation()?,
            cache_ignore_params: ing.cache_ignore_params(),
            cache_whitelist_params: ing.cache_whitelist_params(),
            hsts_max_age: ing.hsts_max_age()?,
            hsts_include_subdomains: ing.hsts_include_subdomains()?,
            preserve_host: ing.preserve_host()?,
            follow_redirects: ing.follow_redirects()?,
            ssl_redirect: ing.ssl_redirect()?,
            force_ssl_redirect: ing.force_ssl_redirect()?,
            secure_backends: ing.secure_backends()?,
            rewrite_target: ing.rewrite_target().map(str::to_string),
            app_root: ing.app_root().map(str::to_string),
        })
    }
}
