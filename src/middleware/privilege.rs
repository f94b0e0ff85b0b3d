// src/middleware/privilege.rs
//
// Regras de acesso por rota. Cada rota pode declarar a ação que consome
// (ex.: `POST /products/search` → `can_search`) ou que só exige login.
// A declaração vence o mapeamento por método HTTP.

use axum::http::Method;

use crate::models::rbac::PrivilegeAction;

/// Prefixos servidos sem autenticação.
pub const PUBLIC_PREFIXES: [&str; 7] = [
    "/token",
    "/docs",
    "/openapi.json",
    "/redoc",
    "/register/",
    "/auth/",
    "/files/",
];

// Módulos que exigem login mas não bits de privilégio
const BYPASS_PATH_PREFIX: &str = "/kyc/";
const BYPASS_MODULE: &str = "modules";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRule {
    /// Basta estar autenticado
    Authenticated,
    Action(PrivilegeAction),
}

// Declaração coletada via `inventory` a partir dos módulos de handlers
#[derive(Debug)]
pub struct RouteAccess {
    pub method: &'static str,
    /// Template da rota no formato do axum (`/roles/{id}/privileges`)
    pub path: &'static str,
    pub rule: AccessRule,
}

impl RouteAccess {
    pub const fn action(method: &'static str, path: &'static str, action: PrivilegeAction) -> Self {
        Self { method, path, rule: AccessRule::Action(action) }
    }

    pub const fn authenticated(method: &'static str, path: &'static str) -> Self {
        Self { method, path, rule: AccessRule::Authenticated }
    }
}

inventory::collect!(RouteAccess);

pub fn is_public(method: &Method, path: &str) -> bool {
    *method == Method::OPTIONS || PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Primeiro segmento não vazio da URL.
pub fn module_key(path: &str) -> Option<&str> {
    path.split('/').find(|segment| !segment.is_empty())
}

pub fn bypasses_privilege(path: &str) -> bool {
    path.starts_with(BYPASS_PATH_PREFIX) || module_key(path) == Some(BYPASS_MODULE)
}

pub fn declared_rule(method: &Method, route: &str) -> Option<AccessRule> {
    inventory::iter::<RouteAccess>
        .into_iter()
        .find(|decl| decl.path == route && method.as_str().eq_ignore_ascii_case(decl.method))
        .map(|decl| decl.rule)
}

/// Declaração da rota, senão o método HTTP. `None` significa negar.
pub fn resolve_rule(method: &Method, route: &str) -> Option<AccessRule> {
    declared_rule(method, route).or_else(|| PrivilegeAction::from_method(method).map(AccessRule::Action))
}

#[cfg(test)]
mod tests {
    use super::*;

    inventory::submit! {
        RouteAccess::action("GET", "/__fixture/export", PrivilegeAction::Export)
    }

    #[test]
    fn options_and_public_prefixes_skip_auth() {
        assert!(is_public(&Method::OPTIONS, "/products/"));
        assert!(is_public(&Method::POST, "/token"));
        assert!(is_public(&Method::POST, "/auth/refresh"));
        assert!(is_public(&Method::GET, "/files/12"));
        assert!(is_public(&Method::GET, "/openapi.json"));
        assert!(!is_public(&Method::GET, "/products/"));
        assert!(!is_public(&Method::GET, "/users/me"));
    }

    #[test]
    fn module_key_is_first_non_empty_segment() {
        assert_eq!(module_key("/products/"), Some("products"));
        assert_eq!(module_key("//countries/1"), Some("countries"));
        assert_eq!(module_key("/"), None);
    }

    #[test]
    fn kyc_and_modules_bypass_privileges() {
        assert!(bypasses_privilege("/kyc/6f1c"));
        assert!(bypasses_privilege("/modules/"));
        assert!(!bypasses_privilege("/products/"));
    }

    #[test]
    fn method_maps_to_action() {
        assert_eq!(resolve_rule(&Method::GET, "/x/"), Some(AccessRule::Action(PrivilegeAction::View)));
        assert_eq!(resolve_rule(&Method::POST, "/x/"), Some(AccessRule::Action(PrivilegeAction::Add)));
        assert_eq!(resolve_rule(&Method::PUT, "/x/{id}"), Some(AccessRule::Action(PrivilegeAction::Edit)));
        assert_eq!(resolve_rule(&Method::DELETE, "/x/{id}"), Some(AccessRule::Action(PrivilegeAction::Delete)));
        assert_eq!(resolve_rule(&Method::PATCH, "/x/{id}"), None);
    }

    #[test]
    fn declaration_takes_precedence_over_method() {
        assert_eq!(
            resolve_rule(&Method::GET, "/__fixture/export"),
            Some(AccessRule::Action(PrivilegeAction::Export))
        );
        // Outro método na mesma rota cai no mapeamento padrão
        assert_eq!(
            resolve_rule(&Method::POST, "/__fixture/export"),
            Some(AccessRule::Action(PrivilegeAction::Add))
        );
    }
}
