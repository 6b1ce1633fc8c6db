use super::handlers::{auth, groups, health, users};
use axum::Router;
use utoipa::openapi::{
    Contact, InfoBuilder, License, OpenApi, OpenApiBuilder, Tag,
    security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Name of the `X-TOKEN` security scheme referenced by gated routes.
pub(crate) const TOKEN_SCHEME: &str = "token";

#[must_use]
pub fn openapi() -> OpenApi {
    let (_public, _gated, openapi) = api_routers();
    openapi
}

/// Routers for public and token-gated endpoints plus the merged `OpenAPI`
/// document.
///
/// Add new endpoints via `.routes(routes!(...))` in the matching router so
/// they are both served and documented. The gate is applied by the caller.
pub(crate) fn api_routers() -> (Router, Router, OpenApi) {
    let public = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::logout::logout));

    let gated = OpenApiRouter::new()
        .routes(routes!(groups::find_groups))
        .routes(routes!(users::get_user, users::add_user));

    let (public, mut openapi) = public.split_for_parts();
    let (gated, gated_openapi) = gated.split_for_parts();
    openapi.merge(gated_openapi);

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Login and logout".to_string());

    let mut account_tag = Tag::new("account");
    account_tag.description = Some("Users and groups, requires X-TOKEN".to_string());

    openapi.tags = Some(vec![auth_tag, account_tag, Tag::new("health")]);

    openapi
        .components
        .get_or_insert_with(Default::default)
        .add_security_scheme(
            TOKEN_SCHEME,
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-TOKEN"))),
        );

    (public, gated, openapi)
}

fn cargo_openapi() -> OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(value: &str) -> Option<&str> {
        if value.is_empty() { None } else { Some(value) }
    }

    match author.split_once('<') {
        Some((name, email)) => (
            non_empty(name.trim()),
            non_empty(email.trim_end_matches('>').trim()),
        ),
        None => (non_empty(author.trim()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, "account-portal");
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));

        let contact = doc.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Account Portal Team"));
            assert_eq!(contact.email.as_deref(), Some("accounts@example.org"));
        }

        let license = doc.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.identifier.as_deref(), Some("GPL-3.0-or-later"));
        }
    }

    #[test]
    fn openapi_documents_public_and_gated_paths() {
        let doc = openapi();
        for path in ["/login", "/logout", "/health", "/groups", "/user"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let tags = doc.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "account"));

        let schemes = doc
            .components
            .map(|components| components.security_schemes)
            .unwrap_or_default();
        assert!(schemes.contains_key(TOKEN_SCHEME));
    }

    #[test]
    fn parse_author_splits_name_and_email() {
        assert_eq!(
            parse_author("Jane Doe <jane@example.org>"),
            (Some("Jane Doe"), Some("jane@example.org"))
        );
        assert_eq!(parse_author("Jane Doe"), (Some("Jane Doe"), None));
        assert_eq!(parse_author("<jane@example.org>"), (None, Some("jane@example.org")));
    }
}
