// Request authorization filter, access enforcement and role gating

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::{ops::Deref, sync::Arc};
use tracing::{debug, warn};

use crate::auth::{
    access::AccessPolicy,
    error::AuthError,
    models::{AuthContext, Role},
    token::{TokenService, ValidationOutcome},
};

/// Marker left in the request extensions once the filter has run,
/// so a request that passes through the layer twice is processed once.
#[derive(Debug, Clone, Copy)]
struct TokenFilterApplied;

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authorization filter.
///
/// Installs an [`AuthContext`] when the request carries a valid bearer
/// token. Missing or invalid tokens leave the request unauthenticated; this
/// layer never rejects, enforcement happens in [`require_authentication`].
pub async fn authenticate(
    State(tokens): State<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<TokenFilterApplied>().is_some() {
        return next.run(request).await;
    }
    request.extensions_mut().insert(TokenFilterApplied);

    let outcome = bearer_token(request.headers()).map(|token| tokens.authenticate(token));

    match outcome {
        Some(ValidationOutcome::Valid(context)) => {
            debug!(
                "Authenticated user_id={} role={} for {}",
                context.user_id,
                context.role,
                request.uri().path()
            );
            request.extensions_mut().insert(context);
        }
        Some(ValidationOutcome::Invalid(reason)) => {
            debug!(
                "Ignoring bearer token on {}: {}",
                request.uri().path(),
                reason
            );
            request.extensions_mut().remove::<AuthContext>();
        }
        None => {}
    }

    next.run(request).await
}

/// Access enforcement: public routes pass, every other route needs a context
pub async fn require_authentication(
    State(policy): State<Arc<AccessPolicy>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if policy.is_public(request.method(), request.uri().path())
        || request.extensions().get::<AuthContext>().is_some()
    {
        return Ok(next.run(request).await);
    }

    warn!(
        "Unauthenticated request to protected route: {} {}",
        request.method(),
        request.uri().path()
    );
    Err(AuthError::Unauthorized)
}

/// Authenticated user extractor for protected routes.
/// Dereferences to the [`AuthContext`] installed by [`authenticate`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthContext);

impl Deref for AuthenticatedUser {
    type Target = AuthContext;

    fn deref(&self) -> &AuthContext {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AuthError::Unauthorized)
    }
}

/// Authorization middleware that requires one of a set of roles
#[derive(Debug, Clone)]
pub struct RequireRole {
    allowed: Vec<Role>,
}

impl RequireRole {
    /// Create a new RequireRole middleware accepting any of `roles`
    pub fn any_of(roles: &[Role]) -> Self {
        Self {
            allowed: roles.to_vec(),
        }
    }

    /// Create a middleware that requires Admin role
    pub fn admin() -> Self {
        Self::any_of(&[Role::Admin])
    }

    /// Check an (optional) request identity against the allowed roles
    pub fn check(&self, context: Option<&AuthContext>) -> Result<(), AuthError> {
        let context = context.ok_or(AuthError::Unauthorized)?;

        if self.allowed.contains(&context.role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden {
                required: self.allowed.clone(),
                actual: context.role,
            })
        }
    }

    /// Middleware function that validates role-based access
    pub async fn middleware(self, request: Request, next: Next) -> Result<Response, AuthError> {
        let context = request.extensions().get::<AuthContext>();

        if let Err(e) = self.check(context) {
            warn!(
                "Role check failed for {} {}: {}",
                request.method(),
                request.uri().path(),
                e
            );
            return Err(e);
        }

        Ok(next.run(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::SessionClaims;
    use axum::{
        body::Body,
        http::{Method, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    const SECRET: &[u8] = b"test_secret_key_for_testing_purposes_only";

    fn test_token_service() -> Arc<TokenService> {
        Arc::new(TokenService::new(SECRET, 900))
    }

    fn token_for(role: Role) -> String {
        test_token_service()
            .mint("user@sonara.com", SessionClaims { user_id: 3, role })
            .unwrap()
    }

    // Echoes the identity the filter installed, or "anonymous"
    async fn whoami(context: Option<Extension<AuthContext>>) -> String {
        match context {
            Some(Extension(context)) => format!("{}:{}", context.subject, context.role),
            None => "anonymous".to_string(),
        }
    }

    fn filter_only_app() -> Router {
        Router::new()
            .route("/echo", get(whoami))
            .layer(middleware::from_fn_with_state(test_token_service(), authenticate))
    }

    fn guarded_app() -> Router {
        let admin_only = middleware::from_fn(|request: Request, next: Next| {
            RequireRole::admin().middleware(request, next)
        });

        Router::new()
            .route("/api/auth/echo", get(whoami))
            .route("/private", get(whoami))
            .route("/admin", get(whoami).route_layer(admin_only))
            .layer(middleware::from_fn_with_state(
                Arc::new(AccessPolicy::standard()),
                require_authentication,
            ))
            .layer(middleware::from_fn_with_state(test_token_service(), authenticate))
    }

    fn request(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = axum::http::Request::builder()
            .method(Method::GET)
            .uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        for value in ["Basic dXNlcjpwYXNz", "Bearer ", "bearer abc", "abc"] {
            headers.insert(header::AUTHORIZATION, value.parse().unwrap());
            assert_eq!(bearer_token(&headers), None, "{:?}", value);
        }
    }

    #[tokio::test]
    async fn test_valid_token_installs_context() {
        let header = format!("Bearer {}", token_for(Role::Artist));
        let response = filter_only_app()
            .oneshot(request("/echo", Some(&header)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "user@sonara.com:ROLE_ARTIST");
    }

    #[tokio::test]
    async fn test_filter_never_rejects() {
        let expired = test_token_service()
            .mint_at(
                "user@sonara.com",
                SessionClaims { user_id: 3, role: Role::User },
                chrono::Utc::now().timestamp() - 10_000,
            )
            .unwrap();
        let foreign = TokenService::new(b"another_secret_another_secret_xx", 900)
            .mint("user@sonara.com", SessionClaims { user_id: 3, role: Role::Admin })
            .unwrap();

        for header in [
            None,
            Some("Bearer garbage".to_string()),
            Some(format!("Bearer {}", expired)),
            Some(format!("Bearer {}", foreign)),
            Some("Basic dXNlcjpwYXNz".to_string()),
        ] {
            let response = filter_only_app()
                .oneshot(request("/echo", header.as_deref()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_text(response).await, "anonymous");
        }
    }

    #[tokio::test]
    async fn test_filter_runs_once_when_layered_twice() {
        // An inner filter must not replace the identity set by the outer one
        let other_secret = Arc::new(TokenService::new(b"another_secret_another_secret_xx", 900));
        let app = Router::new()
            .route("/echo", get(whoami))
            .layer(middleware::from_fn_with_state(other_secret, authenticate))
            .layer(middleware::from_fn_with_state(test_token_service(), authenticate));

        let header = format!("Bearer {}", token_for(Role::User));
        let response = app.oneshot(request("/echo", Some(&header))).await.unwrap();
        assert_eq!(body_text(response).await, "user@sonara.com:ROLE_USER");
    }

    #[tokio::test]
    async fn test_protected_route_requires_context() {
        let response = guarded_app()
            .oneshot(request("/private", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = guarded_app()
            .oneshot(request("/private", Some("Bearer not-a-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let header = format!("Bearer {}", token_for(Role::User));
        let response = guarded_app()
            .oneshot(request("/private", Some(&header)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_public_route_tolerates_bad_token() {
        let response = guarded_app()
            .oneshot(request("/api/auth/echo", Some("Bearer garbage")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "anonymous");
    }

    #[tokio::test]
    async fn test_role_gate() {
        let user = format!("Bearer {}", token_for(Role::User));
        let response = guarded_app()
            .oneshot(request("/admin", Some(&user)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let admin = format!("Bearer {}", token_for(Role::Admin));
        let response = guarded_app()
            .oneshot(request("/admin", Some(&admin)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_require_role_check() {
        let context = AuthContext {
            subject: "a@sonara.com".to_string(),
            user_id: 1,
            role: Role::Artist,
        };

        assert!(RequireRole::any_of(&[Role::Artist, Role::Admin])
            .check(Some(&context))
            .is_ok());
        assert!(matches!(
            RequireRole::admin().check(Some(&context)),
            Err(AuthError::Forbidden { actual: Role::Artist, .. })
        ));
        assert!(matches!(
            RequireRole::admin().check(None),
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_extractor_reads_context() {
        let (mut parts, _) = request("/", None).into_parts();
        let missing = AuthenticatedUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(missing, Err(AuthError::Unauthorized)));

        parts.extensions.insert(AuthContext {
            subject: "a@sonara.com".to_string(),
            user_id: 11,
            role: Role::Admin,
        });
        let user = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user.user_id, 11);
        assert_eq!(user.subject, "a@sonara.com");
        assert!(user.can_access_account(99));
    }
}
