//! REST API layer using Axum
//!
//! JSON endpoints under `/api` for accounts, templates, contracts, signatures,
//! the clause library and canned clause suggestions. Bearer-token routes go
//! through [`auth_middleware`], which resolves the caller into an [`Identity`].
//! Contract routes then ask [`Permissions`] what that identity may do.

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::access::{Identity, Permissions};
use crate::auth::{bearer_token, hash_password, verify_password, TokenKeys};
use crate::error::{ApiError, ErrorBody};
use crate::models::{
    AuthResponse, Clause, Contract, ContractStatus, ContractUpdate, LoginRequest, NewContract,
    NewTemplate, PublicUser, RegisterRequest, SignRequest, Signature, SuggestionRequest,
    SuggestionResponse, Template, User,
};
use crate::storage::{Storage, StorageError};
use crate::suggestions::suggestion_for;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Shared app state for REST handlers (Arc-wrapped for concurrency)
#[derive(Clone)]
pub struct AppState {
    storage: Arc<Storage>,
    keys: TokenKeys,
    bcrypt_cost: u32,
}

impl AppState {
    pub fn new(storage: Storage, keys: TokenKeys, bcrypt_cost: u32) -> Self {
        Self {
            storage: Arc::new(storage),
            keys,
            bcrypt_cost,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        register_handler,
        login_handler,
        list_templates_handler,
        create_template_handler,
        list_contracts_handler,
        create_contract_handler,
        update_contract_handler,
        sign_contract_handler,
        list_clauses_handler,
        suggestion_handler,
        health_handler,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        AuthResponse,
        PublicUser,
        NewTemplate,
        Template,
        NewContract,
        ContractUpdate,
        Contract,
        ContractStatus,
        Signature,
        SignRequest,
        Clause,
        SuggestionRequest,
        SuggestionResponse,
        ErrorBody,
        HealthResponse,
    ))
)]
pub struct ApiDoc;

/// Resolves `Authorization: Bearer <token>` into an [`Identity`] extension.
/// Missing header, bad signature and unknown user all get the same 401.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| {
            warn!(path = %req.uri().path(), "missing or malformed bearer token");
            ApiError::Unauthorized
        })?;

    let claims = state.keys.verify(token).map_err(|e| {
        warn!(error = %e, "rejected bearer token");
        ApiError::Unauthorized
    })?;

    let user = match state.storage.get_user(&claims.id) {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(user_id = %claims.id, "token for unknown user");
            return Err(ApiError::Unauthorized);
        }
        Err(e) => {
            warn!(error = %e, "user lookup failed during authentication");
            return Err(ApiError::Unauthorized);
        }
    };

    req.extensions_mut().insert(Identity::from(&user));
    Ok(next.run(req).await)
}

/// Create Axum router with every endpoint, plus Swagger UI.
/// CORS is open to any origin; preflights are answered before auth runs.
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let auth_routes = Router::new()
        .route(
            "/templates",
            get(list_templates_handler).post(create_template_handler),
        )
        .route(
            "/contracts",
            get(list_contracts_handler).post(create_contract_handler),
        )
        .route("/contracts/:id", put(update_contract_handler))
        .route("/contracts/:id/sign", post(sign_contract_handler))
        .route("/ai-suggestions", post(suggestion_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/clauses", get(list_clauses_handler))
        .merge(auth_routes);

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_handler))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
}

async fn hash_blocking(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::bad_request)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::bad_request)
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = AuthResponse),
        (status = 400, description = "Email taken or invalid input", body = ErrorBody)
    )
)]
async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(payload) = payload?;
    let email = payload.email.trim().to_owned();
    if email.is_empty() {
        return Err(ApiError::bad_request("email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("password is required"));
    }

    // Cheap rejection before paying for a bcrypt hash; create_user re-checks atomically.
    if state
        .storage
        .get_user_by_email(&email)
        .map_err(ApiError::bad_request)?
        .is_some()
    {
        return Err(ApiError::bad_request(StorageError::EmailTaken));
    }

    let password_hash = hash_blocking(payload.password, state.bcrypt_cost).await?;
    let user = User::new(payload.name, email, password_hash);
    state
        .storage
        .create_user(&user)
        .map_err(ApiError::bad_request)?;

    let token = state.keys.issue(&user.id).map_err(ApiError::bad_request)?;
    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.public(),
            token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid credentials", body = ErrorBody)
    )
)]
async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload?;
    let user = state
        .storage
        .get_user_by_email(payload.email.trim())
        .map_err(ApiError::bad_request)?
        .ok_or_else(|| ApiError::bad_request(INVALID_CREDENTIALS))?;

    if !verify_blocking(payload.password, user.password_hash.clone()).await? {
        return Err(ApiError::bad_request(INVALID_CREDENTIALS));
    }

    let token = state.keys.issue(&user.id).map_err(ApiError::bad_request)?;
    Ok(Json(AuthResponse {
        user: user.public(),
        token,
    }))
}

#[utoipa::path(
    get,
    path = "/api/templates",
    responses(
        (status = 200, description = "Templates owned by the caller", body = [Template]),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
async fn list_templates_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Template>>, ApiError> {
    state
        .storage
        .templates_owned_by(&identity.id)
        .map(Json)
        .map_err(ApiError::internal)
}

#[utoipa::path(
    post,
    path = "/api/templates",
    request_body = NewTemplate,
    responses(
        (status = 201, description = "Template saved", body = Template),
        (status = 400, description = "Invalid input", body = ErrorBody)
    )
)]
async fn create_template_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<NewTemplate>, JsonRejection>,
) -> Result<(StatusCode, Json<Template>), ApiError> {
    let Json(payload) = payload?;
    let template = Template::new(&identity.id, payload);
    state
        .storage
        .insert_template(&template)
        .map_err(ApiError::bad_request)?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/api/contracts",
    responses(
        (status = 200, description = "Contracts the caller owns or collaborates on", body = [Contract]),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    )
)]
async fn list_contracts_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<Contract>>, ApiError> {
    state
        .storage
        .contracts_matching(|contract| identity.can_see(contract))
        .map(Json)
        .map_err(ApiError::internal)
}

#[utoipa::path(
    post,
    path = "/api/contracts",
    request_body = NewContract,
    responses(
        (status = 201, description = "Draft contract created", body = Contract),
        (status = 400, description = "Invalid input", body = ErrorBody)
    )
)]
async fn create_contract_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<NewContract>, JsonRejection>,
) -> Result<(StatusCode, Json<Contract>), ApiError> {
    let Json(payload) = payload?;
    let contract = Contract::new(&identity.id, payload);
    state
        .storage
        .insert_contract(&contract)
        .map_err(ApiError::bad_request)?;
    info!(contract_id = %contract.id, owner_id = %identity.id, "contract created");
    Ok((StatusCode::CREATED, Json(contract)))
}

#[utoipa::path(
    put,
    path = "/api/contracts/{id}",
    params(("id" = String, Path, description = "Contract id")),
    request_body = ContractUpdate,
    responses(
        (status = 200, description = "Updated contract", body = Contract),
        (status = 404, description = "Not found or not the owner", body = ErrorBody),
        (status = 400, description = "Invalid input", body = ErrorBody)
    )
)]
async fn update_contract_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    payload: Result<Json<ContractUpdate>, JsonRejection>,
) -> Result<Json<Contract>, ApiError> {
    let Json(update) = payload?;
    let now = Utc::now();
    let updated = state
        .storage
        .modify_contract(&id, |mut contract| {
            if !Permissions::for_contract(&identity, &contract).write {
                return None;
            }
            contract.apply_update(update.clone(), now);
            Some(contract)
        })
        .map_err(ApiError::bad_request)?
        .ok_or(ApiError::NotFound)?;

    info!(contract_id = %id, user_id = %identity.id, "contract updated");
    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/api/contracts/{id}/sign",
    params(("id" = String, Path, description = "Contract id")),
    request_body = SignRequest,
    responses(
        (status = 200, description = "Signed contract", body = Contract),
        (status = 404, description = "Not found or not owner/collaborator", body = ErrorBody),
        (status = 400, description = "Invalid input", body = ErrorBody)
    )
)]
async fn sign_contract_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<String>,
    payload: Result<Json<SignRequest>, JsonRejection>,
) -> Result<Json<Contract>, ApiError> {
    let Json(request) = payload?;
    let now = Utc::now();
    let signed = state
        .storage
        .modify_contract(&id, |mut contract| {
            if !Permissions::for_contract(&identity, &contract).sign {
                return None;
            }
            contract.append_signature(request.name.clone(), request.signature.clone(), now);
            Some(contract)
        })
        .map_err(ApiError::bad_request)?
        .ok_or(ApiError::NotFound)?;

    info!(
        contract_id = %id,
        user_id = %identity.id,
        signatures = signed.signatures.len(),
        "contract signed"
    );
    Ok(Json(signed))
}

#[utoipa::path(
    get,
    path = "/api/clauses",
    responses(
        (status = 200, description = "Public clause library", body = [Clause])
    )
)]
async fn list_clauses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Clause>>, ApiError> {
    state
        .storage
        .public_clauses()
        .map(Json)
        .map_err(ApiError::internal)
}

#[utoipa::path(
    post,
    path = "/api/ai-suggestions",
    request_body = SuggestionRequest,
    responses(
        (status = 200, description = "Canned clause text for the category", body = SuggestionResponse),
        (status = 400, description = "Invalid input", body = ErrorBody)
    )
)]
async fn suggestion_handler(
    payload: Result<Json<SuggestionRequest>, JsonRejection>,
) -> Result<Json<SuggestionResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(SuggestionResponse {
        suggestion: suggestion_for(request.kind.as_deref()).to_owned(),
    }))
}

/// Health check handler
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
