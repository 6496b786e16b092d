//! Session-token authentication.
//!
//! Login and registration issue an opaque token stored in the `sessions`
//! table; the middleware resolves `Authorization: Bearer <token>` back to a
//! user and injects it as a request extension. Tokens carry no payload, so
//! there is nothing to forge and revocation is a row delete.

use api_types::auth::{AuthResponse, LoginRequest, RegisterRequest};
use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseConnection, entity::prelude::*};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,
    pub user_id: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// The authenticated caller, injected by [`require_session`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
}

pub async fn require_session(
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(bearer)) = bearer else {
        return Err(ServerError::Unauthorized);
    };

    let session = Entity::find_by_id(bearer.token())
        .one(&state.db)
        .await
        .map_err(|_| ServerError::Unauthorized)?
        .ok_or(ServerError::Unauthorized)?;
    let user_id =
        Uuid::parse_str(&session.user_id).map_err(|_| ServerError::Unauthorized)?;

    let current = {
        let engine = state.engine.read().await;
        let user = engine.user(user_id).map_err(|_| ServerError::Unauthorized)?;
        CurrentUser {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            is_admin: user.is_admin,
        }
    };

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

async fn issue_session(db: &DatabaseConnection, user_id: Uuid) -> Result<String, ServerError> {
    let token = Uuid::new_v4().simple().to_string();
    let session = ActiveModel {
        token: ActiveValue::Set(token.clone()),
        user_id: ActiveValue::Set(user_id.to_string()),
        created_at: ActiveValue::Set(Utc::now()),
    };
    session
        .insert(db)
        .await
        .map_err(|err| ServerError::Engine(err.into()))?;
    Ok(token)
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    if payload.email.trim().is_empty()
        || payload.password.is_empty()
        || payload.display_name.trim().is_empty()
    {
        return Err(ServerError::Generic(
            "email, password and display name are required".to_string(),
        ));
    }

    let user = {
        let mut engine = state.engine.write().await;
        engine
            .register(
                &payload.email,
                &payload.password,
                &payload.display_name,
                false,
            )
            .await?
    };

    let token = issue_session(&state.db, user.id).await?;
    tracing::info!(user = %user.email, "registered new user");
    Ok(Json(AuthResponse {
        success: true,
        token,
        user: views::user_view(&user),
    }))
}

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let user = {
        let engine = state.engine.read().await;
        let user = engine
            .authenticate(&payload.email, &payload.password)
            .map_err(|_| ServerError::Unauthorized)?;
        views::user_view(user)
    };

    let token = issue_session(&state.db, user.id).await?;
    Ok(Json(AuthResponse {
        success: true,
        token,
        user,
    }))
}
