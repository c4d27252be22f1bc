//! Folders controller - boundary layer over the sync facade
//!
//! Turns facade results into status codes and JSON bodies. Authorization is
//! checked here, per route, before any facade call; the facade itself knows
//! nothing about privileges.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::accounts::{AccountId, AccountService};
use crate::folders::{ChangeQueryEntry, FolderId, SyncError, SyncFacade};
use crate::mail::SyncSettings;

/// HTTP status codes used by the folder routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Created,
    BadRequest,
    Forbidden,
    NotFound,
    ClientClosedRequest,
    InternalServerError,
    NotImplemented,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::BadRequest => 400,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::ClientClosedRequest => 499,
            Status::InternalServerError => 500,
            Status::NotImplemented => 501,
        }
    }
}

/// Status plus JSON body; `Value::Null` means no body
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    pub status: Status,
    pub body: Value,
}

impl JsonResponse {
    pub fn new(status: Status, body: Value) -> Self {
        Self { status, body }
    }

    pub fn empty(status: Status) -> Self {
        Self::new(status, Value::Null)
    }

    fn ok<T: Serialize>(status: Status, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(body) => Self::new(status, body),
            Err(e) => {
                log::error!("Failed to serialize response: {}", e);
                Self::empty(Status::InternalServerError)
            }
        }
    }
}

/// Folder routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Index,
    Show,
    Update,
    Create,
    Destroy,
    DetectChanges,
}

impl Route {
    pub fn requires_admin(&self) -> bool {
        match self {
            Route::Index
            | Route::Show
            | Route::Update
            | Route::Create
            | Route::Destroy
            | Route::DetectChanges => false,
        }
    }

    /// Read-only routes may skip the CSRF check
    pub fn requires_csrf_token(&self) -> bool {
        !matches!(self, Route::Index | Route::Show)
    }
}

/// Caller identity and per-request state
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: String,
    pub is_admin: bool,
    pub csrf_verified: bool,
    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_admin: false,
            csrf_verified: true,
            cancel: CancellationToken::new(),
        }
    }
}

/// Authorization predicate evaluated before a route runs
pub fn authorize(ctx: &RequestContext, route: Route) -> Result<(), JsonResponse> {
    if route.requires_admin() && !ctx.is_admin {
        log::warn!("User {} denied admin route {:?}", ctx.user_id, route);
        return Err(JsonResponse::empty(Status::Forbidden));
    }
    if route.requires_csrf_token() && !ctx.csrf_verified {
        log::warn!("User {} failed CSRF check on {:?}", ctx.user_id, route);
        return Err(JsonResponse::empty(Status::Forbidden));
    }
    Ok(())
}

macro_rules! authorized {
    ($ctx:expr, $route:expr) => {
        if let Err(response) = authorize($ctx, $route) {
            return response;
        }
    };
}

pub struct FoldersController {
    facade: SyncFacade,
}

impl FoldersController {
    pub fn new(accounts: Arc<dyn AccountService>, settings: SyncSettings) -> Self {
        Self {
            facade: SyncFacade::new(accounts, settings),
        }
    }

    pub fn with_facade(facade: SyncFacade) -> Self {
        Self { facade }
    }

    /// List folders of an account
    pub async fn index(&self, ctx: &RequestContext, account_id: AccountId) -> JsonResponse {
        authorized!(ctx, Route::Index);

        match self.facade.list(&ctx.user_id, account_id).await {
            Ok(listing) => JsonResponse::ok(Status::Ok, &listing),
            Err(SyncError::NotFound(_)) => JsonResponse::empty(Status::NotFound),
            Err(e) => {
                log::error!("Listing folders of account {} failed: {}", account_id, e);
                JsonResponse::empty(Status::InternalServerError)
            }
        }
    }

    pub async fn show(&self, ctx: &RequestContext) -> JsonResponse {
        authorized!(ctx, Route::Show);
        JsonResponse::empty(Status::NotImplemented)
    }

    pub async fn update(&self, ctx: &RequestContext) -> JsonResponse {
        authorized!(ctx, Route::Update);
        JsonResponse::empty(Status::NotImplemented)
    }

    /// Create a folder. An unknown account answers with an empty success.
    pub async fn create(&self, ctx: &RequestContext, account_id: AccountId, mailbox: &str) -> JsonResponse {
        authorized!(ctx, Route::Create);

        let result = self.facade.create(&ctx.user_id, account_id, mailbox).await;
        Self::created(account_id, result)
    }

    /// Create `name` below the folder `parent`
    pub async fn create_subfolder(
        &self,
        ctx: &RequestContext,
        account_id: AccountId,
        parent: &str,
        name: &str,
    ) -> JsonResponse {
        authorized!(ctx, Route::Create);

        let parent = FolderId::from_token(parent);
        let result = self
            .facade
            .create_subfolder(&ctx.user_id, account_id, &parent, name)
            .await;
        Self::created(account_id, result)
    }

    fn created(account_id: AccountId, result: Result<String, SyncError>) -> JsonResponse {
        match result {
            Ok(path) => JsonResponse::new(Status::Created, json!({ "id": path })),
            Err(SyncError::NotFound(_)) => JsonResponse::empty(Status::Ok),
            Err(SyncError::Decode(e)) => {
                log::warn!("Rejected folder id: {}", e);
                JsonResponse::empty(Status::BadRequest)
            }
            Err(e) => {
                log::error!("Creating folder on account {} failed: {}", account_id, e);
                JsonResponse::empty(Status::InternalServerError)
            }
        }
    }

    /// Delete a folder by identifier
    pub async fn destroy(&self, ctx: &RequestContext, account_id: AccountId, folder_id: &str) -> JsonResponse {
        authorized!(ctx, Route::Destroy);

        let folder = FolderId::from_token(folder_id);
        match self.facade.delete(&ctx.user_id, account_id, &folder).await {
            Ok(()) => JsonResponse::empty(Status::Ok),
            Err(SyncError::NotFound(_)) => JsonResponse::empty(Status::NotFound),
            Err(SyncError::Decode(e)) => {
                log::warn!("Rejected folder id {:?}: {}", folder_id, e);
                JsonResponse::empty(Status::BadRequest)
            }
            Err(e) => {
                log::error!("Deleting folder on account {} failed: {}", account_id, e);
                JsonResponse::empty(Status::InternalServerError)
            }
        }
    }

    /// Report folders whose state differs from what the client last saw
    pub async fn detect_changes(
        &self,
        ctx: &RequestContext,
        account_id: AccountId,
        folders: Vec<ChangeQueryEntry>,
    ) -> JsonResponse {
        authorized!(ctx, Route::DetectChanges);

        match self
            .facade
            .detect_changes(&ctx.user_id, account_id, folders, &ctx.cancel)
            .await
        {
            Ok(changes) => JsonResponse::ok(Status::Ok, &changes),
            Err(SyncError::NotFound(_)) => JsonResponse::empty(Status::Ok),
            Err(SyncError::Cancelled) => JsonResponse::empty(Status::ClientClosedRequest),
            Err(e) => {
                log::error!("Change detection on account {} failed: {}", account_id, e);
                JsonResponse::empty(Status::InternalServerError)
            }
        }
    }
}
