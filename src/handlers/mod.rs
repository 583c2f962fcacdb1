//! Request handlers, one module per resource.
//!
//! Handlers take `State<AppState>`, an `ApiPath`/`ApiJson` extractor and, when the
//! route is protected, `Extension<AuthUser>`. They return `ApiResult<T>`.

pub mod auth;
pub mod comments;
pub mod features;
pub mod phones;
pub mod reviews;
pub mod users;
