//! Tenant resolution for the HTTP surface.
//!
//! Auth/rate-limiting/CSRF are out of scope (callers are treated as
//! external collaborators already holding a tenant identity), so the only
//! thing this layer does is read the caller-supplied `X-Tenant-Id` header.
//! Requests without one are scoped to the nil tenant rather than rejected —
//! there is no authentication layer in front of this API to reject against.

use axum::http::HeaderMap;
use uuid::Uuid;

pub const TENANT_HEADER: &str = "x-tenant-id";

pub fn tenant_id(headers: &HeaderMap) -> Uuid {
    headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or(Uuid::nil())
}
