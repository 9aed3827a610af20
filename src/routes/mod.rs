/// Router Module Index
///
/// Splits the routing table by who may reach it. Each module states its access
/// rule; the access gate itself is layered onto `site` in `create_router`.

/// Routes open to everyone (health check, credential processing).
pub mod public;

/// Front-end pages. Wrapped by the access gate middleware.
pub mod site;

/// Administration JSON routes. Handlers require the administrator role.
pub mod admin;
