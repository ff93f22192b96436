// Two handler tiers: public (no auth) and protected (bearer token
// required, enforced by middleware::require_auth on the route group).

pub mod protected;
pub mod public;
