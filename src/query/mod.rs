// Runtime SQL construction: typed bind parameters, tenant-scoped
// conjunctive predicates, and whitelisted sort specs.

pub mod order;
pub mod params;
pub mod predicate;

pub use order::{SortDirection, SortError, SortSpec};
pub use params::{bind_param_query_as, SqlParam};
pub use predicate::{Predicate, PredicateSet};
