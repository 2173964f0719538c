//! Settings schema and the layered loader (defaults, TOML file, `YTQ__` env).

mod load;
mod schema;

pub use schema::*;
