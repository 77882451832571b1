mod render_query;
pub use render_query::*;

mod query_builder;
pub use query_builder::*;
