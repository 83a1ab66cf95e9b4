pub mod pagination;
pub mod query;
pub mod suggest;
pub mod text;
