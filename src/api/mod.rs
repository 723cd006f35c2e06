pub mod extract;
pub mod pagination;
pub mod validate;
