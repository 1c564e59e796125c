pub mod fetch;
pub mod payload;
pub mod resolve;
pub mod submit;
pub mod validate;
