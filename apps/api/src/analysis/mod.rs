pub mod formatter;
pub mod handlers;
pub mod processor;
pub mod retrieval;
pub mod submit;
