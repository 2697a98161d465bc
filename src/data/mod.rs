pub mod document;
pub mod session;
