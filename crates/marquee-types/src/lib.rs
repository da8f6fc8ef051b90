pub mod filters;
pub mod models;
pub mod validation;
pub mod validator;
