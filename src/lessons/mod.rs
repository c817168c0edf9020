pub mod billing;
pub mod deduction;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use billing::*;
pub use deduction::*;
pub use error::*;
pub use handlers::*;
pub use models::*;
pub use repository::*;
pub use service::*;
