pub mod access;

pub mod account_service;
pub use account_service::{AccountError, AccountService, NewAccount, ProfileUpdate};

pub mod account_service_impl;
pub use account_service_impl::SeaOrmAccountService;

pub mod token_service;
pub use token_service::TokenService;

pub mod token_service_impl;
pub use token_service_impl::SeaOrmTokenService;
