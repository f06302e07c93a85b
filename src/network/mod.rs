pub mod html;
pub mod middleware;
pub mod origin;
pub mod policies;
pub mod proxy;
pub mod security;
pub mod service;
pub mod url;
