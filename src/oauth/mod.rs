//! OAuth 2.0 request processing: typed requests, grant handlers, and the provider driving them.

pub mod arguments;
pub mod compose;
pub mod grants;
pub mod handlers;
pub mod provider;
pub mod request;
pub mod response;
pub mod strategy;
pub mod types;

// Re-export frequently used items from each module
pub use arguments::Arguments;
pub use compose::{ComposeConfig, compose_provider};
pub use handlers::{
    AuthorizeEndpointHandler, AuthorizeEndpointHandlers, TokenEndpointHandler,
    TokenEndpointHandlers,
};
pub use provider::Provider;
pub use request::{AccessRequest, AuthorizeRequest, ClientCredentials, Request, RequestForm};
pub use response::{AccessResponse, AuthorizeResponse};
pub use strategy::{GeneratedToken, HmacSha256Strategy, TokenStrategy};
pub use types::{ClientType, GrantType, OAuthClient, ResponseType, Session, TokenType};
