pub mod authorization_states;
mod token_file;
pub mod token_refresher;
pub mod token_store;

pub use authorization_states::AuthorizationStates;
pub use token_refresher::TokenRefresher;
pub use token_store::{MemoryTokenStore, TokenStore};
