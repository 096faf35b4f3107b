//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod account_command;
mod auth_gateway;
mod photo_store;
mod tree_command;
mod tree_query;
mod tree_repository;

#[cfg(test)]
pub use account_command::MockAccountCommand;
pub use account_command::{AccountCommand, PASSWORD_RESET_MESSAGE};
#[cfg(test)]
pub use auth_gateway::MockAuthGateway;
pub use auth_gateway::{AuthGateway, AuthGatewayError};
#[cfg(test)]
pub use photo_store::MockPhotoStore;
pub use photo_store::{PhotoStore, PhotoStoreError};
#[cfg(test)]
pub use tree_command::MockTreeCommand;
pub use tree_command::TreeCommand;
#[cfg(test)]
pub use tree_query::MockTreeQuery;
pub use tree_query::TreeQuery;
#[cfg(test)]
pub use tree_repository::MockTreeRepository;
pub use tree_repository::{TreeRepository, TreeRepositoryError};
