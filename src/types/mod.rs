mod account;
mod permissions;
mod repository;

pub use account::{Account, Collaborator};
pub use permissions::Permissions;
pub use repository::{split_repository_name, InvalidRepositoryName, Repository, RepositoryName};
