pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use snip_core::error::StorageError;
pub use snip_core::repository::{ReadRepository, Repository, Transaction};
