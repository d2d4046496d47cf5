//! Hash-based set implementations.

pub mod striped_hash_set;
pub mod striped_set_options;

pub use striped_hash_set::StripedHashSet;
pub use striped_set_options::StripedSetOptions;
