pub mod memory;
pub mod prismic;

pub use memory::{Fixture, InMemoryRepository};
pub use prismic::PrismicRepository;
