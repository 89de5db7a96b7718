pub mod controller;
pub mod state;

pub use controller::{fetch_first_page, ListingController, LoadOutcome};
pub use state::ArticleListingState;
