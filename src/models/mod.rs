pub mod account;
pub mod profile;

pub use account::{Account, AccountSummary};
pub use profile::{Profile, ProfileType};
