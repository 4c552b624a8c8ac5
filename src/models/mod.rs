pub mod bot;
pub mod card;
pub mod claims;
