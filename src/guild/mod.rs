pub mod gateway;

pub use gateway::{GuildGateway, SerenityGateway, SharedGuildGateway};
