pub mod interaction;
pub mod member;

pub use interaction::{handle_interaction, VERIFY_START_ID};
pub use member::handle_member_add;
