pub mod password;
pub mod reset_token;
pub mod session;

pub use reset_token::ResetTokenCodec;
