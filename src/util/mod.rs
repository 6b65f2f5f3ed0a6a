pub mod crypto_helper;
pub mod slug;
