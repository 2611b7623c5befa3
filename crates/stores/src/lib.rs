mod firestore;
mod telegram;

pub use firestore::{FirestoreConfig, FirestoreStore};
pub use telegram::{TelegramConfig, TelegramStore};
