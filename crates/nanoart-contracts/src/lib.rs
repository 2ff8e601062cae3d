pub mod chat;
pub mod events;
pub mod gallery;
pub mod image_data;
pub mod models;
pub mod requests;
