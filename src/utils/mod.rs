pub mod db_utils;
pub mod selfie_store;
pub mod settings_cache;
