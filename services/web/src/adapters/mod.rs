pub mod db;
pub mod definitions;
pub mod mail;
pub mod snippets;
