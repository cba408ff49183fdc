pub mod actions;
pub mod config;
pub mod db;
pub mod model;
pub mod normalize;
pub mod revalidate;
pub mod validation;
pub mod web;
