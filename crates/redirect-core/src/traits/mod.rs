//! Core traits
//!
//! - [`RedirectProvider`]: read and mutate the provider objects that carry redirects

pub mod redirect_provider;

pub use redirect_provider::RedirectProvider;
