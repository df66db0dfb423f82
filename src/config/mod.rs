pub mod constants;
pub mod site;

pub use site::{compile_selector, ConfigError, FieldSelectors, PageScheme, SiteConfig};
