//! Reconciles a compiled theme stylesheet with the library stylesheets it
//! was built from: removes the rules it merely repeats, substitutes variable
//! names for literal colours and fonts, and checks that a transformed
//! stylesheet still renders the same.

pub mod parser {
    pub mod comments;
    pub mod css_reader;
}

pub mod style {
    pub mod canonical;
    pub mod classifier;
    pub mod color;
    pub mod css_diff;
    pub mod owned_css;
    pub mod patterns;
    pub mod reference_set;
    pub mod substitute;
    pub mod variables;
}

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;

pub use config::Settings;
pub use error::{ReconcileError, Result};
