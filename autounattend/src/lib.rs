use rand::Rng;

pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod parser;
pub mod xml;

/// Generate a random computer name in the installer's own style.
///
/// This lives at the UI layer on purpose: [`builder::build`] always emits
/// the `*` wildcard when no explicit name is configured, so that building
/// stays deterministic.
pub fn random_computer_name() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("DESKTOP-{}", suffix.to_uppercase())
}
