mod message;
mod render;
mod synthesizer;
mod tags;

pub use synthesizer::{ChangelogOptions, ChangelogSynthesizer};
