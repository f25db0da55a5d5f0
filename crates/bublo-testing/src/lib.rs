//! Testing utilities and harness for Bublo

pub mod testing;

pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use bublo_core::{deps, node, Deps, EffectResult, Props, View};
}
