#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    use std::hash::BuildHasherDefault;

    pub type HashMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<ahash::AHasher>>;
}
