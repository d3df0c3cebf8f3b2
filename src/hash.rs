use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

pub fn stable_hash_tagged<A: Hash + ?Sized>(tag: &str, args: &A) -> u64 {
    stable_hash_with(|hasher| {
        tag.hash(hasher);
        args.hash(hasher);
    })
}
