#![allow(unused_macros)]

/// Helper macro for reading locked items
///
/// A poisoned lock still holds a consistent value here (writers only ever swap a whole
/// `Arc`), so the guard is recovered instead of panicking.
///
/// ```rust, ignore
///  let policy = read_lock!(self.current);
///  println!("{}", policy.rule_count());
/// ```
macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for writing to locked items
///
/// ```rust, ignore
///  let mut current = write_lock!(self.current);
///  *current = Arc::new(policy);
/// ```
macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}
