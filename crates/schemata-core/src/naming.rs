//! Parameter naming strategies
//!
//! Each engine spells bound parameters differently. A strategy maps a logical,
//! zero-based parameter index to the token written into SQL text and to the
//! name the driver expects when binding the value.

/// Translates a logical parameter index to engine-specific text.
///
/// Implementations are pure and stateless.
pub trait NamingStrategy: Send + Sync {
    /// Name under which the driver binds parameter `index`
    fn parameter_name(&self, index: usize) -> String;

    /// Token that references parameter `index` inside SQL text
    fn sql_token(&self, index: usize) -> String;
}

/// Render `count` consecutive SQL tokens starting at `start`, comma separated.
///
/// Used to build `IN (...)` lists for bound filters.
pub fn placeholder_list(naming: &dyn NamingStrategy, start: usize, count: usize) -> String {
    (start..start + count)
        .map(|index| naming.sql_token(index))
        .collect::<Vec<_>>()
        .join(", ")
}
