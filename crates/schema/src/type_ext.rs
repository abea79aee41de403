use parser::types::{BaseType, Type};

/// Convenience accessors on wrapped GraphQL types.
pub trait TypeExt {
    /// The innermost named type, unwrapping lists and non-null wrappers.
    fn named_type(&self) -> Option<&str>;

    fn is_list(&self) -> bool;
}

impl TypeExt for Type {
    fn named_type(&self) -> Option<&str> {
        fn base_name(base: &BaseType) -> Option<&str> {
            match base {
                BaseType::Named(name) => Some(name.as_str()),
                BaseType::List(inner) => base_name(&inner.base),
            }
        }
        base_name(&self.base)
    }

    fn is_list(&self) -> bool {
        matches!(self.base, BaseType::List(_))
    }
}
