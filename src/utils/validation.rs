use crate::utils::error::{FederationError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_non_empty_string(component: &'static str, field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FederationError::ConfigError {
            component,
            message: format!("{} cannot be empty or whitespace-only", field_name),
        });
    }
    Ok(())
}

/// 檢查 slug 是否已出現過，並將其記錄到集合中
pub fn validate_unique_slug(
    component: &'static str,
    seen: &mut HashSet<String>,
    slug: &str,
) -> Result<()> {
    if !seen.insert(slug.to_string()) {
        return Err(FederationError::ConfigError {
            component,
            message: format!("Duplicate sheet slug '{}'", slug),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("SheetValidator", "slug", "orders").is_ok());
        assert!(validate_non_empty_string("SheetValidator", "slug", "").is_err());
        assert!(validate_non_empty_string("SheetValidator", "slug", "   ").is_err());
    }

    #[test]
    fn test_validate_unique_slug() {
        let mut seen = HashSet::new();
        assert!(validate_unique_slug("SheetValidator", &mut seen, "orders").is_ok());
        assert!(validate_unique_slug("SheetValidator", &mut seen, "customers").is_ok());

        let err = validate_unique_slug("SheetValidator", &mut seen, "orders").unwrap_err();
        assert!(err.to_string().contains("Duplicate sheet slug 'orders'"));
        assert!(err.to_string().starts_with("[SheetValidator]"));
    }
}
