//! URL slugs for categories, brands and products.

/// Slug for a category or brand name.
#[must_use]
pub fn name_slug(name: &str) -> String {
    ::slug::slugify(name)
}

/// Slug for a product: `"{name}-{code}"` slugified.
#[must_use]
pub fn product_slug(name: &str, code: &str) -> String {
    ::slug::slugify(format!("{name}-{code}"))
}

/// First slug of `base`, `base-1`, `base-2`, ... that `is_taken` rejects.
pub fn unique_slug(base: &str, mut is_taken: impl FnMut(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_owned();
    }
    (1_u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_slug_strips_accents_and_case() {
        assert_eq!(
            product_slug("Pastillas de Freno Délantero", "PF-01"),
            "pastillas-de-freno-delantero-pf-01"
        );
    }

    #[test]
    fn test_name_slug() {
        assert_eq!(name_slug("Frenos y Suspensión"), "frenos-y-suspension");
    }

    #[test]
    fn test_unique_slug_returns_base_when_free() {
        assert_eq!(unique_slug("casco", |_| false), "casco");
    }

    #[test]
    fn test_unique_slug_appends_counter() {
        let taken = ["casco", "casco-1"];
        assert_eq!(unique_slug("casco", |s| taken.contains(&s)), "casco-2");
    }
}
