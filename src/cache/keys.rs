//! Cache key builders, one per cached query shape.

pub const AURORA_FORECAST_KEY: &str = "aurora:forecast";
pub const LISTINGS_KEY_PREFIX: &str = "listings:";
pub const SPONSORS_KEY: &str = "sponsors:active";

pub fn aurora_forecast_key() -> String {
    AURORA_FORECAST_KEY.to_string()
}

/// Listings are cached per filter combination; `remove_prefix` with
/// [`LISTINGS_KEY_PREFIX`] invalidates every combination after a write.
pub fn listings_key(community: Option<&str>, category: Option<&str>) -> String {
    format!(
        "{}{}:{}",
        LISTINGS_KEY_PREFIX,
        community.unwrap_or("all"),
        category.unwrap_or("all")
    )
}

pub fn sponsors_key() -> String {
    SPONSORS_KEY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listings_keys_distinguish_filters() {
        assert_eq!(listings_key(None, None), "listings:all:all");
        assert_eq!(
            listings_key(Some("yellowknife"), None),
            "listings:yellowknife:all"
        );
        assert_eq!(
            listings_key(Some("yellowknife"), Some("furniture")),
            "listings:yellowknife:furniture"
        );
        assert!(listings_key(Some("dettah"), None).starts_with(LISTINGS_KEY_PREFIX));
    }
}
