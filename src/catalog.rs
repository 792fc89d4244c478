use crate::evaluation::{FlagDefinition, FlagError, FlagRegistry};

/// Flags the product ships with, in the order they are reported.
pub const FLAGS: &[FlagDefinition] = &[
    FlagDefinition::boolean(
        "tipping_mvp",
        false,
        "Show the tip jar on public profiles",
    ),
    FlagDefinition::boolean(
        "artistSearch",
        true,
        "Enable artist search on the home page",
    )
    .with_alias("artist_search"),
    FlagDefinition::boolean(
        "waitlistEnabled",
        false,
        "Route new signups through the waitlist",
    )
    .with_alias("waitlist_enabled"),
    FlagDefinition::boolean(
        "venmo_tipping",
        false,
        "Accept tips through a linked Venmo handle",
    ),
    FlagDefinition::boolean(
        "universal_notifications",
        false,
        "Send release notifications to every subscriber channel",
    ),
    FlagDefinition::text(
        "pricing_layout",
        "standard",
        &["standard", "compact", "comparison"],
        "Layout of the billing and pricing page",
    ),
    FlagDefinition::number(
        "analytics_sample_rate",
        100,
        &[0, 10, 50, 100],
        "Percentage of page views sent to analytics",
    ),
];

pub fn registry() -> Result<FlagRegistry, FlagError> {
    FlagRegistry::new(FLAGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_valid() {
        let registry = registry().unwrap();
        assert_eq!(registry.len(), FLAGS.len());
        assert_eq!(
            registry.find("waitlist_enabled").map(|d| d.key),
            Some("waitlistEnabled")
        );
    }
}
